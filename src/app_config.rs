use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::drill::controller::PlaybackSettings;
use crate::drill::sequence::{PlanParams, ALL_CATEGORIES};
use crate::speech::espeak::DEFAULT_ESPEAK_BINARY;
use crate::speech::SpeechBackend;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.

/// Slowest allowed speech rate
pub const MIN_RATE: f32 = 0.5;

/// Fastest allowed speech rate
pub const MAX_RATE: f32 = 1.5;

/// Allowed repetitions per phrase
pub const REPETITION_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Playback and sequencing settings
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Pinned voice names
    #[serde(default)]
    pub voices: VoiceConfig,

    /// Speech backend settings
    #[serde(default)]
    pub speech: SpeechConfig,

    /// SQLite database location; the per-user data directory when unset
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Practising user; progress is not persisted when unset
    #[serde(default)]
    pub user: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Playback configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Speech rate multiplier (0.5 to 1.5)
    #[serde(default = "default_rate")]
    pub rate: f32,

    /// Speech pitch multiplier
    #[serde(default = "default_pitch")]
    pub pitch: f32,

    /// How many times each phrase pair is spoken (1 to 10)
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,

    /// Shuffle phrase order before building the sequence
    #[serde(default)]
    pub shuffle: bool,

    /// Category filter; "All" disables filtering
    #[serde(default = "default_category")]
    pub category: String,

    /// Pause between items in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            pitch: default_pitch(),
            repetitions: default_repetitions(),
            shuffle: false,
            category: default_category(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

/// Voice names to prefer over the automatic choice
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct VoiceConfig {
    #[serde(default)]
    pub english: Option<String>,

    #[serde(default)]
    pub mandarin: Option<String>,
}

/// Speech backend configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpeechConfig {
    /// Which synthesizer to drive
    #[serde(default)]
    pub backend: SpeechBackend,

    /// Executable used by the espeak backend
    #[serde(default = "default_espeak_binary")]
    pub espeak_binary: String,

    /// Simulated utterance length for the silent backend
    #[serde(default = "default_silent_delay_ms")]
    pub silent_delay_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: SpeechBackend::default(),
            espeak_binary: default_espeak_binary(),
            silent_delay_ms: default_silent_delay_ms(),
        }
    }
}

fn default_rate() -> f32 {
    0.85
}

fn default_pitch() -> f32 {
    1.0
}

fn default_repetitions() -> u32 {
    3
}

fn default_category() -> String {
    ALL_CATEGORIES.to_string()
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_espeak_binary() -> String {
    DEFAULT_ESPEAK_BINARY.to_string()
}

fn default_silent_delay_ms() -> u64 {
    300
}

impl Config {
    /// Load the configuration from `path`, writing the defaults there first
    /// when the file does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());

        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json =
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let playback = &self.playback;

        if !(MIN_RATE..=MAX_RATE).contains(&playback.rate) {
            return Err(anyhow!(
                "Speech rate must be between {} and {}, got {}",
                MIN_RATE,
                MAX_RATE,
                playback.rate
            ));
        }

        if !playback.pitch.is_finite() || playback.pitch <= 0.0 {
            return Err(anyhow!("Speech pitch must be positive, got {}", playback.pitch));
        }

        if !REPETITION_RANGE.contains(&playback.repetitions) {
            return Err(anyhow!(
                "Repetitions must be between {} and {}, got {}",
                REPETITION_RANGE.start(),
                REPETITION_RANGE.end(),
                playback.repetitions
            ));
        }

        if playback.category.trim().is_empty() {
            return Err(anyhow!("Category filter must not be empty; use \"{}\"", ALL_CATEGORIES));
        }

        if self.speech.backend == SpeechBackend::Espeak && self.speech.espeak_binary.trim().is_empty() {
            return Err(anyhow!("espeak_binary is required for the espeak backend"));
        }

        if self.user.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(anyhow!("User id must not be blank"));
        }

        Ok(())
    }

    /// Settings handed to the playback controller
    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            rate: self.playback.rate,
            pitch: self.playback.pitch,
            settle_delay: Duration::from_millis(self.playback.settle_delay_ms),
        }
    }

    /// Parameters for building the drill sequence
    pub fn plan_params(&self) -> PlanParams {
        PlanParams {
            repetitions: self.playback.repetitions,
            shuffle: self.playback.shuffle,
            category: self.playback.category.clone(),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            playback: PlaybackConfig::default(),
            voices: VoiceConfig::default(),
            speech: SpeechConfig::default(),
            database_path: None,
            user: None,
            log_level: LogLevel::default(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}
