/*!
 * Speech backends.
 *
 * The drill engine only sequences calls; synthesis belongs to the host. This
 * module defines the capability the engine consumes and the backends that
 * provide it:
 * - `say`: macOS built-in synthesizer
 * - `espeak`: eSpeak NG command-line synthesizer
 * - `mock`: scripted backend for tests and silent dry runs
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tokio::sync::watch;

use crate::drill::model::{DrillItem, Language};
use crate::errors::SpeechError;
use crate::voices::Voice;

pub mod espeak;
pub mod mock;
mod process;
pub mod say;

/// Fixed pitch used for every utterance
pub const DEFAULT_PITCH: f32 = 1.0;

/// Everything a backend needs to speak one item
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub language: Language,
    /// `None` lets the backend use its own default voice
    pub voice: Option<Voice>,
    /// Playback rate multiplier, 1.0 is the backend's normal speed
    pub rate: f32,
    pub pitch: f32,
}

impl Utterance {
    pub fn for_item(item: &DrillItem, voice: Option<Voice>, rate: f32, pitch: f32) -> Self {
        Self {
            text: item.text().to_string(),
            language: item.language(),
            voice,
            rate,
            pitch,
        }
    }
}

/// Host speech capability
///
/// Implementations speak one utterance at a time; `speak` resolves when the
/// utterance has finished (or failed). `cancel_all` interrupts whatever is
/// sounding and must be safe to call when nothing is.
#[async_trait]
pub trait SpeechEngine: Send + Sync + Debug {
    /// Enumerate available voices. May be empty until the host has loaded them.
    async fn list_voices(&self) -> Result<Vec<Voice>, SpeechError>;

    /// Speak an utterance and wait for it to complete
    async fn speak(&self, utterance: Utterance) -> Result<(), SpeechError>;

    /// Cancel any in-flight utterance
    fn cancel_all(&self);

    /// Voice-list change notifications; the value is a change counter.
    /// Backends whose voices are known up front return `None`.
    fn voice_changes(&self) -> Option<watch::Receiver<u64>> {
        None
    }

    /// Short backend name for logs
    fn name(&self) -> &str;
}

/// Available backend kinds
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    Say,
    Espeak,
    Silent,
}

impl Default for SpeechBackend {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self::Say
        } else {
            Self::Espeak
        }
    }
}

impl std::fmt::Display for SpeechBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Say => write!(f, "say"),
            Self::Espeak => write!(f, "espeak"),
            Self::Silent => write!(f, "silent"),
        }
    }
}

impl std::str::FromStr for SpeechBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "say" => Ok(Self::Say),
            "espeak" | "espeak-ng" => Ok(Self::Espeak),
            "silent" => Ok(Self::Silent),
            _ => Err(anyhow::anyhow!("Invalid speech backend: {}", s)),
        }
    }
}

/// Words per minute both process backends treat as rate 1.0
pub(crate) const NORMAL_WPM: f32 = 175.0;

pub(crate) fn rate_to_wpm(rate: f32) -> u32 {
    (NORMAL_WPM * rate).round().max(1.0) as u32
}
