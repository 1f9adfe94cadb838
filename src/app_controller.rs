use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::app_config::{Config, SpeechConfig};
use crate::database::{DatabaseConnection, DatabaseStats, Repository};
use crate::drill::controller::{PlaybackController, PlaybackSnapshot};
use crate::drill::model::{PhraseId, PhrasePair};
use crate::drill::progress::ProgressReporter;
use crate::errors::StoreError;
use crate::presentation::{DrillApp, Intent, View, ViewState};
use crate::speech::espeak::ESpeakEngine;
use crate::speech::mock::MockSpeech;
use crate::speech::say::SayEngine;
use crate::speech::{SpeechBackend, SpeechEngine};
use crate::store::{IdentityProvider, LocalIdentity, NewPhrase, PhraseCatalog, PhraseFilter, UserId};
use crate::voices::VoiceDirectory;

/// Main application controller: wires configuration, storage and speech
/// into the drill engine and runs the CLI operations
#[derive(Debug)]
pub struct Controller {
    config: Config,
    speech: Arc<dyn SpeechEngine>,
    repository: Repository,
    identity: LocalIdentity,
}

impl Controller {
    /// Create a controller with the backend and database named in `config`
    pub fn with_config(config: Config) -> Result<Self> {
        let speech = Self::build_speech(&config.speech);

        let db = match &config.database_path {
            Some(path) => DatabaseConnection::new(path)?,
            None => DatabaseConnection::new_default()?,
        };

        Ok(Self::with_parts(config, speech, Repository::new(db)))
    }

    /// Create a controller from already built collaborators
    pub fn with_parts(config: Config, speech: Arc<dyn SpeechEngine>, repository: Repository) -> Self {
        let identity = LocalIdentity::new(config.user.clone().map(UserId::new));
        Self {
            config,
            speech,
            repository,
            identity,
        }
    }

    /// Instantiate the configured speech backend
    pub fn build_speech(config: &SpeechConfig) -> Arc<dyn SpeechEngine> {
        info!("Using {} speech backend", config.backend);
        match config.backend {
            SpeechBackend::Say => Arc::new(SayEngine::new()),
            SpeechBackend::Espeak => Arc::new(ESpeakEngine::with_binary(config.espeak_binary.clone())),
            SpeechBackend::Silent => Arc::new(MockSpeech::slow(config.silent_delay_ms).verbose()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Build a drill app with voices selected and the configured pins applied.
    ///
    /// Spawns the progress writer, so this must run inside a Tokio runtime.
    pub async fn build_app(&self) -> DrillApp {
        let reporter = ProgressReporter::spawn(
            Arc::new(self.repository.clone()),
            self.identity.current_user(),
        );
        let controller = PlaybackController::new(
            self.speech.clone(),
            reporter,
            self.config.playback_settings(),
        );

        let mut app = DrillApp::new(
            Arc::new(self.repository.clone()),
            controller,
            VoiceDirectory::new(self.speech.clone()),
            self.config.plan_params(),
        );

        app.refresh_voices().await;
        if let Some(name) = &self.config.voices.english {
            app.dispatch(Intent::SetEnglishVoice(name.clone())).await;
        }
        if let Some(name) = &self.config.voices.mandarin {
            app.dispatch(Intent::SetMandarinVoice(name.clone())).await;
        }

        app
    }

    /// Play the drill once, or run an interactive session
    pub async fn run_drill(&self, interactive: bool) -> Result<()> {
        let mut app = self.build_app().await;
        app.load().await.context("Failed to load phrases")?;

        if app.plan().is_empty() {
            warn!("No phrases to drill. Add some with `phrase-drill add`.");
            if !interactive {
                return Ok(());
            }
        }

        let progress_bar = Self::create_progress_bar(app.plan().sequence().len() as u64);
        let mut events = app.controller().subscribe();
        let mut voice_changes = app.voice_changes();
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = interactive;

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        if interactive {
            println!("{}", HELP_TEXT);
        }
        if !app.plan().is_empty() {
            app.dispatch(Intent::PlayPause).await;
        }

        loop {
            tokio::select! {
                changed = events.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = events.borrow_and_update().clone();
                    Self::update_progress_bar(&progress_bar, &snapshot);
                    if !snapshot.state.is_playing() && !interactive {
                        break;
                    }
                }
                _ = &mut ctrl_c => {
                    info!("Interrupted, stopping playback");
                    app.dispatch(Intent::Stop).await;
                    break;
                }
                line = stdin.next_line(), if stdin_open => {
                    match line {
                        Ok(Some(line)) => match parse_command(&line) {
                            Ok(DrillCommand::Quit) => {
                                app.dispatch(Intent::Stop).await;
                                break;
                            }
                            Ok(DrillCommand::Status) => println!("{}", render_view_state(&app.view_state())),
                            Ok(DrillCommand::Help) => println!("{}", HELP_TEXT),
                            Ok(DrillCommand::Intent(intent)) => {
                                app.dispatch(intent).await;
                                progress_bar.set_length(app.plan().sequence().len() as u64);
                            }
                            Err(e) => warn!("{}", e),
                        },
                        Ok(None) => {
                            debug!("stdin closed");
                            app.dispatch(Intent::Stop).await;
                            break;
                        }
                        Err(e) => {
                            warn!("Failed to read command: {}", e);
                            stdin_open = false;
                        }
                    }
                }
                alive = next_voice_change(&mut voice_changes) => {
                    if alive {
                        app.refresh_voices().await;
                    } else {
                        voice_changes = None;
                    }
                }
            }
        }

        progress_bar.finish_and_clear();
        app.reporter().flush().await;

        let state = app.view_state();
        let mandarin_plays: u64 = state.session_counts.values().sum();
        info!(
            "Session finished: {} Mandarin repetition(s) across {} phrase(s)",
            mandarin_plays,
            state.session_counts.len()
        );

        if let Some(e) = app.controller().snapshot().error {
            return Err(anyhow!("Playback stopped early: {}", e));
        }
        if let Some(e) = app.reporter().persist_error() {
            warn!("Some progress was not saved: {}", e);
        }

        Ok(())
    }

    fn create_progress_bar(len: u64) -> ProgressBar {
        let progress_bar = ProgressBar::new(len);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("=>-"));
        progress_bar
    }

    fn update_progress_bar(progress_bar: &ProgressBar, snapshot: &PlaybackSnapshot) {
        progress_bar.set_length(snapshot.sequence_len as u64);
        match (snapshot.state.cursor(), &snapshot.current) {
            (Some(cursor), Some(item)) => {
                progress_bar.set_position(cursor as u64);
                progress_bar.set_message(format!("[{}] {}", item.language(), item.label()));
            }
            _ => progress_bar.set_message("stopped"),
        }
    }

    /// Catalog phrases in sort order
    pub async fn list_phrases(&self, include_inactive: bool) -> Result<Vec<PhrasePair>, StoreError> {
        let filter = if include_inactive {
            PhraseFilter::default()
        } else {
            PhraseFilter::active_only()
        };
        self.repository.list(filter).await
    }

    /// Voice directory with the backend's voices enumerated and defaults selected
    pub async fn list_voices(&self) -> VoiceDirectory {
        let mut directory = VoiceDirectory::new(self.speech.clone());
        directory.refresh().await;
        directory
    }

    pub async fn add_phrase(&self, phrase: NewPhrase) -> Result<PhrasePair, StoreError> {
        let created = self.repository.create(phrase).await?;
        info!("Added phrase {}: {} / {}", created.id, created.english, created.chinese);
        Ok(created)
    }

    pub async fn remove_phrase(&self, id: &str) -> Result<(), StoreError> {
        self.repository.delete(&PhraseId::from(id)).await?;
        info!("Removed phrase {}", id);
        Ok(())
    }

    /// Lifetime totals for the configured user, one row per active phrase
    pub async fn progress(&self) -> Result<Vec<(PhrasePair, u64)>, StoreError> {
        let user = self.identity.current_user().ok_or(StoreError::NoUser)?;
        let reporter = ProgressReporter::spawn(Arc::new(self.repository.clone()), Some(user));
        reporter.load_lifetime().await?;

        let phrases = self.repository.list(PhraseFilter::active_only()).await?;
        Ok(phrases
            .into_iter()
            .map(|p| {
                let total = reporter.lifetime_count(&p.id);
                (p, total)
            })
            .collect())
    }

    pub fn stats(&self) -> Result<DatabaseStats> {
        self.repository.connection().stats()
    }
}

async fn next_voice_change(rx: &mut Option<watch::Receiver<u64>>) -> bool {
    match rx {
        Some(rx) => rx.changed().await.is_ok(),
        None => std::future::pending().await,
    }
}

const HELP_TEXT: &str = "Commands: [enter]/p play-pause, s stop, rate <0.5-1.5>, reps <1-10>, \
shuffle [on|off], category <name>, voice en|zh <name>, view drill|list|settings, back, retry, status, help, q quit";

/// A parsed interactive command
#[derive(Debug, Clone, PartialEq)]
pub enum DrillCommand {
    Intent(Intent),
    Status,
    Help,
    Quit,
}

/// Parse one line typed during an interactive drill
pub fn parse_command(line: &str) -> Result<DrillCommand> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "" | "p" | "play" | "pause" => DrillCommand::Intent(Intent::PlayPause),
        "s" | "stop" => DrillCommand::Intent(Intent::Stop),
        "rate" => {
            let rate = rest
                .parse::<f32>()
                .ok()
                .filter(|r| r.is_finite())
                .ok_or_else(|| anyhow!("Invalid rate: '{}'", rest))?;
            DrillCommand::Intent(Intent::SetRate(rate))
        }
        "reps" | "repetitions" => {
            let reps: u32 = rest.parse().map_err(|_| anyhow!("Invalid repetitions: '{}'", rest))?;
            DrillCommand::Intent(Intent::SetRepetitions(reps))
        }
        "shuffle" => match rest.to_lowercase().as_str() {
            "" => DrillCommand::Intent(Intent::ToggleShuffle),
            "on" | "true" => DrillCommand::Intent(Intent::SetShuffle(true)),
            "off" | "false" => DrillCommand::Intent(Intent::SetShuffle(false)),
            other => return Err(anyhow!("Invalid shuffle value: '{}'", other)),
        },
        "category" | "cat" if !rest.is_empty() => DrillCommand::Intent(Intent::SetCategory(rest.to_string())),
        "voice" => {
            let (lang, name) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| anyhow!("Usage: voice en|zh <name>"))?;
            let name = name.trim().to_string();
            match lang.to_lowercase().as_str() {
                "en" | "english" => DrillCommand::Intent(Intent::SetEnglishVoice(name)),
                "zh" | "mandarin" | "chinese" => DrillCommand::Intent(Intent::SetMandarinVoice(name)),
                other => return Err(anyhow!("Unknown voice language: '{}'", other)),
            }
        }
        "view" => match rest.to_lowercase().as_str() {
            "drill" => DrillCommand::Intent(Intent::Navigate(View::Drill)),
            "list" => DrillCommand::Intent(Intent::Navigate(View::List)),
            "settings" => DrillCommand::Intent(Intent::Navigate(View::Settings)),
            other => return Err(anyhow!("Unknown view: '{}'", other)),
        },
        "back" => DrillCommand::Intent(Intent::Back),
        "retry" => DrillCommand::Intent(Intent::Retry),
        "status" => DrillCommand::Status,
        "help" | "?" => DrillCommand::Help,
        "q" | "quit" | "exit" => DrillCommand::Quit,
        other => return Err(anyhow!("Unknown command: '{}' (type 'help')", other)),
    };

    Ok(command)
}

/// Text rendering of the active view
pub fn render_view_state(state: &ViewState) -> String {
    let mut out = Vec::new();

    match state.view {
        View::Drill => {
            let status = if state.is_playing { "playing" } else { "stopped" };
            out.push(format!("Drill ({})", status));
            match &state.current_phrase {
                Some(phrase) => {
                    out.push(format!("  {}", phrase.english));
                    match &phrase.pinyin {
                        Some(pinyin) => out.push(format!("  {} ({})", phrase.chinese, pinyin)),
                        None => out.push(format!("  {}", phrase.chinese)),
                    }
                    out.push(format!(
                        "  session {} / lifetime {}",
                        state.session_counts.get(&phrase.id).copied().unwrap_or(0),
                        state.lifetime_counts.get(&phrase.id).copied().unwrap_or(0)
                    ));
                }
                None => out.push("  No phrases available".to_string()),
            }
        }
        View::List => {
            out.push(format!("Phrases ({})", state.phrases.len()));
            for phrase in &state.phrases {
                out.push(format!(
                    "  {} / {} [{}] x{}",
                    phrase.english,
                    phrase.chinese,
                    phrase.category.as_deref().unwrap_or("-"),
                    state.session_counts.get(&phrase.id).copied().unwrap_or(0)
                ));
            }
        }
        View::Settings => {
            let settings = &state.settings;
            out.push("Settings".to_string());
            out.push(format!("  rate: {:.2}", settings.rate));
            out.push(format!("  repetitions: {}", settings.repetitions));
            out.push(format!("  shuffle: {}", settings.shuffle));
            out.push(format!("  category: {} (of {})", settings.category, state.categories.join(", ")));
            out.push(format!(
                "  english voice: {} ({} available)",
                state.english_voices.chosen.as_deref().unwrap_or("Default"),
                state.english_voices.options.len()
            ));
            out.push(format!(
                "  mandarin voice: {} ({} available)",
                state.mandarin_voices.chosen.as_deref().unwrap_or("Default"),
                state.mandarin_voices.options.len()
            ));
        }
    }

    if let Some(e) = &state.error {
        out.push(format!("Error: {} (type 'retry')", e));
    }

    out.join("\n")
}
