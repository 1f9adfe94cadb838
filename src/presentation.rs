/*!
 * Presentation adapter.
 *
 * `DrillApp` is the composition layer between user controls and the drill
 * engine. It owns the loaded catalog, the plan parameters, the voice
 * directory and the playback controller, and exposes:
 *
 * - `dispatch(intent)`: the single entry point for user intents
 * - `view_state()`: a snapshot of what the active view should show
 *
 * Catalog and progress fetch failures are kept as a recoverable error
 * message; `Intent::Retry` loads again.
 */

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::app_config::{MAX_RATE, MIN_RATE, REPETITION_RANGE};
use crate::drill::controller::PlaybackController;
use crate::drill::model::{Language, PhraseId, PhrasePair};
use crate::drill::progress::ProgressReporter;
use crate::drill::sequence::{DrillPlan, PlanParams, categories};
use crate::errors::StoreError;
use crate::store::{PhraseCatalog, PhraseFilter};
use crate::voices::VoiceDirectory;

/// The three mutually exclusive screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Drill,
    List,
    Settings,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Drill => write!(f, "drill"),
            View::List => write!(f, "list"),
            View::Settings => write!(f, "settings"),
        }
    }
}

/// User intents forwarded to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Start when idle, stop when playing
    PlayPause,
    Stop,
    SetRate(f32),
    SetRepetitions(u32),
    ToggleShuffle,
    SetShuffle(bool),
    SetCategory(String),
    SetEnglishVoice(String),
    SetMandarinVoice(String),
    Navigate(View),
    Back,
    /// Reload the catalog and progress after a failed fetch
    Retry,
}

/// Settings as shown on the settings view
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsView {
    pub rate: f32,
    pub repetitions: u32,
    pub shuffle: bool,
    pub category: String,
}

/// Voice picker contents for one language
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoicePicker {
    /// Name of the voice in use; `None` means the platform default
    pub chosen: Option<String>,
    pub options: Vec<String>,
}

/// Everything a view needs to render
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub view: View,
    /// Phrase being spoken, or the first planned phrase when idle
    pub current_phrase: Option<PhrasePair>,
    pub is_playing: bool,
    /// Phrases in the current plan, in play order
    pub phrases: Vec<PhrasePair>,
    pub session_counts: HashMap<PhraseId, u64>,
    pub lifetime_counts: HashMap<PhraseId, u64>,
    pub settings: SettingsView,
    pub categories: Vec<String>,
    pub english_voices: VoicePicker,
    pub mandarin_voices: VoicePicker,
    /// Recoverable error message (fetch failure, synthesis failure, progress write failure)
    pub error: Option<String>,
}

/// Composition of catalog, voices and playback behind one dispatch entry point
#[derive(Debug)]
pub struct DrillApp {
    catalog: Arc<dyn PhraseCatalog>,
    controller: PlaybackController,
    voices: VoiceDirectory,
    params: PlanParams,
    catalog_pairs: Vec<PhrasePair>,
    plan: DrillPlan,
    view: View,
    load_error: Option<String>,
    rng: StdRng,
}

impl DrillApp {
    pub fn new(
        catalog: Arc<dyn PhraseCatalog>,
        controller: PlaybackController,
        voices: VoiceDirectory,
        params: PlanParams,
    ) -> Self {
        Self::with_rng(catalog, controller, voices, params, StdRng::from_os_rng())
    }

    /// Same as `new` with a caller-provided shuffle source
    pub fn with_rng(
        catalog: Arc<dyn PhraseCatalog>,
        controller: PlaybackController,
        voices: VoiceDirectory,
        params: PlanParams,
        rng: StdRng,
    ) -> Self {
        Self {
            catalog,
            controller,
            voices,
            params,
            catalog_pairs: Vec::new(),
            plan: DrillPlan::default(),
            view: View::default(),
            load_error: None,
            rng,
        }
    }

    /// Fetch the active catalog and the lifetime counters, then rebuild the
    /// plan. On failure the error is kept for the view and also returned.
    pub async fn load(&mut self) -> Result<(), StoreError> {
        let result = self.fetch().await;
        match &result {
            Ok(()) => self.load_error = None,
            Err(e) => {
                warn!("Failed to load drill data: {}", e);
                self.load_error = Some(e.to_string());
            }
        }
        result
    }

    async fn fetch(&mut self) -> Result<(), StoreError> {
        let pairs = self.catalog.list(PhraseFilter::active_only()).await?;
        info!("Loaded {} active phrase(s)", pairs.len());
        self.catalog_pairs = pairs;
        self.rebuild();

        self.reporter().load_lifetime().await?;
        Ok(())
    }

    /// Re-enumerate voices and hand the selection to the controller
    pub async fn refresh_voices(&mut self) {
        self.voices.refresh().await;
        self.controller.set_voices(self.voices.chosen());
    }

    /// Change notifications for the voice list, if the backend publishes any
    pub fn voice_changes(&self) -> Option<watch::Receiver<u64>> {
        self.voices.subscribe()
    }

    pub async fn dispatch(&mut self, intent: Intent) {
        debug!("Dispatching {:?}", intent);

        match intent {
            Intent::PlayPause => {
                if self.controller.is_playing() {
                    self.controller.stop();
                } else {
                    self.controller.play();
                }
            }
            Intent::Stop => self.controller.stop(),
            Intent::SetRate(rate) => {
                if !rate.is_finite() {
                    warn!("Ignoring invalid speech rate {}", rate);
                    return;
                }
                let rate = rate.clamp(MIN_RATE, MAX_RATE);
                self.controller.set_rate(rate);
            }
            Intent::SetRepetitions(repetitions) => {
                let repetitions = repetitions.clamp(*REPETITION_RANGE.start(), *REPETITION_RANGE.end());
                if repetitions != self.params.repetitions {
                    self.params.repetitions = repetitions;
                    self.rebuild();
                }
            }
            Intent::ToggleShuffle => {
                self.params.shuffle = !self.params.shuffle;
                self.rebuild();
            }
            Intent::SetShuffle(shuffle) => {
                if shuffle != self.params.shuffle {
                    self.params.shuffle = shuffle;
                    self.rebuild();
                }
            }
            Intent::SetCategory(category) => {
                if category != self.params.category {
                    self.params.category = category;
                    self.rebuild();
                }
            }
            Intent::SetEnglishVoice(name) => self.choose_voice(Language::English, &name),
            Intent::SetMandarinVoice(name) => self.choose_voice(Language::Mandarin, &name),
            Intent::Navigate(view) => self.view = view,
            Intent::Back => self.view = View::Drill,
            Intent::Retry => {
                // The error is already kept in the view state
                let _ = self.load().await;
            }
        }
    }

    fn choose_voice(&mut self, language: Language, name: &str) {
        if !self.voices.choose(language, name) {
            warn!("{} voice '{}' is not available", language.display_name(), name);
        }
        self.controller.set_voices(self.voices.chosen());
    }

    /// Rebuild the plan from the loaded catalog and hand the new sequence to
    /// the controller. A running drill picks it up at its next advance.
    fn rebuild(&mut self) {
        self.plan = DrillPlan::prepare(&self.catalog_pairs, &self.params, &mut self.rng);
        self.controller.set_sequence(self.plan.sequence().clone());
    }

    pub fn view_state(&self) -> ViewState {
        let snapshot = self.controller.snapshot();
        let counters = self.reporter().counters();

        // The sounding item may belong to a phrase the latest plan no longer holds
        let current_phrase = match &snapshot.current {
            Some(item) => self
                .catalog_pairs
                .iter()
                .find(|p| &p.id == item.phrase_id())
                .cloned(),
            None => self.plan.pairs().first().cloned(),
        };

        let error = self
            .load_error
            .clone()
            .or(snapshot.error)
            .or_else(|| counters.persist_error().map(|e| format!("Progress not saved: {}", e)));

        ViewState {
            view: self.view,
            current_phrase,
            is_playing: snapshot.state.is_playing(),
            phrases: self.plan.pairs().to_vec(),
            session_counts: counters.session_counts().clone(),
            lifetime_counts: counters.lifetime_counts().clone(),
            settings: SettingsView {
                rate: self.controller.settings().rate,
                repetitions: self.params.repetitions,
                shuffle: self.params.shuffle,
                category: self.params.category.clone(),
            },
            categories: categories(&self.catalog_pairs),
            english_voices: self.picker(Language::English),
            mandarin_voices: self.picker(Language::Mandarin),
            error,
        }
    }

    fn picker(&self, language: Language) -> VoicePicker {
        let selection = self.voices.selection(language);
        VoicePicker {
            chosen: selection.chosen.as_ref().map(|v| v.name.clone()),
            options: selection.candidates.iter().map(|v| v.name.clone()).collect(),
        }
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn reporter(&self) -> &ProgressReporter {
        self.controller.reporter()
    }

    pub fn plan(&self) -> &DrillPlan {
        &self.plan
    }

    pub fn params(&self) -> &PlanParams {
        &self.params
    }

    pub fn view(&self) -> View {
        self.view
    }
}

impl Drop for DrillApp {
    fn drop(&mut self) {
        self.controller.dispose();
    }
}
