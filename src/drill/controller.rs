/*!
 * Playback controller.
 *
 * Drives a drill sequence one utterance at a time. The driver is an explicit
 * loop over controller-owned state: at every step it re-reads the cursor, the
 * current sequence, the rate and the voices, so changes made while playing
 * apply from the next item on. Each `play()` starts a new generation; a driver
 * whose generation is no longer current stops without touching anything,
 * which is what keeps late completions from a cancelled utterance harmless.
 */

use log::{debug, error, info};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use super::model::{DrillItem, DrillSequence, Language};
use super::progress::ProgressReporter;
use crate::speech::{DEFAULT_PITCH, SpeechEngine, Utterance};
use crate::voices::{DefaultVoices, Voice};

/// Pause inserted between consecutive items
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Idle, or playing at a cursor into the active sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing { cursor: usize },
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing { .. })
    }

    pub fn cursor(&self) -> Option<usize> {
        match self {
            Self::Playing { cursor } => Some(*cursor),
            Self::Idle => None,
        }
    }
}

/// Settings read by the driver at every advance
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    pub rate: f32,
    pub pitch: f32,
    pub settle_delay: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            rate: 0.85,
            pitch: DEFAULT_PITCH,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// What observers see after every transition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub current: Option<DrillItem>,
    pub sequence_len: usize,
    /// Set when a synthesis error ended the last session
    pub error: Option<String>,
}

#[derive(Debug)]
struct ControllerState {
    state: PlaybackState,
    current: Option<DrillItem>,
    sequence: DrillSequence,
    settings: PlaybackSettings,
    voices: DefaultVoices,
    generation: u64,
    error: Option<String>,
}

impl ControllerState {
    fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            current: self.current.clone(),
            sequence_len: self.sequence.len(),
            error: self.error.clone(),
        }
    }

    fn go_idle(&mut self) {
        self.state = PlaybackState::Idle;
        self.current = None;
    }

    fn voice_for(&self, language: Language) -> Option<Voice> {
        self.voices.for_language(language).cloned()
    }
}

#[derive(Debug)]
struct ControllerInner {
    speech: Arc<dyn SpeechEngine>,
    reporter: ProgressReporter,
    state: Mutex<ControllerState>,
    driver: Mutex<Option<JoinHandle<()>>>,
    events: watch::Sender<PlaybackSnapshot>,
}

impl ControllerInner {
    fn publish(&self, snapshot: PlaybackSnapshot) {
        self.events.send_replace(snapshot);
    }
}

/// Sequential, interruptible playback of a drill sequence
#[derive(Debug, Clone)]
pub struct PlaybackController {
    inner: Arc<ControllerInner>,
}

/// Outcome of one advance decision
enum Step {
    Speak { item: DrillItem, utterance: Utterance },
    Finished,
    Stale,
}

impl PlaybackController {
    pub fn new(speech: Arc<dyn SpeechEngine>, reporter: ProgressReporter, settings: PlaybackSettings) -> Self {
        let state = ControllerState {
            state: PlaybackState::Idle,
            current: None,
            sequence: DrillSequence::empty(),
            settings,
            voices: DefaultVoices::default(),
            generation: 0,
            error: None,
        };
        let (events, _) = watch::channel(state.snapshot());

        Self {
            inner: Arc::new(ControllerInner {
                speech,
                reporter,
                state: Mutex::new(state),
                driver: Mutex::new(None),
                events,
            }),
        }
    }

    /// Start playing from the first item. No-op while already playing.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn play(&self) {
        let (generation, snapshot) = {
            let mut state = self.inner.state.lock();
            if state.state.is_playing() {
                debug!("play() ignored, already playing");
                return;
            }

            // Clear out anything the host may still be saying
            self.inner.speech.cancel_all();

            state.generation += 1;
            state.error = None;
            state.state = PlaybackState::Playing { cursor: 0 };
            info!("Starting drill ({} items)", state.sequence.len());
            (state.generation, state.snapshot())
        };
        self.inner.publish(snapshot);

        let inner = self.inner.clone();
        let handle = tokio::spawn(drive(inner, generation));
        if let Some(previous) = self.inner.driver.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stop immediately. Safe to call while idle.
    pub fn stop(&self) {
        let snapshot = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            if state.state.is_playing() {
                info!("Stopping drill");
            }
            state.go_idle();
            state.snapshot()
        };

        if let Some(driver) = self.inner.driver.lock().take() {
            driver.abort();
        }
        self.inner.speech.cancel_all();
        self.inner.publish(snapshot);
    }

    /// Stop and release the driver; the controller stays usable
    pub fn dispose(&self) {
        self.stop();
    }

    /// Swap in a newly built sequence. The cursor is kept; the new sequence
    /// is consulted at the next advance.
    pub fn set_sequence(&self, sequence: DrillSequence) {
        let snapshot = {
            let mut state = self.inner.state.lock();
            debug!("Sequence replaced ({} -> {} items)", state.sequence.len(), sequence.len());
            state.sequence = sequence;
            state.snapshot()
        };
        self.inner.publish(snapshot);
    }

    /// Change the playback rate from the next item on
    pub fn set_rate(&self, rate: f32) {
        self.inner.state.lock().settings.rate = rate;
    }

    pub fn set_settle_delay(&self, delay: Duration) {
        self.inner.state.lock().settings.settle_delay = delay;
    }

    /// Change the voices from the next item on
    pub fn set_voices(&self, voices: DefaultVoices) {
        self.inner.state.lock().voices = voices;
    }

    pub fn settings(&self) -> PlaybackSettings {
        self.inner.state.lock().settings.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.state.lock().state
    }

    pub fn is_playing(&self) -> bool {
        self.state().is_playing()
    }

    pub fn current_item(&self) -> Option<DrillItem> {
        self.inner.state.lock().current.clone()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.inner.state.lock().snapshot()
    }

    /// Observe every state transition
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.inner.events.subscribe()
    }

    pub fn reporter(&self) -> &ProgressReporter {
        &self.inner.reporter
    }
}

/// Decide what to do at the cursor, or report that this driver is outdated
fn next_step(inner: &ControllerInner, generation: u64) -> (Step, Option<PlaybackSnapshot>) {
    let mut state = inner.state.lock();
    if state.generation != generation {
        return (Step::Stale, None);
    }
    let Some(cursor) = state.state.cursor() else {
        return (Step::Stale, None);
    };

    match state.sequence.get(cursor).cloned() {
        None => {
            info!("Drill finished");
            state.go_idle();
            (Step::Finished, Some(state.snapshot()))
        }
        Some(item) => {
            let voice = state.voice_for(item.language());
            let utterance = Utterance::for_item(&item, voice, state.settings.rate, state.settings.pitch);
            debug!("[{}/{}] {} {}", cursor + 1, state.sequence.len(), item.language(), item.label());
            state.current = Some(item.clone());
            (Step::Speak { item, utterance }, Some(state.snapshot()))
        }
    }
}

async fn drive(inner: Arc<ControllerInner>, generation: u64) {
    loop {
        let (step, snapshot) = next_step(&inner, generation);
        if let Some(snapshot) = snapshot {
            inner.publish(snapshot);
        }

        let (item, utterance) = match step {
            Step::Speak { item, utterance } => (item, utterance),
            Step::Finished | Step::Stale => return,
        };

        if item.is_mandarin() {
            inner.reporter.on_mandarin_item_played(item.phrase_id());
        }

        let outcome = inner.speech.speak(utterance).await;

        let settle_delay = {
            let mut state = inner.state.lock();
            if state.generation != generation {
                debug!("Ignoring completion from a stopped session");
                return;
            }
            if let Err(e) = outcome {
                error!("Speech synthesis error: {}", e);
                state.go_idle();
                state.error = Some(e.to_string());
                let snapshot = state.snapshot();
                drop(state);
                inner.publish(snapshot);
                return;
            }
            state.settings.settle_delay
        };

        if !settle_delay.is_zero() {
            tokio::time::sleep(settle_delay).await;
        }

        let mut state = inner.state.lock();
        if state.generation != generation {
            return;
        }
        if let PlaybackState::Playing { cursor } = state.state {
            state.state = PlaybackState::Playing { cursor: cursor + 1 };
        }
    }
}
