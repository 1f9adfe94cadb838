/*!
 * Mock speech backend for testing and silent dry runs.
 *
 * This module provides a scripted backend that simulates different behaviors:
 * - `MockSpeech::working()` - every utterance completes immediately
 * - `MockSpeech::slow(ms)` - every utterance takes `ms` to complete
 * - `MockSpeech::failing()` - every utterance fails
 * - `MockSpeech::fail_at(n)` - the n-th utterance (0-based) fails
 * - `MockSpeech::manual()` - utterances complete only when the test says so
 */

use async_trait::async_trait;
use log::info;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, oneshot, watch};
use tokio::time::Duration;

use crate::errors::SpeechError;
use crate::speech::{SpeechEngine, Utterance};
use crate::voices::Voice;

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always completes at once
    Working,
    /// Completes after a delay
    Slow { delay_ms: u64 },
    /// Always fails
    Failing,
    /// Fails on the given 0-based utterance, completes the others
    FailAt { index: usize },
    /// Waits for `complete_current` / `fail_current`
    Manual,
}

#[derive(Debug, Default)]
struct Recorder {
    utterances: Mutex<Vec<Utterance>>,
    pending: Mutex<VecDeque<oneshot::Sender<Result<(), SpeechError>>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    cancels: AtomicUsize,
    cancel: Notify,
}

/// Decrements the in-flight count even when the speaking future is dropped
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scripted speech backend
#[derive(Debug, Clone)]
pub struct MockSpeech {
    behavior: MockBehavior,
    verbose: bool,
    recorder: Arc<Recorder>,
    voices: Arc<Mutex<Vec<Voice>>>,
    voice_version: Arc<watch::Sender<u64>>,
    spoken: Arc<watch::Sender<usize>>,
}

impl MockSpeech {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        let (voice_version, _) = watch::channel(0);
        let (spoken, _) = watch::channel(0);
        Self {
            behavior,
            verbose: false,
            recorder: Arc::new(Recorder::default()),
            voices: Arc::new(Mutex::new(Vec::new())),
            voice_version: Arc::new(voice_version),
            spoken: Arc::new(spoken),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn fail_at(index: usize) -> Self {
        Self::new(MockBehavior::FailAt { index })
    }

    pub fn manual() -> Self {
        Self::new(MockBehavior::Manual)
    }

    /// Log every utterance at info level (silent dry runs)
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Replace the voice list and notify subscribers, like a host that
    /// finishes loading its voices after start-up
    pub fn publish_voices(&self, voices: Vec<Voice>) {
        *self.voices.lock() = voices;
        self.voice_version.send_modify(|v| *v += 1);
    }

    /// Every utterance submitted so far, in order
    pub fn utterances(&self) -> Vec<Utterance> {
        self.recorder.utterances.lock().clone()
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.recorder.utterances.lock().iter().map(|u| u.text.clone()).collect()
    }

    pub fn cancel_count(&self) -> usize {
        self.recorder.cancels.load(Ordering::SeqCst)
    }

    /// Highest number of utterances ever in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.recorder.max_in_flight.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` utterances have been submitted
    pub async fn wait_for_utterances(&self, count: usize) {
        let mut rx = self.spoken.subscribe();
        let _ = rx.wait_for(|spoken| *spoken >= count).await;
    }

    /// Finish the oldest pending manual utterance successfully.
    /// Returns false if nothing was waiting for it any more.
    pub fn complete_current(&self) -> bool {
        self.resolve_current(Ok(()))
    }

    /// Fail the oldest pending manual utterance
    pub fn fail_current(&self) -> bool {
        self.resolve_current(Err(SpeechError::ProcessFailed {
            backend: "mock".to_string(),
            stderr: "simulated synthesis failure".to_string(),
        }))
    }

    fn resolve_current(&self, outcome: Result<(), SpeechError>) -> bool {
        match self.recorder.pending.lock().pop_front() {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    fn failure(index: usize) -> SpeechError {
        SpeechError::ProcessFailed {
            backend: "mock".to_string(),
            stderr: format!("simulated failure on utterance #{}", index),
        }
    }
}

#[async_trait]
impl SpeechEngine for MockSpeech {
    async fn list_voices(&self) -> Result<Vec<Voice>, SpeechError> {
        Ok(self.voices.lock().clone())
    }

    async fn speak(&self, utterance: Utterance) -> Result<(), SpeechError> {
        let in_flight = self.recorder.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.recorder.in_flight);
        self.recorder.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if self.verbose {
            info!("[{}] {}", utterance.language, utterance.text);
        }

        let index = {
            let mut utterances = self.recorder.utterances.lock();
            utterances.push(utterance);
            utterances.len() - 1
        };
        self.spoken.send_replace(index + 1);

        match self.behavior {
            MockBehavior::Working => Ok(()),
            MockBehavior::Slow { delay_ms } => {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => Ok(()),
                    _ = self.recorder.cancel.notified() => Err(SpeechError::Cancelled),
                }
            }
            MockBehavior::Failing => Err(Self::failure(index)),
            MockBehavior::FailAt { index: fail_index } => {
                if index == fail_index {
                    Err(Self::failure(index))
                } else {
                    Ok(())
                }
            }
            MockBehavior::Manual => {
                let (tx, rx) = oneshot::channel();
                self.recorder.pending.lock().push_back(tx);
                rx.await.unwrap_or(Err(SpeechError::Cancelled))
            }
        }
    }

    fn cancel_all(&self) {
        self.recorder.cancels.fetch_add(1, Ordering::SeqCst);
        // Manual utterances keep waiting, like a host that is slow to cancel
        self.recorder.cancel.notify_waiters();
    }

    fn voice_changes(&self) -> Option<watch::Receiver<u64>> {
        Some(self.voice_version.subscribe())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
