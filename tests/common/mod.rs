/*!
 * Common test utilities for the phrase-drill test suite
 */

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use phrase_drill::drill::{
    PhrasePair, PlaybackController, PlaybackSettings, PlaybackSnapshot, ProgressReporter,
};
use phrase_drill::speech::SpeechEngine;

// Re-export the mock stores module
pub mod mock_stores;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Upper bound for any single wait in async tests
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Route library logs to the test output when RUST_LOG is set
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The single-phrase catalog used by the concrete playback scenario
pub fn good_morning() -> Vec<PhrasePair> {
    vec![PhrasePair::new("1", "Good morning", "早上好").with_pinyin("zǎo shang hǎo")]
}

/// A small catalog with two categories
pub fn sample_phrases() -> Vec<PhrasePair> {
    vec![
        PhrasePair::new("1", "Good morning", "早上好").with_category("greetings"),
        PhrasePair::new("2", "Thank you", "谢谢").with_category("courtesy"),
        PhrasePair::new("3", "Goodbye", "再见").with_category("greetings"),
    ]
}

/// Settings without the settle delay so tests run at full speed
pub fn fast_settings() -> PlaybackSettings {
    PlaybackSettings {
        settle_delay: Duration::ZERO,
        ..PlaybackSettings::default()
    }
}

/// Controller over `speech` with session-only progress and no settle delay
pub fn controller_with(speech: Arc<dyn SpeechEngine>) -> PlaybackController {
    PlaybackController::new(speech, ProgressReporter::session_only(), fast_settings())
}

/// Wait until the controller reports Idle
pub async fn wait_until_idle(controller: &PlaybackController) -> PlaybackSnapshot {
    let mut rx = controller.subscribe();
    tokio::time::timeout(TEST_TIMEOUT, rx.wait_for(|s| !s.state.is_playing()))
        .await
        .expect("controller did not go idle in time")
        .expect("controller dropped")
        .clone()
}

/// Wait until the controller reports `cursor`
pub async fn wait_for_cursor(controller: &PlaybackController, cursor: usize) {
    let mut rx = controller.subscribe();
    tokio::time::timeout(TEST_TIMEOUT, rx.wait_for(|s| s.state.cursor() == Some(cursor)))
        .await
        .expect("cursor not reached in time")
        .expect("controller dropped");
}
