/*!
 * Tests for the process-backed speech engines when the host lacks them
 */

use std::sync::Arc;

use phrase_drill::drill::{DrillItem, Language, PhraseId};
use phrase_drill::errors::SpeechError;
use phrase_drill::speech::espeak::ESpeakEngine;
use phrase_drill::speech::{SpeechEngine, Utterance};
use phrase_drill::voices::{DefaultVoices, VoiceDirectory};

const MISSING_BINARY: &str = "/nonexistent/phrase-drill-espeak";

fn utterance() -> Utterance {
    let item = DrillItem::new("Good morning", Language::English, PhraseId::new("1"));
    Utterance::for_item(&item, None, 0.85, 1.0)
}

#[tokio::test]
async fn test_espeak_withMissingBinary_speakShouldFailToSpawn() {
    let engine = ESpeakEngine::with_binary(MISSING_BINARY);

    let result = engine.speak(utterance()).await;

    assert!(matches!(result, Err(SpeechError::SpawnFailed { .. })));
}

#[tokio::test]
async fn test_espeak_withMissingBinary_listVoicesShouldFail() {
    let engine = ESpeakEngine::with_binary(MISSING_BINARY);
    assert!(engine.list_voices().await.is_err());
}

#[tokio::test]
async fn test_voiceDirectory_withMissingBackend_shouldDegradeToDefaults() {
    let mut directory = VoiceDirectory::new(Arc::new(ESpeakEngine::with_binary(MISSING_BINARY)));

    directory.refresh().await;

    assert_eq!(directory.chosen(), DefaultVoices::default());
    assert!(directory.subscribe().is_none());
}

#[test]
fn test_cancelAll_withNothingInFlight_shouldBeHarmless() {
    let engine = ESpeakEngine::with_binary(MISSING_BINARY);
    engine.cancel_all();
    engine.cancel_all();
}
