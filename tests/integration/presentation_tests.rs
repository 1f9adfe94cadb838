/*!
 * Tests for the presentation adapter: intents in, view state out
 */

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

use phrase_drill::drill::{PhraseId, PlanParams, PlaybackController, ProgressReporter};
use phrase_drill::presentation::{DrillApp, Intent, View};
use phrase_drill::speech::mock::MockSpeech;
use phrase_drill::store::UserId;
use phrase_drill::voices::{Voice, VoiceDirectory};

use crate::common::mock_stores::{InMemoryCatalog, RecordingProgressStore};
use crate::common::{controller_with, fast_settings, sample_phrases, wait_until_idle};

fn app_with(catalog: Arc<InMemoryCatalog>, speech: Arc<MockSpeech>, controller: PlaybackController) -> DrillApp {
    DrillApp::with_rng(
        catalog,
        controller,
        VoiceDirectory::new(speech),
        PlanParams::default(),
        StdRng::seed_from_u64(7),
    )
}

fn sample_app(speech: Arc<MockSpeech>) -> DrillApp {
    let catalog = Arc::new(InMemoryCatalog::with_phrases(sample_phrases()));
    let controller = controller_with(speech.clone());
    app_with(catalog, speech, controller)
}

#[tokio::test]
async fn test_load_shouldShowFirstPhraseWhileIdle() {
    let mut app = sample_app(Arc::new(MockSpeech::working()));

    app.load().await.unwrap();
    let state = app.view_state();

    assert_eq!(state.view, View::Drill);
    assert!(!state.is_playing);
    assert_eq!(state.current_phrase.map(|p| p.english), Some("Good morning".to_string()));
    assert_eq!(state.phrases.len(), 3);
    assert_eq!(state.categories, vec!["All", "courtesy", "greetings"]);
    assert!(state.error.is_none());
    assert_eq!(app.controller().snapshot().sequence_len, 12);
}

#[tokio::test]
async fn test_playPause_shouldToggleController() {
    let speech = Arc::new(MockSpeech::manual());
    let mut app = sample_app(speech.clone());
    app.load().await.unwrap();

    app.dispatch(Intent::PlayPause).await;
    speech.wait_for_utterances(1).await;
    assert!(app.view_state().is_playing);

    app.dispatch(Intent::PlayPause).await;
    assert!(!app.view_state().is_playing);
    assert_eq!(speech.utterances().len(), 1);
}

#[tokio::test]
async fn test_currentPhrase_whilePlaying_shouldFollowSpokenItem() {
    let speech = Arc::new(MockSpeech::manual());
    let mut app = sample_app(speech.clone());
    app.load().await.unwrap();
    app.dispatch(Intent::SetRepetitions(1)).await;

    app.dispatch(Intent::PlayPause).await;
    speech.wait_for_utterances(1).await;
    for n in 2..=3 {
        while !speech.complete_current() {
            tokio::task::yield_now().await;
        }
        speech.wait_for_utterances(n).await;
    }

    let state = app.view_state();
    assert_eq!(state.current_phrase.map(|p| p.id), Some(PhraseId::new("2")));
    assert_eq!(state.session_counts.get(&PhraseId::new("1")), Some(&1));
    app.dispatch(Intent::Stop).await;
}

#[tokio::test]
async fn test_setCategory_shouldRebuildPlan() {
    let mut app = sample_app(Arc::new(MockSpeech::working()));
    app.load().await.unwrap();

    app.dispatch(Intent::SetCategory("greetings".to_string())).await;

    let state = app.view_state();
    assert_eq!(state.settings.category, "greetings");
    assert_eq!(state.phrases.len(), 2);
    assert_eq!(app.controller().snapshot().sequence_len, 8);
    // Categories always come from the whole catalog
    assert_eq!(state.categories.len(), 3);
}

#[tokio::test]
async fn test_setRepetitions_shouldClampToRange() {
    let mut app = sample_app(Arc::new(MockSpeech::working()));
    app.load().await.unwrap();

    app.dispatch(Intent::SetRepetitions(0)).await;
    assert_eq!(app.view_state().settings.repetitions, 1);
    assert_eq!(app.plan().sequence().len(), 6);

    app.dispatch(Intent::SetRepetitions(50)).await;
    assert_eq!(app.view_state().settings.repetitions, 10);
}

#[tokio::test]
async fn test_setRate_shouldClampAndReachController() {
    let mut app = sample_app(Arc::new(MockSpeech::working()));

    app.dispatch(Intent::SetRate(3.0)).await;
    assert_eq!(app.view_state().settings.rate, 1.5);

    app.dispatch(Intent::SetRate(0.7)).await;
    assert_eq!(app.controller().settings().rate, 0.7);
}

#[tokio::test]
async fn test_toggleShuffle_shouldKeepSamePhrases() {
    let mut app = sample_app(Arc::new(MockSpeech::working()));
    app.load().await.unwrap();

    app.dispatch(Intent::ToggleShuffle).await;
    let state = app.view_state();
    assert!(state.settings.shuffle);

    let mut ids: Vec<String> = state.phrases.iter().map(|p| p.id.to_string()).collect();
    ids.sort();
    assert_eq!(ids, vec!["1", "2", "3"]);

    app.dispatch(Intent::SetShuffle(false)).await;
    let ordered: Vec<String> = app.view_state().phrases.iter().map(|p| p.id.to_string()).collect();
    assert_eq!(ordered, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_setRate_withNonFiniteValue_shouldKeepCurrentRate() {
    let speech = Arc::new(MockSpeech::manual());
    let mut app = sample_app(speech.clone());
    app.load().await.unwrap();
    app.dispatch(Intent::SetRate(0.7)).await;

    app.dispatch(Intent::SetRate(f32::NAN)).await;
    app.dispatch(Intent::SetRate(f32::INFINITY)).await;
    assert_eq!(app.controller().settings().rate, 0.7);

    app.dispatch(Intent::PlayPause).await;
    speech.wait_for_utterances(1).await;
    assert_eq!(speech.utterances()[0].rate, 0.7);
    app.dispatch(Intent::Stop).await;
}

#[tokio::test]
async fn test_setCategory_whilePlaying_shouldKeepPlaying() {
    let speech = Arc::new(MockSpeech::manual());
    let mut app = sample_app(speech.clone());
    app.load().await.unwrap();

    app.dispatch(Intent::PlayPause).await;
    speech.wait_for_utterances(1).await;
    app.dispatch(Intent::SetCategory("courtesy".to_string())).await;

    assert!(app.view_state().is_playing);
    assert_eq!(app.controller().state().cursor(), Some(0));
    app.dispatch(Intent::Stop).await;
}

#[tokio::test]
async fn test_setCategory_whilePlaying_shouldShowSpokenPhraseUntilStopped() {
    let speech = Arc::new(MockSpeech::manual());
    let mut app = sample_app(speech.clone());
    app.load().await.unwrap();

    app.dispatch(Intent::PlayPause).await;
    speech.wait_for_utterances(1).await;
    app.dispatch(Intent::SetCategory("courtesy".to_string())).await;

    let state = app.view_state();
    assert_eq!(speech.spoken_texts(), vec!["Good morning"]);
    assert_eq!(state.current_phrase.map(|p| p.english), Some("Good morning".to_string()));
    assert_eq!(state.phrases.len(), 1);

    app.dispatch(Intent::Stop).await;
    let state = app.view_state();
    assert_eq!(state.current_phrase.map(|p| p.english), Some("Thank you".to_string()));
}

#[tokio::test]
async fn test_navigate_andBack_shouldSwitchViews() {
    let mut app = sample_app(Arc::new(MockSpeech::working()));

    app.dispatch(Intent::Navigate(View::Settings)).await;
    assert_eq!(app.view(), View::Settings);

    app.dispatch(Intent::Navigate(View::List)).await;
    assert_eq!(app.view_state().view, View::List);

    app.dispatch(Intent::Back).await;
    assert_eq!(app.view(), View::Drill);
}

#[tokio::test]
async fn test_loadFailure_shouldBeRecoverableWithRetry() {
    let catalog = Arc::new(InMemoryCatalog::with_phrases(sample_phrases()));
    catalog.set_fail_list(true);
    let speech = Arc::new(MockSpeech::working());
    let mut app = app_with(catalog.clone(), speech.clone(), controller_with(speech));

    assert!(app.load().await.is_err());
    let state = app.view_state();
    assert!(state.error.is_some());
    assert!(state.current_phrase.is_none());

    catalog.set_fail_list(false);
    app.dispatch(Intent::Retry).await;

    let state = app.view_state();
    assert!(state.error.is_none());
    assert_eq!(state.phrases.len(), 3);
}

#[tokio::test]
async fn test_progressFetchFailure_shouldSurfaceError() {
    let catalog = Arc::new(InMemoryCatalog::with_phrases(sample_phrases()));
    let store = Arc::new(RecordingProgressStore::new());
    store.set_fail_reads(true);
    let speech = Arc::new(MockSpeech::working());
    let reporter = ProgressReporter::spawn(store.clone(), Some(UserId::new("alice")));
    let controller = PlaybackController::new(speech.clone(), reporter, fast_settings());
    let mut app = app_with(catalog, speech, controller);

    assert!(app.load().await.is_err());
    assert!(app.view_state().error.is_some());
    // Phrases were loaded before the progress fetch failed
    assert_eq!(app.view_state().phrases.len(), 3);
}

#[tokio::test]
async fn test_lifetimeCounts_shouldComeFromStore() {
    let catalog = Arc::new(InMemoryCatalog::with_phrases(sample_phrases()));
    let store = Arc::new(RecordingProgressStore::new());
    let user = UserId::new("alice");
    store.seed(&user, &PhraseId::new("2"), 12);
    let speech = Arc::new(MockSpeech::working());
    let reporter = ProgressReporter::spawn(store, Some(user));
    let controller = PlaybackController::new(speech.clone(), reporter, fast_settings());
    let mut app = app_with(catalog, speech, controller);

    app.load().await.unwrap();

    assert_eq!(app.view_state().lifetime_counts.get(&PhraseId::new("2")), Some(&12));
}

#[tokio::test]
async fn test_speechError_shouldSurfaceInViewState() {
    let speech = Arc::new(MockSpeech::failing());
    let mut app = sample_app(speech);
    app.load().await.unwrap();

    app.dispatch(Intent::PlayPause).await;
    wait_until_idle(app.controller()).await;

    let state = app.view_state();
    assert!(!state.is_playing);
    assert!(state.error.is_some());
}

#[tokio::test]
async fn test_voiceIntents_shouldUpdatePickers() {
    let speech = Arc::new(MockSpeech::working());
    let mut app = sample_app(speech.clone());

    app.refresh_voices().await;
    assert!(app.view_state().mandarin_voices.chosen.is_none());

    let mut changes = app.voice_changes().unwrap();
    speech.publish_voices(vec![
        Voice::new("Alex", "en_US"),
        Voice::new("Daniel", "en_GB"),
        Voice::new("Ting-Ting", "zh_CN"),
        Voice::new("Mei-Jia", "zh_TW"),
    ]);
    changes.changed().await.unwrap();
    app.refresh_voices().await;

    let state = app.view_state();
    assert_eq!(state.english_voices.chosen.as_deref(), Some("Alex"));
    assert_eq!(state.mandarin_voices.chosen.as_deref(), Some("Ting-Ting"));
    assert_eq!(state.mandarin_voices.options.len(), 2);

    app.dispatch(Intent::SetMandarinVoice("Mei-Jia".to_string())).await;
    app.dispatch(Intent::SetEnglishVoice("Daniel".to_string())).await;

    let state = app.view_state();
    assert_eq!(state.mandarin_voices.chosen.as_deref(), Some("Mei-Jia"));
    assert_eq!(state.english_voices.chosen.as_deref(), Some("Daniel"));
}

#[tokio::test]
async fn test_chosenVoice_shouldReachUtterances() {
    let speech = Arc::new(MockSpeech::working());
    speech.publish_voices(vec![Voice::new("Ting-Ting", "zh-CN")]);
    let mut app = sample_app(speech.clone());
    app.load().await.unwrap();
    app.refresh_voices().await;
    app.dispatch(Intent::SetCategory("courtesy".to_string())).await;
    app.dispatch(Intent::SetRepetitions(1)).await;

    app.dispatch(Intent::PlayPause).await;
    wait_until_idle(app.controller()).await;

    let utterances = speech.utterances();
    assert_eq!(utterances.len(), 2);
    assert!(utterances[0].voice.is_none());
    assert_eq!(utterances[1].voice.as_ref().map(|v| v.name.as_str()), Some("Ting-Ting"));
}
