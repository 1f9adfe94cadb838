/*!
 * Tests for session and lifetime repetition counting
 */

use std::sync::Arc;

use phrase_drill::drill::{PhraseId, ProgressReporter};
use phrase_drill::store::UserId;

use crate::common::mock_stores::RecordingProgressStore;

#[test]
fn test_sessionOnly_onMandarinItemPlayed_shouldCountInMemory() {
    let reporter = ProgressReporter::session_only();
    let id = PhraseId::new("1");

    reporter.on_mandarin_item_played(&id);
    reporter.on_mandarin_item_played(&id);

    assert_eq!(reporter.session_count(&id), 2);
    assert_eq!(reporter.lifetime_count(&id), 0);
    assert!(reporter.persist_error().is_none());
}

#[tokio::test]
async fn test_spawn_withUser_shouldUpsertSnapshotPlusOne() {
    let store = Arc::new(RecordingProgressStore::new());
    let user = UserId::new("alice");
    let id = PhraseId::new("1");
    store.seed(&user, &id, 7);

    let reporter = ProgressReporter::spawn(store.clone(), Some(user.clone()));
    reporter.load_lifetime().await.unwrap();
    assert_eq!(reporter.lifetime_count(&id), 7);

    reporter.on_mandarin_item_played(&id);
    reporter.on_mandarin_item_played(&id);
    reporter.flush().await;

    let totals: Vec<u64> = store.upserts().iter().map(|c| c.new_total).collect();
    assert_eq!(totals, vec![8, 9]);
    assert_eq!(reporter.lifetime_count(&id), 9);
    assert_eq!(store.total(&user, &id), Some(9));
}

#[tokio::test]
async fn test_spawn_withoutUser_shouldNotPersist() {
    let store = Arc::new(RecordingProgressStore::new());
    let reporter = ProgressReporter::spawn(store.clone(), None);
    let id = PhraseId::new("1");

    reporter.on_mandarin_item_played(&id);
    reporter.flush().await;

    assert_eq!(reporter.session_count(&id), 1);
    assert!(store.upserts().is_empty());
}

#[tokio::test]
async fn test_persistFailure_shouldKeepSessionCountAndReportError() {
    let store = Arc::new(RecordingProgressStore::failing());
    let reporter = ProgressReporter::spawn(store.clone(), Some(UserId::new("alice")));
    let id = PhraseId::new("1");

    reporter.on_mandarin_item_played(&id);
    reporter.flush().await;

    assert_eq!(reporter.session_count(&id), 1);
    assert_eq!(reporter.lifetime_count(&id), 0);
    assert!(reporter.persist_error().is_some());
}

#[tokio::test]
async fn test_persistRecovery_shouldClearErrorAndContinueFromSnapshot() {
    let store = Arc::new(RecordingProgressStore::failing());
    let reporter = ProgressReporter::spawn(store.clone(), Some(UserId::new("alice")));
    let id = PhraseId::new("1");

    reporter.on_mandarin_item_played(&id);
    reporter.flush().await;
    assert!(reporter.persist_error().is_some());

    store.set_fail_writes(false);
    reporter.on_mandarin_item_played(&id);
    reporter.flush().await;

    // The failed write is not replayed; the stale snapshot is the base
    assert_eq!(store.upserts().last().map(|c| c.new_total), Some(1));
    assert!(reporter.persist_error().is_none());
    assert_eq!(reporter.session_count(&id), 2);
}

#[tokio::test]
async fn test_loadLifetime_withFailingStore_shouldReturnError() {
    let store = Arc::new(RecordingProgressStore::new());
    store.set_fail_reads(true);
    let reporter = ProgressReporter::spawn(store, Some(UserId::new("alice")));

    assert!(reporter.load_lifetime().await.is_err());
}
