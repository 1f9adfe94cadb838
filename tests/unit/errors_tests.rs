/*!
 * Tests for error types and conversions
 */

use phrase_drill::errors::{AppError, SpeechError, StoreError};

#[test]
fn test_speechError_display_shouldNameBackend() {
    let error = SpeechError::ProcessFailed {
        backend: "espeak-ng".to_string(),
        stderr: "no voice".to_string(),
    };
    assert_eq!(error.to_string(), "espeak-ng failed: no voice");
}

#[test]
fn test_speechError_spawnFailed_shouldExposeSource() {
    use std::error::Error;

    let error = SpeechError::SpawnFailed {
        backend: "say".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
    };
    assert!(error.source().is_some());
}

#[test]
fn test_storeError_fromRusqlite_shouldBeDatabase() {
    let error: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(error, StoreError::Database(_)));
}

#[test]
fn test_storeError_fromAnyhow_shouldKeepContextChain() {
    let error: StoreError = anyhow::anyhow!("disk full").context("saving progress").into();
    let message = error.to_string();
    assert!(message.contains("saving progress"));
    assert!(message.contains("disk full"));
}

#[test]
fn test_appError_fromSpeechAndStore_shouldWrap() {
    let speech: AppError = SpeechError::Cancelled.into();
    let store: AppError = StoreError::NoUser.into();

    assert!(matches!(speech, AppError::Speech(SpeechError::Cancelled)));
    assert_eq!(store.to_string(), "Store error: No user is signed in");
}

#[test]
fn test_appError_fromIo_shouldBeFileError() {
    let error: AppError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
    assert!(matches!(error, AppError::File(_)));
}
