/*!
 * Error types for the phrase-drill application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors reported by a speech backend
#[derive(Error, Debug)]
pub enum SpeechError {
    /// The backend is not usable on this host (binary missing, wrong platform)
    #[error("Speech backend unavailable: {0}")]
    Unavailable(String),

    /// The synthesizer process could not be started
    #[error("Failed to start {backend}: {source}")]
    SpawnFailed {
        /// Backend name
        backend: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The synthesizer exited with a failure status
    #[error("{backend} failed: {stderr}")]
    ProcessFailed {
        /// Backend name
        backend: String,
        /// Captured stderr output
        stderr: String,
    },

    /// Listing voices failed
    #[error("Voice enumeration failed for {backend}: {message}")]
    VoiceEnumerationFailed {
        /// Backend name
        backend: String,
        /// Reason
        message: String,
    },

    /// The utterance was cancelled before it finished
    #[error("Utterance cancelled")]
    Cancelled,
}

/// Errors from the phrase catalog and progress store collaborators
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database access failed
    #[error("Database error: {0}")]
    Database(String),

    /// A record was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A record failed validation before being written
    #[error("Invalid record: {0}")]
    Invalid(String),

    /// An operation needs a signed-in user
    #[error("No user is signed in")]
    NoUser,
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database(error.to_string())
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(error: anyhow::Error) -> Self {
        Self::Database(format!("{:#}", error))
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the speech backend
    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    /// Error from a store collaborator
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
