/*!
 * # phrase-drill
 *
 * A pronunciation drill that speaks paired English/Mandarin phrases aloud in
 * a fixed cadence and tracks how often each Mandarin phrase was heard.
 *
 * ## Features
 *
 * - Deterministic drill sequences: one English item, then N Mandarin items per phrase
 * - Optional shuffle and category filter, applied once per parameter change
 * - Interruptible, self-advancing playback over a pluggable speech backend:
 *   - macOS `say`
 *   - `espeak-ng`
 *   - a silent backend for dry runs
 * - Ranked voice selection per language with user pins
 * - Session and lifetime repetition counters persisted in SQLite
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `drill`: The playback engine:
 *   - `drill::model`: Phrase pairs, drill items and sequences
 *   - `drill::sequence`: Sequence building, filtering and shuffling
 *   - `drill::controller`: The playback state machine
 *   - `drill::progress`: Repetition counters and lifetime persistence
 * - `voices`: Voice enumeration and default selection
 * - `speech`: Speech backends behind the `SpeechEngine` trait
 * - `store`: Catalog, progress and identity collaborator traits
 * - `database`: SQLite implementations of the store traits
 * - `presentation`: View state and intent dispatch
 * - `app_controller`: Wiring and CLI operations
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod drill;
pub mod errors;
pub mod presentation;
pub mod speech;
pub mod store;
pub mod voices;

// Re-export main types for easier usage
pub use app_config::Config;
pub use drill::{DrillItem, DrillSequence, Language, PhraseId, PhrasePair, PlaybackController, PlaybackState};
pub use errors::{AppError, SpeechError, StoreError};
pub use presentation::{DrillApp, Intent, View, ViewState};
pub use speech::{SpeechEngine, Utterance};
pub use voices::{Voice, VoiceDirectory};
