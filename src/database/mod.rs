/*!
 * Database module for persistent storage of the phrase catalog and progress.
 *
 * This module provides SQLite-based persistence for:
 * - The phrase catalog (`PhraseCatalog`)
 * - Per-user lifetime repetition totals (`ProgressStore`)
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::{DatabaseConnection, DatabaseStats};
pub use repository::Repository;
