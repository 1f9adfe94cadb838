/*!
 * Database entity models.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::drill::model::{PhraseId, PhrasePair};

/// Category assigned when a phrase is created without one
pub const DEFAULT_CATEGORY: &str = "general";

/// Phrase catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseRecord {
    /// Unique phrase identifier (UUID)
    pub id: String,
    /// English text
    pub english: String,
    /// Simplified Chinese text
    pub chinese: String,
    /// Romanisation, if any
    pub pinyin: Option<String>,
    /// Category label
    pub category: String,
    /// Usage example, if any
    pub example: Option<String>,
    /// Whether the phrase takes part in drills
    pub is_active: bool,
    /// Catalog position
    pub sort_order: i64,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

impl PhraseRecord {
    /// Create an active record with a fresh UUID and the current timestamp
    pub fn new(english: String, chinese: String, sort_order: i64) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            english,
            chinese,
            pinyin: None,
            category: DEFAULT_CATEGORY.to_string(),
            example: None,
            is_active: true,
            sort_order,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub(crate) fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            english: row.get(1)?,
            chinese: row.get(2)?,
            pinyin: row.get(3)?,
            category: row.get(4)?,
            example: row.get(5)?,
            is_active: row.get(6)?,
            sort_order: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl From<PhraseRecord> for PhrasePair {
    fn from(record: PhraseRecord) -> Self {
        Self {
            id: PhraseId::new(record.id),
            english: record.english,
            chinese: record.chinese,
            pinyin: record.pinyin,
            category: Some(record.category),
            example: record.example,
        }
    }
}

/// Lifetime repetition total for one (user, phrase) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Owning user
    pub user_id: String,
    /// Practised phrase
    pub phrase_id: String,
    /// Lifetime Mandarin plays
    pub total_repetitions: i64,
    /// Last practice timestamp (RFC 3339)
    pub last_practiced_at: String,
}
