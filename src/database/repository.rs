/*!
 * Repository layer for database operations.
 *
 * This module provides the SQLite implementations of the `PhraseCatalog`
 * and `ProgressStore` collaborators, abstracting away the SQL details.
 */

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;

use super::connection::DatabaseConnection;
use super::models::{PhraseRecord, ProgressRecord};
use crate::drill::model::{PhraseId, PhrasePair};
use crate::errors::StoreError;
use crate::store::{NewPhrase, PhraseCatalog, PhraseFilter, ProgressStore, UserId};

const PHRASE_COLUMNS: &str = "id, english, chinese, pinyin, category, example, is_active, sort_order, created_at, updated_at";

/// Repository for database operations
#[derive(Clone, Debug)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Phrase Operations
    // =========================================================================

    /// Insert a phrase at the end of the catalog order
    pub async fn insert_phrase(&self, phrase: NewPhrase) -> Result<PhraseRecord> {
        self.db
            .transaction_async(move |tx| {
                let next_order: i64 = tx.query_row(
                    "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM phrases",
                    [],
                    |row| row.get(0),
                )?;

                let mut record = PhraseRecord::new(phrase.english, phrase.chinese, next_order);
                record.pinyin = phrase.pinyin;
                record.example = phrase.example;
                if let Some(category) = phrase.category.filter(|c| !c.trim().is_empty()) {
                    record.category = category;
                }

                tx.execute(
                    &format!("INSERT INTO phrases ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)", PHRASE_COLUMNS),
                    params![
                        record.id,
                        record.english,
                        record.chinese,
                        record.pinyin,
                        record.category,
                        record.example,
                        record.is_active,
                        record.sort_order,
                        record.created_at,
                        record.updated_at,
                    ],
                )?;

                debug!("Inserted phrase {} at position {}", record.id, record.sort_order);
                Ok(record)
            })
            .await
    }

    /// Get a phrase by ID
    pub async fn get_phrase(&self, id: &str) -> Result<Option<PhraseRecord>> {
        let id = id.to_string();

        self.db
            .execute_async(move |conn| Self::get_phrase_sync(conn, &id))
            .await
    }

    fn get_phrase_sync(conn: &Connection, id: &str) -> Result<Option<PhraseRecord>> {
        let record = conn
            .query_row(
                &format!("SELECT {} FROM phrases WHERE id = ?1", PHRASE_COLUMNS),
                [id],
                PhraseRecord::from_row,
            )
            .optional()?;

        Ok(record)
    }

    /// List phrases in catalog order, optionally filtered by the active flag
    pub async fn list_phrases(&self, active: Option<bool>) -> Result<Vec<PhraseRecord>> {
        self.db
            .execute_async(move |conn| {
                let records = match active {
                    Some(flag) => {
                        let mut stmt = conn.prepare(&format!(
                            "SELECT {} FROM phrases WHERE is_active = ?1 ORDER BY sort_order ASC, created_at ASC",
                            PHRASE_COLUMNS
                        ))?;
                        stmt.query_map([flag], PhraseRecord::from_row)?
                            .collect::<rusqlite::Result<Vec<_>>>()?
                    }
                    None => {
                        let mut stmt = conn.prepare(&format!(
                            "SELECT {} FROM phrases ORDER BY sort_order ASC, created_at ASC",
                            PHRASE_COLUMNS
                        ))?;
                        stmt.query_map([], PhraseRecord::from_row)?
                            .collect::<rusqlite::Result<Vec<_>>>()?
                    }
                };

                Ok(records)
            })
            .await
    }

    /// Update the editable fields of a phrase; returns false if it does not exist
    pub async fn update_phrase(&self, phrase: &PhrasePair) -> Result<bool> {
        let phrase = phrase.clone();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    r#"
                    UPDATE phrases
                    SET english = ?2, chinese = ?3, pinyin = ?4,
                        category = COALESCE(?5, category), example = ?6, updated_at = ?7
                    WHERE id = ?1
                    "#,
                    params![
                        phrase.id.as_str(),
                        phrase.english,
                        phrase.chinese,
                        phrase.pinyin,
                        phrase.category,
                        phrase.example,
                        Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(changed > 0)
            })
            .await
    }

    /// Toggle whether a phrase takes part in drills
    pub async fn set_phrase_active(&self, id: &str, active: bool) -> Result<bool> {
        let id = id.to_string();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    "UPDATE phrases SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, active, Utc::now().to_rfc3339()],
                )?;
                Ok(changed > 0)
            })
            .await
    }

    /// Delete a phrase and its progress rows; returns false if it does not exist
    pub async fn delete_phrase(&self, id: &str) -> Result<bool> {
        let id = id.to_string();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute("DELETE FROM phrases WHERE id = ?1", [&id])?;
                Ok(changed > 0)
            })
            .await
    }

    // =========================================================================
    // Progress Operations
    // =========================================================================

    /// All progress rows for a user
    pub async fn get_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>> {
        let user_id = user_id.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT user_id, phrase_id, total_repetitions, last_practiced_at
                    FROM user_progress
                    WHERE user_id = ?1
                    "#,
                )?;
                let records = stmt
                    .query_map([&user_id], |row| {
                        Ok(ProgressRecord {
                            user_id: row.get(0)?,
                            phrase_id: row.get(1)?,
                            total_repetitions: row.get(2)?,
                            last_practiced_at: row.get(3)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await
    }

    /// Insert or overwrite the total for one (user, phrase) pair
    pub async fn upsert_progress(&self, record: ProgressRecord) -> Result<()> {
        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO user_progress (user_id, phrase_id, total_repetitions, last_practiced_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(user_id, phrase_id) DO UPDATE SET
                        total_repetitions = excluded.total_repetitions,
                        last_practiced_at = excluded.last_practiced_at
                    "#,
                    params![
                        record.user_id,
                        record.phrase_id,
                        record.total_repetitions,
                        record.last_practiced_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl PhraseCatalog for Repository {
    async fn list(&self, filter: PhraseFilter) -> Result<Vec<PhrasePair>, StoreError> {
        let records = self.list_phrases(filter.active).await?;
        Ok(records.into_iter().map(PhrasePair::from).collect())
    }

    async fn create(&self, phrase: NewPhrase) -> Result<PhrasePair, StoreError> {
        if phrase.english.trim().is_empty() || phrase.chinese.trim().is_empty() {
            return Err(StoreError::Invalid(
                "both English and Chinese text are required".to_string(),
            ));
        }
        Ok(self.insert_phrase(phrase).await?.into())
    }

    async fn update(&self, phrase: &PhrasePair) -> Result<(), StoreError> {
        if self.update_phrase(phrase).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound(phrase.id.to_string()))
        }
    }

    async fn delete(&self, id: &PhraseId) -> Result<(), StoreError> {
        if self.delete_phrase(id.as_str()).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }
}

#[async_trait]
impl ProgressStore for Repository {
    async fn fetch_all(&self, user: &UserId) -> Result<HashMap<PhraseId, u64>, StoreError> {
        let records = self.get_progress(user.as_str()).await?;
        Ok(records
            .into_iter()
            .map(|r| (PhraseId::new(r.phrase_id), r.total_repetitions.max(0) as u64))
            .collect())
    }

    async fn upsert_increment(
        &self,
        user: &UserId,
        phrase: &PhraseId,
        new_total: u64,
        practiced_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let total = i64::try_from(new_total)
            .map_err(|_| StoreError::Invalid(format!("total out of range: {}", new_total)))?;

        self.upsert_progress(ProgressRecord {
            user_id: user.to_string(),
            phrase_id: phrase.to_string(),
            total_repetitions: total,
            last_practiced_at: practiced_at.to_rfc3339(),
        })
        .await?;
        Ok(())
    }
}
