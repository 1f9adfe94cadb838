/*!
 * In-memory store implementations for testing
 *
 * These implement the store traits without touching SQLite, and let tests
 * inject failures and inspect what was written.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use phrase_drill::drill::{PhraseId, PhrasePair};
use phrase_drill::errors::StoreError;
use phrase_drill::store::{NewPhrase, PhraseCatalog, PhraseFilter, ProgressStore, UserId};

/// Catalog backed by a vector; order is insertion order
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    phrases: Mutex<Vec<PhrasePair>>,
    fail_list: AtomicBool,
}

impl InMemoryCatalog {
    pub fn with_phrases(phrases: Vec<PhrasePair>) -> Self {
        Self {
            phrases: Mutex::new(phrases),
            fail_list: AtomicBool::new(false),
        }
    }

    /// Make `list` fail until reset
    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PhraseCatalog for InMemoryCatalog {
    async fn list(&self, _filter: PhraseFilter) -> Result<Vec<PhrasePair>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Database("catalog offline".to_string()));
        }
        Ok(self.phrases.lock().clone())
    }

    async fn create(&self, phrase: NewPhrase) -> Result<PhrasePair, StoreError> {
        let mut phrases = self.phrases.lock();
        let mut pair = PhrasePair::new(
            format!("mem-{}", phrases.len() + 1),
            phrase.english,
            phrase.chinese,
        );
        pair.category = phrase.category;
        phrases.push(pair.clone());
        Ok(pair)
    }

    async fn update(&self, phrase: &PhrasePair) -> Result<(), StoreError> {
        let mut phrases = self.phrases.lock();
        let existing = phrases
            .iter_mut()
            .find(|p| p.id == phrase.id)
            .ok_or_else(|| StoreError::NotFound(phrase.id.to_string()))?;
        *existing = phrase.clone();
        Ok(())
    }

    async fn delete(&self, id: &PhraseId) -> Result<(), StoreError> {
        self.phrases.lock().retain(|p| &p.id != id);
        Ok(())
    }
}

/// One recorded `upsert_increment` call
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertCall {
    pub user: UserId,
    pub phrase: PhraseId,
    pub new_total: u64,
    pub practiced_at: DateTime<Utc>,
}

/// Progress store that records upserts and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingProgressStore {
    totals: Mutex<HashMap<(String, PhraseId), u64>>,
    upserts: Mutex<Vec<UpsertCall>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl RecordingProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose writes always fail
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_fail_writes(true);
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Seed an existing lifetime total
    pub fn seed(&self, user: &UserId, phrase: &PhraseId, total: u64) {
        self.totals
            .lock()
            .insert((user.as_str().to_string(), phrase.clone()), total);
    }

    pub fn upserts(&self) -> Vec<UpsertCall> {
        self.upserts.lock().clone()
    }

    pub fn total(&self, user: &UserId, phrase: &PhraseId) -> Option<u64> {
        self.totals
            .lock()
            .get(&(user.as_str().to_string(), phrase.clone()))
            .copied()
    }
}

#[async_trait]
impl ProgressStore for RecordingProgressStore {
    async fn fetch_all(&self, user: &UserId) -> Result<HashMap<PhraseId, u64>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database("progress offline".to_string()));
        }
        Ok(self
            .totals
            .lock()
            .iter()
            .filter(|((u, _), _)| u == user.as_str())
            .map(|((_, phrase), total)| (phrase.clone(), *total))
            .collect())
    }

    async fn upsert_increment(
        &self,
        user: &UserId,
        phrase: &PhraseId,
        new_total: u64,
        practiced_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("write rejected".to_string()));
        }
        self.upserts.lock().push(UpsertCall {
            user: user.clone(),
            phrase: phrase.clone(),
            new_total,
            practiced_at,
        });
        self.totals
            .lock()
            .insert((user.as_str().to_string(), phrase.clone()), new_total);
        Ok(())
    }
}
