/*!
 * Collaborator interfaces consumed by the drill engine.
 *
 * - `PhraseCatalog`: create/read/update/delete on phrase pairs
 * - `ProgressStore`: durable per-user repetition totals
 * - `IdentityProvider`: who is practising
 *
 * The SQLite implementations live in `crate::database`.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::{self, Debug};

use crate::drill::model::{PhraseId, PhrasePair};
use crate::errors::StoreError;

/// Identity of the practising user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog listing filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhraseFilter {
    /// `Some(true)` lists only active phrases, `None` lists everything
    pub active: Option<bool>,
}

impl PhraseFilter {
    pub fn active_only() -> Self {
        Self { active: Some(true) }
    }
}

/// Fields for a new catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct NewPhrase {
    pub english: String,
    pub chinese: String,
    pub pinyin: Option<String>,
    pub category: Option<String>,
    pub example: Option<String>,
}

impl NewPhrase {
    pub fn new(english: impl Into<String>, chinese: impl Into<String>) -> Self {
        Self {
            english: english.into(),
            chinese: chinese.into(),
            pinyin: None,
            category: None,
            example: None,
        }
    }
}

/// Phrase catalog collaborator
#[async_trait]
pub trait PhraseCatalog: Send + Sync + Debug {
    /// List phrases ordered by the catalog's sort key
    async fn list(&self, filter: PhraseFilter) -> Result<Vec<PhrasePair>, StoreError>;

    async fn create(&self, phrase: NewPhrase) -> Result<PhrasePair, StoreError>;

    async fn update(&self, phrase: &PhrasePair) -> Result<(), StoreError>;

    async fn delete(&self, id: &PhraseId) -> Result<(), StoreError>;
}

/// Lifetime progress collaborator
#[async_trait]
pub trait ProgressStore: Send + Sync + Debug {
    /// All lifetime totals for `user`
    async fn fetch_all(&self, user: &UserId) -> Result<HashMap<PhraseId, u64>, StoreError>;

    /// Upsert keyed on (user, phrase), writing `new_total` as the count
    async fn upsert_increment(
        &self,
        user: &UserId,
        phrase: &PhraseId,
        new_total: u64,
        practiced_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Identity collaborator; the engine only reads the id
pub trait IdentityProvider: Send + Sync + Debug {
    fn current_user(&self) -> Option<UserId>;

    fn sign_out(&self);
}

/// Identity taken from local configuration
#[derive(Debug, Default)]
pub struct LocalIdentity {
    user: RwLock<Option<UserId>>,
}

impl LocalIdentity {
    pub fn new(user: Option<UserId>) -> Self {
        Self { user: RwLock::new(user) }
    }

    pub fn signed_in(user: impl Into<String>) -> Self {
        Self::new(Some(UserId::new(user)))
    }
}

impl IdentityProvider for LocalIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.user.read().clone()
    }

    fn sign_out(&self) {
        *self.user.write() = None;
    }
}
