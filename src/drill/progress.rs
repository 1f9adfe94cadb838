/*!
 * Progress reporting.
 *
 * Every Mandarin item played bumps an in-memory session counter and queues an
 * increment of the lifetime counter. Lifetime writes go through one writer
 * task so they are applied in order, and playback never waits on them.
 */

use chrono::Utc;
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::model::PhraseId;
use crate::errors::StoreError;
use crate::store::{ProgressStore, UserId};

/// Session and lifetime repetition counts keyed by phrase
#[derive(Debug, Clone, Default)]
pub struct RepetitionCounters {
    session: HashMap<PhraseId, u64>,
    lifetime: HashMap<PhraseId, u64>,
    /// Last persistence failure; cleared by the next successful write
    persist_error: Option<String>,
}

impl RepetitionCounters {
    pub fn session(&self, id: &PhraseId) -> u64 {
        self.session.get(id).copied().unwrap_or(0)
    }

    pub fn lifetime(&self, id: &PhraseId) -> u64 {
        self.lifetime.get(id).copied().unwrap_or(0)
    }

    pub fn session_counts(&self) -> &HashMap<PhraseId, u64> {
        &self.session
    }

    pub fn lifetime_counts(&self) -> &HashMap<PhraseId, u64> {
        &self.lifetime
    }

    pub fn persist_error(&self) -> Option<&str> {
        self.persist_error.as_deref()
    }
}

enum ProgressCommand {
    Increment(PhraseId),
    Flush(oneshot::Sender<()>),
}

/// Counts Mandarin repetitions and forwards them to the progress store
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    counters: Arc<RwLock<RepetitionCounters>>,
    store: Option<Arc<dyn ProgressStore>>,
    user: Option<UserId>,
    writer: Option<mpsc::UnboundedSender<ProgressCommand>>,
}

impl std::fmt::Debug for ProgressCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Increment(id) => write!(f, "Increment({})", id),
            Self::Flush(_) => write!(f, "Flush"),
        }
    }
}

impl ProgressReporter {
    /// Reporter with session counting only
    pub fn session_only() -> Self {
        Self {
            counters: Arc::new(RwLock::new(RepetitionCounters::default())),
            store: None,
            user: None,
            writer: None,
        }
    }

    /// Reporter that also persists lifetime totals for `user`.
    ///
    /// Spawns the writer task, so this must run inside a Tokio runtime.
    /// Without a user the reporter only counts the session.
    pub fn spawn(store: Arc<dyn ProgressStore>, user: Option<UserId>) -> Self {
        let mut reporter = Self::session_only();
        reporter.store = Some(store.clone());

        if let Some(user) = user {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(run_writer(store, user.clone(), reporter.counters.clone(), rx));
            reporter.user = Some(user);
            reporter.writer = Some(tx);
        } else {
            debug!("No user signed in, lifetime progress will not be persisted");
        }

        reporter
    }

    /// Load the lifetime snapshot from the store
    pub async fn load_lifetime(&self) -> Result<(), StoreError> {
        let (Some(store), Some(user)) = (&self.store, &self.user) else {
            return Ok(());
        };

        let totals = store.fetch_all(user).await?;
        debug!("Loaded lifetime progress for {} phrase(s)", totals.len());
        self.counters.write().lifetime = totals;
        Ok(())
    }

    /// Record one Mandarin repetition of `phrase_id`.
    ///
    /// The session count is updated before returning; the lifetime write is
    /// queued and its outcome only shows up in `persist_error`.
    pub fn on_mandarin_item_played(&self, phrase_id: &PhraseId) {
        *self
            .counters
            .write()
            .session
            .entry(phrase_id.clone())
            .or_insert(0) += 1;

        if let Some(writer) = &self.writer {
            if writer.send(ProgressCommand::Increment(phrase_id.clone())).is_err() {
                warn!("Progress writer stopped; lifetime count for {} not saved", phrase_id);
            }
        }
    }

    /// Wait until every increment queued so far has been attempted
    pub async fn flush(&self) {
        let Some(writer) = &self.writer else {
            return;
        };
        let (tx, rx) = oneshot::channel();
        if writer.send(ProgressCommand::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Snapshot of both counters
    pub fn counters(&self) -> RepetitionCounters {
        self.counters.read().clone()
    }

    pub fn session_count(&self, phrase_id: &PhraseId) -> u64 {
        self.counters.read().session(phrase_id)
    }

    pub fn lifetime_count(&self, phrase_id: &PhraseId) -> u64 {
        self.counters.read().lifetime(phrase_id)
    }

    pub fn persist_error(&self) -> Option<String> {
        self.counters.read().persist_error.clone()
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }
}

async fn run_writer(
    store: Arc<dyn ProgressStore>,
    user: UserId,
    counters: Arc<RwLock<RepetitionCounters>>,
    mut rx: mpsc::UnboundedReceiver<ProgressCommand>,
) {
    while let Some(command) = rx.recv().await {
        let phrase_id = match command {
            ProgressCommand::Increment(id) => id,
            ProgressCommand::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        // Read-then-write against the cached snapshot; concurrent writers on
        // other devices can still lose updates.
        let new_total = counters.read().lifetime(&phrase_id) + 1;

        match store.upsert_increment(&user, &phrase_id, new_total, Utc::now()).await {
            Ok(()) => {
                let mut counters = counters.write();
                counters.lifetime.insert(phrase_id, new_total);
                counters.persist_error = None;
            }
            Err(e) => {
                warn!("Failed to save progress for {}: {}", phrase_id, e);
                counters.write().persist_error = Some(e.to_string());
            }
        }
    }
    debug!("Progress writer finished");
}
