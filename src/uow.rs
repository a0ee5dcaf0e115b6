//! Unit of work
//!
//! Coordinates one logical action that spans several store structures.
//!
//! ## Two phases
//!
//! - **Write batch**: every mutation made through [`UnitOfWork::intents`],
//!   [`UnitOfWork::joins`] or [`UnitOfWork::messages`] is queued, not run.
//!   The returned [`Deferred`](crate::store::Deferred) values only resolve
//!   against the [`CommitReceipt`] returned by [`UnitOfWork::commit`].
//! - **Live reader**: [`UnitOfWork::reader`] reads committed state. Writes
//!   buffered in the same scope are not visible to it.
//!
//! Events collected during the scope are published only after the batch has
//! been applied. A failed commit, an explicit [`UnitOfWork::rollback`] or
//! dropping the scope discards both the batch and the events.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::domain::DomainEvent;
use crate::repo::{IntentRepository, JoinRepository, MessageRepository, Repositories, Scoped};
use crate::services::events::EventBus;
use crate::store::{CommitReceipt, StoreClient, StoreResult, WriteBatch};
use crate::types::{NowhereError, Result};

type EventBuilder = Box<dyn FnOnce(&CommitReceipt) -> StoreResult<Option<DomainEvent>> + Send>;

enum PendingEvent {
    Ready(DomainEvent),
    /// Built from the commit receipt; `None` means nothing to publish
    FromReceipt(EventBuilder),
}

pub struct UnitOfWork {
    store: StoreClient,
    bus: Arc<EventBus>,
    repos: Arc<Repositories>,
    batch: WriteBatch,
    events: Vec<PendingEvent>,
    finished: bool,
}

impl UnitOfWork {
    /// Open a scope.
    pub fn begin(store: StoreClient, repos: Arc<Repositories>, bus: Arc<EventBus>) -> Self {
        Self {
            store,
            bus,
            repos,
            batch: WriteBatch::new(),
            events: Vec::new(),
            finished: false,
        }
    }

    pub fn intents(&mut self) -> Scoped<'_, IntentRepository> {
        Scoped::new(&self.repos.intents, &mut self.batch)
    }

    pub fn joins(&mut self) -> Scoped<'_, JoinRepository> {
        Scoped::new(&self.repos.joins, &mut self.batch)
    }

    pub fn messages(&mut self) -> Scoped<'_, MessageRepository> {
        Scoped::new(&self.repos.messages, &mut self.batch)
    }

    /// Raw access to the buffered batch.
    pub fn batch(&mut self) -> &mut WriteBatch {
        &mut self.batch
    }

    /// Live reads of committed state.
    pub fn reader(&self) -> &Repositories {
        &self.repos
    }

    pub fn pending_writes(&self) -> usize {
        self.batch.len()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Queue an event for publication after commit.
    pub fn collect_event(&mut self, event: impl Into<DomainEvent>) {
        self.events.push(PendingEvent::Ready(event.into()));
    }

    /// Queue an event that depends on deferred results.
    ///
    /// `build` runs after a successful commit; returning `Ok(None)` skips
    /// publication.
    pub fn collect_deferred_event<F>(&mut self, build: F)
    where
        F: FnOnce(&CommitReceipt) -> StoreResult<Option<DomainEvent>> + Send + 'static,
    {
        self.events.push(PendingEvent::FromReceipt(Box::new(build)));
    }

    /// Submit the batch as one all-or-nothing unit, then publish events in
    /// collection order.
    pub async fn commit(mut self) -> Result<CommitReceipt> {
        self.finished = true;
        let batch = std::mem::take(&mut self.batch);
        let events = std::mem::take(&mut self.events);
        let writes = batch.len();

        let receipt = if batch.is_empty() {
            CommitReceipt::default()
        } else {
            match self.store.submit(batch).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    warn!(
                        writes = writes,
                        discarded_events = events.len(),
                        error = %e,
                        "Commit failed, unit of work rolled back"
                    );
                    return Err(NowhereError::from_commit_error(e));
                }
            }
        };

        let mut published = 0;
        for pending in events {
            let event = match pending {
                PendingEvent::Ready(event) => event,
                PendingEvent::FromReceipt(build) => match build(&receipt) {
                    Ok(Some(event)) => event,
                    Ok(None) => continue,
                    Err(e) => {
                        error!(error = %e, "Could not build event from commit receipt");
                        continue;
                    }
                },
            };
            self.bus.publish(&event).await;
            published += 1;
        }

        debug!(writes = writes, events = published, "Unit of work committed");
        Ok(receipt)
    }

    /// Discard buffered writes and events.
    pub fn rollback(mut self) {
        self.discard("explicit rollback");
    }

    fn discard(&mut self, reason: &'static str) {
        self.finished = true;
        if !self.batch.is_empty() || !self.events.is_empty() {
            debug!(
                writes = self.batch.len(),
                events = self.events.len(),
                reason = reason,
                "Unit of work rolled back"
            );
        }
        self.batch.clear();
        self.events.clear();
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            self.discard("dropped without commit");
        }
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("pending_writes", &self.batch.len())
            .field("pending_events", &self.events.len())
            .field("finished", &self.finished)
            .finish()
    }
}
