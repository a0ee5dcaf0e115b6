//! Repository layer
//!
//! Each repository reads live committed state through a [`StoreClient`] and
//! stages writes into a caller-owned [`WriteBatch`]. Staged writes return
//! [`Deferred`](crate::store::Deferred) placeholders and take effect only
//! when the batch is submitted, normally by a
//! [`UnitOfWork`](crate::uow::UnitOfWork).
//!
//! ## Key layout
//!
//! | Key                        | Structure  | Holds                          |
//! |----------------------------|------------|--------------------------------|
//! | `intent:{id}`              | blob       | intent JSON, intent TTL        |
//! | `intent:{id}:joins`        | set        | joined actor ids, intent TTL   |
//! | `intent:{id}:msgs`         | list       | recent messages, intent TTL    |
//! | `intents:geo`              | geo index  | intent id → (lon, lat)         |
//! | `intents:expiry`           | sorted set | intent id → expiry unix time   |
//! | `identity:{owner}:intents` | set        | ids created by an owner        |

pub mod intents;
pub mod joins;
pub mod keys;
pub mod messages;

use std::time::Duration;

pub use intents::IntentRepository;
pub use joins::{JoinReply, JoinRepository};
pub use messages::MessageRepository;

use crate::discovery::RankingConfig;
use crate::store::{StoreClient, WriteBatch};

/// Storage tuning
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Lifetime of an intent and everything attached to it
    pub intent_ttl: Duration,
    /// Messages kept per intent
    pub message_history: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            intent_ttl: Duration::from_secs(24 * 60 * 60),
            message_history: 100,
        }
    }
}

/// A repository bound to a write batch.
///
/// Handed out by the unit of work; its write methods enqueue into the
/// scope's batch instead of touching the store.
pub struct Scoped<'a, R> {
    pub(crate) repo: &'a R,
    pub(crate) batch: &'a mut WriteBatch,
}

impl<'a, R> Scoped<'a, R> {
    pub fn new(repo: &'a R, batch: &'a mut WriteBatch) -> Self {
        Self { repo, batch }
    }

    /// Live reads through the underlying repository.
    pub fn reader(&self) -> &R {
        self.repo
    }
}

/// All repositories over one store.
#[derive(Debug, Clone)]
pub struct Repositories {
    pub intents: IntentRepository,
    pub joins: JoinRepository,
    pub messages: MessageRepository,
}

impl Repositories {
    pub fn new(store: StoreClient, config: StoreConfig, ranking: RankingConfig) -> Self {
        Self {
            intents: IntentRepository::new(store.clone(), config.clone(), ranking),
            joins: JoinRepository::new(store.clone()),
            messages: MessageRepository::new(store, config),
        }
    }
}
