//! Keyed store layer
//!
//! Models the external key-value server the intent store runs against:
//! expiring blobs, a geospatial index, unordered sets, sorted sets, bounded
//! lists and atomic scripts.
//!
//! ## Layers
//!
//! - [`Backend`] - the server boundary: run one [`Command`], or run a batch
//!   of commands as one all-or-nothing submission
//! - [`StoreClient`] - typed convenience wrapper used by the repositories
//! - [`WriteBatch`] - buffered commands whose results are only available as
//!   [`Deferred`] placeholders until the batch is submitted
//! - [`MemoryBackend`] - in-process implementation
//!
//! Every command runs under the backend's command lock, so a [`Script`]
//! observes and mutates the keyspace as one indivisible step.

pub mod batch;
pub mod client;
pub mod command;
pub mod error;
pub mod geo;
pub mod memory;
pub mod scripts;

pub use batch::{CommitReceipt, Deferred, WriteBatch};
pub use client::StoreClient;
pub use command::{Command, FromReply, KeyTtl, Reply};
pub use error::{StoreError, StoreResult};
pub use geo::{haversine_km, GeoHit, GeoPoint};
pub use memory::{spawn_sweeper_task, BackendStats, MemoryBackend};
pub use scripts::{Script, ScriptContext};

use async_trait::async_trait;

/// The keyed store boundary.
///
/// Implementations must execute each [`Command`] atomically and must apply a
/// batch submitted through [`Backend::exec`] entirely or not at all.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Run a single command.
    async fn query(&self, command: Command) -> StoreResult<Reply>;

    /// Run a batch of commands as one all-or-nothing submission.
    ///
    /// Replies are returned in command order.
    async fn exec(&self, batch: Vec<Command>) -> StoreResult<Vec<Reply>>;
}
