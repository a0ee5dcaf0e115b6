//! Nowhere - ephemeral geospatial intent store
//!
//! Users publish short-lived, location-tagged "intents", discover nearby ones
//! ranked by relevance, join them and post ephemeral messages. Everything
//! expires on its own.
//!
//! ## Architecture
//!
//! ```text
//! Use cases (services::IntentService / IntentQueryService)
//!     ↓                         ↓
//! UnitOfWork (buffered)     live reads
//!     ↓                         ↓
//! Repositories (repo/*.rs) ─────┘
//!     ↓
//! StoreClient → Backend (MemoryBackend)
//!     ↓ (after commit)
//! EventBus → MetricsEventHandler → MetricsSink
//! ```

pub mod config;
pub mod discovery;
pub mod domain;
pub mod repo;
pub mod services;
pub mod store;
pub mod types;
pub mod uow;

pub use config::Args;
pub use domain::{ActorId, Intent, IntentId, Message, MessageId};
pub use services::Services;
pub use types::{ErrorKind, NowhereError, Result};
pub use uow::UnitOfWork;
