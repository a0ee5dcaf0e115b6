//! Service layer for Nowhere
//!
//! Services hold the use cases between a boundary layer (HTTP, CLI, tests)
//! and the repositories:
//! - Input validation and content policy
//! - Unit of work boundaries
//! - Event publication after commit
//!
//! ## Architecture
//!
//! ```text
//! Boundary (thin)
//!     ↓
//! IntentService (writes)      IntentQueryService (reads)
//!     ↓                           ↓
//! UnitOfWork ──→ Repositories ←───┘
//!     ↓
//! EventBus → MetricsEventHandler → MetricsSink
//! ```

pub mod events;
pub mod intent_service;
pub mod maintenance;
pub mod metrics;
pub mod policy;
pub mod query_service;
pub mod seeder;

// Re-exports
pub use events::{EventBus, EventHandler, FnHandler, PublishReport};
pub use intent_service::IntentService;
pub use maintenance::{spawn_reaper_task, ExpiryReaper, ReapReport};
pub use metrics::{InMemoryMetrics, MetricsEventHandler, MetricsSink, MetricsSnapshot, TracingMetrics};
pub use policy::{AllowAll, ContentPolicy, PolicyDecision};
pub use query_service::{IntentQueryService, QueryDefaults};
pub use seeder::AmbientSeeder;

use std::sync::Arc;

use crate::discovery::RankingConfig;
use crate::domain::Clock;
use crate::repo::{Repositories, StoreConfig};
use crate::store::{Backend, StoreClient};

/// Collaborators supplied at startup.
pub struct ServiceDeps {
    pub backend: Arc<dyn Backend>,
    pub clock: Arc<dyn Clock>,
    pub policy: Arc<dyn ContentPolicy>,
    pub metrics: Arc<dyn MetricsSink>,
    pub store_config: StoreConfig,
    pub ranking: RankingConfig,
    pub query_defaults: QueryDefaults,
}

/// Service container for dependency injection
///
/// Built once at startup. The event bus is wired with the metrics handler
/// before any service sees it.
pub struct Services {
    pub store: StoreClient,
    pub repos: Arc<Repositories>,
    pub events: Arc<EventBus>,
    pub intents: Arc<IntentService>,
    pub queries: Arc<IntentQueryService>,
    pub seeder: Arc<AmbientSeeder>,
    pub reaper: Arc<ExpiryReaper>,
}

impl Services {
    /// Wire every service with the metrics handler subscribed to all events
    pub fn new(deps: ServiceDeps) -> Self {
        let mut bus = EventBus::new();
        bus.subscribe_all(Arc::new(MetricsEventHandler::new(deps.metrics)));
        Self::with_bus(deps.backend, bus, deps.clock, deps.policy, deps.store_config, deps.ranking, deps.query_defaults)
    }

    /// Wire every service around an already populated bus
    pub fn with_bus(
        backend: Arc<dyn Backend>,
        bus: EventBus,
        clock: Arc<dyn Clock>,
        policy: Arc<dyn ContentPolicy>,
        store_config: StoreConfig,
        ranking: RankingConfig,
        query_defaults: QueryDefaults,
    ) -> Self {
        let store = StoreClient::new(backend);
        let events = Arc::new(bus);
        let repos = Arc::new(Repositories::new(store.clone(), store_config, ranking));

        let intents = Arc::new(IntentService::new(
            store.clone(),
            repos.clone(),
            events.clone(),
            policy,
            clock.clone(),
        ));
        let queries = Arc::new(IntentQueryService::new(repos.clone(), clock.clone(), query_defaults));
        let seeder = Arc::new(AmbientSeeder::new(intents.clone()));
        let reaper = Arc::new(ExpiryReaper::new(store.clone(), clock));

        Self {
            store,
            repos,
            events,
            intents,
            queries,
            seeder,
            reaper,
        }
    }
}
