//! Shared test harness

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use nowhere::discovery::RankingConfig;
use nowhere::domain::{ActorId, Clock, CreateIntent, FixedClock, Intent, IntentId, JoinIntent};
use nowhere::repo::StoreConfig;
use nowhere::services::{
    AllowAll, ContentPolicy, InMemoryMetrics, PolicyDecision, QueryDefaults, ServiceDeps, Services,
};
use nowhere::store::{Backend, Command, MemoryBackend, Reply, StoreError, StoreResult};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 18, 30, 0).unwrap()
}

pub struct Harness {
    pub services: Services,
    pub metrics: Arc<InMemoryMetrics>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn create(&self, owner: &str, title: &str, latitude: f64, longitude: f64) -> Intent {
        self.services
            .intents
            .handle_create_intent(CreateIntent::new(owner, title, "📍", latitude, longitude, self.now()))
            .await
            .unwrap()
    }

    pub async fn join(&self, intent_id: IntentId, actor: &str) {
        self.services
            .intents
            .handle_join_intent(JoinIntent::new(intent_id, ActorId::new(actor), self.now()))
            .await
            .unwrap();
    }
}

pub struct HarnessBuilder {
    backend: Arc<dyn Backend>,
    policy: Arc<dyn ContentPolicy>,
    store_config: StoreConfig,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            backend: Arc::new(MemoryBackend::new()),
            policy: Arc::new(AllowAll),
            store_config: StoreConfig::default(),
        }
    }

    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn policy(mut self, policy: Arc<dyn ContentPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn intent_ttl(mut self, ttl: Duration) -> Self {
        self.store_config.intent_ttl = ttl;
        self
    }

    pub fn build(self) -> Harness {
        let clock = Arc::new(FixedClock::new(t0()));
        let metrics = Arc::new(InMemoryMetrics::new());
        let services = Services::new(ServiceDeps {
            backend: self.backend,
            clock: clock.clone(),
            policy: self.policy,
            metrics: metrics.clone(),
            store_config: self.store_config,
            ranking: RankingConfig::default(),
            query_defaults: QueryDefaults::default(),
        });
        Harness {
            services,
            metrics,
            clock,
        }
    }
}

pub fn harness() -> Harness {
    HarnessBuilder::new().build()
}

/// Backend whose batch submissions always fail; single commands pass through.
pub struct FailingBatches {
    inner: MemoryBackend,
}

impl FailingBatches {
    pub fn new() -> Self {
        Self {
            inner: MemoryBackend::new(),
        }
    }
}

#[async_trait]
impl Backend for FailingBatches {
    async fn query(&self, command: Command) -> StoreResult<Reply> {
        self.inner.query(command).await
    }

    async fn exec(&self, _batch: Vec<Command>) -> StoreResult<Vec<Reply>> {
        Err(StoreError::Unavailable("injected batch failure".into()))
    }
}

/// Rejects any text containing a word.
pub struct RejectWord(pub &'static str);

#[async_trait]
impl ContentPolicy for RejectWord {
    async fn review(&self, _actor: &ActorId, text: &str) -> PolicyDecision {
        if text.contains(self.0) {
            PolicyDecision::Reject(format!("contains {}", self.0))
        } else {
            PolicyDecision::Accept
        }
    }
}

/// Kilometers per degree along a meridian for the store's earth radius.
pub fn km_per_degree() -> f64 {
    nowhere::store::geo::EARTH_RADIUS_KM * std::f64::consts::PI / 180.0
}
