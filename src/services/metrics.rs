//! Metrics side effects
//!
//! [`MetricsEventHandler`] forwards committed events to a [`MetricsSink`].
//! Sinks are eventually consistent and best-effort: a failing sink is logged
//! by the bus and never reaches the use case.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};

use super::events::EventHandler;
use crate::domain::{
    DomainEvent, EventKind, IntentCreated, IntentFlagged, IntentJoined, MessagePosted,
};

/// Destination for usage metrics.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn record_intent_created(&self, event: &IntentCreated) -> anyhow::Result<()>;
    async fn record_join(&self, event: &IntentJoined) -> anyhow::Result<()>;
    async fn record_message(&self, event: &MessagePosted) -> anyhow::Result<()>;
    async fn record_flag(&self, event: &IntentFlagged) -> anyhow::Result<()>;
}

/// Bus subscriber feeding a metrics sink.
pub struct MetricsEventHandler {
    sink: Arc<dyn MetricsSink>,
}

impl MetricsEventHandler {
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl EventHandler for MetricsEventHandler {
    fn name(&self) -> &str {
        "metrics"
    }

    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        match event {
            DomainEvent::IntentCreated(e) => self.sink.record_intent_created(e).await?,
            DomainEvent::IntentJoined(e) => self.sink.record_join(e).await?,
            DomainEvent::MessagePosted(e) => self.sink.record_message(e).await?,
            DomainEvent::IntentFlagged(e) => self.sink.record_flag(e).await?,
        }
        debug!(kind = %event.kind(), intent_id = %event.intent_id(), "Recorded metrics");
        Ok(())
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Point-in-time view of [`InMemoryMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub intents_created: u64,
    pub system_intents_created: u64,
    pub joins: u64,
    pub messages: u64,
    pub message_chars: u64,
    pub flags: u64,
    pub intents_hidden: u64,
}

/// Counters kept in process.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    events: DashMap<EventKind, u64>,
    system_intents: AtomicU64,
    message_chars: AtomicU64,
    hidden: AtomicU64,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self, kind: EventKind) {
        *self.events.entry(kind).or_insert(0) += 1;
    }

    pub fn count(&self, kind: EventKind) -> u64 {
        self.events.get(&kind).map_or(0, |n| *n)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            intents_created: self.count(EventKind::IntentCreated),
            system_intents_created: self.system_intents.load(Ordering::Relaxed),
            joins: self.count(EventKind::IntentJoined),
            messages: self.count(EventKind::MessagePosted),
            message_chars: self.message_chars.load(Ordering::Relaxed),
            flags: self.count(EventKind::IntentFlagged),
            intents_hidden: self.hidden.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl MetricsSink for InMemoryMetrics {
    async fn record_intent_created(&self, event: &IntentCreated) -> anyhow::Result<()> {
        self.bump(EventKind::IntentCreated);
        if event.is_system {
            self.system_intents.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn record_join(&self, _event: &IntentJoined) -> anyhow::Result<()> {
        self.bump(EventKind::IntentJoined);
        Ok(())
    }

    async fn record_message(&self, event: &MessagePosted) -> anyhow::Result<()> {
        self.bump(EventKind::MessagePosted);
        self.message_chars
            .fetch_add(event.content_length as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn record_flag(&self, event: &IntentFlagged) -> anyhow::Result<()> {
        self.bump(EventKind::IntentFlagged);
        if event.newly_hidden {
            self.hidden.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// Writes one log line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetrics;

#[async_trait]
impl MetricsSink for TracingMetrics {
    async fn record_intent_created(&self, event: &IntentCreated) -> anyhow::Result<()> {
        info!(
            intent_id = %event.intent_id,
            emoji = %event.emoji,
            latitude = event.latitude,
            longitude = event.longitude,
            is_system = event.is_system,
            "metric: intent created"
        );
        Ok(())
    }

    async fn record_join(&self, event: &IntentJoined) -> anyhow::Result<()> {
        info!(intent_id = %event.intent_id, actor = %event.actor, "metric: intent joined");
        Ok(())
    }

    async fn record_message(&self, event: &MessagePosted) -> anyhow::Result<()> {
        info!(
            intent_id = %event.intent_id,
            message_id = %event.message_id,
            content_length = event.content_length,
            "metric: message posted"
        );
        Ok(())
    }

    async fn record_flag(&self, event: &IntentFlagged) -> anyhow::Result<()> {
        info!(
            intent_id = %event.intent_id,
            flag_count = event.flag_count,
            hidden = event.hidden,
            "metric: intent flagged"
        );
        Ok(())
    }
}
