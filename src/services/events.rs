//! Event bus for committed domain events
//!
//! Typed observer registry keyed by [`EventKind`]. Handlers are registered
//! once during startup wiring; the bus is then shared behind an `Arc`.
//!
//! Delivery is best-effort and in registration order. A handler that fails
//! or panics is logged as a side-effect failure and never affects the
//! remaining handlers or the publisher.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{error, trace, warn};

use crate::domain::{DomainEvent, EventKind};
use crate::types::ErrorKind;

/// Side-effect subscriber
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Handle a committed event
    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()>;
}

/// Handler backed by a plain closure.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&DomainEvent) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&DomainEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        (self.f)(event)
    }
}

/// Outcome of one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Observer registry for domain events
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind
    pub fn subscribe(&mut self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Register a handler for every event kind
    pub fn subscribe_all(&mut self, handler: Arc<dyn EventHandler>) {
        for kind in EventKind::ALL {
            self.subscribe(kind, handler.clone());
        }
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Deliver an event to its subscribers
    pub async fn publish(&self, event: &DomainEvent) -> PublishReport {
        let kind = event.kind();
        let mut report = PublishReport::default();
        let Some(handlers) = self.handlers.get(&kind) else {
            trace!(kind = %kind, "No subscribers");
            return report;
        };

        for handler in handlers {
            match AssertUnwindSafe(handler.handle(event)).catch_unwind().await {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(
                        handler = handler.name(),
                        kind = %kind,
                        event_id = %event.event_id(),
                        error_kind = %ErrorKind::SideEffectFailure,
                        error = %e,
                        "Event handler failed"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    error!(
                        handler = handler.name(),
                        kind = %kind,
                        event_id = %event.event_id(),
                        error_kind = %ErrorKind::SideEffectFailure,
                        "Event handler panicked"
                    );
                }
            }
        }

        trace!(kind = %kind, delivered = report.delivered, failed = report.failed, "Event published");
        report
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(kind, handlers)| (kind.as_str(), handlers.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IntentFlagged, IntentId};
    use chrono::Utc;
    use std::sync::Mutex;

    struct Recorder {
        tag: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, _event: &DomainEvent) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(self.tag);
            Ok(())
        }
    }

    struct Panicker;

    #[async_trait]
    impl EventHandler for Panicker {
        async fn handle(&self, _event: &DomainEvent) -> anyhow::Result<()> {
            panic!("handler blew up");
        }
    }

    fn flagged() -> DomainEvent {
        IntentFlagged::new(IntentId::new(), 1, 3, Utc::now()).into()
    }

    #[tokio::test]
    async fn test_registration_order_and_isolation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(
            EventKind::IntentFlagged,
            Arc::new(Recorder {
                tag: "first",
                seen: seen.clone(),
            }),
        );
        bus.subscribe(
            EventKind::IntentFlagged,
            Arc::new(FnHandler::new("failing", |_: &DomainEvent| {
                Err(anyhow::anyhow!("sink down"))
            })),
        );
        bus.subscribe(EventKind::IntentFlagged, Arc::new(Panicker));
        bus.subscribe(
            EventKind::IntentFlagged,
            Arc::new(Recorder {
                tag: "last",
                seen: seen.clone(),
            }),
        );

        let report = bus.publish(&flagged()).await;
        assert_eq!(report, PublishReport { delivered: 2, failed: 2 });
        assert_eq!(*seen.lock().unwrap(), vec!["first", "last"]);
    }

    #[tokio::test]
    async fn test_only_matching_kind_is_delivered() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(
            EventKind::IntentCreated,
            Arc::new(Recorder {
                tag: "created",
                seen: seen.clone(),
            }),
        );

        let report = bus.publish(&flagged()).await;
        assert_eq!(report, PublishReport::default());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_subscribe_all() {
        let mut bus = EventBus::new();
        bus.subscribe_all(Arc::new(FnHandler::new("noop", |_: &DomainEvent| Ok(()))));
        for kind in EventKind::ALL {
            assert_eq!(bus.handler_count(kind), 1);
        }
    }
}
