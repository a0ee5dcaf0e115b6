//! Store key names

use crate::domain::{ActorId, IntentId};

/// Global geo index of discoverable intents.
pub const GEO_INDEX: &str = "intents:geo";

/// Sorted set of intent ids scored by expiry unix time.
pub const EXPIRY_QUEUE: &str = "intents:expiry";

pub fn intent(id: IntentId) -> String {
    format!("intent:{}", id)
}

pub fn joins(id: IntentId) -> String {
    format!("intent:{}:joins", id)
}

pub fn messages(id: IntentId) -> String {
    format!("intent:{}:msgs", id)
}

pub fn owner_intents(owner: &ActorId) -> String {
    format!("identity:{}:intents", owner)
}
