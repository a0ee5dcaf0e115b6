//! Error types for the keyed store

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Wrong type for key {key}: expected {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("Key missing: {0}")]
    KeyMissing(String),

    #[error("Unexpected reply, expected {expected}: {reply}")]
    UnexpectedReply { expected: &'static str, reply: String },

    #[error("Command not allowed here: {0}")]
    NotAllowed(&'static str),

    #[error("Script error: {0}")]
    Script(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
