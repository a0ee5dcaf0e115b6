//! Error types for Nowhere use cases

use serde::Serialize;

use crate::store::StoreError;

/// Main error type for intent store operations
#[derive(Debug, thiserror::Error)]
pub enum NowhereError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Membership required: {0}")]
    MembershipRequired(String),

    #[error("Rejected by content policy: {0}")]
    PolicyRejected(String),

    #[error("Write failure: {0}")]
    WriteFailure(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable failure category a boundary layer can translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Validation,
    MembershipRequired,
    PolicyRejected,
    WriteFailure,
    /// Contained inside the event bus; never returned to a caller
    SideEffectFailure,
    Store,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::MembershipRequired => "membership_required",
            Self::PolicyRejected => "policy_rejected",
            Self::WriteFailure => "write_failure",
            Self::SideEffectFailure => "side_effect_failure",
            Self::Store => "store",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NowhereError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::MembershipRequired(_) => ErrorKind::MembershipRequired,
            Self::PolicyRejected(_) => ErrorKind::PolicyRejected,
            Self::WriteFailure(_) => ErrorKind::WriteFailure,
            Self::Store(_) => ErrorKind::Store,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Map a failed batch submission.
    ///
    /// A batch guard tripping on a missing key means the referenced entity
    /// expired between validation and commit.
    pub fn from_commit_error(err: StoreError) -> Self {
        match err {
            StoreError::KeyMissing(key) => Self::NotFound(key),
            other => Self::WriteFailure(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for NowhereError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("Serialization error: {}", err))
    }
}

/// Result type alias for Nowhere operations
pub type Result<T> = std::result::Result<T, NowhereError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(NowhereError::NotFound("x".into()).kind().as_str(), "not_found");
        assert_eq!(
            NowhereError::MembershipRequired("x".into()).kind(),
            ErrorKind::MembershipRequired
        );
        assert_eq!(ErrorKind::SideEffectFailure.to_string(), "side_effect_failure");
    }

    #[test]
    fn test_commit_error_mapping() {
        let missing = NowhereError::from_commit_error(StoreError::KeyMissing("intent:1".into()));
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let other = NowhereError::from_commit_error(StoreError::Unavailable("down".into()));
        assert_eq!(other.kind(), ErrorKind::WriteFailure);
    }
}
