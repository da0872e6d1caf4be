//! Error types for the fairway engine.

use crate::identity::Role;
use thiserror::Error;

/// All possible errors from the fairway engine.
///
/// Local parse failures are deliberately absent: reads recover with an empty
/// default instead of failing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("invalid shape for {collection}: {reason}")]
    InvalidShape { collection: String, reason: String },

    // Storage errors
    #[error("local backend error: {0}")]
    Backend(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    // Identity errors
    #[error("insufficient permissions: requires {required}, have {actual}")]
    InsufficientPermissions { required: Role, actual: Role },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::UnknownCollection("holes".into());
        assert_eq!(err.to_string(), "unknown collection: holes");

        let err = Error::InsufficientPermissions {
            required: Role::Admin,
            actual: Role::User,
        };
        assert_eq!(
            err.to_string(),
            "insufficient permissions: requires admin, have user"
        );

        let err = Error::InvalidShape {
            collection: "scores".into(),
            reason: "expected an object".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid shape for scores: expected an object"
        );
    }
}
