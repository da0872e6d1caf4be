//! Client error types.

use fairway_engine::Role;

use crate::config::ConfigError;

/// Failures talking to the Remote Store.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("remote store did not answer in time")]
    Timeout,
}

impl RemoteError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RemoteError::Status { status: 401, .. })
    }
}

/// Failures of the sync operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Cloud sync is disabled or no remote is configured
    #[error("not connected to a remote store")]
    NotConnected,

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("local store error: {0}")]
    Engine(#[from] fairway_engine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Identity and authorization failures.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("not signed in")]
    NotSignedIn,

    #[error("invalid login name or password")]
    InvalidCredentials,

    #[error("insufficient permissions: requires {required}, have {actual}")]
    InsufficientPermissions { required: Role, actual: Role },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("local store error: {0}")]
    Store(#[from] fairway_engine::Error),
}
