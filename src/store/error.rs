use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classification of a remote storage failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// Request was throttled by the store
    RateLimited,
    /// Credentials are missing, expired or revoked
    AuthExpired,
    /// A resource the request depends on does not exist
    NotFound,
    /// Temporary network or server failure, including timeouts
    Transient,
    /// Any other failure that will not go away by retrying
    Fatal,
}

impl RemoteErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, RemoteErrorKind::RateLimited | RemoteErrorKind::Transient)
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteErrorKind::RateLimited => "rate limited",
            RemoteErrorKind::AuthExpired => "authentication expired",
            RemoteErrorKind::NotFound => "not found",
            RemoteErrorKind::Transient => "transient failure",
            RemoteErrorKind::Fatal => "fatal error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("remote store {kind}: {message}")]
pub struct RemoteStoreError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteStoreError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::RateLimited, message)
    }

    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::AuthExpired, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transient, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Fatal, message)
    }

    pub fn timeout(operation: &str, after: Duration) -> Self {
        Self::transient(format!(
            "{} timed out after {}ms",
            operation,
            after.as_millis()
        ))
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
