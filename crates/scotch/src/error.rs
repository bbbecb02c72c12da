//! Error types for scotch
//!
//! Every failure surfaces synchronously to the caller of the operation that
//! triggered it: a relationship read, or an explicit accessor call. Nothing is
//! retried or swallowed internally.

use thiserror::Error;

/// Result type alias for scotch operations
pub type ScotchResult<T> = Result<T, ScotchError>;

/// Error types for relationship resolution and remote access
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScotchError {
    /// Missing resource directory, unbound key attribute, or a context that
    /// was never given a base URL
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A by-name target matched zero or several registered types
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// The response body is not JSON or does not fit the entity shape
    #[error("Remote decode error: {message} (status {status}, url {url})")]
    RemoteDecode {
        url: String,
        status: u16,
        message: String,
    },

    /// A create/update response did not carry the success marker
    #[error("Remote write error: {operation} on {url} answered {marker:?}")]
    RemoteWrite {
        operation: &'static str,
        url: String,
        marker: Option<String>,
    },

    /// The entity has no id, so it cannot be addressed remotely
    #[error("Entity of '{0}' has no id")]
    MissingId(String),

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The local repository failed to answer a query
    #[error("Local store error: {0}")]
    LocalStore(String),
}

impl ScotchError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn local_store(message: impl Into<String>) -> Self {
        Self::LocalStore(message.into())
    }

    /// Check if this error comes from a misconfigured type or context
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this error comes from target lookup
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }
}

impl From<reqwest::Error> for ScotchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<url::ParseError> for ScotchError {
    fn from(err: url::ParseError) -> Self {
        Self::Configuration(format!("invalid URL: {}", err))
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for ScotchError {
    fn from(err: sqlx::Error) -> Self {
        Self::LocalStore(err.to_string())
    }
}
