//! Unified error type.

use thiserror::Error;

/// The error type returned by astor's fallible operations.
///
/// Application-level errors (404, 500, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. Logging never
/// produces one either: a record that cannot be written is dropped. This type
/// surfaces startup and infrastructure failures only.
#[derive(Debug, Error)]
pub enum Error {
    /// Binding to a port or accepting a connection failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The listen address is not a valid `host:port` string.
    #[error("invalid socket address `{0}`")]
    Addr(String),

    /// A logging configuration value could not be parsed.
    #[error("config: {key}: {message}")]
    Config { key: &'static str, message: String },
}

impl Error {
    pub(crate) fn config(key: &'static str, message: impl Into<String>) -> Self {
        Self::Config { key, message: message.into() }
    }
}
