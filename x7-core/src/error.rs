//! Domain-specific error types for the X7 remote protocol.
//!
//! All fallible operations return `Result<T, X7Error>`.
//! Broken reply invariants surface as [`X7Error::Assertion`] and are
//! handled like protocol errors, never as panics.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the X7 remote protocol.
#[derive(Debug, Error)]
pub enum X7Error {
    // ── Session Errors ───────────────────────────────────────────
    /// The connect sequence failed; the session never reached `Connected`.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A command was rejected or issued while not connected.
    #[error("command failed: {0}")]
    Command(String),

    // ── Transport Errors ─────────────────────────────────────────
    /// The socket is missing or was closed by the camera.
    #[error("transport error: {0}")]
    Transport(String),

    /// The TCP/IO layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Protocol Errors ──────────────────────────────────────────
    /// A reply was malformed or more than one answer arrived.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A reply did not have the shape the exchange requires.
    #[error("reply assertion failed: {0}")]
    Assertion(&'static str),

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} value: {value}")]
    UnknownVariant { type_name: &'static str, value: i64 },

    // ── Encoding / HTTP Errors ───────────────────────────────────
    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An HTTP request to the camera failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl X7Error {
    /// Returns `true` for malformed or unexpected replies.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::Assertion(_) | Self::UnknownVariant { .. } | Self::Json(_)
        )
    }

    /// Returns `true` for failures of the underlying socket.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_) | Self::Timeout(_))
    }

    /// Re-label any error as a connect-sequence failure, keeping its text.
    pub fn into_connection(self) -> Self {
        match self {
            Self::Connection(_) => self,
            other => Self::Connection(other.to_string()),
        }
    }
}
