//! Error types for eas-queue-client.

use eas_queue_core::{Attributes, CodecError, TagError};
use std::sync::Arc;

/// Main error type for all client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket transport failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// WebSocket handshake did not complete in time.
    #[error("connecting to {url} timed out after {timeout:?}")]
    ConnectTimeout {
        url: String,
        timeout: std::time::Duration,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with a status the operation does not accept.
    #[error("visiting: {url}, unexpected status code: {status}, message: {body}")]
    Protocol { url: String, status: u16, body: String },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Enqueue response body is not an index.
    #[error("invalid index in response: {0:?}")]
    InvalidIndex(String),

    /// Attribute snapshot lacks the user identity header.
    #[error("malformed attributes: {0}")]
    MalformedAttributes(Attributes),

    /// Attribute fetch failed. Shared between every caller that waited on it.
    #[error("failed to obtain attributes: {0}")]
    Attributes(Arc<ClientError>),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid tags: {0}")]
    InvalidTags(#[from] TagError),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status for protocol errors, including ones behind a shared
    /// attribute failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } => Some(*status),
            Self::Attributes(inner) => inner.status(),
            _ => None,
        }
    }
}

/// Result type alias using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;
