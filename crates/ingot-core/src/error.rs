//! Unified error types for channel adapters.
//!
//! Mirrors the taxonomy the gateway cares about: configuration errors are
//! fatal to `start`, validation errors are returned to the `send` caller,
//! transport errors are recoverable by the adapter's own reconnect logic.

use thiserror::Error;

/// Errors that can occur in channel adapter operations.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// The adapter is missing required configuration.
    #[error("channel not configured: {0}")]
    NotConfigured(String),

    /// The adapter is not running or has no live connection.
    #[error("channel not connected: {0}")]
    NotConnected(String),

    /// Connection establishment failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The endpoint that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The destination chat identifier could not be parsed.
    #[error("invalid chat id: {0}")]
    InvalidChatId(String),

    /// An outbound frame could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An outbound frame could not be written to the transport.
    #[error("failed to send message: {0}")]
    SendFailed(String),
}

/// Result type for channel adapter operations.
pub type ChannelResult<T> = Result<T, ChannelError>;
