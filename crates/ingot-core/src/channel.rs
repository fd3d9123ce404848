//! Channel and sink traits.
//!
//! A [`Channel`] is one adapter instance bound to one external network
//! account. The gateway owns the channel; the channel owns its transport.
//! Inbound traffic flows the other way through an [`InboundSink`] the
//! gateway hands to the adapter at construction time.

use async_trait::async_trait;

use crate::error::ChannelResult;
use crate::message::{InboundMessage, OutboundMessage};

/// A long-lived connection to one external chat network.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Returns the adapter name (e.g. `"onebot"`).
    fn name(&self) -> &str;

    /// Starts the channel: establishes the connection and spawns any
    /// background tasks.
    ///
    /// # Errors
    /// Fails only for configuration errors or an unrecoverable initial
    /// connect (a transient dial failure is not fatal when the adapter can
    /// reconnect on its own).
    async fn start(&self) -> ChannelResult<()>;

    /// Stops the channel: cancels background tasks and closes the
    /// connection. Idempotent.
    async fn stop(&self) -> ChannelResult<()>;

    /// Sends a message to the external network.
    ///
    /// # Errors
    /// Returns an error immediately when the channel is not running, not
    /// connected, or the destination identifier is invalid. Never blocks
    /// waiting for connectivity.
    async fn send(&self, msg: &OutboundMessage) -> ChannelResult<()>;

    /// Returns whether the channel has been started and not yet stopped.
    fn is_running(&self) -> bool;
}

/// Routing collaborator that receives normalized inbound messages.
///
/// Implemented by the gateway's message bus; adapters call
/// [`deliver`](InboundSink::deliver) once per accepted inbound event.
#[async_trait]
pub trait InboundSink: Send + Sync {
    /// Delivers one normalized inbound message for routing.
    async fn deliver(&self, msg: InboundMessage);
}
