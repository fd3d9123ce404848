//! # Ingot Core
//!
//! Core abstractions shared by the Ingot gateway and its channel adapters.
//!
//! ## Overview
//!
//! The gateway talks to external chat networks through *channel adapters*.
//! This crate defines the seam between the two sides:
//!
//! - [`Channel`]: the lifecycle and outbound interface every adapter
//!   implements (`start`, `stop`, `send`).
//! - [`InboundSink`]: the routing collaborator an adapter delivers
//!   normalized inbound messages to.
//! - [`OutboundMessage`] / [`InboundMessage`]: the generic message types
//!   crossing that seam.
//! - [`ChannelError`]: the unified error taxonomy for adapter operations.
//!
//! No I/O lives here; adapters bring their own transports.

pub mod channel;
pub mod error;
pub mod message;

pub use channel::{Channel, InboundSink};
pub use error::{ChannelError, ChannelResult};
pub use message::{InboundMessage, OutboundMessage};
