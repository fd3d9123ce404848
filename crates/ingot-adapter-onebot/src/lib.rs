//! # Ingot Adapter for OneBot v11
//!
//! Channel adapter connecting the Ingot gateway to a OneBot v11
//! implementation over a persistent WebSocket.
//!
//! ## Overview
//!
//! The adapter maintains exactly one logical connection to the OneBot
//! endpoint and translates between the gateway's generic message types and
//! the OneBot wire protocol:
//!
//! - schema-tolerant decoding of the loosely-typed event envelope
//!   ([`wire`]),
//! - normalization of message content, including CQ-code and segment-array
//!   mention detection ([`event`]),
//! - bounded in-memory deduplication of redelivered events ([`dedup`]),
//! - mention/prefix trigger classification for group chats ([`trigger`]),
//! - connection supervision with background reconnect and a single read
//!   loop per connection generation ([`channel`]).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ingot_core::Channel;
//! use ingot_adapter_onebot::{OneBotChannel, OneBotConfig};
//!
//! let config = OneBotConfig {
//!     ws_url: "ws://127.0.0.1:6700/ws".into(),
//!     reconnect_interval_secs: 10,
//!     ..OneBotConfig::default()
//! };
//! let channel = OneBotChannel::new(config, bus.clone());
//! channel.start().await?;
//! ```
//!
//! Outbound actions are fire-and-forget: each carries a fresh `echo`
//! correlation token, and the matching API-response frames are recognized
//! and discarded by the read loop.

pub mod channel;
pub mod config;
pub mod dedup;
pub mod event;
pub mod state;
pub mod trigger;
pub mod wire;

pub use channel::OneBotChannel;
pub use config::OneBotConfig;
pub use dedup::DedupWindow;
pub use event::{NormalizedEvent, Sender, normalize};
pub use state::ConnectionState;
pub use trigger::TriggerClassifier;
pub use wire::{ApiRequest, BotStatus, DecodeError, RawEvent, flex_i64, flex_string};
