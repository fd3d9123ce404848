//! Generic message types crossing the channel seam.
//!
//! Adapters translate between their network's wire protocol and these two
//! shapes. Chat identifiers are composite strings (`group:<id>`,
//! `private:<id>`) so the gateway can route replies without knowing any
//! protocol specifics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A message the gateway wants delivered to an external chat network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Composite destination identifier (e.g. `group:456`, `private:123`).
    pub chat_id: String,
    /// Plain text content.
    pub content: String,
}

impl OutboundMessage {
    /// Creates an outbound message.
    pub fn new(chat_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            content: content.into(),
        }
    }
}

/// A normalized inbound message produced by a channel adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Identifier of the sending user on the external network.
    pub sender_id: String,
    /// Composite chat identifier the message arrived in.
    pub chat_id: String,
    /// Text content after any adapter-side normalization.
    pub content: String,
    /// Attachment references (paths or URLs), if any.
    pub attachments: Vec<String>,
    /// Adapter-specific metadata (message id, group id, sender name, …).
    pub metadata: HashMap<String, String>,
}
