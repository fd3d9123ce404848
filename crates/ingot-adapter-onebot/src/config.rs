//! Configuration for the OneBot channel adapter.
//!
//! Loaded from the gateway's configuration file:
//!
//! ```yaml
//! channels:
//!   onebot:
//!     ws_url: ws://127.0.0.1:6700/ws
//!     access_token: ${BOT_TOKEN:-}
//!     reconnect_interval_secs: 10
//!     group_trigger_prefixes: ["!bot "]
//! ```

use serde::{Deserialize, Serialize};

/// OneBot adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OneBotConfig {
    /// WebSocket endpoint of the OneBot implementation.
    pub ws_url: String,

    /// Bearer token sent in the handshake `Authorization` header.
    pub access_token: Option<String>,

    /// Reconnect interval in seconds; 0 disables reconnection, making an
    /// initial connect failure fatal. Non-zero values are floored at 5.
    pub reconnect_interval_secs: u64,

    /// Textual prefixes that trigger the bot in group chats.
    pub group_trigger_prefixes: Vec<String>,

    /// Number of recent message ids remembered for deduplication.
    pub dedup_capacity: usize,
}

impl Default for OneBotConfig {
    fn default() -> Self {
        Self {
            ws_url: String::new(),
            access_token: None,
            reconnect_interval_secs: 0,
            group_trigger_prefixes: Vec::new(),
            dedup_capacity: 1024,
        }
    }
}
