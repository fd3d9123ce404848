//! OneBot v11 wire envelopes and schema-tolerant field decoding.
//!
//! OneBot implementations disagree on field representation: the same logical
//! integer (`message_id`, `user_id`, `self_id`, …) may arrive as a JSON
//! number, a JSON string, or be absent entirely. The raw envelope therefore
//! keeps those fields as [`serde_json::Value`] and defers interpretation to
//! [`flex_i64`] / [`flex_string`], which coerce any of the legal shapes and
//! fail only when the content itself is unusable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A wire value could not be coerced to the expected type.
#[derive(Debug, Clone, Error)]
#[error("cannot decode {raw} as {expected}")]
pub struct DecodeError {
    /// The expected logical type.
    pub expected: &'static str,
    /// The offending raw value, verbatim.
    pub raw: String,
}

/// Decodes an integer that may arrive as a number, a string, or nothing.
///
/// Absent / null values decode to `0` without error. String values are
/// trimmed before parsing.
///
/// # Errors
/// Fails when the value is present but not numeric (e.g. `"abc"`), with the
/// raw value attached for logging.
pub fn flex_i64(value: &Value) -> Result<i64, DecodeError> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => n.as_i64().ok_or_else(|| DecodeError {
            expected: "i64",
            raw: n.to_string(),
        }),
        Value::String(s) => s.trim().parse().map_err(|_| DecodeError {
            expected: "i64",
            raw: format!("{value}"),
        }),
        other => Err(DecodeError {
            expected: "i64",
            raw: format!("{other}"),
        }),
    }
}

/// Decodes a string that may arrive as a string, a number, or nothing.
///
/// Numbers are stringified verbatim so the original precision and format
/// survive downstream (message ids are compared textually). Absent / null
/// values decode to the empty string.
pub fn flex_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Embedded status payload carried by API-response frames.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotStatus {
    /// Whether the bot account is online.
    pub online: bool,
    /// Whether the implementation considers itself healthy.
    pub good: bool,
}

/// Raw inbound event envelope, decoded loosely.
///
/// Every field is optional on the wire; numeric fields stay as [`Value`]
/// until [`normalize`](crate::event::normalize) coerces them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    /// Top-level classification: message / meta_event / notice / request.
    pub post_type: String,
    /// Message scope: private / group.
    pub message_type: String,
    /// Scope-specific sub type.
    pub sub_type: String,
    /// Message identifier (number or string on the wire).
    pub message_id: Value,
    /// Sending user identifier (number or string on the wire).
    pub user_id: Value,
    /// Group identifier for group-scoped events.
    pub group_id: Value,
    /// Uninterpreted message text, CQ codes inline.
    pub raw_message: String,
    /// Message content: plain string or segment array.
    pub message: Value,
    /// Sender sub-object, parsed best-effort.
    pub sender: Value,
    /// The bot's own account identifier.
    pub self_id: Value,
    /// Event timestamp (unix seconds).
    pub time: Value,
    /// Meta event classification: lifecycle / heartbeat.
    pub meta_event_type: String,
    /// Correlation token — non-empty only on API-response frames.
    pub echo: String,
    /// API return code — present only on API-response frames.
    pub retcode: Value,
    /// Status payload — present on heartbeat and API-response frames,
    /// explicit `null` elsewhere on some implementations.
    pub status: Option<BotStatus>,
}

impl RawEvent {
    /// Returns whether this frame is a protocol control/response frame
    /// rather than an event.
    ///
    /// The adapter issues actions fire-and-forget, so these frames are
    /// recognized and discarded instead of being matched to a caller.
    pub fn is_api_response(&self) -> bool {
        if !self.echo.is_empty() || !self.retcode.is_null() {
            return true;
        }
        self.status.is_some_and(|s| s.online || s.good)
    }
}

/// Outbound action envelope: `{"action", "params", "echo"}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiRequest {
    /// Protocol action name (e.g. `"send_private_msg"`).
    pub action: &'static str,
    /// Action-specific parameters.
    pub params: Value,
    /// Connection-scoped correlation token.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub echo: String,
}
