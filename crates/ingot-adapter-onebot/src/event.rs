//! Event normalization: raw wire envelope to canonical event record.
//!
//! Message content arrives in one of two shapes: a plain CQ-code string
//! (mentions inline as `[CQ:at,qq=<self_id>]`) or an ordered array of typed
//! segments. Both are supported; a non-empty top-level `raw_message` is the
//! authoritative content source, with the structured decode as fallback.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::wire::{DecodeError, RawEvent, flex_i64, flex_string};

/// Sender information, parsed best-effort from the event envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Sender {
    /// User ID (number or string on the wire).
    pub user_id: Value,
    /// Nickname.
    pub nickname: String,
    /// Group card (group-scoped display name).
    pub card: String,
}

/// Canonical event record produced from a [`RawEvent`].
///
/// Invariant: `content` never contains the bot's own mention token.
#[derive(Debug, Clone, Default)]
pub struct NormalizedEvent {
    /// Top-level classification.
    pub post_type: String,
    /// Message scope: private / group.
    pub message_type: String,
    /// Scope-specific sub type.
    pub sub_type: String,
    /// Message identifier; empty or `"0"` means "no id".
    pub message_id: String,
    /// Sending user identifier.
    pub user_id: i64,
    /// Group identifier, 0 outside group scope.
    pub group_id: i64,
    /// Text content after mention stripping.
    pub content: String,
    /// Untouched `raw_message` field.
    pub raw_content: String,
    /// Whether the bot was mentioned in the message.
    pub is_bot_mentioned: bool,
    /// Sender details, empty when unparseable.
    pub sender: Sender,
    /// The bot's own account identifier.
    pub self_id: i64,
    /// Event timestamp (unix seconds).
    pub time: i64,
}

/// Result of decoding the `message` field.
#[derive(Debug, Default, PartialEq)]
struct ParsedContent {
    text: String,
    mentioned: bool,
}

/// Returns the bot's inline mention token for `self_id`.
fn mention_token(self_id: i64) -> String {
    format!("[CQ:at,qq={self_id}]")
}

/// Removes the mention token from `text`, reporting whether it was present.
fn strip_mention(text: &str, self_id: i64) -> (String, bool) {
    if self_id > 0 {
        let token = mention_token(self_id);
        if text.contains(&token) {
            return (text.replace(&token, "").trim().to_string(), true);
        }
    }
    (text.to_string(), false)
}

/// Decodes the `message` field, which is either a plain CQ string or an
/// ordered segment array.
fn parse_message_content(message: &Value, self_id: i64) -> ParsedContent {
    match message {
        Value::String(s) => {
            let (text, mentioned) = strip_mention(s, self_id);
            ParsedContent { text, mentioned }
        }
        Value::Array(segments) => {
            let mut text = String::new();
            let mut mentioned = false;
            let self_id_str = self_id.to_string();
            for seg in segments {
                let seg_type = seg.get("type").and_then(Value::as_str).unwrap_or("");
                let data = seg.get("data");
                match seg_type {
                    "text" => {
                        if let Some(t) = data.and_then(|d| d.get("text")).and_then(Value::as_str) {
                            text.push_str(t);
                        }
                    }
                    "at" => {
                        if self_id > 0
                            && let Some(target) = data.and_then(|d| d.get("qq"))
                        {
                            let target = flex_string(target);
                            if target == self_id_str || target == "all" {
                                mentioned = true;
                            }
                        }
                    }
                    // Unknown segment types carry no routable text.
                    _ => {}
                }
            }
            ParsedContent {
                text: text.trim().to_string(),
                mentioned,
            }
        }
        _ => ParsedContent::default(),
    }
}

/// Maps a raw envelope to a [`NormalizedEvent`].
///
/// Only an uncoercible `user_id` fails the event; every other field falls
/// back to its zero value. A failed event is dropped by the caller with the
/// returned cause, not forwarded.
pub fn normalize(raw: &RawEvent) -> Result<NormalizedEvent, DecodeError> {
    let user_id = flex_i64(&raw.user_id)?;

    let group_id = flex_i64(&raw.group_id).unwrap_or(0);
    let self_id = flex_i64(&raw.self_id).unwrap_or(0);
    let time = flex_i64(&raw.time).unwrap_or(0);
    let message_id = flex_string(&raw.message_id);

    let parsed = parse_message_content(&raw.message, self_id);
    let mut is_bot_mentioned = parsed.mentioned;

    // raw_message wins when present; the structured decode is the fallback.
    let content = if raw.raw_message.is_empty() {
        parsed.text
    } else {
        let (stripped, mentioned) = strip_mention(&raw.raw_message, self_id);
        is_bot_mentioned |= mentioned;
        stripped
    };

    let sender = if raw.sender.is_null() {
        Sender::default()
    } else {
        serde_json::from_value(raw.sender.clone()).unwrap_or_else(|e| {
            warn!(error = %e, sender = %raw.sender, "Failed to parse sender, leaving empty");
            Sender::default()
        })
    };

    Ok(NormalizedEvent {
        post_type: raw.post_type.clone(),
        message_type: raw.message_type.clone(),
        sub_type: raw.sub_type.clone(),
        message_id,
        user_id,
        group_id,
        content,
        raw_content: raw.raw_message.clone(),
        is_bot_mentioned,
        sender,
        self_id,
        time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_from(v: Value) -> RawEvent {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn plain_string_mention_is_stripped() {
        let raw = raw_from(json!({
            "post_type": "message",
            "message_type": "group",
            "user_id": 123,
            "group_id": 456,
            "self_id": 10000,
            "message": "[CQ:at,qq=10000] what's up"
        }));
        let evt = normalize(&raw).unwrap();
        assert!(evt.is_bot_mentioned);
        assert_eq!(evt.content, "what's up");
    }

    #[test]
    fn mention_stripping_is_idempotent() {
        let raw = raw_from(json!({
            "post_type": "message",
            "message_type": "group",
            "user_id": 123,
            "self_id": 10000,
            "message": "what's up"
        }));
        let evt = normalize(&raw).unwrap();
        assert!(!evt.is_bot_mentioned);
        assert_eq!(evt.content, "what's up");
    }

    #[test]
    fn segment_array_concatenates_text_and_detects_at() {
        let raw = raw_from(json!({
            "post_type": "message",
            "message_type": "group",
            "user_id": 123,
            "self_id": 10000,
            "message": [
                {"type": "at", "data": {"qq": "10000"}},
                {"type": "text", "data": {"text": " hello "}},
                {"type": "face", "data": {"id": "1"}},
                {"type": "text", "data": {"text": "world"}}
            ]
        }));
        let evt = normalize(&raw).unwrap();
        assert!(evt.is_bot_mentioned);
        assert_eq!(evt.content, "hello world");
    }

    #[test]
    fn at_all_counts_as_mention() {
        let parsed = parse_message_content(
            &json!([{"type": "at", "data": {"qq": "all"}}, {"type": "text", "data": {"text": "hi"}}]),
            10000,
        );
        assert!(parsed.mentioned);
        assert_eq!(parsed.text, "hi");
    }

    #[test]
    fn at_numeric_target_matches_self_id() {
        // Some implementations send the at target as a JSON number.
        let parsed = parse_message_content(
            &json!([{"type": "at", "data": {"qq": 10000}}]),
            10000,
        );
        assert!(parsed.mentioned);
    }

    #[test]
    fn raw_message_takes_precedence_over_segments() {
        let raw = raw_from(json!({
            "post_type": "message",
            "message_type": "private",
            "user_id": 123,
            "self_id": 10000,
            "raw_message": "[CQ:at,qq=10000]from raw",
            "message": [{"type": "text", "data": {"text": "from segments"}}]
        }));
        let evt = normalize(&raw).unwrap();
        assert!(evt.is_bot_mentioned);
        assert_eq!(evt.content, "from raw");
        assert_eq!(evt.raw_content, "[CQ:at,qq=10000]from raw");
    }

    #[test]
    fn bad_user_id_fails_the_event() {
        let raw = raw_from(json!({
            "post_type": "message",
            "message_type": "private",
            "user_id": "abc",
            "message": "hi"
        }));
        assert!(normalize(&raw).is_err());
    }

    #[test]
    fn bad_sender_leaves_fields_empty() {
        let raw = raw_from(json!({
            "post_type": "message",
            "message_type": "private",
            "user_id": 123,
            "sender": "not an object",
            "message": "hi"
        }));
        let evt = normalize(&raw).unwrap();
        assert_eq!(evt.sender.nickname, "");
        assert_eq!(evt.sender.card, "");
    }

    #[test]
    fn numeric_fields_fall_back_to_zero() {
        let raw = raw_from(json!({
            "post_type": "message",
            "message_type": "private",
            "user_id": "123",
            "group_id": "oops",
            "message": "hi"
        }));
        let evt = normalize(&raw).unwrap();
        assert_eq!(evt.user_id, 123);
        assert_eq!(evt.group_id, 0);
        assert_eq!(evt.self_id, 0);
        assert_eq!(evt.time, 0);
    }
}
