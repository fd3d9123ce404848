//! Group trigger classification.
//!
//! Group chats are noisy; the adapter only acts on a group message when the
//! bot was mentioned directly or the text starts with a configured prefix.
//! Private messages bypass this entirely and are always acted upon.

/// Decides whether a group-scoped message should be acted upon and strips
/// the trigger token from the content.
#[derive(Debug, Clone, Default)]
pub struct TriggerClassifier {
    prefixes: Vec<String>,
}

impl TriggerClassifier {
    /// Creates a classifier from the configured prefix list.
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    /// Returns `(triggered, stripped_content)`.
    ///
    /// A direct mention always triggers (the mention token is already
    /// removed upstream). Otherwise the first matching non-empty prefix
    /// triggers, with the prefix removed and the remainder trimmed. No
    /// match returns the content unchanged; the caller must not forward it.
    pub fn classify(&self, content: &str, is_bot_mentioned: bool) -> (bool, String) {
        if is_bot_mentioned {
            return (true, content.trim().to_string());
        }

        for prefix in &self.prefixes {
            if prefix.is_empty() {
                continue;
            }
            if let Some(rest) = content.strip_prefix(prefix.as_str()) {
                return (true, rest.trim().to_string());
            }
        }

        (false, content.to_string())
    }
}
