// src/event.rs
use serde::{Deserialize, Serialize};

/// One listing notification as produced upstream.
///
/// `content` carries the loosely structured text (tagged or positional, see
/// [`crate::content`]); `url` is the canonical listing URL and doubles as the
/// identity of the item. The remaining fields are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub content: String,
    pub url: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "buyUrl", alias = "buy_url")]
    pub buy_url: String,
    #[serde(default, rename = "buyText", alias = "buy_text")]
    pub buy_text: String,
}

impl NotificationEvent {
    pub fn new(content: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Build from the upstream 5-tuple `(content, url, text, buy_url, buy_text)`.
    pub fn from_tuple(t: (String, String, String, String, String)) -> Self {
        let (content, url, text, buy_url, buy_text) = t;
        Self {
            content,
            url,
            text,
            buy_url,
            buy_text,
        }
    }
}
