pub mod discord;
pub mod feed;

/// Title used whenever neither the record store nor the payload yields one.
pub const PLACEHOLDER_TITLE: &str = "Vinted Item";

/// Display name for outbound messages and the feed title.
pub const DISPLAY_NAME: &str = "Vinted Notifications";

/// Result of one delivery attempt. Failures are reported, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    /// Nothing was attempted (e.g. no webhook configured).
    Skipped(&'static str),
    /// Attempted and failed; carries status/body or the transport error.
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent)
    }
}
