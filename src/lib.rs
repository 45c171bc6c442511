// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod consumer;
pub mod content;
pub mod event;
pub mod listing;
pub mod notify;
pub mod queue;
pub mod shutdown;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::consumer::{ConsumerHandle, EventHandler, SinkConsumer};
pub use crate::content::{format_price, parse_content, ParsedFields};
pub use crate::event::NotificationEvent;
pub use crate::notify::discord::DiscordSink;
pub use crate::notify::feed::FeedSink;
pub use crate::notify::DeliveryOutcome;
pub use crate::queue::SharedQueue;
