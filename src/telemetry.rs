// src/telemetry.rs
use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_JSON: &str = "FANOUT_LOG_JSON";
const DEFAULT_FILTER: &str = "listing_fanout=info,warn";

/// Install the global subscriber. `RUST_LOG` wins over the default filter;
/// `FANOUT_LOG_JSON=1` switches to JSON lines. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var(ENV_LOG_JSON).ok().is_some_and(|v| v == "1");

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// One-time metrics registration (so series carry descriptions once a recorder exists).
pub fn describe_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "fanout_events_handled_total",
            "Events a sink handled without error."
        );
        describe_counter!(
            "fanout_events_failed_total",
            "Events whose handler returned an error or panicked."
        );
        describe_counter!(
            "fanout_webhook_failures_total",
            "Discord webhook posts that failed or returned non-2xx."
        );
        describe_counter!(
            "fanout_feed_evictions_total",
            "Feed entries dropped to stay within rss_max_items."
        );
        describe_gauge!("fanout_feed_items", "Entries currently held by the feed store.");
    });
}
