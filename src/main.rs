//! Listing fan-out service: binary entrypoint.
//! Reads JSON-line notification events from stdin and fans each one out to
//! the enabled sinks (Discord webhook, RSS feed server).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing::{info, warn};

use listing_fanout::config::{FileParameterStore, ParameterStore, SinkSettings};
use listing_fanout::listing::{ListingLookup, MemoryListingStore, ENV_LISTINGS_PATH};
use listing_fanout::notify::feed::FeedMeta;
use listing_fanout::queue::fan_out_lines;
use listing_fanout::shutdown::shutdown_signal;
use listing_fanout::{telemetry, DiscordSink, FeedSink, SharedQueue, SinkConsumer};

fn load_listings() -> ListingLookup {
    let Ok(p) = std::env::var(ENV_LISTINGS_PATH) else {
        return ListingLookup::disabled();
    };
    match MemoryListingStore::load_json(&PathBuf::from(&p)) {
        Ok(store) => ListingLookup::new(Arc::new(store)),
        Err(e) => {
            warn!(error = ?e, path = %p, "listing store unavailable, payload fields only");
            ListingLookup::disabled()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op otherwise.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();
    telemetry::describe_metrics();

    let params: Arc<dyn ParameterStore> =
        Arc::new(FileParameterStore::open_default().context("opening parameter store")?);
    let listings = load_listings();
    let settings = SinkSettings::from_store(params.as_ref());
    info!(?settings, "sink settings loaded");

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut queues = Vec::new();
    let mut consumers = Vec::new();
    let mut feed_server = None;

    if settings.discord_enabled {
        info!("Discord webhook sink started");
        let q = SharedQueue::new();
        let sink = DiscordSink::new(params.clone(), listings.clone());
        consumers.push(SinkConsumer::new(q.clone(), Arc::new(sink)).spawn());
        queues.push(q);
    }

    if settings.rss_enabled {
        info!("RSS feed sink started");
        let q = SharedQueue::new();
        let sink = FeedSink::new(settings.rss_max_items, FeedMeta::for_port(settings.rss_port));
        consumers.push(SinkConsumer::new(q.clone(), Arc::new(sink.clone())).spawn());
        queues.push(q);

        let port = settings.rss_port;
        let mut rx = stop_rx.clone();
        feed_server = Some(tokio::spawn(async move {
            let shutdown = async move {
                let _ = rx.changed().await;
            };
            // already logged inside serve(); the consumer keeps running
            let _ = sink.serve(port, shutdown).await;
        }));
    }

    if queues.is_empty() {
        warn!("no sinks enabled (set discord_enabled / rss_enabled)");
    }

    let stop = shutdown_signal()?;
    let producer = tokio::spawn(async move {
        fan_out_lines(BufReader::new(tokio::io::stdin()), &queues).await;
    });

    stop.await?;
    info!("shutdown requested");

    producer.abort();
    let _ = stop_tx.send(true);
    for c in consumers {
        c.shutdown().await;
    }
    if let Some(server) = feed_server {
        let _ = server.await;
    }
    info!("listing fan-out stopped");
    Ok(())
}
