// src/notify/feed/mod.rs
//! RSS sink: keeps the most recent listings in memory and serves them on `GET /`.

pub mod render;
pub mod store;

pub use render::{format_description, render_feed, FeedMeta, RSS_CONTENT_TYPE};
pub use store::{FeedEntry, FeedStore};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::PLACEHOLDER_TITLE;
use crate::consumer::EventHandler;
use crate::content::parse_content;
use crate::event::NotificationEvent;

/// Last-resort body if rendering ever fails; still a valid, empty feed.
const EMPTY_FEED: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<rss version="2.0"><channel><title>Vinted Notifications</title>"#,
    r#"<link>http://localhost</link><description></description></channel></rss>"#
);

#[derive(Clone)]
pub struct FeedSink {
    store: Arc<FeedStore>,
    meta: Arc<FeedMeta>,
}

impl FeedSink {
    pub fn new(max_items: usize, meta: FeedMeta) -> Self {
        Self {
            store: Arc::new(FeedStore::new(max_items)),
            meta: Arc::new(meta),
        }
    }

    pub fn store(&self) -> &FeedStore {
        &self.store
    }

    /// Parse `ev` and record it as published at `now`.
    pub fn add_event(&self, ev: &NotificationEvent, now: DateTime<Utc>) -> Vec<FeedEntry> {
        let fields = parse_content(&ev.content);
        let title = if fields.title.is_empty() {
            warn!(target: "feed", url = %ev.url, "could not extract title from content, using fallback");
            PLACEHOLDER_TITLE.to_string()
        } else {
            fields.title
        };

        let evicted = self.store.push(FeedEntry {
            title,
            url: ev.url.clone(),
            brand: fields.brand,
            price: fields.price,
            image: fields.image,
            published_at: now,
        });

        if !evicted.is_empty() {
            counter!("fanout_feed_evictions_total").increment(evicted.len() as u64);
        }
        gauge!("fanout_feed_items").set(self.store.len() as f64);
        evicted
    }

    /// Current document: newest first, capped at the store's capacity.
    pub fn render(&self, now: DateTime<Utc>) -> Result<String> {
        render_feed(&self.meta, &self.store.recent(), now)
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(serve_feed))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    /// Bind `0.0.0.0:port` and serve until `shutdown` resolves.
    /// Bind and serve errors are logged here and returned; they end only this server.
    pub async fn serve<F>(self, port: u16, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = match TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(e) => {
                error!(target: "feed", %addr, error = %e, "error starting RSS feed server");
                return Err(e).with_context(|| format!("binding feed server on {addr}"));
            }
        };
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr().context("feed listener address")?;
        info!(target: "feed", addr = %local, "starting RSS feed server");
        let app = self.router();
        let res = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;
        if let Err(e) = &res {
            error!(target: "feed", error = %e, "RSS feed server stopped with error");
        }
        res.context("serving feed")
    }
}

async fn serve_feed(State(sink): State<FeedSink>) -> Response {
    let body = match sink.render(Utc::now()) {
        Ok(xml) => xml,
        Err(e) => {
            error!(target: "feed", error = ?e, "failed to render feed");
            EMPTY_FEED.to_string()
        }
    };
    ([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], body).into_response()
}

#[async_trait]
impl EventHandler for FeedSink {
    fn name(&self) -> &'static str {
        "feed"
    }

    async fn handle(&self, ev: NotificationEvent) -> Result<()> {
        self.add_event(&ev, Utc::now());
        Ok(())
    }
}
