use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use metrics::counter;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};

use super::{DeliveryOutcome, DISPLAY_NAME, PLACEHOLDER_TITLE};
use crate::config::{self, ParameterStore};
use crate::consumer::EventHandler;
use crate::content::{format_price, parse_content, price::format_amount, ParsedFields};
use crate::event::NotificationEvent;
use crate::listing::ListingLookup;

/// Green accent on every embed.
pub const EMBED_COLOR: u32 = 0x00ff00;
pub const FOOTER_TEXT: &str = DISPLAY_NAME;
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub url: String,
    pub description: String,
    pub color: u32,
    pub timestamp: String,
    pub footer: EmbedFooter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookMessage {
    pub embeds: Vec<Embed>,
    pub username: String,
}

impl WebhookMessage {
    pub fn single(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            username: DISPLAY_NAME.to_string(),
        }
    }
}

/// Build the embed for one listing. Title always falls back to the placeholder.
pub fn build_embed(fields: &ParsedFields, item_url: &str, now: DateTime<Utc>) -> Embed {
    let description = [fields.price.as_str(), fields.brand.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let title = if fields.title.is_empty() {
        PLACEHOLDER_TITLE.to_string()
    } else {
        fields.title.clone()
    };

    Embed {
        title,
        url: item_url.to_string(),
        description,
        color: EMBED_COLOR,
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        footer: EmbedFooter {
            text: FOOTER_TEXT.to_string(),
        },
        image: (!fields.image.is_empty()).then(|| EmbedImage {
            url: fields.image.clone(),
        }),
    }
}

/// Posts one embed per event to the configured Discord webhook.
#[derive(Clone)]
pub struct DiscordSink {
    params: Arc<dyn ParameterStore>,
    listings: ListingLookup,
    client: Client,
    timeout: Duration,
}

impl DiscordSink {
    pub fn new(params: Arc<dyn ParameterStore>, listings: ListingLookup) -> Self {
        Self {
            params,
            listings,
            client: Client::new(),
            timeout: WEBHOOK_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Display fields for `ev`: a stored record wins for title, price and
    /// image wherever it has a value; brand only ever comes from the payload.
    pub fn resolve_fields(&self, ev: &NotificationEvent) -> ParsedFields {
        let parsed = parse_content(&ev.content);
        let Some(rec) = self.listings.by_url(&ev.url) else {
            return ParsedFields {
                price: format_price(&parsed.price),
                ..parsed
            };
        };
        let or_parsed = |stored: String, fallback: String| {
            if stored.trim().is_empty() {
                fallback
            } else {
                stored
            }
        };
        let price = if rec.price.trim().is_empty() {
            format_price(&parsed.price)
        } else {
            format_amount(&rec.price, &rec.currency)
        };
        ParsedFields {
            title: or_parsed(rec.title, parsed.title),
            brand: parsed.brand,
            price,
            image: or_parsed(rec.photo_url, parsed.image),
        }
    }

    /// One delivery attempt. Never retried; failures are logged and returned.
    pub async fn send(&self, ev: &NotificationEvent) -> DeliveryOutcome {
        let Some(webhook) = config::webhook_url(self.params.as_ref()) else {
            debug!(target: "discord", "webhook URL not configured, skipping notification");
            return DeliveryOutcome::Skipped("webhook not configured");
        };

        let fields = self.resolve_fields(ev);
        let embed = build_embed(&fields, &ev.url, Utc::now());
        let title = embed.title.clone();
        let msg = WebhookMessage::single(embed);

        let res = self
            .client
            .post(&webhook)
            .timeout(self.timeout)
            .json(&msg)
            .send()
            .await;

        let outcome = match res {
            Ok(rsp) if rsp.status().is_success() => DeliveryOutcome::Sent,
            Ok(rsp) => {
                let status = rsp.status();
                let body = rsp
                    .text()
                    .await
                    .unwrap_or_else(|e| format!("<body unavailable: {e}>"));
                DeliveryOutcome::Failed(format!("HTTP {status}: {body}"))
            }
            Err(e) => DeliveryOutcome::Failed(format!("request failed: {e}")),
        };

        match &outcome {
            DeliveryOutcome::Sent => {
                debug!(target: "discord", %title, "discord notification sent");
            }
            DeliveryOutcome::Failed(detail) => {
                error!(target: "discord", url = %ev.url, response = %detail, "error sending discord webhook");
                counter!("fanout_webhook_failures_total").increment(1);
            }
            DeliveryOutcome::Skipped(_) => {}
        }
        outcome
    }
}

#[async_trait]
impl EventHandler for DiscordSink {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn handle(&self, ev: NotificationEvent) -> Result<()> {
        self.send(&ev).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryParameterStore;
    use crate::listing::{ListingRecord, MemoryListingStore};
    use chrono::TimeZone;

    const TAGGED: &str =
        "🆕 Title : Red Jacket\n💶 Price : 8.0 GBP\n🛍️ Brand : Nike\n<a href=\"http://img/x.jpg\">";

    fn sink_with(listings: ListingLookup) -> DiscordSink {
        DiscordSink::new(Arc::new(MemoryParameterStore::new()), listings)
    }

    #[test]
    fn embed_from_payload_when_lookup_misses() {
        let sink = sink_with(ListingLookup::disabled());
        let ev = NotificationEvent::new(TAGGED, "https://example.com/items/123");
        let fields = sink.resolve_fields(&ev);
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        let embed = build_embed(&fields, &ev.url, now);

        assert_eq!(embed.title, "Red Jacket");
        assert_eq!(embed.url, "https://example.com/items/123");
        assert_eq!(embed.description, "£8.0\nNike");
        assert_eq!(embed.image, Some(EmbedImage { url: "http://img/x.jpg".into() }));
        assert_eq!(embed.timestamp, "2025-09-06T09:00:00.000Z");
        assert_eq!(embed.color, EMBED_COLOR);
    }

    #[test]
    fn record_overrides_title_price_image_but_not_brand() {
        let store = MemoryListingStore::new();
        store.insert(ListingRecord {
            item_id: "123".into(),
            title: "Red Jacket (stored)".into(),
            price: "9.5".into(),
            currency: "EUR".into(),
            photo_url: "http://img/stored.jpg".into(),
        });
        let sink = sink_with(ListingLookup::new(Arc::new(store)));
        let ev = NotificationEvent::new(TAGGED, "https://example.com/items/123");
        let f = sink.resolve_fields(&ev);
        assert_eq!(f.title, "Red Jacket (stored)");
        assert_eq!(f.price, "€9.5");
        assert_eq!(f.brand, "Nike");
        assert_eq!(f.image, "http://img/stored.jpg");
    }

    #[test]
    fn blank_record_fields_fall_back_to_payload() {
        let store = MemoryListingStore::new();
        store.insert(ListingRecord {
            item_id: "123".into(),
            title: String::new(),
            price: String::new(),
            currency: "EUR".into(),
            photo_url: "  ".into(),
        });
        let sink = sink_with(ListingLookup::new(Arc::new(store)));
        let ev = NotificationEvent::new(TAGGED, "https://example.com/items/123");
        let f = sink.resolve_fields(&ev);
        assert_eq!(f.title, "Red Jacket");
        assert_eq!(f.price, "£8.0");
        assert_eq!(f.brand, "Nike");
        assert_eq!(f.image, "http://img/x.jpg");

        let embed = build_embed(&f, &ev.url, Utc::now());
        assert_ne!(embed.title, PLACEHOLDER_TITLE);
    }

    #[test]
    fn placeholder_title_and_sparse_description() {
        let now = Utc::now();
        let e = build_embed(&ParsedFields::default(), "u", now);
        assert_eq!(e.title, PLACEHOLDER_TITLE);
        assert_eq!(e.description, "");
        assert!(e.image.is_none());

        let only_brand = ParsedFields {
            brand: "Zara".into(),
            ..Default::default()
        };
        assert_eq!(build_embed(&only_brand, "u", now).description, "Zara");
    }

    #[test]
    fn payload_shape_omits_missing_image() {
        let e = build_embed(&ParsedFields::default(), "u", Utc::now());
        let v = serde_json::to_value(WebhookMessage::single(e)).unwrap();
        assert_eq!(v["username"], DISPLAY_NAME);
        assert_eq!(v["embeds"][0]["footer"]["text"], FOOTER_TEXT);
        assert!(v["embeds"][0].get("image").is_none());
    }

    #[tokio::test]
    async fn missing_webhook_is_skipped() {
        let sink = sink_with(ListingLookup::disabled());
        let out = sink.send(&NotificationEvent::new(TAGGED, "u")).await;
        assert_eq!(out, DeliveryOutcome::Skipped("webhook not configured"));
        assert!(!out.is_sent());
    }
}
