// src/listing.rs
//! Read-only adapter over the listing record store, keyed by the item id in a listing URL.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::debug;

pub const ENV_LISTINGS_PATH: &str = "FANOUT_LISTINGS_PATH";

/// One stored listing. Prices are kept as the raw amount plus ISO code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub item_id: String,
    pub title: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub photo_url: String,
}

pub trait ListingStore: Send + Sync {
    fn lookup_listing(&self, item_id: &str) -> Option<ListingRecord>;
}

#[derive(Debug, Default)]
pub struct MemoryListingStore {
    items: RwLock<HashMap<String, ListingRecord>>,
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, rec: ListingRecord) {
        let mut g = self.items.write().unwrap_or_else(|p| p.into_inner());
        g.insert(rec.item_id.clone(), rec);
    }

    /// Load a JSON array of [`ListingRecord`]s.
    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading listings from {}", path.display()))?;
        let recs: Vec<ListingRecord> =
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        let store = Self::new();
        for r in recs {
            store.insert(r);
        }
        Ok(store)
    }
}

impl ListingStore for MemoryListingStore {
    fn lookup_listing(&self, item_id: &str) -> Option<ListingRecord> {
        let g = self.items.read().unwrap_or_else(|p| p.into_inner());
        g.get(item_id).cloned()
    }
}

/// Store that never finds anything; used when no record store is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoListings;

impl ListingStore for NoListings {
    fn lookup_listing(&self, _item_id: &str) -> Option<ListingRecord> {
        None
    }
}

/// Item id from a listing URL: the segment right after `items`, otherwise the
/// last all-numeric path segment.
pub fn item_id_from_url(url: &str) -> Option<String> {
    let path = match url::Url::parse(url) {
        Ok(u) => u.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let after_items = segments
        .iter()
        .rposition(|s| *s == "items")
        .and_then(|i| segments.get(i + 1));
    if let Some(id) = after_items {
        return Some((*id).to_string());
    }

    segments
        .iter()
        .rev()
        .find(|s| s.chars().all(|c| c.is_ascii_digit()))
        .map(|s| (*s).to_string())
}

/// URL-keyed front of a [`ListingStore`].
#[derive(Clone)]
pub struct ListingLookup {
    store: Arc<dyn ListingStore>,
}

impl ListingLookup {
    pub fn new(store: Arc<dyn ListingStore>) -> Self {
        Self { store }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(NoListings))
    }

    pub fn by_url(&self, url: &str) -> Option<ListingRecord> {
        let id = item_id_from_url(url)?;
        let hit = self.store.lookup_listing(&id);
        debug!(target: "listing", %id, found = hit.is_some(), "listing lookup");
        hit
    }
}
