// src/notify/feed/store.rs
//! Bounded, recency-ordered in-memory feed store.
//!
//! One writer (the feed consumer) and any number of readers (HTTP requests).
//! Every append/evict happens under a single write lock and readers copy the
//! entries out under a read lock, so a render never sees half an update.

use chrono::{DateTime, Utc};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    /// Identity of the entry; also the item guid and link.
    pub url: String,
    pub brand: String,
    pub price: String,
    pub image: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct FeedStore {
    entries: RwLock<Vec<FeedEntry>>,
    max_items: usize,
}

impl FeedStore {
    /// `max_items` below 1 is raised to 1.
    pub fn new(max_items: usize) -> Self {
        let max_items = max_items.max(1);
        Self {
            entries: RwLock::new(Vec::with_capacity(max_items.min(10_000) + 1)),
            max_items,
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Append `entry`; while over capacity, drop the entry with the smallest
    /// `published_at` (earliest inserted on ties). Returns what was dropped.
    pub fn push(&self, entry: FeedEntry) -> Vec<FeedEntry> {
        let mut v = self.write();
        v.push(entry);

        let mut evicted = Vec::new();
        while v.len() > self.max_items {
            let oldest = v
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.published_at)
                .map(|(i, _)| i);
            match oldest {
                Some(i) => evicted.push(v.remove(i)),
                None => break,
            }
        }
        evicted
    }

    /// Copy of the entries in storage order.
    pub fn snapshot(&self) -> Vec<FeedEntry> {
        self.read().clone()
    }

    /// Newest first, at most `max_items`.
    pub fn recent(&self) -> Vec<FeedEntry> {
        let mut items = self.snapshot();
        // stable sort keeps insertion order among equal timestamps
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        items.truncate(self.max_items);
        items
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<FeedEntry>> {
        self.entries.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<FeedEntry>> {
        self.entries.write().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn entry(url: &str, secs: i64) -> FeedEntry {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        FeedEntry {
            title: url.to_uppercase(),
            url: url.to_string(),
            brand: String::new(),
            price: String::new(),
            image: String::new(),
            published_at: t0 + Duration::seconds(secs),
        }
    }

    #[test]
    fn never_exceeds_capacity() {
        let s = FeedStore::new(3);
        for i in 0..10 {
            s.push(entry(&format!("u{i}"), i));
            assert!(s.len() <= 3);
        }
        let urls: Vec<_> = s.recent().into_iter().map(|e| e.url).collect();
        assert_eq!(urls, vec!["u9", "u8", "u7"]);
    }

    #[test]
    fn evicts_by_timestamp_not_insertion_order() {
        let s = FeedStore::new(2);
        s.push(entry("late", 100));
        s.push(entry("early", 10));
        let evicted = s.push(entry("mid", 50));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].url, "early");
        let urls: Vec<_> = s.recent().into_iter().map(|e| e.url).collect();
        assert_eq!(urls, vec!["late", "mid"]);
    }

    #[test]
    fn ties_evict_earliest_inserted() {
        let s = FeedStore::new(1);
        s.push(entry("first", 5));
        let evicted = s.push(entry("second", 5));
        assert_eq!(evicted[0].url, "first");
        assert_eq!(s.snapshot()[0].url, "second");
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let s = FeedStore::new(0);
        assert_eq!(s.max_items(), 1);
        assert!(s.is_empty());
        s.push(entry("a", 1));
        assert_eq!(s.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_partial_updates() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        const CAP: usize = 7;
        let store = Arc::new(FeedStore::new(CAP));
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let (store, done) = (store.clone(), done.clone());
                tokio::spawn(async move {
                    let mut seen = 0usize;
                    loop {
                        let finished = done.load(Ordering::Acquire);
                        let items = store.recent();
                        assert!(items.len() <= CAP);
                        assert!(items.windows(2).all(|w| w[0].published_at >= w[1].published_at));
                        assert!(items.iter().all(|e| e.title == e.url.to_uppercase()));
                        seen += 1;
                        if finished {
                            break;
                        }
                        tokio::task::yield_now().await;
                    }
                    seen
                })
            })
            .collect();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..500 {
                    store.push(entry(&format!("u{i}"), i));
                    assert!(store.len() <= CAP);
                    tokio::task::yield_now().await;
                }
            })
        };

        writer.await.unwrap();
        done.store(true, Ordering::Release);
        for r in readers {
            assert!(r.await.unwrap() > 0);
        }

        let urls: Vec<_> = store.recent().into_iter().map(|e| e.url).collect();
        let want: Vec<_> = (493..500).rev().map(|i| format!("u{i}")).collect();
        assert_eq!(urls, want);
    }
}
