// tests/consumer_loop.rs
//
// SinkConsumer over a SharedQueue: ordering, failure isolation, shutdown,
// and the queue → FeedSink path end to end.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use listing_fanout::notify::feed::FeedMeta;
use listing_fanout::{EventHandler, FeedSink, NotificationEvent, SharedQueue, SinkConsumer};

/// Fails on payload "fail", panics on payload "panic", records the rest.
struct Flaky {
    seen: Mutex<Vec<String>>,
}

impl Flaky {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for Flaky {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn handle(&self, ev: NotificationEvent) -> Result<()> {
        match ev.content.as_str() {
            "fail" => bail!("cannot handle {}", ev.url),
            "panic" => panic!("handler blew up on {}", ev.url),
            _ => {
                self.seen.lock().unwrap().push(ev.url);
                Ok(())
            }
        }
    }
}

/// Poll `cond` until it holds or two seconds pass.
async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

#[tokio::test]
async fn failing_event_does_not_stop_the_loop() {
    let q = SharedQueue::new();
    let h = Flaky::new();
    let consumer = SinkConsumer::new(q.clone(), h.clone())
        .with_idle_interval(Duration::from_millis(5))
        .spawn();

    q.push(NotificationEvent::new("fail", "u1"));
    q.push(NotificationEvent::new("ok", "u2"));

    assert!(eventually(|| h.seen() == vec!["u2".to_string()]).await);
    assert!(!consumer.is_finished());
    consumer.shutdown().await;
}

#[tokio::test]
async fn panicking_event_does_not_stop_the_loop() {
    let q = SharedQueue::new();
    let h = Flaky::new();
    let consumer = SinkConsumer::new(q.clone(), h.clone())
        .with_idle_interval(Duration::from_millis(5))
        .spawn();

    q.push(NotificationEvent::new("panic", "u1"));
    q.push(NotificationEvent::new("ok", "u2"));
    q.push(NotificationEvent::new("ok", "u3"));

    assert!(eventually(|| h.seen().len() == 2).await);
    assert_eq!(h.seen(), vec!["u2".to_string(), "u3".to_string()]);
    consumer.shutdown().await;
}

#[tokio::test]
async fn events_are_handled_in_queue_order() {
    let q = SharedQueue::new();
    let h = Flaky::new();
    let expected: Vec<String> = (0..50).map(|i| format!("u{i}")).collect();
    for u in &expected {
        q.push(NotificationEvent::new("ok", u.clone()));
    }

    let consumer = SinkConsumer::new(q.clone(), h.clone()).spawn();
    assert!(eventually(|| h.seen().len() == expected.len()).await);
    assert_eq!(h.seen(), expected);
    assert!(q.is_empty());
    consumer.shutdown().await;
}

#[tokio::test]
async fn shutdown_leaves_unconsumed_events_behind() {
    let q = SharedQueue::new();
    let h = Flaky::new();
    let consumer = SinkConsumer::new(q.clone(), h.clone()).spawn();
    consumer.shutdown().await;

    q.push(NotificationEvent::new("ok", "late"));
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(h.seen().is_empty());
    assert_eq!(q.len(), 1);
}

#[tokio::test]
async fn queue_feeds_the_rss_store() {
    let q = SharedQueue::new();
    let feed = FeedSink::new(1, FeedMeta::for_port(18473));
    let consumer = SinkConsumer::new(q.clone(), Arc::new(feed.clone()))
        .with_idle_interval(Duration::from_millis(5))
        .spawn();

    let tagged =
        "🆕 Title : Red Jacket\n💶 Price : 8.0 GBP\n🛍️ Brand : Nike\n<a href=\"http://img/x.jpg\">";
    q.push(NotificationEvent::new(tagged, "https://example.com/items/123"));
    assert!(eventually(|| feed.store().len() == 1).await);
    assert_eq!(feed.store().snapshot()[0].title, "Red Jacket");

    q.push(NotificationEvent::new("🆕 Title : Second", "https://example.com/items/124"));
    assert!(eventually(|| feed.store().snapshot()[0].title == "Second").await);
    assert_eq!(feed.store().len(), 1);

    consumer.shutdown().await;
}
