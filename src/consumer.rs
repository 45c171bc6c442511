// src/consumer.rs
//! # Sink consumer
//! Background loop that drains one sink's queue and hands each event to that
//! sink's handler, in pop order.
//!
//! The loop polls: pop one event if present, otherwise sleep for the idle
//! interval. Each handler call runs in its own task and is awaited before the
//! next pop, so order is preserved while an `Err` or a panic from one event
//! is only logged. Shutdown goes through [`ConsumerHandle`]; events still
//! queued at that point are dropped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::event::NotificationEvent;
use crate::queue::SharedQueue;

/// Default pause between polls of an empty queue.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(100);

/// Per-sink event handler.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Short label for logs and metrics, e.g. `"discord"`.
    fn name(&self) -> &'static str;

    async fn handle(&self, ev: NotificationEvent) -> Result<()>;
}

pub struct SinkConsumer<H: EventHandler> {
    queue: SharedQueue,
    handler: Arc<H>,
    idle: Duration,
}

impl<H: EventHandler> SinkConsumer<H> {
    pub fn new(queue: SharedQueue, handler: Arc<H>) -> Self {
        Self {
            queue,
            handler,
            idle: DEFAULT_IDLE_INTERVAL,
        }
    }

    pub fn with_idle_interval(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    /// Spawn the loop on the current Tokio runtime.
    pub fn spawn(self) -> ConsumerHandle {
        let (tx, rx) = watch::channel(false);
        let sink = self.handler.name();
        let join = tokio::spawn(self.run(rx));
        ConsumerHandle {
            sink,
            shutdown: tx,
            join,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let sink = self.handler.name();
        info!(sink, "sink consumer started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.queue.try_pop() {
                Some(ev) => {
                    dispatch_one(&self.handler, ev).await;
                }
                None => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.idle) => {}
                        changed = shutdown.changed() => {
                            // sender dropped counts as shutdown too
                            if changed.is_err() || *shutdown.borrow() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        info!(sink, pending = self.queue.len(), "sink consumer stopped");
    }
}

/// Handle one event in an isolated task and record the outcome.
/// Returns `true` when the handler completed without error.
pub async fn dispatch_one<H: EventHandler>(handler: &Arc<H>, ev: NotificationEvent) -> bool {
    let sink = handler.name();
    let url = ev.url.clone();
    let h = Arc::clone(handler);

    match tokio::spawn(async move { h.handle(ev).await }).await {
        Ok(Ok(())) => {
            debug!(sink, %url, "event handled");
            counter!("fanout_events_handled_total", "sink" => sink).increment(1);
            true
        }
        Ok(Err(e)) => {
            error!(sink, %url, error = ?e, "error processing event");
            counter!("fanout_events_failed_total", "sink" => sink).increment(1);
            false
        }
        Err(join_err) => {
            error!(sink, %url, error = %join_err, "event handler panicked");
            counter!("fanout_events_failed_total", "sink" => sink).increment(1);
            false
        }
    }
}

/// Owner's grip on a running consumer.
pub struct ConsumerHandle {
    sink: &'static str,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ConsumerHandle {
    pub fn sink(&self) -> &'static str {
        self.sink
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Ask the loop to stop and wait for it. An in-flight event finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            error!(sink = self.sink, error = %e, "sink consumer task failed");
        }
    }
}
