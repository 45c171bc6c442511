// src/queue.rs
//! Cross-thread handoff between the upstream producer and one sink consumer.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info, warn};

use crate::event::NotificationEvent;

/// Clonable FIFO handle. Every clone points at the same queue, so the
/// producer keeps one clone and the sink's consumer owns another.
#[derive(Debug, Clone, Default)]
pub struct SharedQueue {
    inner: Arc<Mutex<VecDeque<NotificationEvent>>>,
}

impl SharedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, ev: NotificationEvent) {
        self.lock().push_back(ev);
    }

    /// Pop the oldest event if one is waiting. Never blocks on an empty queue.
    pub fn try_pop(&self) -> Option<NotificationEvent> {
        self.lock().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    // A panic while holding the lock cannot leave the deque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<NotificationEvent>> {
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Upstream side of the fan-out: parse JSON-line events from `reader` and
/// push a copy of each onto every queue. Returns the number of events queued.
///
/// Blank and malformed lines are skipped. A line that is not valid UTF-8 is
/// consumed by the reader before the error surfaces, so reading carries on
/// with the next line; any other I/O error ends the stream.
pub async fn fan_out_lines<R>(reader: R, queues: &[SharedQueue]) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut queued = 0;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<NotificationEvent>(&line) {
                    Ok(ev) => {
                        for q in queues {
                            q.push(ev.clone());
                        }
                        queued += 1;
                    }
                    Err(e) => warn!(error = %e, "skipping malformed event line"),
                }
            }
            Ok(None) => {
                info!(queued, "event stream closed");
                break;
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!(error = %e, "skipping undecodable event line");
            }
            Err(e) => {
                error!(error = %e, "reading event stream failed");
                break;
            }
        }
    }
    queued
}
