//! Shared work queues
//!
//! The task queue, fetch-result queue, and page queue are the only shared
//! mutable structures between workers. Each is an explicitly constructed
//! [`CrawlQueue`] passed by `Arc` to the components that need it; all
//! access goes through blocking, thread-safe push/pop operations.
//!
//! Depth is observable via [`CrawlQueue::len`] because both the frontier
//! manager's backpressure throttle and the persistence manager's batch
//! triggers are driven by queue depth.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout, Instant};

/// A FIFO queue shared between pipeline stages
pub struct CrawlQueue<T> {
    items: Mutex<VecDeque<T>>,
    notify: Notify,
}

impl<T> CrawlQueue<T> {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// Appends an item and wakes one waiting consumer
    pub fn push(&self, item: T) {
        self.items
            .lock()
            .expect("queue mutex poisoned")
            .push_back(item);
        self.notify.notify_one();
    }

    /// Removes and returns the oldest item, if any
    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().expect("queue mutex poisoned").pop_front()
    }

    /// Waits up to `wait` for an item
    ///
    /// Returns `None` on timeout; an idle timeout is not an error, callers
    /// are expected to loop.
    pub async fn pop_timeout(&self, wait: Duration) -> Option<T> {
        let deadline = Instant::now() + wait;

        loop {
            if let Some(item) = self.try_pop() {
                return Some(item);
            }

            let remaining = deadline.checked_duration_since(Instant::now())?;
            if timeout(remaining, self.notify.notified()).await.is_err() {
                // Timed out; one last opportunistic check in case a push
                // raced the deadline.
                return self.try_pop();
            }
        }
    }

    /// Removes and returns up to `max` items in FIFO order
    pub fn drain(&self, max: usize) -> Vec<T> {
        let mut items = self.items.lock().expect("queue mutex poisoned");
        let take = max.min(items.len());
        items.drain(..take).collect()
    }

    /// Current queue depth
    pub fn len(&self) -> usize {
        self.items.lock().expect("queue mutex poisoned").len()
    }

    /// Whether the queue is currently empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for CrawlQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
