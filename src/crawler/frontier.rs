//! Frontier manager
//!
//! The frontier is the single source of crawl work. It polls the durable
//! task table, falls back to the configured seed URLs when the table is
//! empty, filters out URLs that already have a stored page, and feeds the
//! Task Queue. Queue depth drives its pacing so it never floods the
//! fetch pool with more work than the batch cycle can absorb.

use crate::config::Config;
use crate::model::CrawlTask;
use crate::queue::CrawlQueue;
use crate::storage::Storage;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

/// How many pending tasks one polling cycle pulls from the store.
const TASK_FETCH_LIMIT: usize = 1000;

/// Feeds the Task Queue from the durable store.
pub struct FrontierManager<S: Storage> {
    config: Arc<Config>,
    storage: Arc<Mutex<S>>,
    task_queue: Arc<CrawlQueue<CrawlTask>>,
    shutdown: watch::Receiver<bool>,
}

impl<S: Storage> FrontierManager<S> {
    pub fn new(
        config: Arc<Config>,
        storage: Arc<Mutex<S>>,
        task_queue: Arc<CrawlQueue<CrawlTask>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            storage,
            task_queue,
            shutdown,
        }
    }

    /// Runs the polling loop until shutdown is signaled.
    pub async fn run(mut self) {
        info!("frontier manager started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let sleep_ms = self.cycle();

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {}
                _ = self.shutdown.changed() => break,
            }
        }

        info!("frontier manager stopped");
    }

    /// One polling cycle. Returns how long to sleep before the next one.
    fn cycle(&self) -> u64 {
        let crawler = &self.config.crawler;

        // A deep queue means the fetch pool is still chewing through the
        // previous cycle. Back off instead of stacking duplicates.
        if self.task_queue.len() >= crawler.batch_size {
            return crawler.frontier_backoff_ms;
        }

        let candidates = match self.load_candidates() {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("frontier store read failed: {}", e);
                return crawler.error_cooldown_ms;
            }
        };

        let mut enqueued = 0;
        for task in candidates {
            if !has_crawlable_scheme(&task.url) {
                debug!("frontier skipping non-http url: {}", task.url);
                continue;
            }

            match self.page_exists(&task.url) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    warn!("frontier dedup check failed for {}: {}", task.url, e);
                    return crawler.error_cooldown_ms;
                }
            }

            self.task_queue.push(task);
            enqueued += 1;
        }

        if enqueued > 0 {
            debug!("frontier enqueued {} tasks", enqueued);
            crawler.frontier_poll_ms
        } else {
            crawler.frontier_backoff_ms
        }
    }

    /// Pending tasks from the store, or seed-derived tasks when the
    /// store has none.
    fn load_candidates(&self) -> Result<Vec<CrawlTask>, crate::storage::StorageError> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        let tasks = storage.pending_tasks(TASK_FETCH_LIMIT)?;

        if !tasks.is_empty() {
            return Ok(tasks);
        }

        Ok(self
            .config
            .start_urls
            .iter()
            .map(|url| CrawlTask::pending(url.clone()))
            .collect())
    }

    fn page_exists(&self, url: &str) -> Result<bool, crate::storage::StorageError> {
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .page_exists(url)
    }
}

fn has_crawlable_scheme(url: &str) -> bool {
    matches!(
        Url::parse(url).map(|u| u.scheme().to_string()),
        Ok(scheme) if scheme == "http" || scheme == "https"
    )
}
