//! Batched persistence manager
//!
//! Drains the Page Queue into the store in batches and closes the crawl
//! loop: each flush upserts pages, seeds new tasks from the links those
//! pages contained, and removes the tasks the pages satisfied. The three
//! sub-steps are individually idempotent, so a failed flush can be
//! retried without rollback machinery.

use crate::config::Config;
use crate::model::{CrawlTask, Page};
use crate::queue::CrawlQueue;
use crate::storage::Storage;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Writes crawl results and re-expands the frontier.
pub struct PersistenceManager<S: Storage> {
    config: Arc<Config>,
    storage: Arc<Mutex<S>>,
    task_queue: Arc<CrawlQueue<CrawlTask>>,
    page_queue: Arc<CrawlQueue<Page>>,
    shutdown: watch::Receiver<bool>,
}

impl<S: Storage> PersistenceManager<S> {
    pub fn new(
        config: Arc<Config>,
        storage: Arc<Mutex<S>>,
        task_queue: Arc<CrawlQueue<CrawlTask>>,
        page_queue: Arc<CrawlQueue<Page>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            storage,
            task_queue,
            page_queue,
            shutdown,
        }
    }

    /// Runs the flush loop until shutdown, then drains whatever is left.
    pub async fn run(mut self) {
        info!("persistence manager started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let sleep_ms = if self.should_flush() {
                match self.flush_batch() {
                    Ok(persisted) => {
                        debug!("persisted batch of {} pages", persisted);
                        0
                    }
                    Err(e) => {
                        warn!("batch flush failed: {}", e);
                        self.config.crawler.error_cooldown_ms
                    }
                }
            } else {
                self.config.crawler.persist_poll_ms
            };

            if sleep_ms > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {}
                    _ = self.shutdown.changed() => break,
                }
            }
        }

        self.flush_all();
        info!("persistence manager stopped");
    }

    /// Flush when a full batch is ready, or when the fetch pipeline is
    /// starved and holding results back would stall the crawl loop
    /// (discovered links only become tasks at flush time).
    fn should_flush(&self) -> bool {
        let pages = self.page_queue.len();
        if pages == 0 {
            return false;
        }

        let batch_size = self.config.crawler.batch_size;
        pages >= batch_size || self.task_queue.len() < batch_size
    }

    /// Persists one batch. A failure in any sub-step puts the drained
    /// pages back on the queue and surfaces as an error, so the caller
    /// backs off and the whole batch is retried later; the sub-steps are
    /// idempotent, so replaying the already-written part is safe.
    fn flush_batch(&self) -> Result<usize, crate::storage::StorageError> {
        let pages = self.page_queue.drain(self.config.crawler.batch_size);
        if pages.is_empty() {
            return Ok(0);
        }

        let discovered = collect_discovered_urls(&pages);
        let satisfied = collect_satisfied_urls(&pages);

        let mut storage = self.storage.lock().expect("storage mutex poisoned");
        let result = write_batch(&mut *storage, &pages, &discovered, &satisfied);
        drop(storage);

        match result {
            Ok(()) => Ok(pages.len()),
            Err(e) => {
                for page in pages {
                    self.page_queue.push(page);
                }
                Err(e)
            }
        }
    }

    /// Best-effort drain of everything still queued, used at shutdown.
    fn flush_all(&self) {
        while !self.page_queue.is_empty() {
            match self.flush_batch() {
                Ok(persisted) => info!("final flush persisted {} pages", persisted),
                Err(e) => {
                    warn!("final flush failed, abandoning {} pages: {}", self.page_queue.len(), e);
                    break;
                }
            }
        }
    }
}

/// The three store writes of one flush: upsert pages, seed tasks for the
/// links they contained, retire the tasks they satisfied.
fn write_batch<S: Storage>(
    storage: &mut S,
    pages: &[Page],
    discovered: &[String],
    satisfied: &[String],
) -> Result<(), crate::storage::StorageError> {
    storage.upsert_pages(pages)?;

    let created = storage.insert_new_tasks(discovered)?;
    if created > 0 {
        debug!("created {} new tasks", created);
    }

    let removed = storage.remove_tasks(satisfied)?;
    if removed > 0 {
        debug!("removed {} completed tasks", removed);
    }

    Ok(())
}

/// Unique link targets across a batch, in first-seen order.
fn collect_discovered_urls(pages: &[Page]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for page in pages {
        for url in &page.extracted_urls {
            if seen.insert(url.as_str()) {
                urls.push(url.clone());
            }
        }
    }

    urls
}

/// Task URLs a batch satisfies. A redirected page satisfies the task for
/// the originally requested URL as well as its final one.
fn collect_satisfied_urls(pages: &[Page]) -> Vec<String> {
    let mut urls = Vec::new();

    for page in pages {
        urls.push(page.url.clone());
        if let Some(redirect_url) = &page.redirect_url {
            urls.push(redirect_url.clone());
        }
    }

    urls
}
