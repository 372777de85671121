//! Crawl orchestration
//!
//! The coordinator wires the pipeline together: it opens the store,
//! builds the shared HTTP client and the three in-process queues, then
//! spawns the frontier loop, the fetch and parse pools, and the
//! persistence loop as tokio tasks. It owns the shutdown channel; on
//! ctrl-c every loop winds down cooperatively and the persistence
//! manager drains what is left of the Page Queue before exit.

use crate::config::Config;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::frontier::FrontierManager;
use crate::crawler::persistence::PersistenceManager;
use crate::crawler::workers::{run_fetch_worker, run_parse_worker};
use crate::model::{CrawlTask, FetchOutcome, Page};
use crate::queue::CrawlQueue;
use crate::storage::SqliteStorage;
use crate::SpindleError;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: Arc<Mutex<SqliteStorage>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Handle for requesting shutdown from outside the crawl loop.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

impl Coordinator {
    /// Opens the store and prepares the pipeline.
    pub fn new(config: Config) -> Result<Self, SpindleError> {
        let storage_path = Path::new(&config.storage.database_path);
        let storage = SqliteStorage::new(storage_path)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            storage: Arc::new(Mutex::new(storage)),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        })
    }

    /// Handle that triggers the same wind-down as ctrl-c.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Runs the crawl until ctrl-c or an external shutdown request.
    pub async fn run(self) -> Result<(), SpindleError> {
        let client = build_http_client()?;

        let task_queue: Arc<CrawlQueue<CrawlTask>> = Arc::new(CrawlQueue::new());
        let result_queue: Arc<CrawlQueue<FetchOutcome>> = Arc::new(CrawlQueue::new());
        let page_queue: Arc<CrawlQueue<Page>> = Arc::new(CrawlQueue::new());

        let fetch_workers = self.config.crawler.effective_fetch_workers();
        let parse_workers = self.config.crawler.effective_parse_workers();
        info!(
            "starting crawl: {} fetch workers, {} parse workers, batch size {}",
            fetch_workers, parse_workers, self.config.crawler.batch_size
        );

        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        let frontier = FrontierManager::new(
            Arc::clone(&self.config),
            Arc::clone(&self.storage),
            Arc::clone(&task_queue),
            self.shutdown_rx.clone(),
        );
        handles.push(tokio::spawn(frontier.run()));

        for worker_id in 0..fetch_workers {
            handles.push(tokio::spawn(run_fetch_worker(
                worker_id,
                Arc::clone(&self.config),
                client.clone(),
                Arc::clone(&task_queue),
                Arc::clone(&result_queue),
                self.shutdown_rx.clone(),
            )));
        }

        for worker_id in 0..parse_workers {
            handles.push(tokio::spawn(run_parse_worker(
                worker_id,
                Arc::clone(&self.config),
                Arc::clone(&result_queue),
                Arc::clone(&page_queue),
                self.shutdown_rx.clone(),
            )));
        }

        let persistence = PersistenceManager::new(
            Arc::clone(&self.config),
            Arc::clone(&self.storage),
            Arc::clone(&task_queue),
            Arc::clone(&page_queue),
            self.shutdown_rx.clone(),
        );
        handles.push(tokio::spawn(persistence.run()));

        // Park until someone asks us to stop.
        let mut shutdown_rx = self.shutdown_rx.clone();
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("interrupt received, shutting down"),
                    Err(e) => error!("failed to listen for interrupt: {}", e),
                }
                let _ = self.shutdown_tx.send(true);
            }
            _ = shutdown_rx.changed() => {
                info!("shutdown requested");
            }
        }

        // The persistence manager runs its final flush as part of its
        // own wind-down, so joining everything covers it.
        for handle in handles {
            let _ = handle.await;
        }

        info!("crawl stopped");
        Ok(())
    }
}

/// Loads the store and runs the crawl until interrupted.
pub async fn run_crawl(config: Config) -> Result<(), SpindleError> {
    let coordinator = Coordinator::new(config)?;
    coordinator.run().await
}
