use serde::Deserialize;

/// Main configuration structure for Spindle
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seed URLs used when the store holds no pending tasks
    #[serde(default)]
    pub start_urls: Vec<String>,

    pub crawler: CrawlerConfig,

    pub storage: StorageConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent fetch workers
    #[serde(alias = "threads", default = "default_fetch_workers")]
    pub fetch_workers: usize,

    /// Number of concurrent parse workers
    #[serde(default = "default_parse_workers")]
    pub parse_workers: usize,

    /// Horizontal scaling multiplier applied to both pool sizes
    #[serde(
        alias = "multiprocess",
        alias = "multiprocess_for_threads",
        default = "default_scale_factor"
    )]
    pub scale_factor: usize,

    /// Number of pages persisted per batch; also the queue-depth threshold
    /// for frontier backpressure and the persistence starvation trigger
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Frontier re-poll delay while the task queue is shallow (ms)
    #[serde(default = "default_frontier_poll_ms")]
    pub frontier_poll_ms: u64,

    /// Frontier re-poll delay while the task queue is saturated (ms)
    #[serde(default = "default_frontier_backoff_ms")]
    pub frontier_backoff_ms: u64,

    /// Cooldown after a store error in any manager loop (ms)
    #[serde(default = "default_error_cooldown_ms")]
    pub error_cooldown_ms: u64,

    /// Persistence manager poll interval (ms)
    #[serde(default = "default_persist_poll_ms")]
    pub persist_poll_ms: u64,

    /// How long a worker blocks waiting for a queue item before idling (ms)
    #[serde(default = "default_queue_wait_ms")]
    pub queue_wait_ms: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            fetch_workers: default_fetch_workers(),
            parse_workers: default_parse_workers(),
            scale_factor: default_scale_factor(),
            batch_size: default_batch_size(),
            frontier_poll_ms: default_frontier_poll_ms(),
            frontier_backoff_ms: default_frontier_backoff_ms(),
            error_cooldown_ms: default_error_cooldown_ms(),
            persist_poll_ms: default_persist_poll_ms(),
            queue_wait_ms: default_queue_wait_ms(),
        }
    }
}

impl CrawlerConfig {
    /// Effective fetch pool size after horizontal scaling
    pub fn effective_fetch_workers(&self) -> usize {
        self.fetch_workers * self.scale_factor.max(1)
    }

    /// Effective parse pool size after horizontal scaling
    pub fn effective_parse_workers(&self) -> usize {
        self.parse_workers * self.scale_factor.max(1)
    }
}

fn default_fetch_workers() -> usize {
    16
}

fn default_parse_workers() -> usize {
    8
}

fn default_scale_factor() -> usize {
    1
}

fn default_batch_size() -> usize {
    100
}

fn default_frontier_poll_ms() -> u64 {
    1_000
}

fn default_frontier_backoff_ms() -> u64 {
    30_000
}

fn default_error_cooldown_ms() -> u64 {
    60_000
}

fn default_persist_poll_ms() -> u64 {
    1_000
}

fn default_queue_wait_ms() -> u64 {
    30_000
}
