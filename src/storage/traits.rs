//! Storage traits and error types
//!
//! The durable store is an external collaborator: two collections keyed by
//! URL, supporting point lookups, bulk upserts, bulk deletes, and
//! count-based existence checks. It provides per-document atomicity only;
//! every bulk operation here is individually idempotent so a retried
//! batch is safe.

use crate::model::{CrawlTask, Page};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Implementations back two collections: `webpages` (page records keyed by
/// URL) and `crawl_tasks` (frontier work keyed by URL).
pub trait Storage {
    // ===== Task Management =====

    /// Reads up to `limit` pending tasks, ordered by URL
    fn pending_tasks(&self, limit: usize) -> StorageResult<Vec<CrawlTask>>;

    /// Whether a URL exists as a task of any status
    fn task_exists(&self, url: &str) -> StorageResult<bool>;

    /// Bulk-inserts pending tasks for URLs not already known
    ///
    /// A URL is skipped when it is already a task, a stored page's `url`,
    /// or a stored page's `redirect_url`. Duplicate-key races with a
    /// concurrent insert are tolerated, not fatal. Returns the number of
    /// tasks actually created.
    fn insert_new_tasks(&mut self, urls: &[String]) -> StorageResult<usize>;

    /// Bulk-deletes tasks by URL, returning the number removed
    fn remove_tasks(&mut self, urls: &[String]) -> StorageResult<usize>;

    /// Counts tasks, optionally restricted to one status
    fn count_tasks(&self, status: Option<crate::model::TaskStatus>) -> StorageResult<u64>;

    // ===== Page Management =====

    /// Whether a URL is already covered by a stored page
    ///
    /// Matches both a page's `url` and its declared `redirect_url`, so a
    /// redirected fetch is never re-offered under its original URL.
    fn page_exists(&self, url: &str) -> StorageResult<bool>;

    /// Point lookup of a page by its `url` key
    fn get_page(&self, url: &str) -> StorageResult<Option<Page>>;

    /// Bulk-upserts pages keyed by `url`: insert if absent, else replace
    /// fields. Idempotent under redelivery.
    fn upsert_pages(&mut self, pages: &[Page]) -> StorageResult<()>;

    /// Total page count
    fn count_pages(&self) -> StorageResult<u64>;

    // ===== Image Sizing Support =====

    /// Pages holding at least one ImageRef without a `file_size`,
    /// ordered by URL
    ///
    /// `after_url` is an exclusive keyset cursor: only pages with a
    /// strictly greater URL are returned, so a caller can page through
    /// the whole table even when some images stay unsized.
    fn pages_with_unsized_images(
        &self,
        after_url: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<Page>>;

    /// Writes back `file_size`/`format` for one image on one page
    fn update_image_sizing(
        &mut self,
        page_url: &str,
        image_url: &str,
        file_size: u64,
        format: Option<&str>,
    ) -> StorageResult<()>;
}
