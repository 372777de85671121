//! Durable store for crawled pages and the task frontier
//!
//! The crawler talks to the store through the [`Storage`] trait so the
//! pipeline stays backend-agnostic. [`SqliteStorage`] is the shipped
//! implementation; it keeps two tables, `webpages` for fetched documents
//! and `crawl_tasks` for the pending frontier, both keyed by URL.

mod schema;
mod sqlite;
mod traits;

pub use schema::initialize_schema;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};
