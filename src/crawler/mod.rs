//! Crawling pipeline
//!
//! The pipeline is a closed loop of independent tokio tasks connected by
//! in-process queues:
//!
//! ```text
//! store -> frontier -> Task Queue -> fetch pool -> Fetch Result Queue
//!       -> parse pool -> Page Queue -> persistence -> store
//! ```
//!
//! Submodules:
//! - `frontier`: sources and dedups work from the durable task table
//! - `fetcher`: HTTP client and bounded manual redirect handling
//! - `workers`: the fetch and parse worker pools
//! - `extractor`: HTML parsing into structured page data
//! - `persistence`: batched writes that close the loop
//! - `coordinator`: spawns and supervises all of the above
//! - `sizing`: offline image file-size backfill

pub mod coordinator;
pub mod extractor;
pub mod fetcher;
pub mod frontier;
pub mod persistence;
pub mod sizing;
pub mod workers;

pub use coordinator::{run_crawl, Coordinator, ShutdownHandle};
pub use extractor::{extract, Extraction};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use frontier::FrontierManager;
pub use persistence::PersistenceManager;
pub use sizing::{run_sizing_pass, SizingReport};
