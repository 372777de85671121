//! Data model for crawl records
//!
//! These are the value types that flow through the pipeline and into the
//! store: persistent `Page` and `CrawlTask` records, the transient
//! `FetchOutcome` handed from the fetch pool to the parse pool, and the
//! `ImageRef` entries embedded in a page.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed ISO-8601 UTC timestamp format used for all `last_fetched` and
/// `last_attempted` fields
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Returns the current time formatted with [`TIMESTAMP_FORMAT`]
pub fn utc_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Status of a crawl task
///
/// The core loop only ever creates `Pending` tasks and deletes them when
/// the corresponding page persists; the remaining states are kept in the
/// schema for forward compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A unit of frontier work: one URL awaiting fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlTask {
    pub url: String,
    pub status: TaskStatus,
    pub attempts: u32,
    pub last_attempted: Option<String>,
    pub error_message: Option<String>,
}

impl CrawlTask {
    /// Creates a fresh pending task for a discovered URL
    pub fn pending(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: TaskStatus::Pending,
            attempts: 0,
            last_attempted: None,
            error_message: None,
        }
    }
}

/// A reference to an image found on a page
///
/// `width`/`height` are present only when the source attribute was a valid
/// non-negative integer. `file_size`/`format` are back-filled by the
/// HEAD-based sizing pass, not during the crawl itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub last_fetched: Option<String>,
}

/// The durable, persisted result of successfully fetching and extracting
/// one URL
///
/// Keyed by `url` in the store. For a redirected fetch, `url` is the final
/// URL the chain resolved to and `redirect_url` is the originally
/// requested URL, so the Page records where it was redirected from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    pub redirected: bool,
    pub redirect_url: Option<String>,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    /// Visible text with script/style/nav/chrome elements removed
    pub text_content: Option<String>,
    /// Ordered, duplicates allowed; deduplication happens at persistence
    pub extracted_urls: Vec<String>,
    pub image_data: Vec<ImageRef>,
    /// All `<meta name|property, content>` pairs, last writer wins
    pub metadata: HashMap<String, String>,
    pub last_fetched: Option<String>,
}

/// The transient result of a successful fetch, awaiting extraction
///
/// Lives only on the queue between the fetch and parse pools; never
/// persisted.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Final URL the fetch resolved to
    pub url: String,
    pub redirected: bool,
    /// Originally requested URL, when the fetch was redirected
    pub redirect_url: Option<String>,
    pub status: u16,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_roundtrip() {
        for status in &[
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            let db_str = status.to_db_string();
            assert_eq!(Some(*status), TaskStatus::from_db_string(db_str));
        }
    }

    #[test]
    fn test_task_status_invalid() {
        assert_eq!(TaskStatus::from_db_string("unknown"), None);
    }

    #[test]
    fn test_pending_task_defaults() {
        let task = CrawlTask::pending("https://example.com/");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.attempts, 0);
        assert!(task.last_attempted.is_none());
        assert!(task.error_message.is_none());
    }

    #[test]
    fn test_timestamp_format() {
        let ts = utc_timestamp();
        // e.g. 2026-08-30T12:34:56
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], "T");
    }

    #[test]
    fn test_page_serializes_across_process_boundary() {
        let page = Page {
            url: "https://example.com/".to_string(),
            redirected: false,
            redirect_url: None,
            title: Some("Example".to_string()),
            meta_description: None,
            text_content: Some("hello".to_string()),
            extracted_urls: vec!["https://example.com/a".to_string()],
            image_data: vec![],
            metadata: HashMap::new(),
            last_fetched: Some(utc_timestamp()),
        };

        let json = serde_json::to_string(&page).unwrap();
        let back: Page = serde_json::from_str(&json).unwrap();
        assert_eq!(back.url, page.url);
        assert_eq!(back.title, page.title);
        assert_eq!(back.extracted_urls, page.extracted_urls);
    }
}
