//! Fetch and parse worker pools
//!
//! Fetch workers turn pending tasks into raw HTTP outcomes; parse workers
//! turn outcomes into structured page records. Both run as plain loops
//! popping from their input queue with a bounded wait, so an idle queue
//! just means another wait, never an error. A failed URL is dropped for
//! the cycle; its durable task record stays behind and the frontier
//! redelivers it later.

use crate::config::Config;
use crate::crawler::extractor::extract;
use crate::crawler::fetcher::{fetch_url, FetchResult};
use crate::model::{utc_timestamp, CrawlTask, FetchOutcome, Page};
use crate::queue::CrawlQueue;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

/// Runs one fetch worker until shutdown.
pub async fn run_fetch_worker(
    worker_id: usize,
    config: Arc<Config>,
    client: Client,
    task_queue: Arc<CrawlQueue<CrawlTask>>,
    result_queue: Arc<CrawlQueue<FetchOutcome>>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!("fetch worker {} started", worker_id);
    let wait = Duration::from_millis(config.crawler.queue_wait_ms);

    loop {
        if *shutdown.borrow() {
            break;
        }

        let task = tokio::select! {
            task = task_queue.pop_timeout(wait) => task,
            _ = shutdown.changed() => break,
        };

        let Some(task) = task else {
            continue;
        };

        if let Some(outcome) = fetch_task(&client, &task.url).await {
            result_queue.push(outcome);
        }
    }

    debug!("fetch worker {} stopped", worker_id);
}

/// Fetches one task URL, reissuing at most once when the server answers
/// with an unfollowed redirect. Returns `None` when the URL produced
/// nothing worth parsing.
async fn fetch_task(client: &Client, url: &str) -> Option<FetchOutcome> {
    match fetch_url(client, url, 1).await {
        FetchResult::Redirect { location } => {
            debug!("following redirect {} -> {}", url, location);
            match fetch_url(client, &location, 1).await {
                FetchResult::Html {
                    final_url,
                    status,
                    body,
                    ..
                } => Some(FetchOutcome {
                    url: final_url,
                    redirected: true,
                    redirect_url: Some(url.to_string()),
                    status,
                    body,
                }),
                other => {
                    log_dropped_fetch(&location, &other);
                    None
                }
            }
        }
        FetchResult::Html {
            final_url,
            status,
            body,
            redirected_from,
        } => Some(FetchOutcome {
            url: final_url,
            redirected: redirected_from.is_some(),
            redirect_url: redirected_from,
            status,
            body,
        }),
        other => {
            log_dropped_fetch(url, &other);
            None
        }
    }
}

fn log_dropped_fetch(url: &str, result: &FetchResult) {
    match result {
        FetchResult::NotHtml { content_type } => {
            debug!("skipping non-html {} ({})", url, content_type);
        }
        FetchResult::HttpError { status } => {
            info!("fetch of {} returned status {}", url, status);
        }
        FetchResult::NetworkError { error } => {
            warn!("fetch of {} failed: {}", url, error);
        }
        FetchResult::Redirect { location } => {
            info!("abandoning redirect chain at {} -> {}", url, location);
        }
        FetchResult::Html { .. } => {}
    }
}

/// Runs one parse worker until shutdown.
pub async fn run_parse_worker(
    worker_id: usize,
    config: Arc<Config>,
    result_queue: Arc<CrawlQueue<FetchOutcome>>,
    page_queue: Arc<CrawlQueue<Page>>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!("parse worker {} started", worker_id);
    let wait = Duration::from_millis(config.crawler.queue_wait_ms);

    loop {
        if *shutdown.borrow() {
            break;
        }

        let outcome = tokio::select! {
            outcome = result_queue.pop_timeout(wait) => outcome,
            _ = shutdown.changed() => break,
        };

        let Some(outcome) = outcome else {
            continue;
        };

        if let Some(page) = build_page(outcome) {
            page_queue.push(page);
        }
    }

    debug!("parse worker {} stopped", worker_id);
}

/// Parses one fetch outcome into a Page record.
///
/// Only status 200 bodies are parsed; anything else was queued in error
/// and is dropped here. Pages that extract to nothing are dropped too.
fn build_page(outcome: FetchOutcome) -> Option<Page> {
    if outcome.status != 200 {
        debug!(
            "dropping outcome for {} with status {}",
            outcome.url, outcome.status
        );
        return None;
    }

    let base_url = match Url::parse(&outcome.url) {
        Ok(url) => url,
        Err(e) => {
            warn!("unparseable outcome url {}: {}", outcome.url, e);
            return None;
        }
    };

    let extraction = extract(&outcome.body, &base_url)?;

    Some(Page {
        url: outcome.url,
        redirected: outcome.redirected,
        redirect_url: outcome.redirect_url,
        title: extraction.title,
        meta_description: extraction.meta_description,
        text_content: extraction.text_content,
        extracted_urls: extraction.links,
        image_data: extraction.images,
        metadata: extraction.metadata,
        last_fetched: Some(utc_timestamp()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::build_http_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn html_outcome(url: &str, status: u16, body: &str) -> FetchOutcome {
        FetchOutcome {
            url: url.to_string(),
            redirected: false,
            redirect_url: None,
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_build_page_from_ok_outcome() {
        let outcome = html_outcome(
            "https://example.com/",
            200,
            r#"<html><head><title>T</title></head><body><a href="/next">n</a></body></html>"#,
        );

        let page = build_page(outcome).unwrap();
        assert_eq!(page.url, "https://example.com/");
        assert_eq!(page.title, Some("T".to_string()));
        assert_eq!(page.extracted_urls, vec!["https://example.com/next"]);
        assert!(page.last_fetched.is_some());
        assert!(!page.redirected);
    }

    #[test]
    fn test_build_page_rejects_non_200() {
        let outcome = html_outcome("https://example.com/", 500, "<html><body>err</body></html>");
        assert!(build_page(outcome).is_none());
    }

    #[test]
    fn test_build_page_keeps_redirect_attribution() {
        let mut outcome = html_outcome(
            "https://example.com/final",
            200,
            "<html><head><title>T</title></head><body>x</body></html>",
        );
        outcome.redirected = true;
        outcome.redirect_url = Some("https://example.com/original".to_string());

        let page = build_page(outcome).unwrap();
        assert!(page.redirected);
        assert_eq!(
            page.redirect_url,
            Some("https://example.com/original".to_string())
        );
    }

    #[test]
    fn test_build_page_drops_empty_extraction() {
        let outcome = html_outcome("https://example.com/", 200, "<html><body></body></html>");
        assert!(build_page(outcome).is_none());
    }

    #[tokio::test]
    async fn test_fetch_task_reissues_one_redirect_hop() {
        let server = MockServer::start().await;
        // Two hops: the client follows the first in-place, the worker
        // reissues once for the second.
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/b"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/c"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/c"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body>done</body></html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let url = format!("{}/a", server.uri());
        let outcome = fetch_task(&client, &url).await.unwrap();

        assert_eq!(outcome.url, format!("{}/c", server.uri()));
        assert!(outcome.redirected);
        assert_eq!(outcome.redirect_url, Some(url));
    }
}
