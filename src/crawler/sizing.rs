//! Image sizing pass
//!
//! Crawled pages record image references with whatever dimensions the
//! markup declared, but not the file size on disk. This pass walks pages
//! whose images lack a size, issues HEAD requests, and backfills
//! `file_size` and `format` from the response headers. It is an offline
//! maintenance operation, run on demand rather than during the crawl.

use crate::config::Config;
use crate::crawler::fetcher::build_http_client;
use crate::storage::{SqliteStorage, Storage};
use crate::SpindleError;
use reqwest::Client;
use std::path::Path;
use tracing::{debug, info, warn};

/// Pages examined per store read.
const SIZING_PAGE_LIMIT: usize = 100;

/// Outcome of a sizing pass
#[derive(Debug, Default)]
pub struct SizingReport {
    pub pages_examined: usize,
    pub images_sized: usize,
    pub images_failed: usize,
}

/// Backfills image file sizes for every page that needs them.
pub async fn run_sizing_pass(config: Config) -> Result<SizingReport, SpindleError> {
    let storage_path = Path::new(&config.storage.database_path);
    let mut storage = SqliteStorage::new(storage_path)?;
    let client = build_http_client()?;

    let mut report = SizingReport::default();
    let mut cursor: Option<String> = None;

    loop {
        let pages = storage.pages_with_unsized_images(cursor.as_deref(), SIZING_PAGE_LIMIT)?;
        let Some(last) = pages.last() else {
            break;
        };

        // Keyset cursor, so pages whose images fail to size are stepped
        // past rather than revisited.
        cursor = Some(last.url.clone());

        for page in pages {
            report.pages_examined += 1;

            for image in page.image_data.iter().filter(|i| i.file_size.is_none()) {
                match head_image(&client, &image.url).await {
                    Some((file_size, format)) => {
                        storage.update_image_sizing(
                            &page.url,
                            &image.url,
                            file_size,
                            format.as_deref(),
                        )?;
                        report.images_sized += 1;
                    }
                    None => {
                        debug!("could not size image {}", image.url);
                        report.images_failed += 1;
                    }
                }
            }
        }
    }

    info!(
        "sizing pass complete: {} pages, {} images sized, {} failed",
        report.pages_examined, report.images_sized, report.images_failed
    );

    Ok(report)
}

/// HEAD request for one image. Returns the content length and a short
/// format name when the server reports them.
async fn head_image(client: &Client, url: &str) -> Option<(u64, Option<String>)> {
    let response = match client.head(url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("HEAD {} failed: {}", url, e);
            return None;
        }
    };

    if !response.status().is_success() {
        return None;
    }

    let format = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .and_then(image_format_from);

    response.content_length().map(|size| (size, format))
}

/// "image/png" → "png"; parameters and vendor prefixes stripped.
fn image_format_from(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let format = essence.strip_prefix("image/")?;

    let format = format.strip_prefix("x-").unwrap_or(format);
    if format.is_empty() {
        None
    } else {
        Some(format.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_format_from_content_type() {
        assert_eq!(image_format_from("image/png"), Some("png".to_string()));
        assert_eq!(
            image_format_from("image/jpeg; charset=binary"),
            Some("jpeg".to_string())
        );
        assert_eq!(image_format_from("image/x-icon"), Some("icon".to_string()));
        assert_eq!(image_format_from("IMAGE/GIF"), Some("gif".to_string()));
        assert_eq!(image_format_from("text/html"), None);
        assert_eq!(image_format_from(""), None);
    }
}
