//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client
//! - GET requests with bounded manual redirect following
//! - Content-Type filtering
//! - Error classification

use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched an HTML document
    Html {
        /// Final URL after any redirects followed during this fetch
        final_url: String,
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
        /// Original requested URL when the document was reached via redirect
        redirected_from: Option<String>,
    },

    /// Redirect whose target was not followed (hop budget exhausted)
    Redirect {
        /// Absolute redirect target
        location: String,
    },

    /// Response is not an HTML document
    NotHtml {
        /// The Content-Type received
        content_type: String,
    },

    /// Non-success HTTP status
    HttpError {
        /// The HTTP status code
        status: u16,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Builds the shared HTTP client
///
/// Redirects are handled manually so that redirect attribution can be
/// recorded on the resulting page. The user agent mimics a desktop
/// browser since many sites serve stripped content to unknown agents.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let user_agent = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true for Content-Type values the parser can handle.
pub fn is_html_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.starts_with("text/html")
        || ct.starts_with("application/xhtml")
        || ct.starts_with("application/xml")
        || ct.contains("text/")
}

/// Fetches a URL, following up to `max_hops` redirects in-place.
///
/// When the hop budget runs out while the response is still a redirect,
/// the unfollowed target is returned as [`FetchResult::Redirect`] so the
/// caller can decide whether to reissue the fetch.
pub async fn fetch_url(client: &Client, url: &str, max_hops: usize) -> FetchResult {
    let original_url = url.to_string();
    let mut current_url = url.to_string();
    let mut hops = 0;

    loop {
        let response = match client.get(&current_url).send().await {
            Ok(response) => response,
            Err(e) => return classify_network_error(e),
        };

        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let Some(location) = location else {
                return FetchResult::HttpError {
                    status: status.as_u16(),
                };
            };

            // Relative Location headers resolve against the URL that
            // produced them, not the original request.
            let target = match Url::parse(&current_url)
                .ok()
                .and_then(|base| base.join(&location).ok())
            {
                Some(target) => target.to_string(),
                None => {
                    return FetchResult::NetworkError {
                        error: format!("unresolvable redirect target: {}", location),
                    }
                }
            };

            if hops >= max_hops {
                return FetchResult::Redirect { location: target };
            }

            hops += 1;
            current_url = target;
            continue;
        }

        if !status.is_success() {
            return FetchResult::HttpError {
                status: status.as_u16(),
            };
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html_content_type(&content_type) {
            return FetchResult::NotHtml { content_type };
        }

        let final_url = response.url().to_string();
        let redirected_from = if current_url != original_url || final_url != original_url {
            Some(original_url.clone())
        } else {
            None
        };

        return match response.text().await {
            Ok(body) => FetchResult::Html {
                final_url,
                status: status.as_u16(),
                body,
                redirected_from,
            },
            Err(e) => FetchResult::NetworkError {
                error: e.to_string(),
            },
        };
    }
}

fn classify_network_error(e: reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::NetworkError {
            error: "request timeout".to_string(),
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: "connection refused".to_string(),
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client().is_ok());
    }

    #[test]
    fn test_html_content_type_detection() {
        assert!(is_html_content_type("text/html"));
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("application/xhtml+xml"));
        assert!(is_html_content_type("TEXT/HTML"));
        assert!(!is_html_content_type("application/pdf"));
        assert!(!is_html_content_type("image/png"));
        assert!(!is_html_content_type("application/json"));
    }

    #[tokio::test]
    async fn test_fetch_plain_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body>hi</body></html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let url = format!("{}/", server.uri());
        match fetch_url(&client, &url, 1).await {
            FetchResult::Html {
                status,
                redirected_from,
                ..
            } => {
                assert_eq!(status, 200);
                assert!(redirected_from.is_none());
            }
            other => panic!("expected Html, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_follows_one_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/b"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html></html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let url = format!("{}/a", server.uri());
        match fetch_url(&client, &url, 1).await {
            FetchResult::Html {
                final_url,
                redirected_from,
                ..
            } => {
                assert_eq!(final_url, format!("{}/b", server.uri()));
                assert_eq!(redirected_from, Some(url));
            }
            other => panic!("expected Html, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_returns_unfollowed_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/b"))
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let url = format!("{}/a", server.uri());
        match fetch_url(&client, &url, 0).await {
            FetchResult::Redirect { location } => {
                assert_eq!(location, format!("{}/b", server.uri()));
            }
            other => panic!("expected Redirect, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"))
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let url = format!("{}/doc.pdf", server.uri());
        match fetch_url(&client, &url, 1).await {
            FetchResult::NotHtml { content_type } => {
                assert_eq!(content_type, "application/pdf");
            }
            other => panic!("expected NotHtml, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_reports_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let url = format!("{}/missing", server.uri());
        match fetch_url(&client, &url, 1).await {
            FetchResult::HttpError { status } => assert_eq!(status, 404),
            other => panic!("expected HttpError, got {:?}", other),
        }
    }
}
