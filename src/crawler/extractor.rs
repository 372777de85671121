//! HTML content extraction
//!
//! This module parses fetched HTML and pulls out everything the crawler
//! records about a page:
//! - Links to follow (from <a> tags)
//! - Page title and meta description
//! - Other <meta> tags as a name/value map
//! - Image references with their inline attributes
//! - Visible text content with boilerplate containers stripped

use crate::model::{utc_timestamp, ImageRef};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Content of `<meta name="description">`
    pub meta_description: Option<String>,

    /// Remaining named meta tags, last writer wins on duplicates
    pub metadata: HashMap<String, String>,

    /// All followable links on the page (absolute URLs)
    pub links: Vec<String>,

    /// Image references found on the page
    pub images: Vec<ImageRef>,

    /// Visible text with script/style/navigation containers removed
    pub text_content: Option<String>,
}

/// Parses HTML content and extracts everything worth storing.
///
/// Returns `None` when the document yields nothing usable at all, which
/// lets callers drop empty shells without persisting them.
pub fn extract(html: &str, base_url: &Url) -> Option<Extraction> {
    let document = Html::parse_document(html);

    let extraction = Extraction {
        title: extract_title(&document),
        meta_description: extract_meta_description(&document),
        metadata: extract_metadata(&document),
        links: extract_links(&document, base_url),
        images: extract_images(&document, base_url),
        text_content: extract_text(&document),
    };

    let empty = extraction.title.is_none()
        && extraction.text_content.is_none()
        && extraction.links.is_empty()
        && extraction.images.is_empty();

    if empty {
        None
    } else {
        Some(extraction)
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_meta_description(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name='description'][content]").ok()?;

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collects all named and OpenGraph-style meta tags into a map. The
/// description appears here as well as in its dedicated field.
fn extract_metadata(document: &Html) -> HashMap<String, String> {
    let mut metadata = HashMap::new();

    for (selector_str, key_attr) in [
        ("meta[name][content]", "name"),
        ("meta[property][content]", "property"),
    ] {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };

        for element in document.select(&selector) {
            let key = element.value().attr(key_attr).unwrap_or("").trim();
            let content = element.value().attr("content").unwrap_or("").trim();

            if key.is_empty() || content.is_empty() {
                continue;
            }

            metadata.insert(key.to_string(), content.to_string());
        }
    }

    metadata
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

fn extract_images(document: &Html, base_url: &Url) -> Vec<ImageRef> {
    let mut images = Vec::new();

    if let Ok(selector) = Selector::parse("img[src]") {
        for element in document.select(&selector) {
            let Some(src) = element.value().attr("src") else {
                continue;
            };

            let src = src.trim();
            if src.is_empty() || src.starts_with("data:") {
                continue;
            }

            let Ok(absolute) = base_url.join(src) else {
                continue;
            };
            if absolute.scheme() != "http" && absolute.scheme() != "https" {
                continue;
            }

            let attr = |name: &str| {
                element
                    .value()
                    .attr(name)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };

            images.push(ImageRef {
                url: absolute.to_string(),
                alt_text: attr("alt"),
                title: attr("title"),
                width: attr("width").and_then(|w| w.parse().ok()),
                height: attr("height").and_then(|h| h.parse().ok()),
                file_size: None,
                format: None,
                last_fetched: Some(utc_timestamp()),
            });
        }
    }

    images
}

/// Containers whose text is navigation or chrome rather than content.
const SKIPPED_CONTAINERS: &[&str] = &[
    "script", "style", "header", "footer", "nav", "aside", "form", "noscript",
];

/// Collects visible text, walking the tree and skipping boilerplate
/// containers wholesale.
fn extract_text(document: &Html) -> Option<String> {
    let body_selector = Selector::parse("body").ok()?;
    let body = document.select(&body_selector).next()?;

    let mut chunks: Vec<String> = Vec::new();
    collect_text(body, &mut chunks);

    let text = chunks.join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn collect_text(element: ElementRef<'_>, chunks: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            }
            Node::Element(el) => {
                if SKIPPED_CONTAINERS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, chunks);
                }
            }
            _ => {}
        }
    }
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only anchors
/// - Invalid or non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_extract_title() {
        let html = r#"<html><head><title>Test Page</title></head><body>x</body></html>"#;
        let extraction = extract(html, &base_url()).unwrap();
        assert_eq!(extraction.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_extract_title_with_whitespace() {
        let html = r#"<html><head><title>  Test Page  </title></head><body>x</body></html>"#;
        let extraction = extract(html, &base_url()).unwrap();
        assert_eq!(extraction.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_extract_meta_description() {
        let html = r#"<html><head><meta name="description" content="A page."></head><body>x</body></html>"#;
        let extraction = extract(html, &base_url()).unwrap();
        assert_eq!(extraction.meta_description, Some("A page.".to_string()));
    }

    #[test]
    fn test_metadata_map_carries_all_meta_tags() {
        let html = r#"
            <html><head>
                <meta name="description" content="A page.">
                <meta name="author" content="Someone">
                <meta name="keywords" content="one,two">
                <meta property="og:title" content="Shared title">
            </head><body>x</body></html>
        "#;
        let extraction = extract(html, &base_url()).unwrap();
        assert_eq!(extraction.metadata.get("author"), Some(&"Someone".to_string()));
        assert_eq!(
            extraction.metadata.get("keywords"),
            Some(&"one,two".to_string())
        );
        assert_eq!(
            extraction.metadata.get("og:title"),
            Some(&"Shared title".to_string())
        );
        // Description lands in the map alongside its dedicated field.
        assert_eq!(
            extraction.metadata.get("description"),
            Some(&"A page.".to_string())
        );
    }

    #[test]
    fn test_metadata_last_writer_wins() {
        let html = r#"
            <html><head>
                <meta name="author" content="First">
                <meta name="author" content="Second">
            </head><body>x</body></html>
        "#;
        let extraction = extract(html, &base_url()).unwrap();
        assert_eq!(extraction.metadata.get("author"), Some(&"Second".to_string()));
    }

    #[test]
    fn test_extract_relative_link() {
        let html = r#"<html><body><a href="/other">Link</a></body></html>"#;
        let extraction = extract(html, &base_url()).unwrap();
        assert_eq!(extraction.links, vec!["https://example.com/other"]);
    }

    #[test]
    fn test_skip_special_scheme_links() {
        let html = r##"
            <html><body>
                <a href="javascript:void(0)">a</a>
                <a href="mailto:test@example.com">b</a>
                <a href="tel:+1234567890">c</a>
                <a href="#section">d</a>
                <a href="/valid">e</a>
            </body></html>
        "##;
        let extraction = extract(html, &base_url()).unwrap();
        assert_eq!(extraction.links, vec!["https://example.com/valid"]);
    }

    #[test]
    fn test_skip_download_link() {
        let html = r#"<html><body><a href="/file.pdf" download>Download</a>x</body></html>"#;
        let extraction = extract(html, &base_url()).unwrap();
        assert!(extraction.links.is_empty());
    }

    #[test]
    fn test_extract_images_with_attributes() {
        let html = r#"
            <html><body>
                <img src="/logo.png" alt="Logo" title="Our logo" width="120" height="80">
                <img src="photo.jpg">
            </body></html>
        "#;
        let extraction = extract(html, &base_url()).unwrap();
        assert_eq!(extraction.images.len(), 2);

        let logo = &extraction.images[0];
        assert_eq!(logo.url, "https://example.com/logo.png");
        assert_eq!(logo.alt_text, Some("Logo".to_string()));
        assert_eq!(logo.title, Some("Our logo".to_string()));
        assert_eq!(logo.width, Some(120));
        assert_eq!(logo.height, Some(80));
        assert!(logo.file_size.is_none());
        assert!(logo.last_fetched.is_some());

        assert_eq!(extraction.images[1].url, "https://example.com/photo.jpg");
        assert!(extraction.images[1].width.is_none());
    }

    #[test]
    fn test_skip_data_uri_images() {
        let html = r#"<html><body><img src="data:image/png;base64,AAAA">x</body></html>"#;
        let extraction = extract(html, &base_url()).unwrap();
        assert!(extraction.images.is_empty());
    }

    #[test]
    fn test_non_numeric_dimensions_dropped() {
        let html = r#"<html><body><img src="/a.png" width="100%" height="auto"></body></html>"#;
        let extraction = extract(html, &base_url()).unwrap();
        assert!(extraction.images[0].width.is_none());
        assert!(extraction.images[0].height.is_none());
    }

    #[test]
    fn test_text_skips_boilerplate() {
        let html = r#"
            <html><body>
                <nav>Navigation here</nav>
                <header>Site header</header>
                <p>Real content.</p>
                <script>var x = 1;</script>
                <style>p { color: red; }</style>
                <footer>Copyright</footer>
            </body></html>
        "#;
        let extraction = extract(html, &base_url()).unwrap();
        let text = extraction.text_content.unwrap();
        assert!(text.contains("Real content."));
        assert!(!text.contains("Navigation"));
        assert!(!text.contains("Site header"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_empty_document_yields_none() {
        let html = r#"<html><head></head><body><script>x</script></body></html>"#;
        assert!(extract(html, &base_url()).is_none());
    }
}
