//! Content extraction for listing and detail pages
//!
//! Pure functions from raw response bytes to structured data:
//! - ranked post ids from the listing page
//! - post ids from the JSON index endpoint
//! - download targets (article link + comment links) from a detail page
//!
//! Extraction never fails hard: unparseable content yields an empty result,
//! which callers treat as "nothing to do" rather than an error.

use crate::crawler::PostId;
use scraper::{Html, Selector};
use url::Url;

/// Extracted download targets of one post's detail page
#[derive(Debug, Clone, Default)]
pub struct DetailPage {
    /// The article URL from the title line, if present
    pub article_url: Option<String>,

    /// All URLs found inside comment bodies, in document order
    pub comment_links: Vec<String>,
}

/// Extracts ranked post ids from the listing page, truncated to `limit`
///
/// Listing rows carry their post id as the `id` attribute of a
/// `<tr class="athing">` element; ranking order is document order.
pub fn extract_post_ids(html: &str, limit: usize) -> Vec<PostId> {
    let document = Html::parse_document(html);
    let mut ids = Vec::new();

    if let Ok(row_selector) = Selector::parse("tr.athing") {
        for row in document.select(&row_selector) {
            if ids.len() >= limit {
                break;
            }
            if let Some(id) = row.value().attr("id") {
                let id = id.trim();
                if !id.is_empty() {
                    ids.push(PostId::new(id));
                }
            }
        }
    }

    ids
}

/// Parses the JSON index endpoint body (an ordered array of numeric ids)
///
/// Malformed JSON yields an empty list.
pub fn parse_index_ids(body: &[u8], limit: usize) -> Vec<PostId> {
    match serde_json::from_slice::<Vec<u64>>(body) {
        Ok(ids) => ids.into_iter().take(limit).map(PostId::from).collect(),
        Err(e) => {
            tracing::warn!("Failed to parse index response: {}", e);
            Vec::new()
        }
    }
}

/// Parses a post's detail page into its article URL and comment links
///
/// The article link is the first anchor inside the title line element;
/// comment links are every anchor inside a comment body. Relative hrefs are
/// resolved against `base_url`.
pub fn parse_detail(html: &str, base_url: &Url) -> DetailPage {
    let document = Html::parse_document(html);
    let mut detail = DetailPage::default();

    if let Ok(title_selector) = Selector::parse("span.titleline > a") {
        detail.article_url = document
            .select(&title_selector)
            .next()
            .and_then(|element| element.value().attr("href"))
            .and_then(|href| resolve_link(href, base_url));
    }

    if let Ok(comment_selector) = Selector::parse("span.commtext a[href]") {
        for element in document.select(&comment_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    detail.comment_links.push(absolute_url);
                }
            }
        }
    }

    detail
}

/// Extracts the deduplicated download-target list for one detail page
///
/// The article URL comes first, then comment links in document order. The
/// same href appearing more than once yields a single target.
pub fn extract_targets(html: &str, base_url: &Url) -> Vec<String> {
    let detail = parse_detail(html, base_url);

    let mut seen = std::collections::HashSet::new();
    let mut targets = Vec::new();

    for url in detail
        .article_url
        .into_iter()
        .chain(detail.comment_links)
    {
        if seen.insert(url.clone()) {
            targets.push(url);
        }
    }

    targets
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Non-HTTP(S) URLs after resolution
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
