//! HTML parser for locating declared icons
//!
//! Scans `<link rel=... href=...>` elements. A declaration whose rel token list
//! contains `icon` (`icon`, `shortcut icon`) wins over `apple-touch-icon`
//! variants; within a class the first declaration in document order is used.

use scraper::{Html, Selector};
use url::Url;

/// Finds the preferred icon declared by an HTML page
///
/// Relative hrefs are resolved against `base_url`, which should be the final
/// page URL after redirects. `data:` URIs and non-HTTP(S) targets are skipped.
///
/// # Example
///
/// ```
/// use favicon_harvest::harvest::extract_icon_link;
/// use url::Url;
///
/// let html = r#"<html><head><link rel="icon" href="/static/fav.png"></head></html>"#;
/// let base = Url::parse("https://example.com/about/").unwrap();
/// let icon = extract_icon_link(html, &base).unwrap();
/// assert_eq!(icon.as_str(), "https://example.com/static/fav.png");
/// ```
pub fn extract_icon_link(html: &str, base_url: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("link[rel][href]").ok()?;

    let mut touch_icon = None;

    for element in document.select(&selector) {
        let (Some(rel), Some(href)) = (element.value().attr("rel"), element.value().attr("href"))
        else {
            continue;
        };

        let rel = rel.to_ascii_lowercase();
        let tokens: Vec<&str> = rel.split_ascii_whitespace().collect();
        let is_icon = tokens.contains(&"icon");
        let is_touch_icon = tokens
            .iter()
            .any(|t| t.starts_with("apple-touch-icon"));

        if !is_icon && !is_touch_icon {
            continue;
        }

        let Some(url) = resolve_icon_href(href, base_url) else {
            continue;
        };

        if is_icon {
            return Some(url);
        }
        if touch_icon.is_none() {
            touch_icon = Some(url);
        }
    }

    touch_icon
}

/// Resolves an icon href to an absolute HTTP(S) URL
fn resolve_icon_href(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.to_ascii_lowercase().starts_with("data:") {
        return None;
    }

    match base_url.join(href) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(url),
        _ => None,
    }
}
