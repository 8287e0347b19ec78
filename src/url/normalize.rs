use crate::UrlError;
use url::Url;

/// Normalizes a target base URL as it appears in a link source
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; reject empty input
/// 2. Prepend `https://` when no scheme is present (CMS entries are often bare hosts)
/// 3. Parse the URL; reject if malformed
/// 4. Accept only HTTP and HTTPS schemes
/// 5. Require a host
/// 6. Remove the fragment
///
/// The host is lowercased by the URL parser. The path and query are kept: the
/// HTML strategy fetches exactly the page the source points at.
///
/// # Examples
///
/// ```
/// use favicon_harvest::url::normalize_target_url;
///
/// let url = normalize_target_url("  Example.COM/about#team ").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about");
/// ```
pub fn normalize_target_url(raw: &str) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches('/'))
    };

    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingHost),
    }

    url.set_fragment(None);

    Ok(url)
}
