use url::Url;

/// Extracts the lowercase hostname from a URL
///
/// The port is not part of the hostname, so two targets on the same host but
/// different ports share an icon file name.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use favicon_harvest::url::extract_hostname;
///
/// let url = Url::parse("https://WWW.Example.com:8443/path").unwrap();
/// assert_eq!(extract_hostname(&url), Some("www.example.com".to_string()));
/// ```
pub fn extract_hostname(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// Returns true when the hostname ends with any of the slow-host suffixes
///
/// Matching is case-insensitive. A suffix `.gov` matches `irs.gov` but not
/// `gov.example.com`; a bare host equal to the suffix body (`gov`) also matches.
pub fn is_slow_host(host: &str, suffixes: &[String]) -> bool {
    let host = host.to_lowercase();
    suffixes.iter().any(|suffix| {
        let suffix = suffix.to_lowercase();
        host.ends_with(&suffix) || Some(host.as_str()) == suffix.strip_prefix('.')
    })
}

/// Builds the conventional root icon location (`/favicon.ico`) for a URL's origin
///
/// Scheme, host and port are kept; path, query and fragment are dropped.
pub fn root_icon_url(url: &Url) -> Option<Url> {
    extract_hostname(url)?;
    url.join("/favicon.ico").ok()
}
