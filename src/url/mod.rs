//! URL handling module for Favicon-Harvest
//!
//! Target URL normalization, hostname extraction, slow-host classification and
//! icon location helpers.

mod domain;
mod normalize;

pub use domain::{extract_hostname, is_slow_host, root_icon_url};
pub use normalize::normalize_target_url;

/// Builds the icon-service fallback URL by substituting the hostname into the template
///
/// # Examples
///
/// ```
/// use favicon_harvest::url::fallback_icon_url;
///
/// let url = fallback_icon_url("https://icons.example.net/{host}.png", "agency.gov").unwrap();
/// assert_eq!(url.as_str(), "https://icons.example.net/agency.gov.png");
/// ```
pub fn fallback_icon_url(template: &str, host: &str) -> Result<::url::Url, ::url::ParseError> {
    ::url::Url::parse(&template.replace("{host}", host))
}
