//! Link source module
//!
//! Reads the list of target sites produced by the content system. Each entry is a
//! `{id, title, url}` record; malformed entries are skipped, and only a missing or
//! structurally unreadable document is fatal.

mod reader;

pub use reader::{parse_json_targets, parse_toml_targets, read_targets};

use url::Url;

/// One external site to acquire an icon for
///
/// Immutable once read. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    pub title: String,
    /// Normalized base URL of the site
    pub url: Url,
}

impl Target {
    /// Lowercase hostname of the target; the key for its icon file
    pub fn hostname(&self) -> Option<String> {
        crate::url::extract_hostname(&self.url)
    }
}
