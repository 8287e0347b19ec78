//! Attempt outcome definitions
//!
//! An attempt is the single recorded outcome of processing one target in one run.
use crate::source::Target;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final status of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Success,
    Failed,
}

impl AttemptStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// The strategy that produced the icon URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// `/favicon.ico` at the site root, confirmed to be an image
    Root,
    /// `<link rel="icon">` declared in the page markup
    HtmlParsed,
    /// Third-party icon-rendering service keyed by hostname
    SearchEngineFallback,
    /// No strategy resolved (or processing failed before resolution)
    None,
}

impl Strategy {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::HtmlParsed => "html_parsed",
            Self::SearchEngineFallback => "search_engine_fallback",
            Self::None => "none",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "root" => Some(Self::Root),
            "html_parsed" => Some(Self::HtmlParsed),
            "search_engine_fallback" => Some(Self::SearchEngineFallback),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Recorded outcome of one target in one run
///
/// Built once by the worker and never mutated after it reaches the recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub target_id: String,
    pub title: String,
    pub url: String,
    pub status: AttemptStatus,
    pub strategy: Strategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// First target in this run whose icon had the same content hash
    ///
    /// Only later occurrences carry this marker; the first target of a group has
    /// `None`. Complete groups are in `RunSummary::duplicate_groups` and the
    /// markdown summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<String>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Details of a saved icon, used to build a successful attempt
#[derive(Debug, Clone)]
pub struct SavedIcon {
    pub strategy: Strategy,
    pub icon_url: String,
    pub local_path: String,
    pub byte_length: u64,
    pub content_hash: String,
    pub duplicate_of: Option<String>,
}

impl AttemptResult {
    pub fn success(target: &Target, icon: SavedIcon, duration_ms: u64) -> Self {
        Self {
            target_id: target.id.clone(),
            title: target.title.clone(),
            url: target.url.to_string(),
            status: AttemptStatus::Success,
            strategy: icon.strategy,
            icon_url: Some(icon.icon_url),
            local_path: Some(icon.local_path),
            byte_length: Some(icon.byte_length),
            content_hash: Some(icon.content_hash),
            duplicate_of: icon.duplicate_of,
            duration_ms,
            error: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn failed(
        target: &Target,
        strategy: Strategy,
        icon_url: Option<String>,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            target_id: target.id.clone(),
            title: target.title.clone(),
            url: target.url.to_string(),
            status: AttemptStatus::Failed,
            strategy,
            icon_url,
            local_path: None,
            byte_length: None,
            content_hash: None,
            duplicate_of: None,
            duration_ms,
            error: Some(error.into()),
            recorded_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
