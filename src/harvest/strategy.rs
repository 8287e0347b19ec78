//! Resolution strategy chain
//!
//! Turns a target into the URL of an icon to download. Strategies run in the
//! configured order; the first that yields a URL wins. The icon-service fallback
//! is always last and always yields a URL when the target has a hostname.

use crate::config::{StrategyConfig, StrategyOrder};
use crate::harvest::fetcher::{header_content_type, Fetcher};
use crate::harvest::parser::extract_icon_link;
use crate::source::Target;
use crate::state::Strategy;
use crate::url::{fallback_icon_url, root_icon_url};
use crate::HarvestError;
use std::sync::Arc;
use url::Url;

/// An icon URL together with the strategy that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIcon {
    pub url: Url,
    pub strategy: Strategy,
}

/// True for `image/*` types and anything mentioning `icon`
pub fn is_image_content_type(content_type: &str) -> bool {
    let ct = content_type.trim().to_ascii_lowercase();
    ct.starts_with("image/") || ct.contains("icon")
}

pub struct StrategyChain {
    fetcher: Arc<Fetcher>,
    order: StrategyOrder,
    fallback_template: String,
}

impl StrategyChain {
    pub fn new(fetcher: Arc<Fetcher>, config: &StrategyConfig) -> Self {
        Self {
            fetcher,
            order: config.order,
            fallback_template: config.fallback_service.clone(),
        }
    }

    /// Strategies in the order they are tried
    pub fn strategies(&self) -> [Strategy; 3] {
        match self.order {
            StrategyOrder::RootFirst => [
                Strategy::Root,
                Strategy::HtmlParsed,
                Strategy::SearchEngineFallback,
            ],
            StrategyOrder::HtmlFirst => [
                Strategy::HtmlParsed,
                Strategy::Root,
                Strategy::SearchEngineFallback,
            ],
        }
    }

    /// Returns the first icon URL any strategy produces
    ///
    /// Individual strategy failures are logged and swallowed.
    pub async fn resolve(&self, target: &Target) -> Result<ResolvedIcon, HarvestError> {
        for strategy in self.strategies() {
            let attempt = match strategy {
                Strategy::Root => self.probe_root(target).await,
                Strategy::HtmlParsed => self.inspect_html(target).await,
                Strategy::SearchEngineFallback => self.fallback(target),
                Strategy::None => continue,
            };

            match attempt {
                Ok(url) => {
                    tracing::debug!("{}: {} resolved {}", target.id, strategy, url);
                    return Ok(ResolvedIcon { url, strategy });
                }
                Err(e) => {
                    tracing::debug!("{}: {} strategy failed: {}", target.id, strategy, e);
                }
            }
        }

        Err(HarvestError::NoIconFound {
            target_id: target.id.clone(),
        })
    }

    /// HEAD `/favicon.ico` on the target's origin; accepts only image responses
    async fn probe_root(&self, target: &Target) -> Result<Url, HarvestError> {
        let url = root_icon_url(&target.url).ok_or_else(|| HarvestError::NoIconFound {
            target_id: target.id.clone(),
        })?;

        let response = self.fetcher.head(&url).await?;
        let content_type = header_content_type(&response).unwrap_or_default();

        if !is_image_content_type(&content_type) {
            return Err(HarvestError::InvalidIcon {
                url: url.to_string(),
                reason: format!("content type '{}' is not an image", content_type),
            });
        }

        Ok(url)
    }

    /// GET the target page and look for a declared icon
    async fn inspect_html(&self, target: &Target) -> Result<Url, HarvestError> {
        let response = self.fetcher.get(&target.url).await?;
        let final_url = response.url().clone();
        let body = response.text().await?;

        extract_icon_link(&body, &final_url).ok_or_else(|| HarvestError::NoIconFound {
            target_id: target.id.clone(),
        })
    }

    fn fallback(&self, target: &Target) -> Result<Url, HarvestError> {
        let host = target.hostname().ok_or_else(|| HarvestError::NoIconFound {
            target_id: target.id.clone(),
        })?;
        Ok(fallback_icon_url(&self.fallback_template, &host)?)
    }
}
