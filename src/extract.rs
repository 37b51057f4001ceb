use scraper::{Html, Selector};
use tracing::{debug, error};

use crate::error::ConfigError;

/// Pulls video identifiers out of a search results page.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    selector: Selector,
    prefix: String,
}

impl LinkExtractor {
    pub fn new(selector: &str, prefix: impl Into<String>) -> Result<Self, ConfigError> {
        let selector = Selector::parse(selector).map_err(|e| ConfigError::Invalid {
            key: "VIDEO_LINK_SELECTOR",
            value: selector.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            selector,
            prefix: prefix.into(),
        })
    }

    /// Identifiers of every matching anchor with a non-empty `href`, in
    /// document order. Duplicates are kept.
    pub fn extract_video_ids(&self, html: &str) -> Vec<String> {
        if html.trim().is_empty() {
            return Vec::new();
        }

        let document = Html::parse_document(html);
        if !document.errors.is_empty() {
            debug!("Page parsed with {} recoverable errors", document.errors.len());
        }

        let ids: Vec<String> = document
            .select(&self.selector)
            .filter_map(|element| element.value().attr("href"))
            .filter(|href| !href.is_empty())
            .map(|href| href.replace(self.prefix.as_str(), ""))
            .collect();

        if ids.is_empty() {
            error!("No video links found on page");
        }

        ids
    }
}
