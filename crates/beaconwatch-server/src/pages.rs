//! Page titles for URL beacons.
//!
//! Successful lookups are cached by the URL the beacon advertised for the
//! lifetime of the process. Failures are not cached.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use utoipa::ToSchema;

static TITLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").expect("Invalid title regex"));

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Errors from resolving a page title.
#[derive(Debug, Error)]
pub enum PageError {
    /// The beacon URL is not a valid absolute URL.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parse failure.
        source: url::ParseError,
    },

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request failed or returned an error status.
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        /// The requested URL.
        url: String,
        /// Transport or status failure.
        source: reqwest::Error,
    },

    /// The page has no `<title>`.
    #[error("No title found at {0}")]
    NoTitle(String),
}

/// A resolved beacon page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "url": "https://example.com/",
    "title": "Example Domain"
}))]
pub struct PageInfo {
    /// Final URL after redirects.
    #[schema(example = "https://example.com/")]
    pub url: String,

    /// Contents of the page's `<title>` element.
    #[schema(example = "Example Domain")]
    pub title: String,
}

/// Fetches and caches page titles.
#[derive(Debug)]
pub struct TitleResolver {
    client: reqwest::Client,
    cache: Mutex<HashMap<String, PageInfo>>,
}

impl TitleResolver {
    /// Create a resolver whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Client`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, PageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("beaconwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PageError::Client)?;
        Ok(Self {
            client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Resolve the title of the page at `url`, following redirects.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the fetch fails, or the page
    /// has no title.
    pub async fn resolve(&self, url: &str) -> Result<PageInfo, PageError> {
        if let Some(page) = self.cached(url) {
            return Ok(page);
        }

        let parsed = url::Url::parse(url).map_err(|source| PageError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let fetch_error = |source| PageError::Fetch {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(fetch_error)?;
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(fetch_error)?;

        let Some(title) = extract_title(&body) else {
            warn!(%url, "Beacon page has no title");
            return Err(PageError::NoTitle(url.to_string()));
        };

        let page = PageInfo {
            url: final_url,
            title,
        };
        debug!(%url, title = %page.title, "Resolved beacon page title");
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), page.clone());
        Ok(page)
    }

    fn cached(&self, url: &str) -> Option<PageInfo> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }
}

/// Extract the text of the first `<title>` element, whitespace collapsed.
#[must_use]
pub fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE_PATTERN.captures(html)?.get(1)?.as_str();
    let title = WHITESPACE.replace_all(raw.trim(), " ").into_owned();
    (!title.is_empty()).then_some(title)
}
