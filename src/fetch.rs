use std::sync::LazyLock;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Proxy, StatusCode};
use tracing::{debug, error};
use url::Url;

use crate::budget::ErrorBudget;
use crate::error::FetchError;

static META_CHARSET: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"charset\s*=\s*["']?([A-Za-z0-9_\-]+)"#).ok());

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Builds the results-listing URL for one keyword.
pub fn search_url(base: &str, filter: &str, keyword: &str) -> Result<Url, url::ParseError> {
    let mut params = vec![("q", keyword)];
    if !filter.is_empty() {
        params.push(("sp", filter));
    }
    Url::parse_with_params(base, params)
}

/// The `charset` parameter of a `Content-Type` value, unquoted.
fn header_charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(&['"', '\''][..]))
            .filter(|v| !v.is_empty())
    })
}

/// Issues GETs for results pages, optionally through a proxy.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(proxy_url: Option<&str>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(proxy) = proxy_url {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self::with_client(builder.build()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches `url` and returns its decoded body.
    ///
    /// Anything but a 200 response is a failure; each failure is logged and
    /// counted once against `budget`.
    pub async fn fetch(&self, url: &str, budget: &ErrorBudget) -> Result<String, FetchError> {
        match self.fetch_html(url).await {
            Ok(body) => Ok(body),
            Err(e) => {
                let count = budget.record_failure();
                match &e {
                    FetchError::HttpStatus { status, .. } => {
                        error!(error_count = count, "Failed to fetch URL {} - Status Code: {}", url, status)
                    }
                    FetchError::Transport { source, .. } => {
                        error!(error_count = count, "Error fetching URL {}: {}", url, source)
                    }
                }
                Err(e)
            }
        }
    }

    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        debug!("Fetching {}", url);
        let transport = |source: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::HttpStatus {
                status: response.status(),
                url: url.to_string(),
            });
        }

        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(transport)?;

        Ok(self.decode(&headers, &bytes))
    }

    fn decode(&self, headers: &HeaderMap, bytes: &[u8]) -> String {
        // 1. Charset from header
        if let Some(content_type) = headers.get(CONTENT_TYPE) {
            if let Ok(content_type_str) = content_type.to_str() {
                if let Some(charset) = header_charset(content_type_str) {
                    if let Some(encoding) = Encoding::for_label(charset.as_bytes()) {
                        let (text, _, _) = encoding.decode(bytes);
                        return text.into_owned();
                    }
                }
            }
        }

        // 2. Charset from a meta tag near the top (ASCII-safe)
        let ascii_head = String::from_utf8_lossy(&bytes[..bytes.len().min(4096)]);
        let meta = META_CHARSET.as_ref().and_then(|re| re.captures(&ascii_head));
        if let Some(charset) = meta.as_ref().and_then(|c| c.get(1)) {
            if let Some(encoding) = Encoding::for_label(charset.as_str().as_bytes()) {
                let (text, _, _) = encoding.decode(bytes);
                return text.into_owned();
            }
        }

        // 3. Guess
        let mut detector = EncodingDetector::new();
        detector.feed(bytes, true);
        let encoding = detector.guess(None, true);
        let (text, _, _) = encoding.decode(bytes);
        text.into_owned()
    }
}
