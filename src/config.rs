use std::env;
use std::str::FromStr;

use scraper::Selector;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::budget::ResetPolicy;
use crate::error::ConfigError;

pub const DEFAULT_SEARCH_URL: &str = "https://www.youtube.com/results";
pub const DEFAULT_SEARCH_FILTER: &str = "CAISAggBUBQ%3D";
pub const DEFAULT_LINK_SELECTOR: &str = "a.yt-uix-tile-link";
pub const DEFAULT_LINK_PREFIX: &str = "/watch?v=";
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_LOG_FILTER: &str = "comment_bot=info";

/// Log filter from a `RUST_LOG` value, falling back to `comment_bot=info` when
/// it is unset or unparsable.
pub fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[derive(Debug, Clone)]
pub struct Config {
    pub client_secrets_file: String,
    pub keywords_file: String,
    pub comments_file: String,
    pub proxy_url: Option<String>,
    pub search: SearchConfig,
    pub youtube: YouTubeConfig,
    pub email: EmailConfig,
    pub max_errors_before_email: usize,
    pub reset_policy: ResetPolicy,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub url: String,
    pub filter: String,
    pub link_selector: String,
    pub link_prefix: String,
}

#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub api_base: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub password: Option<String>,
    pub smtp_server: String,
    pub smtp_port: u16,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SEARCH_URL.to_string(),
            filter: DEFAULT_SEARCH_FILTER.to_string(),
            link_selector: DEFAULT_LINK_SELECTOR.to_string(),
            link_prefix: DEFAULT_LINK_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Loads settings from the process environment (and `.env` when present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let max_errors_before_email: usize = parse_or(&get, "MAX_ERRORS_BEFORE_EMAIL", 5)?;
        if max_errors_before_email == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_ERRORS_BEFORE_EMAIL",
                value: "0".to_string(),
                reason: "threshold must be positive".to_string(),
            });
        }

        let reset_policy = match get("ALERT_RESET_POLICY") {
            Some(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                key: "ALERT_RESET_POLICY",
                value,
                reason,
            })?,
            None => ResetPolicy::default(),
        };

        let proxy_url = get("PROXY_URL");
        if let Some(proxy) = &proxy_url {
            reqwest::Proxy::all(proxy.as_str()).map_err(|e| ConfigError::Invalid {
                key: "PROXY_URL",
                value: proxy.clone(),
                reason: e.to_string(),
            })?;
        }

        let search = SearchConfig {
            url: or("SEARCH_URL", DEFAULT_SEARCH_URL),
            filter: or("SEARCH_FILTER", DEFAULT_SEARCH_FILTER),
            link_selector: or("VIDEO_LINK_SELECTOR", DEFAULT_LINK_SELECTOR),
            link_prefix: or("VIDEO_LINK_PREFIX", DEFAULT_LINK_PREFIX),
        };
        if Selector::parse(&search.link_selector).is_err() {
            return Err(ConfigError::Invalid {
                key: "VIDEO_LINK_SELECTOR",
                value: search.link_selector,
                reason: "not a valid CSS selector".to_string(),
            });
        }
        if url::Url::parse(&search.url).is_err() {
            return Err(ConfigError::Invalid {
                key: "SEARCH_URL",
                value: search.url,
                reason: "not an absolute URL".to_string(),
            });
        }

        let config = Self {
            client_secrets_file: or("CLIENT_SECRETS_FILE", "client_secret.json"),
            keywords_file: or("KEYWORDS_FILE", "data/keywords.txt"),
            comments_file: or("COMMENTS_FILE", "data/comments.txt"),
            proxy_url,
            search,
            youtube: YouTubeConfig {
                api_base: or("YOUTUBE_API_BASE", DEFAULT_API_BASE),
                access_token: get("YOUTUBE_ACCESS_TOKEN"),
                refresh_token: get("YOUTUBE_REFRESH_TOKEN"),
            },
            email: EmailConfig {
                sender: get("EMAIL_SENDER"),
                receiver: get("EMAIL_RECEIVER"),
                password: get("EMAIL_PASSWORD"),
                smtp_server: or("SMTP_SERVER", "smtp.gmail.com"),
                smtp_port: parse_or(&get, "SMTP_PORT", 587)?,
            },
            max_errors_before_email,
            reset_policy,
        };

        Ok(config)
    }

    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let n = val.chars().take(3).collect::<String>();
            format!("{}...({} chars)", n, val.chars().count())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) => preview(v),
                None => "<not set>".to_string(),
            }
        }
        fn plain_opt(val: &Option<String>) -> &str {
            val.as_deref().unwrap_or("<not set>")
        }

        info!("Config loaded:");
        info!("  CLIENT_SECRETS_FILE: {}", self.client_secrets_file);
        info!("  KEYWORDS_FILE: {}", self.keywords_file);
        info!("  COMMENTS_FILE: {}", self.comments_file);
        info!("  PROXY_URL: {}", preview_opt(&self.proxy_url));
        info!("  SEARCH_URL: {}", self.search.url);
        info!("  YOUTUBE_ACCESS_TOKEN: {}", preview_opt(&self.youtube.access_token));
        info!("  YOUTUBE_REFRESH_TOKEN: {}", preview_opt(&self.youtube.refresh_token));
        info!("  EMAIL_SENDER: {}", plain_opt(&self.email.sender));
        info!("  EMAIL_RECEIVER: {}", plain_opt(&self.email.receiver));
        info!("  EMAIL_PASSWORD: {}", preview_opt(&self.email.password));
        info!("  SMTP: {}:{}", self.email.smtp_server, self.email.smtp_port);
        info!("  MAX_ERRORS_BEFORE_EMAIL: {}", self.max_errors_before_email);
        info!("  ALERT_RESET_POLICY: {}", self.reset_policy);
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
