use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status error: {status} {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum PostError {
    /// Structured error reported by the platform API.
    #[error("API error {code}: {message}")]
    Api { code: u16, message: String },

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("alert email is not configured (missing {0})")]
    NotConfigured(&'static str),

    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("cannot read client secrets {path}: {source}")]
    Secrets {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed client secrets: {0}")]
    MalformedSecrets(String),

    #[error("no credentials: set YOUTUBE_REFRESH_TOKEN or YOUTUBE_ACCESS_TOKEN")]
    MissingToken,

    #[error("token exchange failed with status {status}: {body}")]
    TokenExchange { status: StatusCode, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
