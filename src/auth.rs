use std::fs;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::YouTubeConfig;
use crate::error::AuthError;
use crate::youtube::YouTubeClient;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client credentials as downloaded from the Google console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ClientSecrets {
    pub fn load(path: &str) -> Result<Self, AuthError> {
        let text = fs::read_to_string(path).map_err(|source| AuthError::Secrets {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, AuthError> {
        let file: SecretsFile =
            serde_json::from_str(text).map_err(|e| AuthError::MalformedSecrets(e.to_string()))?;

        file.installed.or(file.web).ok_or_else(|| {
            AuthError::MalformedSecrets("expected an \"installed\" or \"web\" section".to_string())
        })
    }
}

/// Trades a stored refresh token for a fresh access token.
pub async fn refresh_access_token(
    http: &Client,
    secrets: &ClientSecrets,
    refresh_token: &str,
) -> Result<String, AuthError> {
    debug!("Refreshing access token at {}", secrets.token_uri);

    let response = http
        .post(&secrets.token_uri)
        .form(&[
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::TokenExchange { status, body });
    }

    Ok(response.json::<TokenResponse>().await?.access_token)
}

/// Produces the authenticated client the rest of the run posts through.
pub async fn authenticate(
    secrets_path: &str,
    youtube: &YouTubeConfig,
    http: Client,
) -> Result<YouTubeClient, AuthError> {
    let secrets = ClientSecrets::load(secrets_path)?;

    let access_token = match (&youtube.refresh_token, &youtube.access_token) {
        (Some(refresh), _) => refresh_access_token(&http, &secrets, refresh).await?,
        (None, Some(token)) => token.clone(),
        (None, None) => return Err(AuthError::MissingToken),
    };

    info!(client_id = secrets.client_id.as_str(), "YouTube API client ready");
    Ok(YouTubeClient::new(http, youtube.api_base.clone(), access_token))
}
