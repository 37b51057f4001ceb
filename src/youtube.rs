use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::budget::ErrorBudget;
use crate::error::PostError;

/// The one write operation the pipeline needs from the platform.
#[async_trait]
pub trait CommentApi: Send + Sync {
    async fn insert_comment_thread(
        &self,
        video_id: &str,
        text: &str,
    ) -> Result<CommentThread, PostError>;
}

/// The part of a `commentThreads.insert` response worth logging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentThread {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadBody<'a> {
    snippet: ThreadSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet<'a> {
    video_id: &'a str,
    top_level_comment: TopLevelComment<'a>,
}

#[derive(Debug, Serialize)]
struct TopLevelComment<'a> {
    snippet: CommentSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet<'a> {
    text_original: &'a str,
}

impl<'a> CommentThreadBody<'a> {
    fn new(video_id: &'a str, text: &'a str) -> Self {
        Self {
            snippet: ThreadSnippet {
                video_id,
                top_level_comment: TopLevelComment {
                    snippet: CommentSnippet {
                        text_original: text,
                    },
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: u16,
    #[serde(default)]
    message: String,
}

/// Authenticated YouTube Data API client.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: Client,
    api_base: String,
    access_token: String,
}

impl YouTubeClient {
    pub fn new(http: Client, api_base: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl CommentApi for YouTubeClient {
    async fn insert_comment_thread(
        &self,
        video_id: &str,
        text: &str,
    ) -> Result<CommentThread, PostError> {
        let url = format!("{}/commentThreads", self.api_base);

        let response = self
            .http
            .post(&url)
            .query(&[("part", "snippet")])
            .bearer_auth(&self.access_token)
            .json(&CommentThreadBody::new(video_id, text))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<CommentThread>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorEnvelope>(&body) {
            Ok(envelope) => Err(PostError::Api {
                code: envelope.error.code,
                message: envelope.error.message,
            }),
            Err(_) => Err(PostError::Status(status)),
        }
    }
}

/// Posts `text` as a top-level comment on `video_id`.
///
/// A failure is logged and counted once against `budget`; it never stops the
/// caller from moving on to the next video.
pub async fn post_comment(
    api: &dyn CommentApi,
    video_id: &str,
    text: &str,
    budget: &ErrorBudget,
) -> Result<CommentThread, PostError> {
    match api.insert_comment_thread(video_id, text).await {
        Ok(thread) => {
            info!(video_id, thread_id = thread.id.as_str(), "Comment posted");
            Ok(thread)
        }
        Err(e) => {
            let count = budget.record_failure();
            match &e {
                PostError::Api { .. } | PostError::Status(_) => {
                    error!(video_id, error_count = count, "HTTP error occurred: {}", e)
                }
                PostError::Http(_) => error!(
                    video_id,
                    error_count = count,
                    "An unexpected error occurred while posting a comment: {}",
                    e
                ),
            }
            Err(e)
        }
    }
}
