//! Mastodon publishing client
//!
//! Each language variant is posted from its own account, so tokens are keyed by
//! language. A post is a media upload followed by a status referencing it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use url::Url;

use shared::{run_debug, Language};

use crate::error::{PosterError, PosterResult};
use crate::traits::Publisher;
use crate::types::{Post, PublishReceipt};

const STATUS_VISIBILITY: &str = "public";

#[derive(Debug, Deserialize)]
struct MediaAttachment {
    id: String,
}

#[derive(Debug, Serialize)]
struct NewStatus<'a> {
    status: &'a str,
    media_ids: Vec<String>,
    language: &'a str,
    visibility: &'a str,
}

#[derive(Debug, Deserialize)]
struct Status {
    id: String,
    url: Option<String>,
}

/// Publisher for a Mastodon-compatible instance
pub struct MastodonPublisher {
    client: reqwest::Client,
    base_url: Url,
    tokens: HashMap<Language, String>,
}

impl MastodonPublisher {
    pub fn new(
        base_url: Url,
        tokens: HashMap<Language, String>,
        timeout: Duration,
    ) -> PosterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("plate-poster/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    fn endpoint(&self, path: &str) -> PosterResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PosterError::config("social_url", e.to_string()))
    }

    fn token(&self, language: Language) -> PosterResult<&str> {
        self.tokens
            .get(&language)
            .map(String::as_str)
            .ok_or_else(|| PosterError::Publish {
                language,
                message: "no access token configured".to_string(),
            })
    }

    async fn check(
        language: Language,
        step: &str,
        response: reqwest::Response,
    ) -> PosterResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PosterError::Publish {
            language,
            message: format!("{step} answered HTTP {status}: {}", body.trim()),
        })
    }

    async fn upload_media(&self, post: &Post, token: &str) -> PosterResult<String> {
        let part = Part::bytes(post.image.bytes.clone())
            .file_name(post.file_name.clone())
            .mime_str(&post.image.mime)?;
        let form = Form::new()
            .part("file", part)
            .text("description", post.alt_text.clone());

        let response = self
            .client
            .post(self.endpoint("api/v2/media")?)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        let media: MediaAttachment = Self::check(post.language, "media upload", response)
            .await?
            .json()
            .await?;
        Ok(media.id)
    }
}

#[async_trait]
impl Publisher for MastodonPublisher {
    async fn publish(&self, post: &Post) -> PosterResult<PublishReceipt> {
        let token = self.token(post.language)?;
        let media_id = self.upload_media(post, token).await?;
        run_debug!(
            post.run_id,
            "📤 Uploaded media {} for language {}",
            media_id,
            post.language
        );

        let body = NewStatus {
            status: &post.text,
            media_ids: vec![media_id],
            language: post.language.code(),
            visibility: STATUS_VISIBILITY,
        };
        let response = self
            .client
            .post(self.endpoint("api/v1/statuses")?)
            .bearer_auth(token)
            // One status per run and language
            .header(
                "Idempotency-Key",
                format!("{}-{}", post.run_id, post.language),
            )
            .json(&body)
            .send()
            .await?;
        let status: Status = Self::check(post.language, "status", response)
            .await?
            .json()
            .await?;

        Ok(PublishReceipt {
            language: post.language,
            status_id: status.id,
            url: status.url,
        })
    }
}
