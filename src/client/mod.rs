//! Video source - the paginated list endpoint
//!
//! `GET {api_url}/videos?offset&limit` answers `{ "videos": [...] }`. A
//! response shorter than `limit` means the feed is exhausted. 401/403 are
//! auth rejections and are reported apart from every other failure so the
//! feed can stop and ask for a new session.

use crate::feed::model::VideosResponse;
use crate::feed::{FeedError, SessionContext, VideoRecord};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;

/// Something that can serve pages of the feed
pub trait VideoSource: Send + Sync + 'static {
    fn fetch_page(
        &self,
        session: &SessionContext,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<VideoRecord>, FeedError>> + Send;
}

/// reqwest-backed source for a feed API
#[derive(Debug, Clone)]
pub struct HttpVideoSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVideoSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Content endpoint for a video id
    #[cfg(test)]
    pub fn content_url(&self, id: crate::feed::model::VideoId) -> String {
        format!("{}/videos/{}/content", self.base_url, id)
    }

    /// Resolve a content locator against the API base
    pub fn resolve(&self, uri: &str) -> String {
        resolve_uri(&self.base_url, uri)
    }
}

impl VideoSource for HttpVideoSource {
    async fn fetch_page(
        &self,
        session: &SessionContext,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<VideoRecord>, FeedError> {
        let url = format!("{}/videos", self.base_url);
        tracing::debug!(offset, limit, "GET {}", url);

        let mut request = self
            .client
            .get(&url)
            .query(&[("offset", offset), ("limit", limit)]);
        if let Some(token) = session.token() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FeedError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FeedError::AuthRejected);
        }
        if !status.is_success() {
            return Err(FeedError::NetworkFailure(format!(
                "Failed to fetch videos (HTTP {})",
                status.as_u16()
            )));
        }

        let body: VideosResponse = response
            .json()
            .await
            .map_err(|e| FeedError::NetworkFailure(format!("Invalid feed response: {}", e)))?;

        Ok(body
            .videos
            .into_iter()
            .map(|mut video| {
                video.content_uri = self.resolve(&video.content_uri);
                video
            })
            .collect())
    }
}

/// Absolute URLs pass through; anything else is joined onto `base`
pub fn resolve_uri(base: &str, uri: &str) -> String {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return uri.to_string();
    }
    let base = base.trim_end_matches('/');
    if uri.starts_with('/') {
        format!("{}{}", base, uri)
    } else {
        format!("{}/{}", base, uri)
    }
}
