// Demo backend: an in-memory feed API served with axum
//
// Serves the same surface the client talks to, so the whole app can run
// without a real service (REELFEED_DEMO=1 or `reelfeed serve-demo`):
//
//   GET  /videos?offset&limit    newest first, default limit 10
//   GET  /videos/:id/content     synthetic bytes with the stored mime type
//   POST /videos                 add a record (JSON body)
//
// When a token is configured every route requires `Authorization: Bearer`.
// The seeded catalogue includes one record with a non-video mime type and one
// with an empty body so the failure badges can be seen in the TUI.

use crate::feed::model::{VideoId, VideosResponse};
use crate::feed::VideoRecord;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Response, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Page size when the client sends no limit
const DEFAULT_LIMIT: usize = 10;

/// Largest page the demo will serve
const MAX_LIMIT: usize = 100;

/// Seeded record served as text/plain
const UNSUPPORTED_ID: VideoId = 3;

/// Seeded record with no content bytes
const EMPTY_ID: VideoId = 5;

const CAPTIONS: &[&str] = &[
    "Sunrise over the harbour",
    "Street food tour, part 2",
    "Trying the new skate park",
    "Rainy day timelapse",
    "Cat vs. laser pointer",
    "Five minute pasta",
    "Mountain bike descent",
    "Drone shot of the coast",
    "Learning to juggle: day 30",
    "Night market lights",
];

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StoredVideo {
    record: VideoRecord,
    mime_type: String,
    size_bytes: usize,
}

#[derive(Debug)]
struct Catalogue {
    videos: Vec<StoredVideo>,
    next_id: VideoId,
}

/// Shared state for the demo routes
#[derive(Debug, Clone)]
pub struct DemoState {
    catalogue: Arc<Mutex<Catalogue>>,
    token: Option<String>,
}

impl DemoState {
    /// Empty catalogue
    pub fn new(token: Option<String>) -> Self {
        Self {
            catalogue: Arc::new(Mutex::new(Catalogue {
                videos: Vec::new(),
                next_id: 1,
            })),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Catalogue with `count` records, one hour apart
    pub fn seeded(count: usize, token: Option<String>) -> Self {
        let state = Self::new(token);
        let now = Utc::now();
        for n in 0..count {
            let id = n as VideoId + 1;
            let caption = CAPTIONS[n % CAPTIONS.len()].to_string();
            let (mime_type, size_bytes) = match id {
                UNSUPPORTED_ID => ("text/plain", 2048),
                EMPTY_ID => ("video/mp4", 0),
                _ => ("video/mp4", 64 * 1024 + id as usize * 512),
            };
            let created_at = now - ChronoDuration::hours((count - n) as i64);
            state.insert(caption, mime_type.to_string(), size_bytes, created_at);
        }
        state
    }

    #[cfg(test)]
    pub fn unsupported_id(&self) -> VideoId {
        UNSUPPORTED_ID
    }

    #[cfg(test)]
    pub fn empty_id(&self) -> VideoId {
        EMPTY_ID
    }

    pub fn len(&self) -> usize {
        self.catalogue().videos.len()
    }

    fn catalogue(&self) -> MutexGuard<'_, Catalogue> {
        self.catalogue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert(
        &self,
        caption: String,
        mime_type: String,
        size_bytes: usize,
        created_at: DateTime<Utc>,
    ) -> VideoRecord {
        let mut catalogue = self.catalogue();
        let id = catalogue.next_id;
        catalogue.next_id += 1;

        let record = VideoRecord {
            id,
            content_uri: format!("/videos/{}/content", id),
            thumbnail_uri: Some(format!("/videos/{}/thumbnail.jpg", id)),
            caption: Some(caption),
            created_at,
        };
        catalogue.videos.push(StoredVideo {
            record: record.clone(),
            mime_type,
            size_bytes,
        });
        record
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), DemoError> {
        let Some(expected) = &self.token else {
            return Ok(());
        };
        let provided = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match provided {
            None => Err(DemoError::Unauthorized("Authentication required")),
            Some(token) if token == expected => Ok(()),
            Some(_) => Err(DemoError::Unauthorized("Invalid token")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub(crate) enum DemoError {
    Unauthorized(&'static str),
    NotFound(VideoId),
    BadRequest(String),
}

impl IntoResponse for DemoError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            DemoError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            DemoError::NotFound(id) => (StatusCode::NOT_FOUND, format!("Video {} not found", id)),
            DemoError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        tracing::debug!("Demo backend: {} - {}", status, message);
        (status, Json(json!({ "message": message }))).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Routes
// ─────────────────────────────────────────────────────────────────────────────

pub fn router(state: DemoState) -> Router {
    Router::new()
        .route("/videos", get(list_videos).post(create_video))
        .route("/videos/:id/content", get(video_content))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListParams {
    offset: Option<usize>,
    limit: Option<usize>,
}

async fn list_videos(
    State(state): State<DemoState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<VideosResponse>, DemoError> {
    state.authorize(&headers)?;

    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let catalogue = state.catalogue();
    let mut newest_first: Vec<&StoredVideo> = catalogue.videos.iter().collect();
    newest_first.sort_by(|a, b| {
        b.record
            .created_at
            .cmp(&a.record.created_at)
            .then(b.record.id.cmp(&a.record.id))
    });

    let videos = newest_first
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|video| video.record.clone())
        .collect();
    Ok(Json(VideosResponse { videos }))
}

async fn video_content(
    State(state): State<DemoState>,
    headers: HeaderMap,
    Path(id): Path<VideoId>,
) -> Result<Response<Body>, DemoError> {
    state.authorize(&headers)?;

    let (mime_type, size) = {
        let catalogue = state.catalogue();
        let video = catalogue
            .videos
            .iter()
            .find(|v| v.record.id == id)
            .ok_or(DemoError::NotFound(id))?;
        (video.mime_type.clone(), video.size_bytes)
    };

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_range(v, size));
    let (status, start, end) = match range {
        Some((start, end)) => (StatusCode::PARTIAL_CONTENT, start, end),
        None => (StatusCode::OK, 0, size),
    };

    let body: Bytes = (start..end).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, mime_type)
        .header(header::ACCEPT_RANGES, "bytes")
        .body(Body::from(body))
        .map_err(|e| DemoError::BadRequest(e.to_string()))
}

/// `bytes=a-b` (inclusive) to a half-open range within `size`
fn parse_range(value: &str, size: usize) -> Option<(usize, usize)> {
    let bounds = value.strip_prefix("bytes=")?;
    let (start, end) = bounds.split_once('-')?;
    let start: usize = start.trim().parse().ok()?;
    if start >= size {
        return None;
    }
    let end = match end.trim() {
        "" => size,
        end => end.parse::<usize>().ok()?.saturating_add(1).min(size),
    };
    (start < end).then_some((start, end))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewVideo {
    caption: String,
    #[serde(default = "default_mime")]
    mime_type: String,
    #[serde(default = "default_size")]
    size_bytes: usize,
}

fn default_mime() -> String {
    "video/mp4".to_string()
}

fn default_size() -> usize {
    64 * 1024
}

async fn create_video(
    State(state): State<DemoState>,
    headers: HeaderMap,
    Json(new): Json<NewVideo>,
) -> Result<impl IntoResponse, DemoError> {
    state.authorize(&headers)?;
    if new.caption.trim().is_empty() {
        return Err(DemoError::BadRequest("Caption is required".to_string()));
    }

    let record = state.insert(new.caption, new.mime_type, new.size_bytes, Utc::now());
    tracing::info!(id = record.id, "Demo video uploaded");
    Ok((StatusCode::CREATED, Json(json!({ "video": record }))))
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// Serve until `shutdown_rx` fires
pub async fn serve(
    bind_addr: SocketAddr,
    state: DemoState,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .context("Failed to bind to address")?;
    serve_on(listener, state, shutdown_rx).await
}

async fn serve_on(
    listener: TcpListener,
    state: DemoState,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read local address")?;
    tracing::info!(videos = state.len(), "Demo backend listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown_rx.await.ok();
        })
        .await
        .context("Server error")?;

    tracing::info!("Demo backend shut down");
    Ok(())
}

/// A demo backend running on a background task
pub struct DemoServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

impl DemoServer {
    /// Bind an ephemeral port on 127.0.0.1 and start serving
    pub async fn start_local(state: DemoState) -> Result<Self> {
        Self::start(SocketAddr::from(([127, 0, 0, 1], 0)), state).await
    }

    pub async fn start(bind_addr: SocketAddr, state: DemoState) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .context("Failed to bind demo backend")?;
        let addr = listener.local_addr().context("Failed to read local address")?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(serve_on(listener, state, shutdown_rx));
        Ok(Self {
            addr,
            shutdown_tx,
            handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        match self.handle.await {
            Ok(Err(e)) => tracing::warn!("Demo backend error: {:#}", e),
            Err(e) => tracing::warn!("Demo backend task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("bytes=0-99", 1000), Some((0, 100)));
        assert_eq!(parse_range("bytes=0-", 10), Some((0, 10)));
        assert_eq!(parse_range("bytes=0-5000", 10), Some((0, 10)));
        assert_eq!(parse_range("bytes=0-10", 0), None);
        assert_eq!(parse_range("items=0-1", 10), None);
    }

    #[test]
    fn test_seeded_catalogue() {
        let state = DemoState::seeded(6, None);
        assert_eq!(state.len(), 6);
        let catalogue = state.catalogue();
        let unsupported = catalogue
            .videos
            .iter()
            .find(|v| v.record.id == UNSUPPORTED_ID)
            .unwrap();
        assert_eq!(unsupported.mime_type, "text/plain");
        assert!(catalogue
            .videos
            .iter()
            .any(|v| v.record.id == EMPTY_ID && v.size_bytes == 0));
    }

    #[tokio::test]
    async fn test_listing_defaults_and_auth() {
        let server = DemoServer::start_local(DemoState::seeded(12, Some("tok".into())))
            .await
            .unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/videos", server.base_url());

        let rejected = client.get(&url).send().await.unwrap();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = rejected.json().await.unwrap();
        assert_eq!(body["message"], "Authentication required");

        let listed: VideosResponse = client
            .get(&url)
            .bearer_auth("tok")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed.videos.len(), DEFAULT_LIMIT);
        assert_eq!(listed.videos[0].id, 12);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_upload_appears_first() {
        let server = DemoServer::start_local(DemoState::seeded(3, None))
            .await
            .unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/videos", server.base_url());

        let created = client
            .post(&url)
            .json(&json!({ "caption": "fresh upload" }))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let listed: VideosResponse = client.get(&url).send().await.unwrap().json().await.unwrap();
        assert_eq!(listed.videos.len(), 4);
        assert_eq!(listed.videos[0].caption.as_deref(), Some("fresh upload"));

        let blank = client
            .post(&url)
            .json(&json!({ "caption": "  " }))
            .send()
            .await
            .unwrap();
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_content_honours_range() {
        let server = DemoServer::start_local(DemoState::seeded(2, None))
            .await
            .unwrap();
        let response = reqwest::Client::new()
            .get(format!("{}/videos/1/content", server.base_url()))
            .header(header::RANGE, "bytes=0-1023")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            "video/mp4"
        );
        assert_eq!(response.bytes().await.unwrap().len(), 1024);

        server.shutdown().await;
    }
}
