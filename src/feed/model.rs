//! Feed data model
//!
//! Records are immutable once fetched and owned by the page store. Wire names
//! follow the backend's camelCase JSON; the older `uri`/`thumbnail` field names
//! are accepted as aliases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend identifier of a video
pub type VideoId = i64;

/// One video in the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: VideoId,

    /// Locator of the playable content (never embedded bytes)
    #[serde(alias = "uri")]
    pub content_uri: String,

    #[serde(default, alias = "thumbnail")]
    pub thumbnail_uri: Option<String>,

    #[serde(default)]
    pub caption: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Body of `GET /videos`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideosResponse {
    /// A missing list is the same as "no results"
    #[serde(default)]
    pub videos: Vec<VideoRecord>,
}

/// A fetched page, tagged with the offset used to request it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub videos: Vec<VideoRecord>,
}

/// Pagination cursor
///
/// `has_more` only ever goes from true to false within one feed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCursor {
    pub next_offset: usize,
    pub has_more: bool,
}

impl Default for FeedCursor {
    fn default() -> Self {
        Self {
            next_offset: 0,
            has_more: true,
        }
    }
}

/// A page request issued by the store
///
/// `generation` identifies the feed session the request belongs to, so a
/// completion that arrives after a reset can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub generation: u64,
    pub offset: usize,
    pub limit: usize,
}
