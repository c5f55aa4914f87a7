//! Feed and media configuration

use serde::Deserialize;
use std::time::Duration;

use super::clamped;
use crate::feed::FeedSettings;

// ─────────────────────────────────────────────────────────────────────────────
// Feed
// ─────────────────────────────────────────────────────────────────────────────

/// Pagination, visibility and playback tunables
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Records requested per page
    pub page_size: usize,
    /// Visible fraction (0, 1] required to become the active item
    pub visibility_threshold: f32,
    /// Trailing items that trigger the next page fetch
    pub prefetch_distance: usize,
    /// Non-active items allowed to keep buffered media
    pub retain_buffered: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let settings = FeedSettings::default();
        Self {
            page_size: settings.page_size,
            visibility_threshold: settings.visibility_threshold,
            prefetch_distance: settings.prefetch_distance,
            retain_buffered: settings.retain_buffered,
        }
    }
}

/// Feed settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileFeed {
    pub page_size: Option<usize>,
    pub visibility_threshold: Option<f32>,
    pub prefetch_distance: Option<usize>,
    pub retain_buffered: Option<usize>,
}

impl FeedConfig {
    pub fn from_file(file: Option<FileFeed>, warnings: &mut Vec<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            page_size: clamped(
                "feed.page_size",
                file.page_size.unwrap_or(defaults.page_size),
                1,
                100,
                warnings,
            ),
            visibility_threshold: clamped(
                "feed.visibility_threshold",
                file.visibility_threshold
                    .unwrap_or(defaults.visibility_threshold),
                0.05,
                1.0,
                warnings,
            ),
            prefetch_distance: clamped(
                "feed.prefetch_distance",
                file.prefetch_distance.unwrap_or(defaults.prefetch_distance),
                1,
                100,
                warnings,
            ),
            retain_buffered: clamped(
                "feed.retain_buffered",
                file.retain_buffered.unwrap_or(defaults.retain_buffered),
                0,
                16,
                warnings,
            ),
        }
    }

    pub fn settings(&self) -> FeedSettings {
        FeedSettings {
            page_size: self.page_size,
            visibility_threshold: self.visibility_threshold,
            prefetch_distance: self.prefetch_distance,
            retain_buffered: self.retain_buffered,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Media
// ─────────────────────────────────────────────────────────────────────────────

/// Media buffering configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MediaConfig {
    /// Bytes to buffer before an item counts as ready
    pub buffer_bytes: usize,
    /// Timeout for feed and media requests
    pub request_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            buffer_bytes: 256 * 1024,
            request_timeout_secs: 15,
        }
    }
}

/// Media settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileMedia {
    pub buffer_bytes: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

impl MediaConfig {
    pub fn from_file(file: Option<FileMedia>, warnings: &mut Vec<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            buffer_bytes: clamped(
                "media.buffer_bytes",
                file.buffer_bytes.unwrap_or(defaults.buffer_bytes),
                1024,
                64 * 1024 * 1024,
                warnings,
            ),
            request_timeout_secs: clamped(
                "media.request_timeout_secs",
                file.request_timeout_secs
                    .unwrap_or(defaults.request_timeout_secs),
                1,
                600,
                warnings,
            ),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
