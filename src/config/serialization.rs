//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Render the config as a commented TOML file
    pub fn to_toml(&self) -> String {
        let token = match &self.token {
            Some(token) => format!("token = \"{}\"", token),
            None => "# token = \"...\"".to_string(),
        };
        // Written even when disabled
        let log_file = self.logging.file.clone().unwrap_or_default();

        format!(
            r#"# reelfeed configuration

# Feed API base URL (REELFEED_API_URL overrides)
api_url = "{api_url}"

# Bearer token for the feed API (REELFEED_TOKEN overrides)
{token}

# Address for `reelfeed serve-demo` (REELFEED_BIND overrides)
bind_addr = "{bind}"

# Pagination, visibility and playback
[feed]
page_size = {page_size}
visibility_threshold = {threshold:?}
prefetch_distance = {prefetch}
retain_buffered = {retain}

# Media buffering
[media]
buffer_bytes = {buffer_bytes}
request_timeout_secs = {timeout}

# Terminal UI (card_height = 0 fills the screen with one card)
[tui]
card_height = {card_height}
tick_ms = {tick_ms}
autoscroll_ms = {autoscroll_ms}

# Logging (RUST_LOG overrides the level)
[logging]
level = "{log_level}"

# Rolling JSON log file, written alongside the TUI buffer or stdout
[logging.file]
enabled = {log_file_enabled}
dir = "{log_file_dir}"
prefix = "{log_file_prefix}"
rotation = "{log_file_rotation}"  # hourly, daily, never
"#,
            api_url = self.api_url,
            token = token,
            bind = self.bind_addr,
            page_size = self.feed.page_size,
            threshold = self.feed.visibility_threshold,
            prefetch = self.feed.prefetch_distance,
            retain = self.feed.retain_buffered,
            buffer_bytes = self.media.buffer_bytes,
            timeout = self.media.request_timeout_secs,
            card_height = self.tui.card_height,
            tick_ms = self.tui.tick_ms,
            autoscroll_ms = self.tui.autoscroll_ms,
            log_level = self.logging.level,
            log_file_enabled = self.logging.file.is_some(),
            log_file_dir = log_file.dir.display().to_string().replace('\\', "/"),
            log_file_prefix = log_file.prefix,
            log_file_rotation = log_file.rotation.as_str(),
        )
    }
}
