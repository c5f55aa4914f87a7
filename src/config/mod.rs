//! Configuration for the feed client
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/reelfeed/config.toml)
//! 3. Built-in defaults (lowest priority)
//!
//! Out-of-range values are clamped; the adjustments are kept in
//! `Config::warnings` and logged once tracing is up.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod feed;
mod logging;
mod serialization;
mod tui;

#[cfg(test)]
mod tests;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (maintain public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use feed::{FeedConfig, FileFeed, FileMedia, MediaConfig};
pub use logging::{FileLogging, LoggingConfig};
pub use tui::{FileTui, TuiConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_API_URL: &str = "http://127.0.0.1:8787";
const DEFAULT_BIND: &str = "127.0.0.1:8787";

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the feed API
    pub api_url: String,

    /// Bearer token for the feed API (None = anonymous)
    pub token: Option<String>,

    /// Address `serve-demo` binds to
    pub bind_addr: SocketAddr,

    /// Whether to run the TUI (disabled = headless auto-scroll)
    pub enable_tui: bool,

    /// Demo mode: run against an in-process demo backend
    pub demo_mode: bool,

    /// Pagination, visibility and playback tunables
    pub feed: FeedConfig,

    /// Media buffering
    pub media: MediaConfig,

    /// Terminal UI layout and timing
    pub tui: TuiConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Values that were adjusted while loading
    pub warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            enable_tui: true,
            demo_mode: false,
            feed: FeedConfig::default(),
            media: MediaConfig::default(),
            tui: TuiConfig::default(),
            logging: LoggingConfig::default(),
            warnings: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub bind_addr: Option<String>,

    /// Optional [feed] section
    pub feed: Option<FileFeed>,

    /// Optional [media] section
    pub media: Option<FileMedia>,

    /// Optional [tui] section
    pub tui: Option<FileTui>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/reelfeed/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("reelfeed").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };
        if path.exists() {
            return;
        }
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // config is optional
            }
        }
        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load file config if it exists
    ///
    /// # Panics
    /// Exits the process if the file exists but cannot be parsed. A broken
    /// config should fail fast, not silently fall back to defaults.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                    eprintln!("║  CONFIG ERROR - Failed to parse configuration file          ║");
                    eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                    eprintln!("  File: {}\n", path.display());
                    eprintln!("  Error: {}\n", e);
                    eprintln!("  To reset, run `reelfeed config --reset`.\n");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                eprintln!("║  CONFIG ERROR - Cannot read configuration file              ║");
                eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                eprintln!("  File: {}\n", path.display());
                eprintln!("  Error: {}\n", e);
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: file -> env vars -> defaults
    pub fn from_env() -> Self {
        let env = |key: &str| std::env::var(key).ok();
        Self::layered(Self::load_file_config(), env)
    }

    /// Merge env (via `env`) over `file` over defaults
    pub(crate) fn layered(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut warnings = Vec::new();
        let flag = |key: &str| {
            env(key)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };

        // API URL: env > file > default
        let api_url = env("REELFEED_API_URL")
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        // Token: env > file
        let token = env("REELFEED_TOKEN")
            .or(file.token)
            .filter(|t| !t.trim().is_empty());

        // Demo bind address: env > file > default
        let bind = env("REELFEED_BIND")
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind.parse().unwrap_or_else(|_| {
            warnings.push(format!("Invalid bind address '{}', using {}", bind, DEFAULT_BIND));
            SocketAddr::from(([127, 0, 0, 1], 8787))
        });

        // Runtime flags: env only
        let enable_tui = !flag("REELFEED_NO_TUI");
        let demo_mode = flag("REELFEED_DEMO");

        // Page size can be overridden from env for quick experiments
        let mut file_feed = file.feed.unwrap_or_default();
        if let Some(raw) = env("REELFEED_PAGE_SIZE") {
            match raw.parse() {
                Ok(page_size) => file_feed.page_size = Some(page_size),
                Err(_) => warnings.push(format!("Ignoring REELFEED_PAGE_SIZE='{}'", raw)),
            }
        }

        let feed = FeedConfig::from_file(Some(file_feed), &mut warnings);
        let media = MediaConfig::from_file(file.media, &mut warnings);
        let tui = TuiConfig::from_file(file.tui, &mut warnings);
        let logging = LoggingConfig::from_file(file.logging, &mut warnings);

        Self {
            api_url,
            token,
            bind_addr,
            enable_tui,
            demo_mode,
            feed,
            media,
            tui,
            logging,
            warnings,
        }
    }
}

/// Clamp `value` into `min..=max`, noting any adjustment
pub(crate) fn clamped<T>(name: &str, value: T, min: T, max: T, warnings: &mut Vec<String>) -> T
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    if value < min {
        warnings.push(format!("{} = {} is below {}, using {}", name, value, min, min));
        min
    } else if value > max {
        warnings.push(format!("{} = {} is above {}, using {}", name, value, max, max));
        max
    } else {
        value
    }
}
