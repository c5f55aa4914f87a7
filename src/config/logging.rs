//! Logging configuration
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [logging.file]
//! enabled = true
//! dir = "./logs"
//! rotation = "daily"
//! ```
//!
//! A missing `[logging.file]` table, or `enabled = false`, keeps logs in the
//! TUI buffer (or on stdout when headless).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{self, RollingFileAppender};

/// Levels accepted for `logging.level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

const DEFAULT_LEVEL: &str = "info";

/// How often the JSON log file rolls over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl LogRotation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Never => "never",
        }
    }

    pub fn appender(self, dir: &Path, prefix: &str) -> RollingFileAppender {
        match self {
            Self::Hourly => rolling::hourly(dir, prefix),
            Self::Daily => rolling::daily(dir, prefix),
            Self::Never => rolling::never(dir, prefix),
        }
    }
}

/// Rolling JSON log file
#[derive(Debug, Clone, PartialEq)]
pub struct LogFile {
    pub dir: PathBuf,
    /// "reelfeed" -> reelfeed.2024-01-15
    pub prefix: String,
    pub rotation: LogRotation,
}

impl Default for LogFile {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./logs"),
            prefix: "reelfeed".to_string(),
            rotation: LogRotation::Daily,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level for reelfeed's own targets, one of [`LOG_LEVELS`]
    pub level: String,
    /// File output on top of the TUI buffer or stdout
    pub file: Option<LogFile>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            file: None,
        }
    }
}

/// `[logging]` as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileLogging {
    pub level: Option<String>,
    pub file: Option<FileLogFile>,
}

/// `[logging.file]` as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileLogFile {
    pub enabled: Option<bool>,
    pub dir: Option<String>,
    pub prefix: Option<String>,
    pub rotation: Option<LogRotation>,
}

impl LoggingConfig {
    pub fn from_file(file: Option<FileLogging>, warnings: &mut Vec<String>) -> Self {
        let file = file.unwrap_or_default();

        let level = match file.level.map(|l| l.to_ascii_lowercase()) {
            Some(level) if LOG_LEVELS.contains(&level.as_str()) => level,
            Some(level) => {
                warnings.push(format!(
                    "logging.level = '{}' is not one of {}, using {}",
                    level,
                    LOG_LEVELS.join("/"),
                    DEFAULT_LEVEL
                ));
                DEFAULT_LEVEL.to_string()
            }
            None => DEFAULT_LEVEL.to_string(),
        };

        let file = file
            .file
            .filter(|f| f.enabled.unwrap_or(true))
            .map(|f| {
                let defaults = LogFile::default();
                LogFile {
                    dir: f.dir.map(PathBuf::from).unwrap_or(defaults.dir),
                    prefix: f
                        .prefix
                        .filter(|p| !p.is_empty())
                        .unwrap_or(defaults.prefix),
                    rotation: f.rotation.unwrap_or(defaults.rotation),
                }
            });

        Self { level, file }
    }

    /// `EnvFilter` directives used when RUST_LOG is unset
    pub fn filter_directives(&self) -> String {
        format!("reelfeed={},tower_http=warn,axum=warn", self.level)
    }
}
