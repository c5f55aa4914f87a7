//! Terminal UI configuration

use serde::Deserialize;
use std::time::Duration;

use super::clamped;

/// Smallest card that still fits every row of the card layout
pub const MIN_CARD_HEIGHT: u16 = 8;

/// TUI layout and timing
#[derive(Debug, Clone, PartialEq)]
pub struct TuiConfig {
    /// Rows per card; 0 makes each card fill the feed viewport
    pub card_height: u16,
    /// Redraw interval
    pub tick_ms: u64,
    /// Headless mode: time spent on each item before scrolling on
    pub autoscroll_ms: u64,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            card_height: 0,
            tick_ms: 100,
            autoscroll_ms: 1500,
        }
    }
}

/// TUI settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileTui {
    pub card_height: Option<u16>,
    pub tick_ms: Option<u64>,
    pub autoscroll_ms: Option<u64>,
}

impl TuiConfig {
    pub fn from_file(file: Option<FileTui>, warnings: &mut Vec<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        let card_height = match file.card_height.unwrap_or(defaults.card_height) {
            0 => 0,
            rows => clamped("tui.card_height", rows, MIN_CARD_HEIGHT, 200, warnings),
        };

        Self {
            card_height,
            tick_ms: clamped(
                "tui.tick_ms",
                file.tick_ms.unwrap_or(defaults.tick_ms),
                16,
                1000,
                warnings,
            ),
            autoscroll_ms: clamped(
                "tui.autoscroll_ms",
                file.autoscroll_ms.unwrap_or(defaults.autoscroll_ms),
                100,
                60_000,
                warnings,
            ),
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn autoscroll(&self) -> Duration {
        Duration::from_millis(self.autoscroll_ms)
    }
}
