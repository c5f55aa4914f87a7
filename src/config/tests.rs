//! Configuration tests

use super::*;
use std::collections::HashMap;

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip tests
// ─────────────────────────────────────────────────────────────────────────────

/// Serialized defaults parse back into the same config
#[test]
fn test_config_roundtrip_default() {
    let config = Config::default();
    let toml_str = config.to_toml();

    let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
    assert!(
        parsed.is_ok(),
        "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
        toml_str,
        parsed.err()
    );

    let reloaded = Config::layered(parsed.unwrap(), no_env);
    assert_eq!(reloaded.api_url, config.api_url);
    assert_eq!(reloaded.feed, config.feed);
    assert_eq!(reloaded.media, config.media);
    assert_eq!(reloaded.tui, config.tui);
    assert_eq!(reloaded.logging, config.logging);
    assert!(reloaded.warnings.is_empty());
}

#[test]
fn test_config_roundtrip_customised() {
    let mut config = Config::default();
    config.token = Some("abc".to_string());
    config.feed.page_size = 8;
    config.feed.visibility_threshold = 1.0;
    config.tui.card_height = 12;
    config.logging.level = "debug".to_string();
    config.logging.file = Some(logging::LogFile {
        dir: "/tmp/reelfeed-logs".into(),
        prefix: "feed".to_string(),
        rotation: logging::LogRotation::Hourly,
    });

    let file: FileConfig = toml::from_str(&config.to_toml()).unwrap();
    let reloaded = Config::layered(file, no_env);
    assert_eq!(reloaded.token.as_deref(), Some("abc"));
    assert_eq!(reloaded.feed.page_size, 8);
    assert_eq!(reloaded.feed.visibility_threshold, 1.0);
    assert_eq!(reloaded.tui.card_height, 12);
    assert_eq!(reloaded.logging, config.logging);
}

// ─────────────────────────────────────────────────────────────────────────────
// Precedence and validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_env_overrides_file() {
    let file: FileConfig = toml::from_str(
        r#"
api_url = "http://file.example/api/"
token = "from-file"

[feed]
page_size = 7
"#,
    )
    .unwrap();

    let config = Config::layered(
        file,
        env_from(&[
            ("REELFEED_TOKEN", "from-env"),
            ("REELFEED_PAGE_SIZE", "3"),
            ("REELFEED_NO_TUI", "1"),
            ("REELFEED_DEMO", "true"),
        ]),
    );
    assert_eq!(config.api_url, "http://file.example/api");
    assert_eq!(config.token.as_deref(), Some("from-env"));
    assert_eq!(config.feed.page_size, 3);
    assert!(!config.enable_tui);
    assert!(config.demo_mode);
}

#[test]
fn test_out_of_range_values_are_clamped() {
    let file: FileConfig = toml::from_str(
        r#"
bind_addr = "not an address"

[feed]
page_size = 0
visibility_threshold = 1.5
prefetch_distance = 0

[tui]
card_height = 3
tick_ms = 1
"#,
    )
    .unwrap();

    let config = Config::layered(file, env_from(&[("REELFEED_PAGE_SIZE", "lots")]));
    assert_eq!(config.feed.page_size, 1);
    assert_eq!(config.feed.visibility_threshold, 1.0);
    assert_eq!(config.feed.prefetch_distance, 1);
    assert_eq!(config.tui.card_height, tui::MIN_CARD_HEIGHT);
    assert_eq!(config.tui.tick_ms, 16);
    assert_eq!(config.bind_addr, Config::default().bind_addr);
    // bind, page-size env, page_size, threshold, prefetch, card_height, tick_ms
    assert_eq!(config.warnings.len(), 7, "{:?}", config.warnings);
}

#[test]
fn test_zero_card_height_means_full_screen() {
    let file: FileConfig = toml::from_str("[tui]\ncard_height = 0\n").unwrap();
    let config = Config::layered(file, no_env);
    assert_eq!(config.tui.card_height, 0);
    assert!(config.warnings.is_empty());
}

#[test]
fn test_feed_settings_follow_config() {
    let config = Config::default();
    let settings = config.feed.settings();
    assert_eq!(settings, crate::feed::FeedSettings::default());
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_file_logging_needs_file_table() {
    let config = Config::layered(FileConfig::default(), no_env);
    assert_eq!(config.logging.file, None);

    let file: FileConfig = toml::from_str("[logging.file]\nrotation = \"never\"\n").unwrap();
    let config = Config::layered(file, no_env);
    let log_file = config.logging.file.expect("file logging enabled");
    assert_eq!(log_file.rotation, logging::LogRotation::Never);
    assert_eq!(log_file.prefix, "reelfeed");

    let file: FileConfig = toml::from_str("[logging.file]\nenabled = false\n").unwrap();
    assert_eq!(Config::layered(file, no_env).logging.file, None);
}

#[test]
fn test_unknown_log_level_falls_back_to_info() {
    let file: FileConfig = toml::from_str("[logging]\nlevel = \"LOUD\"\n").unwrap();
    let config = Config::layered(file, no_env);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.warnings.len(), 1, "{:?}", config.warnings);

    let file: FileConfig = toml::from_str("[logging]\nlevel = \"DEBUG\"\n").unwrap();
    let config = Config::layered(file, no_env);
    assert_eq!(
        config.logging.filter_directives(),
        "reelfeed=debug,tower_http=warn,axum=warn"
    );
}

#[test]
fn test_unknown_rotation_is_a_parse_error() {
    let parsed: Result<FileConfig, _> = toml::from_str("[logging.file]\nrotation = \"weekly\"\n");
    assert!(parsed.is_err());
}
