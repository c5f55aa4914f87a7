// reelfeed - vertical short-video feed client for the terminal
//
// Architecture:
// - Feed core (sans-IO): pagination, visibility tracking, playback scheduling
// - Runtime (tokio): executes fetches and media commands, routes completions
// - Client (reqwest): paginated feed API and media buffering
// - TUI (ratatui): card list with snap scrolling; or a headless auto-scroller
// - Demo backend (axum): in-memory feed API for offline use

mod cli;
mod client;
mod config;
mod demo;
mod events;
mod feed;
mod headless;
mod logging;
mod media;
mod runtime;
mod tui;

use anyhow::{Context, Result};
use cli::CliAction;
use client::HttpVideoSource;
use config::Config;
use feed::{Feed, IntersectionTracker, SessionContext, VisibilityTracker};
use logging::{LogBuffer, TuiLogLayer};
use media::HttpMediaBackend;
use runtime::FeedRuntime;
use std::net::SocketAddr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Videos seeded into the in-process demo backend
const DEMO_VIDEOS: usize = 24;

/// Token the in-process demo backend expects
const DEMO_TOKEN: &str = "demo-token";

/// Initialize tracing
///
/// TUI mode captures logs into `log_buffer` (stdout would garble the
/// alternate screen); headless mode writes to stdout. File logging adds a
/// rolling JSON file on top of either. Precedence: RUST_LOG > config > "info".
fn init_logging(config: &Config, log_buffer: &LogBuffer) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.filter_directives().into());

    let tui_layer = config
        .enable_tui
        .then(|| TuiLogLayer::new(log_buffer.clone()));
    let stdout_layer = (!config.enable_tui).then(|| tracing_subscriber::fmt::layer());

    let mut guard = None;
    let file_layer = match &config.logging.file {
        Some(file) => match std::fs::create_dir_all(&file.dir) {
            Ok(()) => {
                let appender = file.rotation.appender(&file.dir, &file.prefix);
                // Writes happen on a background thread; the guard flushes on drop
                let (writer, worker_guard) = tracing_appender::non_blocking(appender);
                guard = Some(worker_guard);
                Some(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_ansi(false),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not create log directory {:?}: {}",
                    file.dir, e
                );
                None
            }
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tui_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::handle_cli();
    if let CliAction::Exit = action {
        return Ok(());
    }

    Config::ensure_config_exists();
    let mut config = Config::from_env();

    // serve-demo runs in the foreground with plain stdout logging
    if let CliAction::ServeDemo { .. } = action {
        config.enable_tui = false;
    }

    let log_buffer = LogBuffer::new();
    let _file_guard = init_logging(&config, &log_buffer);

    for warning in std::mem::take(&mut config.warnings) {
        tracing::warn!("Config: {}", warning);
    }

    if let CliAction::ServeDemo { videos, token } = action {
        let token = token.or_else(|| config.token.clone());
        return serve_demo(config.bind_addr, videos, token).await;
    }

    // Demo mode: point the client at an in-process demo backend
    let demo_server = if config.demo_mode {
        tracing::info!("Running in DEMO MODE against an in-process backend");
        let state = demo::DemoState::seeded(DEMO_VIDEOS, Some(DEMO_TOKEN.to_string()));
        let server = demo::DemoServer::start_local(state).await?;
        config.api_url = server.base_url();
        config.token = Some(DEMO_TOKEN.to_string());
        Some(server)
    } else {
        None
    };

    let result = run_client(&config, log_buffer).await;

    if let Some(server) = demo_server {
        server.shutdown().await;
    }

    tracing::info!("Shutdown complete");
    result
}

/// Build the runtime and hand it to the TUI or the headless driver
async fn run_client(config: &Config, log_buffer: LogBuffer) -> Result<()> {
    let session = SessionContext::new(config.token.clone());
    if !session.is_authenticated() {
        tracing::warn!("No token configured, requests go out without credentials");
    }
    let settings = config.feed.settings();
    tracing::info!(
        api_url = %config.api_url,
        session = %session.fingerprint(),
        page_size = settings.page_size,
        "Starting feed client"
    );

    let source = HttpVideoSource::new(&config.api_url, config.media.request_timeout())?;
    let media = HttpMediaBackend::new(
        config.media.buffer_bytes,
        config.media.request_timeout(),
        session.clone(),
    )?;

    let mut tracker = IntersectionTracker::new(settings.visibility_threshold);
    if !config.enable_tui {
        tracker.on_active_change(Box::new(|change| {
            tracing::info!(
                previous = ?change.previous,
                "Now showing item {}",
                change.current + 1
            );
        }));
    }
    let feed = Feed::new(settings, session, tracker);
    let (runtime, completions) = FeedRuntime::new(feed, source, media);

    if config.enable_tui {
        let demo_mode = config.demo_mode;
        let token_source: tui::app::TokenSource = Box::new(move || {
            if demo_mode {
                Some(DEMO_TOKEN.to_string())
            } else {
                Config::from_env().token
            }
        });
        tui::run_tui(
            runtime,
            completions,
            log_buffer,
            config.tui.card_height as usize,
            config.tui.tick(),
            token_source,
        )
        .await
        .context("TUI error")
    } else {
        tracing::info!("TUI disabled, running in headless mode");
        headless::run(runtime, completions, config.tui.autoscroll())
            .await
            .map(|_| ())
    }
}

/// `reelfeed serve-demo`: run the demo backend until Ctrl+C
async fn serve_demo(bind_addr: SocketAddr, videos: usize, token: Option<String>) -> Result<()> {
    let state = demo::DemoState::seeded(videos, token.clone());
    if token.is_none() {
        tracing::warn!("Demo backend running without authentication");
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let mut server = tokio::spawn(demo::serve(bind_addr, state, shutdown_rx));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            tracing::info!("Shutting down...");
            let _ = shutdown_tx.send(());
        }
        // Bind failure or server error before any Ctrl+C
        result = &mut server => return result.context("Demo backend task failed")?,
    }

    server.await.context("Demo backend task failed")?
}
