// TUI module - Terminal User Interface
//
// This module manages the terminal UI using ratatui. It handles:
// - Terminal initialization and cleanup
// - Event loop (keyboard and mouse input, timer ticks, task completions)
// - Laying out the feed viewport and rendering the cards

pub mod app;
pub mod clipboard;
pub mod scroll;
pub mod ui;

use crate::events::RuntimeEvent;
use crate::logging::LogBuffer;
use anyhow::{Context, Result};
use app::{App, ClientRuntime, TokenSource};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

/// Run the TUI until the user quits
pub async fn run_tui(
    runtime: ClientRuntime,
    mut completions: mpsc::Receiver<RuntimeEvent>,
    log_buffer: LogBuffer,
    card_height: usize,
    tick: Duration,
    token_source: TokenSource,
) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let mut app = App::new(runtime, log_buffer, card_height, token_source);
    app.runtime.start();

    let result = run_event_loop(&mut terminal, &mut app, &mut completions, tick).await;

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

/// Main event loop
///
/// Before each frame the viewport is fitted to the terminal and its changes
/// go to the feed, so mounts and intersections always describe what is
/// about to be drawn.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    completions: &mut mpsc::Receiver<RuntimeEvent>,
    tick: Duration,
) -> Result<()> {
    let mut tick_interval = tokio::time::interval(tick);

    loop {
        let size = terminal.size().context("Failed to read terminal size")?;
        let feed_rows = ui::feed_area(Rect::new(0, 0, size.width, size.height), app.show_logs)
            .height as usize;
        app.layout_feed(feed_rows);

        terminal
            .draw(|f| ui::draw(f, app))
            .context("Failed to draw terminal")?;

        tokio::select! {
            // Keyboard or mouse input
            _ = async {
                if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                    match event::read() {
                        Ok(Event::Key(key)) => app.handle_key(key),
                        Ok(Event::Mouse(mouse)) => app.handle_mouse(mouse),
                        _ => {}
                    }
                }
            } => {}

            _ = tick_interval.tick() => app.tick(),

            Some(event) = completions.recv() => app.apply(event),
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
