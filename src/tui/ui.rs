// UI rendering logic
//
// Cards are rendered as plain lines, one block of `card_height` lines per
// card, and the feed area shows the window of those lines starting at the
// viewport offset. A card cut off at the top or bottom is therefore clipped
// the same way a scrolled web page would be.

use super::app::App;
use crate::feed::{FeedError, FeedStatus, PlaybackState, VideoRecord};
use crate::logging::{LogEntry, LogLevel};
use crate::media::MediaBackend;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Rows of the logs panel when shown
const LOGS_HEIGHT: u16 = 8;

const ACCENT: Color = Color::Cyan;
const MUTED: Color = Color::DarkGray;

// ═══════════════════════════════════════════════════════════════════════════
// Layout
// ═══════════════════════════════════════════════════════════════════════════

struct Areas {
    title: Rect,
    feed: Rect,
    logs: Option<Rect>,
    help: Rect,
}

fn split(area: Rect, show_logs: bool) -> Areas {
    let logs_height = if show_logs { LOGS_HEIGHT } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),           // Title bar
            Constraint::Min(1),              // Feed
            Constraint::Length(logs_height), // Logs
            Constraint::Length(1),           // Help / toast
        ])
        .split(area);

    Areas {
        title: chunks[0],
        feed: chunks[1],
        logs: show_logs.then_some(chunks[2]),
        help: chunks[3],
    }
}

/// Where the card list goes for a terminal of `area`
pub fn feed_area(area: Rect, show_logs: bool) -> Rect {
    split(area, show_logs).feed
}

/// Main UI render function - called on every frame
pub fn draw(f: &mut Frame, app: &App) {
    let areas = split(f.area(), app.show_logs);

    render_title(f, areas.title, app);
    render_feed(f, areas.feed, app);
    if let Some(logs) = areas.logs {
        render_logs(f, logs, app);
    }
    render_help(f, areas.help, app);
}

// ═══════════════════════════════════════════════════════════════════════════
// Title and help bars
// ═══════════════════════════════════════════════════════════════════════════

fn status_label(status: &FeedStatus) -> (&'static str, Color) {
    match status {
        FeedStatus::Loading => ("loading", Color::Yellow),
        FeedStatus::Ready => ("ready", Color::Green),
        FeedStatus::Exhausted => ("end of feed", Color::Green),
        FeedStatus::Empty => ("empty", MUTED),
        FeedStatus::Failed(_) => ("offline", Color::Red),
        FeedStatus::ReauthRequired => ("signed out", Color::Red),
    }
}

fn render_title(f: &mut Frame, area: Rect, app: &App) {
    let feed = app.runtime.feed();
    let (label, color) = status_label(&feed.status());

    let mut spans = vec![
        Span::styled(
            " reelfeed ",
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" {} videos ", feed.len())),
        Span::styled("│", Style::default().fg(MUTED)),
        Span::styled(format!(" {} ", label), Style::default().fg(color)),
    ];
    if feed.is_fetching() {
        let frame = SPINNER[app.animation_frame % SPINNER.len()];
        spans.push(Span::styled(
            format!("{} fetching ", frame),
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(active) = feed.active_index() {
        spans.push(Span::styled("│", Style::default().fg(MUTED)));
        spans.push(Span::raw(format!(" {}/{} ", active + 1, feed.len())));
    }
    if let Some(output) = app.runtime.media().output() {
        spans.push(Span::styled(
            format!("▶ #{} ", output + 1),
            Style::default().fg(Color::Green),
        ));
    }
    spans.push(Span::styled("│", Style::default().fg(MUTED)));
    spans.push(Span::styled(
        format!(" session {} ", feed.session().fingerprint()),
        Style::default().fg(MUTED),
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_help(f: &mut Frame, area: Rect, app: &App) {
    let line = match app.toast() {
        Some(message) => Line::from(Span::styled(
            format!(" {} ", message),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        None => {
            let keys = [
                ("j/k", "scroll"),
                ("n/p", "snap"),
                ("l", "like"),
                ("c", "comment"),
                ("s", "share"),
                ("r", "retry"),
                ("a", "sign in"),
                ("g", "logs"),
                ("q", "quit"),
            ];
            let spans: Vec<Span> = keys
                .iter()
                .flat_map(|(key, action)| {
                    [
                        Span::styled(format!(" {}", key), Style::default().fg(ACCENT)),
                        Span::styled(format!(" {} ", action), Style::default().fg(MUTED)),
                    ]
                })
                .collect();
            Line::from(spans)
        }
    };
    f.render_widget(Paragraph::new(line), area);
}

// ═══════════════════════════════════════════════════════════════════════════
// Feed
// ═══════════════════════════════════════════════════════════════════════════

fn render_feed(f: &mut Frame, area: Rect, app: &App) {
    let feed = app.runtime.feed();

    if feed.is_empty() {
        render_placeholder(f, area, &feed.status());
        return;
    }

    let viewport = &app.viewport;
    let card_height = viewport.card_height();
    let rows = area.height as usize;

    let mut lines: Vec<Line> = Vec::with_capacity(rows);
    for index in viewport.visible_range() {
        let Some(video) = feed.video(index) else {
            continue;
        };
        let skip = if lines.is_empty() {
            viewport.clipped_rows(index)
        } else {
            0
        };
        lines.extend(
            card_lines(app, index, video, area.width as usize, card_height)
                .into_iter()
                .skip(skip),
        );
        if lines.len() >= rows {
            break;
        }
    }
    lines.truncate(rows);

    // Footer row under the last card
    if lines.len() < rows {
        let footer = match feed.status() {
            FeedStatus::Exhausted => "You're all caught up".to_string(),
            FeedStatus::Failed(e) => format!("{}  (r to retry)", e),
            _ if feed.is_fetching() => {
                format!("{} Loading more", SPINNER[app.animation_frame % SPINNER.len()])
            }
            _ => String::new(),
        };
        lines.push(Line::from(Span::styled(footer, Style::default().fg(MUTED))).centered());
    }

    f.render_widget(Paragraph::new(lines), area);
}

fn render_placeholder(f: &mut Frame, area: Rect, status: &FeedStatus) {
    let (message, color) = match status {
        FeedStatus::Loading => ("Loading videos…".to_string(), Color::Yellow),
        FeedStatus::Empty => ("No videos available".to_string(), MUTED),
        FeedStatus::ReauthRequired => (
            "Please log in to view videos. Press a to sign in again.".to_string(),
            Color::Red,
        ),
        FeedStatus::Failed(FeedError::NetworkFailure(reason)) => (
            format!("Error loading videos: {}\nPress r to retry.", reason),
            Color::Red,
        ),
        FeedStatus::Failed(e) => (format!("Error loading videos: {}", e), Color::Red),
        FeedStatus::Ready | FeedStatus::Exhausted => (String::new(), MUTED),
    };

    let top = area.height.saturating_sub(2) / 2;
    let centered = Rect {
        y: area.y + top,
        height: area.height - top,
        ..area
    };
    f.render_widget(
        Paragraph::new(message)
            .style(Style::default().fg(color))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        centered,
    );
}

/// Badge text and color for a playback state
fn playback_badge(index: usize, state: Option<PlaybackState>, frame: usize) -> (String, Color) {
    match state {
        Some(PlaybackState::Playing) => {
            let bar: String = (0..12)
                .map(|i| if i <= frame % 12 { '▮' } else { '▯' })
                .collect();
            (format!("▶ playing {}", bar), Color::Green)
        }
        Some(PlaybackState::Paused) => ("⏸ paused".to_string(), Color::Yellow),
        Some(PlaybackState::Ready) => ("● ready".to_string(), ACCENT),
        Some(PlaybackState::Loading) => (
            format!("{} buffering", SPINNER[frame % SPINNER.len()]),
            Color::Yellow,
        ),
        Some(PlaybackState::Failed(reason)) => (
            format!("✖ {}  (r to retry)", FeedError::from_media(index, reason)),
            Color::Red,
        ),
        Some(PlaybackState::Idle) | None => ("·".to_string(), MUTED),
    }
}

/// All `height` lines of one card, `width` columns wide
fn card_lines<'a>(
    app: &App,
    index: usize,
    video: &'a VideoRecord,
    width: usize,
    height: usize,
) -> Vec<Line<'a>> {
    let feed = app.runtime.feed();
    let active = feed.active_index() == Some(index);
    let border = Style::default().fg(if active { ACCENT } else { MUTED });
    let inner = width.saturating_sub(4);

    let body_row = |content: Vec<Span<'a>>| -> Line<'a> {
        let used: usize = content.iter().map(|s| s.content.width()).sum();
        let mut spans = vec![Span::styled("│ ", border)];
        spans.extend(content);
        spans.push(Span::raw(" ".repeat(inner.saturating_sub(used))));
        spans.push(Span::styled(" │", border));
        Line::from(spans)
    };

    let title = format!(" #{} ", index + 1);
    let top = format!(
        "╭─{}{}╮",
        title,
        "─".repeat(width.saturating_sub(3 + title.width()))
    );
    let bottom = format!("╰{}╯", "─".repeat(width.saturating_sub(2)));

    let (badge, badge_color) =
        playback_badge(index, feed.playback_state(index), app.animation_frame);
    let engagement = app.engagement(video.id);
    let heart = if engagement.liked { "♥" } else { "♡" };

    let header = vec![
        body_row(vec![Span::styled(
            truncate(video.caption.as_deref().unwrap_or("(no caption)"), inner),
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        body_row(vec![Span::styled(
            truncate(
                &format!(
                    "{} · {}",
                    video.created_at.format("%Y-%m-%d %H:%M"),
                    video.thumbnail_uri.as_deref().unwrap_or("no thumbnail")
                ),
                inner,
            ),
            Style::default().fg(MUTED),
        )]),
    ];
    let footer = vec![body_row(vec![
        Span::styled(
            format!("{} {}", heart, engagement.likes),
            Style::default().fg(if engagement.liked { Color::Red } else { Color::Gray }),
        ),
        Span::raw(format!(
            "   ✎ {}   ↗ {}",
            engagement.comments, engagement.shares
        )),
    ])];

    // Stage rows between header and footer; badge in the middle
    let stage_rows = height.saturating_sub(2 + header.len() + footer.len());
    let mut lines = Vec::with_capacity(height);
    lines.push(Line::from(Span::styled(top, border)));
    lines.extend(header);
    for row in 0..stage_rows {
        if row == stage_rows / 2 {
            let badge = truncate(&badge, inner);
            let pad = inner.saturating_sub(badge.width()) / 2;
            lines.push(body_row(vec![
                Span::raw(" ".repeat(pad)),
                Span::styled(badge, Style::default().fg(badge_color)),
            ]));
        } else {
            lines.push(body_row(Vec::new()));
        }
    }
    lines.extend(footer);
    lines.push(Line::from(Span::styled(bottom, border)));

    // Tiny terminals: keep the line count exact
    lines.truncate(height);
    while lines.len() < height {
        lines.push(Line::default());
    }
    lines
}

/// Cut `text` to at most `width` columns, marking the cut with '…'
fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

// ═══════════════════════════════════════════════════════════════════════════
// Logs
// ═══════════════════════════════════════════════════════════════════════════

fn format_log_entry(entry: &LogEntry) -> String {
    let target = entry
        .target
        .strip_prefix("reelfeed::")
        .unwrap_or(&entry.target);
    format!(
        "[{}] {:5} {}: {}",
        entry.timestamp.format("%H:%M:%S"),
        entry.level.as_str(),
        target,
        entry.message
    )
}

fn log_level_style(level: LogLevel) -> Style {
    match level {
        LogLevel::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        LogLevel::Warn => Style::default().fg(Color::Yellow),
        LogLevel::Info => Style::default().fg(Color::Gray),
        LogLevel::Debug | LogLevel::Trace => Style::default().fg(MUTED),
    }
}

fn render_logs(f: &mut Frame, area: Rect, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = app
        .log_buffer
        .recent(visible)
        .iter()
        .map(|entry| ListItem::new(format_log_entry(entry)).style(log_level_style(entry.level)))
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(MUTED))
            .title(" Logs "),
    );
    f.render_widget(list, area);
}
