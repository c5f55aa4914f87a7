// TUI application state
//
// Owns the feed runtime, the viewport over the card list and the purely
// local engagement counters. Input handlers translate keys into viewport
// moves or feed events; `layout_feed` runs before every frame and forwards
// whatever the viewport changed to the feed.

use super::clipboard::copy_to_clipboard;
use super::scroll::FeedViewport;
use crate::client::HttpVideoSource;
use crate::events::RuntimeEvent;
use crate::feed::model::VideoId;
use crate::feed::{FeedError, FeedEvent, FeedStatus, PlaybackState, SessionContext, VideoRecord};
use crate::logging::LogBuffer;
use crate::media::HttpMediaBackend;
use crate::runtime::FeedRuntime;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Runtime wired to the HTTP collaborators
pub type ClientRuntime = FeedRuntime<HttpVideoSource, HttpMediaBackend>;

/// Supplies a fresh token when the user re-authenticates
pub type TokenSource = Box<dyn Fn() -> Option<String> + Send>;

/// Debounce for like/share, for terminals that repeat without release events
const ACTION_DEBOUNCE: Duration = Duration::from_millis(150);

/// How long a status message stays in the help bar
const TOAST_DURATION: Duration = Duration::from_secs(3);

/// Rows moved per mouse wheel notch
const WHEEL_ROWS: isize = 3;

/// Local like/comment/share counters for one video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engagement {
    pub likes: u32,
    pub comments: u32,
    pub shares: u32,
    pub liked: bool,
}

impl Engagement {
    /// Plausible starting counts derived from the id
    pub fn seeded(id: VideoId) -> Self {
        let n = id.unsigned_abs() as u32;
        Self {
            likes: 100 + n.wrapping_mul(37) % 900,
            comments: 5 + n.wrapping_mul(13) % 90,
            shares: n.wrapping_mul(7) % 40,
            liked: false,
        }
    }

    pub fn toggle_like(&mut self) {
        if self.liked {
            self.likes = self.likes.saturating_sub(1);
        } else {
            self.likes += 1;
        }
        self.liked = !self.liked;
    }
}

pub struct App {
    pub runtime: ClientRuntime,
    pub viewport: FeedViewport,
    pub log_buffer: LogBuffer,
    pub show_logs: bool,
    pub should_quit: bool,
    /// Advances every tick (spinners)
    pub animation_frame: usize,
    engagement: HashMap<VideoId, Engagement>,
    toast: Option<(String, Instant)>,
    last_action_time: Option<Instant>,
    token_source: TokenSource,
}

impl App {
    pub fn new(
        runtime: ClientRuntime,
        log_buffer: LogBuffer,
        card_height: usize,
        token_source: TokenSource,
    ) -> Self {
        Self {
            runtime,
            viewport: FeedViewport::new(card_height),
            log_buffer,
            show_logs: false,
            should_quit: false,
            animation_frame: 0,
            engagement: HashMap::new(),
            toast: None,
            last_action_time: None,
            token_source,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Frame lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Fit the viewport to `rows` and report changes to the feed
    pub fn layout_feed(&mut self, rows: usize) {
        let feed = self.runtime.feed();
        let (len, generation) = (feed.len(), feed.generation());

        self.viewport.update_dimensions(len, rows);
        let changes = self.viewport.sync(generation);
        for event in changes.into_events() {
            self.runtime.dispatch(event);
        }
    }

    /// Apply a background completion
    pub fn apply(&mut self, event: RuntimeEvent) {
        self.runtime.apply(event);
        if self.runtime.take_reauth_request() {
            self.set_toast("Session expired: press a to sign in again");
        }
    }

    pub fn tick(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
        if let Some((_, shown)) = &self.toast {
            if shown.elapsed() > TOAST_DURATION {
                self.toast = None;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Input
    // ─────────────────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.viewport.scroll_by(1),
            KeyCode::Char('k') | KeyCode::Up => self.viewport.scroll_by(-1),
            KeyCode::Char('n') | KeyCode::Char(' ') | KeyCode::PageDown => {
                self.viewport.snap_next()
            }
            KeyCode::Char('p') | KeyCode::PageUp => self.viewport.snap_prev(),
            KeyCode::Home => self.viewport.scroll_to_top(),
            KeyCode::End => self.viewport.scroll_to_bottom(),
            KeyCode::Char('r') => self.retry(),
            KeyCode::Char('a') => self.reauthenticate(),
            KeyCode::Char('g') => self.show_logs = !self.show_logs,
            KeyCode::Char('l') if self.debounced() => self.like(),
            KeyCode::Char('c') => self.comment(),
            KeyCode::Char('s') if self.debounced() => self.share(),
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollDown => self.viewport.scroll_by(WHEEL_ROWS),
            MouseEventKind::ScrollUp => self.viewport.scroll_by(-WHEEL_ROWS),
            _ => {}
        }
    }

    fn debounced(&mut self) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last_action_time {
            if now.duration_since(last) < ACTION_DEBOUNCE {
                return false;
            }
        }
        self.last_action_time = Some(now);
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Actions
    // ─────────────────────────────────────────────────────────────────────

    /// Retry the page fetch after a network failure, else the active item
    pub fn retry(&mut self) {
        let feed = self.runtime.feed();
        if let FeedStatus::Failed(FeedError::NetworkFailure(_)) = feed.status() {
            self.runtime.dispatch(FeedEvent::RetryFetch);
            self.set_toast("Retrying…");
            return;
        }
        if let Some(index) = feed.active_index() {
            if matches!(feed.playback_state(index), Some(PlaybackState::Failed(_))) {
                self.runtime.dispatch(FeedEvent::Retry(index));
            }
        }
    }

    /// Restart the feed with whatever token is configured now
    pub fn reauthenticate(&mut self) {
        let session = SessionContext::new((self.token_source)());
        tracing::info!(session = %session.fingerprint(), "Re-authenticating");
        self.runtime.reset(session);
        self.set_toast("Signed in again, reloading feed");
    }

    fn focused_video(&self) -> Option<VideoRecord> {
        let feed = self.runtime.feed();
        feed.active_index().and_then(|i| feed.video(i)).cloned()
    }

    fn like(&mut self) {
        if let Some(video) = self.focused_video() {
            self.engagement_mut(video.id).toggle_like();
        }
    }

    fn comment(&mut self) {
        if let Some(video) = self.focused_video() {
            self.engagement_mut(video.id).comments += 1;
            self.set_toast("Comment posted");
        }
    }

    fn share(&mut self) {
        let Some(video) = self.focused_video() else {
            return;
        };
        match copy_to_clipboard(&video.content_uri) {
            Ok(()) => {
                self.engagement_mut(video.id).shares += 1;
                self.set_toast("Link copied to clipboard");
            }
            Err(e) => {
                tracing::warn!("Share failed: {:#}", e);
                self.set_toast(format!("Could not copy link: {}", e));
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read access for rendering
    // ─────────────────────────────────────────────────────────────────────

    pub fn engagement(&self, id: VideoId) -> Engagement {
        self.engagement
            .get(&id)
            .copied()
            .unwrap_or_else(|| Engagement::seeded(id))
    }

    fn engagement_mut(&mut self, id: VideoId) -> &mut Engagement {
        self.engagement
            .entry(id)
            .or_insert_with(|| Engagement::seeded(id))
    }

    pub fn toast(&self) -> Option<&str> {
        self.toast.as_ref().map(|(message, _)| message.as_str())
    }

    fn set_toast(&mut self, message: impl Into<String>) {
        self.toast = Some((message.into(), Instant::now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Feed, FeedSettings, PageRequest};
    use crate::feed::page_store::tests::records;
    use tokio::sync::mpsc;

    /// App over a backend that is never reached; pages are injected
    fn test_app() -> (App, mpsc::Receiver<RuntimeEvent>) {
        let session = SessionContext::new(Some("tok".into()));
        let feed = Feed::with_settings(FeedSettings::default(), session.clone());
        let source = HttpVideoSource::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let media =
            HttpMediaBackend::new(1024, Duration::from_secs(1), session).unwrap();
        let (runtime, rx) = FeedRuntime::new(feed, source, media);
        let app = App::new(
            runtime,
            LogBuffer::new(),
            10,
            Box::new(|| Some("fresh".to_string())),
        );
        (app, rx)
    }

    fn load_first_page(app: &mut App) {
        app.runtime.start();
        app.apply(RuntimeEvent::Page {
            request: PageRequest {
                generation: 1,
                offset: 0,
                limit: 5,
            },
            result: Ok(records(0..5)),
        });
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[tokio::test]
    async fn test_layout_activates_top_card() {
        let (mut app, _rx) = test_app();
        load_first_page(&mut app);
        assert_eq!(app.runtime.feed().len(), 5);

        app.layout_feed(10);
        assert_eq!(app.runtime.feed().active_index(), Some(0));
        assert_eq!(
            app.runtime.feed().playback_state(0),
            Some(PlaybackState::Loading)
        );

        press(&mut app, KeyCode::Char('n'));
        app.layout_feed(10);
        assert_eq!(app.runtime.feed().active_index(), Some(1));
    }

    #[tokio::test]
    async fn test_like_toggles_and_comment_counts() {
        let (mut app, _rx) = test_app();
        load_first_page(&mut app);
        app.layout_feed(10);

        let id = app.runtime.feed().video(0).unwrap().id;
        let before = app.engagement(id);
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.engagement(id).likes, before.likes + 1);
        assert!(app.engagement(id).liked);

        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.engagement(id).comments, before.comments + 1);
        assert_eq!(app.toast(), Some("Comment posted"));
    }

    #[tokio::test]
    async fn test_reauth_restarts_feed_and_viewport() {
        let (mut app, _rx) = test_app();
        load_first_page(&mut app);
        app.layout_feed(10);
        press(&mut app, KeyCode::Char('n'));
        app.layout_feed(10);

        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.runtime.feed().generation(), 2);
        assert!(app.runtime.feed().is_empty());
        assert!(app.runtime.feed().session().is_authenticated());

        app.layout_feed(10);
        assert_eq!(app.viewport.offset(), 0);
        assert_eq!(app.runtime.feed().active_index(), None);
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let (mut app, _rx) = test_app();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);

        let (mut app, _rx) = test_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_seeded_engagement_is_stable() {
        assert_eq!(Engagement::seeded(42), Engagement::seeded(42));
        let mut e = Engagement::seeded(1);
        let likes = e.likes;
        e.toggle_like();
        e.toggle_like();
        assert_eq!(e.likes, likes);
        assert!(!e.liked);
    }
}
