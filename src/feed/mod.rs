//! Feed core - pagination, visibility and playback scheduling
//!
//! The [`Feed`] is a sans-IO state machine. The rendering layer and the
//! runtime deliver [`FeedEvent`]s one at a time; each call runs to completion
//! and returns the [`FeedEffect`]s (fetches, media commands) the caller must
//! carry out. Because events are applied strictly in order, "pause previous,
//! then play next" needs no locking.

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

pub mod error;
pub mod model;
pub mod page_store;
pub mod playback;
pub mod prefetch;
pub mod session;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use error::{FailureReason, FeedError};
pub use model::{PageRequest, VideoRecord};
pub use page_store::{FetchOutcome, PageStore};
pub use playback::{MediaCommand, PlaybackController, PlaybackState};
pub use prefetch::PrefetchTrigger;
pub use session::SessionContext;
pub use visibility::{Intersection, IntersectionTracker, VisibilityTracker};

// ─────────────────────────────────────────────────────────────────────────────
// Events, effects, status
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables for one feed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedSettings {
    /// Records requested per page
    pub page_size: usize,
    /// Visible fraction required before an item becomes active
    pub visibility_threshold: f32,
    /// Trailing items that count as near the end
    pub prefetch_distance: usize,
    /// Non-active items allowed to keep buffered media
    pub retain_buffered: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: 5,
            visibility_threshold: visibility::DEFAULT_VISIBILITY_THRESHOLD,
            prefetch_distance: prefetch::DEFAULT_PREFETCH_DISTANCE,
            retain_buffered: playback::DEFAULT_RETAIN_BUFFERED,
        }
    }
}

/// Input to the feed
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Item entered the rendering window
    Mounted(usize),
    /// Item left the rendering window
    Unmounted(usize),
    /// One batch of viewport reports
    Intersections(Vec<Intersection>),
    /// A page fetch finished
    PageLoaded {
        request: PageRequest,
        result: Result<Vec<VideoRecord>, FeedError>,
    },
    /// Media for an item buffered enough to play
    MediaReady(usize),
    /// Media for an item failed
    MediaFailed { index: usize, reason: FailureReason },
    /// User retried a failed item
    Retry(usize),
    /// User retried the page fetch after a network failure
    RetryFetch,
    /// Re-authenticated: restart with a new session
    Reset(SessionContext),
}

/// Work the caller must perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEffect {
    Fetch(PageRequest),
    Media(MediaCommand),
    /// Session rejected; hand control to the login flow
    Reauthenticate,
}

/// Feed-level status for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    /// Nothing loaded yet, first page pending
    Loading,
    /// Items loaded, more may follow
    Ready,
    /// Items loaded, no more pages
    Exhausted,
    /// The backend has no videos at all (valid terminal state)
    Empty,
    /// Last fetch failed with a recoverable error
    Failed(FeedError),
    /// Session rejected; waiting for a reset
    ReauthRequired,
}

// ─────────────────────────────────────────────────────────────────────────────
// Feed
// ─────────────────────────────────────────────────────────────────────────────

/// The feed state machine
pub struct Feed<T: VisibilityTracker = IntersectionTracker> {
    settings: FeedSettings,
    session: SessionContext,
    store: PageStore,
    tracker: T,
    playback: PlaybackController,
    prefetch: PrefetchTrigger,
}

#[cfg(test)]
impl Feed<IntersectionTracker> {
    /// Feed with the threshold-based tracker
    pub fn with_settings(settings: FeedSettings, session: SessionContext) -> Self {
        let tracker = IntersectionTracker::new(settings.visibility_threshold);
        Self::new(settings, session, tracker)
    }
}

#[cfg(test)]
impl<T: VisibilityTracker> Feed<T> {
    /// Read access to the page store
    pub fn store(&self) -> &PageStore {
        &self.store
    }
}

impl<T: VisibilityTracker> Feed<T> {
    pub fn new(settings: FeedSettings, session: SessionContext, tracker: T) -> Self {
        Self {
            settings,
            session,
            store: PageStore::new(1, settings.page_size),
            tracker,
            playback: PlaybackController::new(settings.retain_buffered),
            prefetch: PrefetchTrigger::new(settings.prefetch_distance),
        }
    }

    /// Issue the first page request
    pub fn start(&mut self) -> Vec<FeedEffect> {
        tracing::info!(
            generation = self.store.generation(),
            session = %self.session.fingerprint(),
            "Starting feed"
        );
        self.store
            .request_page()
            .map(FeedEffect::Fetch)
            .into_iter()
            .collect()
    }

    /// Apply one event
    ///
    /// Once the session is rejected the feed is stopped: only `Reset` and
    /// `Unmounted` are applied until re-authentication.
    pub fn handle(&mut self, event: FeedEvent) -> Vec<FeedEffect> {
        if self.store.is_auth_rejected()
            && !matches!(event, FeedEvent::Reset(_) | FeedEvent::Unmounted(_))
        {
            tracing::debug!(?event, "Feed stopped, event ignored");
            return Vec::new();
        }

        match event {
            FeedEvent::Mounted(index) => self.on_mounted(index),
            FeedEvent::Unmounted(index) => {
                self.tracker.unregister_region(index);
                media(self.playback.unmount(index))
            }
            FeedEvent::Intersections(batch) => self.on_intersections(&batch),
            FeedEvent::PageLoaded { request, result } => self.on_page_loaded(request, result),
            FeedEvent::MediaReady(index) => media(self.playback.media_ready(index)),
            FeedEvent::MediaFailed { index, reason } => {
                media(self.playback.media_failed(index, reason))
            }
            FeedEvent::Retry(index) => match self.playback.retry(index) {
                Some(commands) => {
                    tracing::info!(index, "Retrying video");
                    media(commands)
                }
                None => Vec::new(),
            },
            FeedEvent::RetryFetch => self.on_retry_fetch(),
            FeedEvent::Reset(session) => self.reset(session),
        }
    }

    fn on_mounted(&mut self, index: usize) -> Vec<FeedEffect> {
        let Some(record) = self.store.get(index) else {
            tracing::debug!(index, "Mount for unknown item ignored");
            return Vec::new();
        };
        let uri = record.content_uri.clone();
        self.tracker.register_region(index);
        media(self.playback.mount(index, uri))
    }

    fn on_intersections(&mut self, batch: &[Intersection]) -> Vec<FeedEffect> {
        let Some(change) = self.tracker.observe(batch) else {
            return Vec::new();
        };
        tracing::debug!(
            previous = ?change.previous,
            current = change.current,
            "Active item changed"
        );

        let mut effects = media(self.playback.activate(change.current));
        effects.extend(self.evaluate_prefetch());
        effects
    }

    fn on_page_loaded(
        &mut self,
        request: PageRequest,
        result: Result<Vec<VideoRecord>, FeedError>,
    ) -> Vec<FeedEffect> {
        match self.store.complete(request, result) {
            Ok(FetchOutcome::Appended { count, exhausted }) => {
                tracing::info!(
                    offset = request.offset,
                    count,
                    total = self.store.len(),
                    exhausted,
                    "Page loaded"
                );
                self.evaluate_prefetch().into_iter().collect()
            }
            Ok(FetchOutcome::Stale) => Vec::new(),
            Err(e) if e.is_fatal() => {
                tracing::warn!(
                    session = %self.session.fingerprint(),
                    "{}",
                    e
                );
                self.tracker.reset();
                self.prefetch.reset();
                let mut effects = media(self.playback.teardown());
                effects.push(FeedEffect::Reauthenticate);
                effects
            }
            Err(e) => {
                tracing::warn!(offset = request.offset, "Page fetch failed: {}", e);
                Vec::new()
            }
        }
    }

    fn on_retry_fetch(&mut self) -> Vec<FeedEffect> {
        if !matches!(self.store.last_error(), Some(FeedError::NetworkFailure(_))) {
            return Vec::new();
        }
        tracing::info!(offset = self.store.cursor().next_offset, "Retrying page fetch");
        self.store
            .request_page()
            .map(FeedEffect::Fetch)
            .into_iter()
            .collect()
    }

    fn evaluate_prefetch(&mut self) -> Option<FeedEffect> {
        self.prefetch
            .evaluate(self.tracker.active_index(), &mut self.store)
            .map(FeedEffect::Fetch)
    }

    /// Restart with a new session: media unloaded, pages discarded
    fn reset(&mut self, session: SessionContext) -> Vec<FeedEffect> {
        let mut effects = media(self.playback.teardown());
        self.tracker.reset();
        self.prefetch.reset();

        let generation = self.store.generation() + 1;
        self.store = PageStore::new(generation, self.settings.page_size);
        self.session = session;

        effects.extend(self.start());
        effects
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read access for the rendering layer
    // ─────────────────────────────────────────────────────────────────────

    pub fn status(&self) -> FeedStatus {
        if self.store.is_auth_rejected() {
            return FeedStatus::ReauthRequired;
        }
        if let Some(error) = self.store.last_error() {
            return FeedStatus::Failed(error.clone());
        }
        let cursor = self.store.cursor();
        match (self.store.is_empty(), cursor.has_more) {
            (true, true) => FeedStatus::Loading,
            (true, false) => FeedStatus::Empty,
            (false, true) => FeedStatus::Ready,
            (false, false) => FeedStatus::Exhausted,
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn video(&self, index: usize) -> Option<&VideoRecord> {
        self.store.get(index)
    }

    #[cfg(test)]
    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn playback_state(&self, index: usize) -> Option<PlaybackState> {
        self.playback.state(index)
    }

    /// Error shown on a Failed item
    pub fn item_error(&self, index: usize) -> Option<FeedError> {
        match self.playback.state(index)? {
            PlaybackState::Failed(reason) => Some(FeedError::from_media(index, reason)),
            _ => None,
        }
    }

    pub fn active_index(&self) -> Option<usize> {
        self.tracker.active_index()
    }

    #[cfg(test)]
    pub fn near_end(&self) -> bool {
        self.prefetch.near_end()
    }

    pub fn is_fetching(&self) -> bool {
        self.store.is_fetching()
    }

    /// Identifies the current session; bumps on every reset
    pub fn generation(&self) -> u64 {
        self.store.generation()
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

}

fn media(commands: Vec<MediaCommand>) -> Vec<FeedEffect> {
    commands.into_iter().map(FeedEffect::Media).collect()
}
