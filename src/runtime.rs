//! Runtime - executes feed effects on tokio
//!
//! Owns the [`Feed`] plus its collaborators. UI input goes in through
//! [`FeedRuntime::dispatch`]; task completions come back on the receiver
//! returned by [`FeedRuntime::new`] and are fed to [`FeedRuntime::apply`] by
//! whichever loop drives the app (TUI or headless).

use crate::client::VideoSource;
use crate::events::{MediaOutcome, RuntimeEvent, COMPLETION_BUFFER};
use crate::feed::{
    Feed, FeedEffect, FeedEvent, IntersectionTracker, PageRequest, SessionContext,
    VisibilityTracker,
};
use crate::media::MediaBackend;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct FeedRuntime<S, M, T = IntersectionTracker>
where
    S: VideoSource,
    M: MediaBackend,
    T: VisibilityTracker,
{
    feed: Feed<T>,
    source: Arc<S>,
    media: M,
    completions: mpsc::Sender<RuntimeEvent>,
    reauth_requested: bool,
}

impl<S, M, T> FeedRuntime<S, M, T>
where
    S: VideoSource,
    M: MediaBackend,
    T: VisibilityTracker,
{
    /// Build the runtime and the receiver its tasks report to
    pub fn new(feed: Feed<T>, source: S, mut media: M) -> (Self, mpsc::Receiver<RuntimeEvent>) {
        let (tx, rx) = mpsc::channel(COMPLETION_BUFFER);
        media.set_session(feed.session().clone());
        let runtime = Self {
            feed,
            source: Arc::new(source),
            media,
            completions: tx,
            reauth_requested: false,
        };
        (runtime, rx)
    }

    /// Request the first page
    pub fn start(&mut self) {
        let effects = self.feed.start();
        self.run(effects);
    }

    /// Apply an event from the rendering layer
    pub fn dispatch(&mut self, event: FeedEvent) {
        let effects = self.feed.handle(event);
        self.run(effects);
    }

    /// Apply a task completion
    pub fn apply(&mut self, event: RuntimeEvent) {
        let event = match event {
            RuntimeEvent::Page { request, result } => FeedEvent::PageLoaded { request, result },
            RuntimeEvent::Media {
                index,
                load,
                outcome,
            } => {
                if !self.media.is_current(index, load) {
                    tracing::debug!(index, load, "Dropping outcome of an unloaded media load");
                    return;
                }
                match outcome {
                    MediaOutcome::Ready { buffered_bytes } => {
                        tracing::debug!(index, buffered_bytes, "Media ready");
                        FeedEvent::MediaReady(index)
                    }
                    MediaOutcome::Failed(reason) => FeedEvent::MediaFailed { index, reason },
                }
            }
        };
        self.dispatch(event);
    }

    /// Restart the feed under a new session
    pub fn reset(&mut self, session: SessionContext) {
        self.reauth_requested = false;
        let effects = self.feed.handle(FeedEvent::Reset(session));
        self.media.set_session(self.feed.session().clone());
        self.run(effects);
    }

    /// True once after the session was rejected
    pub fn take_reauth_request(&mut self) -> bool {
        std::mem::take(&mut self.reauth_requested)
    }

    pub fn feed(&self) -> &Feed<T> {
        &self.feed
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    fn run(&mut self, effects: Vec<FeedEffect>) {
        for effect in effects {
            match effect {
                FeedEffect::Fetch(request) => self.spawn_fetch(request),
                FeedEffect::Media(command) => self.media.execute(command, &self.completions),
                FeedEffect::Reauthenticate => self.reauth_requested = true,
            }
        }
    }

    fn spawn_fetch(&self, request: PageRequest) {
        let source = Arc::clone(&self.source);
        let session = self.feed.session().clone();
        let tx = self.completions.clone();

        tracing::debug!(
            generation = request.generation,
            offset = request.offset,
            limit = request.limit,
            "Fetching page"
        );
        tokio::spawn(async move {
            let result = source
                .fetch_page(&session, request.offset, request.limit)
                .await;
            let _ = tx.send(RuntimeEvent::Page { request, result }).await;
        });
    }
}
