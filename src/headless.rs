// Headless mode: scroll the feed automatically and log what happens
//
// Stands in for a person scrolling: one card per viewport, advancing to the
// next card once the current one is playing (or has failed) and the dwell
// interval has passed. Runs until the feed is exhausted or Ctrl+C.

use crate::client::VideoSource;
use crate::events::RuntimeEvent;
use crate::feed::{FeedError, FeedEvent, FeedStatus, PlaybackState};
use crate::media::MediaBackend;
use crate::runtime::FeedRuntime;
use crate::tui::scroll::FeedViewport;
use anyhow::{bail, Result};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::mpsc;

/// Ticks to wait on an item that never settles before moving on
const MAX_STALLED_TICKS: u32 = 10;

/// What the driver saw over a run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub played: BTreeSet<usize>,
    pub failed: BTreeSet<usize>,
    pub skipped: BTreeSet<usize>,
    pub total: usize,
}

pub async fn run<S, M>(
    mut runtime: FeedRuntime<S, M>,
    mut completions: mpsc::Receiver<RuntimeEvent>,
    dwell: Duration,
) -> Result<RunSummary>
where
    S: VideoSource,
    M: MediaBackend,
{
    let mut viewport = FeedViewport::new(1);
    let mut summary = RunSummary::default();
    let mut stalled = 0u32;
    let mut ticker = tokio::time::interval(dwell);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    runtime.start();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Interrupted");
                break;
            }

            Some(event) = completions.recv() => {
                runtime.apply(event);
                if runtime.take_reauth_request() {
                    bail!("Session rejected by the feed API; set REELFEED_TOKEN and restart");
                }
            }

            _ = ticker.tick() => {
                match step(&mut runtime, &mut viewport, &mut summary, &mut stalled) {
                    Step::Continue => {}
                    Step::Done => break,
                }
            }
        }

        viewport.update_dimensions(runtime.feed().len(), 1);
        for event in viewport.sync(runtime.feed().generation()).into_events() {
            runtime.dispatch(event);
        }
    }

    summary.total = runtime.feed().len();
    tracing::info!(
        total = summary.total,
        played = summary.played.len(),
        failed = summary.failed.len(),
        skipped = summary.skipped.len(),
        "Headless run finished"
    );
    Ok(summary)
}

enum Step {
    Continue,
    Done,
}

fn step<S, M>(
    runtime: &mut FeedRuntime<S, M>,
    viewport: &mut FeedViewport,
    summary: &mut RunSummary,
    stalled: &mut u32,
) -> Step
where
    S: VideoSource,
    M: MediaBackend,
{
    let feed = runtime.feed();
    let status = feed.status();

    if status == FeedStatus::Empty {
        tracing::info!("No videos available");
        return Step::Done;
    }
    let Some(current) = feed.active_index() else {
        return Step::Continue;
    };

    let settled = match feed.playback_state(current) {
        Some(PlaybackState::Playing) => {
            summary.played.insert(current);
            true
        }
        Some(PlaybackState::Failed(_)) => {
            if summary.failed.insert(current) {
                if let Some(error) = feed.item_error(current) {
                    tracing::warn!(index = current, "Skipping item: {}", error);
                }
            }
            true
        }
        _ => false,
    };

    if !settled {
        *stalled += 1;
        if *stalled < MAX_STALLED_TICKS {
            return Step::Continue;
        }
        tracing::warn!(index = current, "Item did not start, moving on");
        summary.skipped.insert(current);
    }
    *stalled = 0;

    if current + 1 < feed.len() {
        viewport.snap_next();
        return Step::Continue;
    }

    match status {
        FeedStatus::Exhausted => Step::Done,
        FeedStatus::Failed(FeedError::NetworkFailure(_)) => {
            runtime.dispatch(FeedEvent::RetryFetch);
            Step::Continue
        }
        _ => Step::Continue,
    }
}
