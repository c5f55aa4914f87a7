//! Feed scenario tests
//!
//! These drive the [`Feed`] the way the runtime does: every effect is
//! collected, fetch completions are delivered by hand, and media readiness is
//! injected at chosen points to reproduce races between scrolling and data.

use super::*;
use crate::feed::page_store::tests::records;
use std::collections::BTreeSet;

fn feed() -> Feed {
    Feed::with_settings(FeedSettings::default(), SessionContext::anonymous())
}

fn fetches(effects: &[FeedEffect]) -> Vec<PageRequest> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            FeedEffect::Fetch(request) => Some(*request),
            _ => None,
        })
        .collect()
}

fn load(feed: &mut Feed, request: PageRequest, ids: std::ops::Range<i64>) -> Vec<FeedEffect> {
    feed.handle(FeedEvent::PageLoaded {
        request,
        result: Ok(records(ids)),
    })
}

fn mount_range(feed: &mut Feed, range: std::ops::Range<usize>) {
    for index in range {
        feed.handle(FeedEvent::Mounted(index));
    }
}

fn show(feed: &mut Feed, index: usize) -> Vec<FeedEffect> {
    feed.handle(FeedEvent::Intersections(vec![Intersection::new(index, 1.0)]))
}

#[test]
fn test_scenario_short_second_page_ends_feed() {
    let mut feed = feed();

    let first = fetches(&feed.start());
    assert_eq!(first.len(), 1);
    assert_eq!((first[0].offset, first[0].limit), (0, 5));

    assert!(fetches(&load(&mut feed, first[0], 0..5)).is_empty());
    mount_range(&mut feed, 0..5);

    for index in 0..3 {
        assert!(fetches(&show(&mut feed, index)).is_empty());
        assert!(!feed.near_end());
    }

    let second = fetches(&show(&mut feed, 3));
    assert!(feed.near_end());
    assert_eq!(second.len(), 1);
    assert_eq!((second[0].offset, second[0].limit), (5, 5));

    // In flight: the plateau does not fire again
    assert!(fetches(&show(&mut feed, 4)).is_empty());

    assert!(fetches(&load(&mut feed, second[0], 5..7)).is_empty());
    assert!(!feed.store().cursor().has_more);
    assert_eq!(feed.len(), 7);
    assert_eq!(feed.status(), FeedStatus::Exhausted);

    mount_range(&mut feed, 5..7);
    for index in [5, 6, 5, 6] {
        assert!(fetches(&show(&mut feed, index)).is_empty());
    }
}

#[test]
fn test_three_pages_then_no_fourth_fetch() {
    let mut feed = feed();
    let mut issued = Vec::new();

    let request = fetches(&feed.start())[0];
    issued.push(request);
    load(&mut feed, request, 0..5);
    assert!(feed.store().cursor().has_more);
    mount_range(&mut feed, 0..5);

    let request = fetches(&show(&mut feed, 3))[0];
    issued.push(request);
    load(&mut feed, request, 5..10);
    assert!(feed.store().cursor().has_more);
    mount_range(&mut feed, 5..10);

    let request = fetches(&show(&mut feed, 8))[0];
    issued.push(request);
    load(&mut feed, request, 10..13);
    assert!(!feed.store().cursor().has_more);
    mount_range(&mut feed, 10..13);

    for index in [11, 12, 11, 12] {
        issued.extend(fetches(&show(&mut feed, index)));
        assert!(feed.near_end());
    }

    let offsets: Vec<usize> = issued.iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![0, 5, 10]);
    assert_eq!(feed.len(), 13);
}

#[test]
fn test_stale_ready_after_quick_back_and_forth() {
    let mut feed = feed();
    let request = fetches(&feed.start())[0];
    load(&mut feed, request, 0..5);
    mount_range(&mut feed, 0..5);

    let mut effects = show(&mut feed, 0);
    effects.extend(feed.handle(FeedEvent::MediaReady(0)));
    effects.extend(show(&mut feed, 1));
    effects.extend(show(&mut feed, 0));
    effects.extend(feed.handle(FeedEvent::MediaReady(1)));

    assert!(!effects.contains(&FeedEffect::Media(MediaCommand::Play { index: 1 })));
    assert_eq!(feed.playback_state(1), Some(PlaybackState::Ready));
    assert_eq!(feed.playback_state(0), Some(PlaybackState::Playing));
    assert_eq!(feed.playback().playing_index(), Some(0));
}

#[test]
fn test_switching_pauses_before_playing() {
    let mut feed = feed();
    let request = fetches(&feed.start())[0];
    load(&mut feed, request, 0..5);
    mount_range(&mut feed, 0..5);

    show(&mut feed, 0);
    feed.handle(FeedEvent::MediaReady(0));
    show(&mut feed, 1);
    feed.handle(FeedEvent::MediaReady(1));

    let effects = show(&mut feed, 0);
    let pause = effects
        .iter()
        .position(|e| *e == FeedEffect::Media(MediaCommand::Pause { index: 1 }))
        .unwrap();
    let play = effects
        .iter()
        .position(|e| *e == FeedEffect::Media(MediaCommand::Play { index: 0 }))
        .unwrap();
    assert!(pause < play);
}

#[test]
fn test_auth_rejection_halts_until_reset() {
    let mut feed = feed();
    let request = fetches(&feed.start())[0];
    load(&mut feed, request, 0..5);
    mount_range(&mut feed, 0..5);
    show(&mut feed, 0);
    feed.handle(FeedEvent::MediaReady(0));

    let rejected = fetches(&show(&mut feed, 3))[0];
    let effects = feed.handle(FeedEvent::PageLoaded {
        request: rejected,
        result: Err(FeedError::AuthRejected),
    });
    assert!(effects.contains(&FeedEffect::Reauthenticate));
    assert!(effects.contains(&FeedEffect::Media(MediaCommand::Unload { index: 0 })));
    assert_eq!(feed.status(), FeedStatus::ReauthRequired);
    assert_eq!(feed.playback().playing_count(), 0);

    // Nothing brings fetching back except a reset
    assert!(feed.handle(FeedEvent::RetryFetch).is_empty());
    assert!(fetches(&show(&mut feed, 4)).is_empty());
    assert!(fetches(&show(&mut feed, 3)).is_empty());

    let session = SessionContext::new(Some("fresh-token".into()));
    let restarted = fetches(&feed.handle(FeedEvent::Reset(session.clone())));
    assert_eq!(restarted.len(), 1);
    assert_eq!(restarted[0].offset, 0);
    assert_eq!(restarted[0].generation, rejected.generation + 1);
    assert!(feed.is_empty());
    assert_eq!(feed.active_index(), None);
    assert_eq!(feed.session(), &session);

    // A completion from the old session is dropped
    load(&mut feed, request, 0..5);
    assert!(feed.is_empty());

    load(&mut feed, restarted[0], 0..5);
    assert_eq!(feed.len(), 5);
    assert_eq!(feed.status(), FeedStatus::Ready);
}

#[test]
fn test_rejected_session_starts_no_media() {
    let mut feed = feed();
    let request = fetches(&feed.start())[0];
    load(&mut feed, request, 0..5);
    mount_range(&mut feed, 0..5);
    show(&mut feed, 0);
    feed.handle(FeedEvent::MediaReady(0));

    let rejected = fetches(&show(&mut feed, 3))[0];
    feed.handle(FeedEvent::PageLoaded {
        request: rejected,
        result: Err(FeedError::AuthRejected),
    });
    assert_eq!(feed.active_index(), None);

    // The viewport keeps reporting while the login flow runs
    assert!(feed.handle(FeedEvent::Unmounted(4)).is_empty());
    assert!(feed.handle(FeedEvent::Mounted(4)).is_empty());
    assert!(show(&mut feed, 4).is_empty());
    assert!(feed.handle(FeedEvent::MediaReady(4)).is_empty());
    assert!(feed
        .handle(FeedEvent::MediaFailed {
            index: 4,
            reason: FailureReason::Network
        })
        .is_empty());
    assert!(feed.handle(FeedEvent::Retry(4)).is_empty());

    assert_eq!(feed.playback_state(4), None);
    assert_eq!(feed.active_index(), None);
    assert_eq!(feed.status(), FeedStatus::ReauthRequired);

    // A reset brings the feed back to life
    let restarted = fetches(&feed.handle(FeedEvent::Reset(SessionContext::new(Some(
        "fresh".into()
    )))));
    load(&mut feed, restarted[0], 0..5);
    mount_range(&mut feed, 0..5);
    assert!(matches!(
        show(&mut feed, 0)[..],
        [FeedEffect::Media(MediaCommand::Load { index: 0, .. })]
    ));
}

#[test]
fn test_network_failure_keeps_pages_and_retries_on_request() {
    let mut feed = feed();
    let request = fetches(&feed.start())[0];
    load(&mut feed, request, 0..5);
    mount_range(&mut feed, 0..5);

    let failed = fetches(&show(&mut feed, 3))[0];
    let effects = feed.handle(FeedEvent::PageLoaded {
        request: failed,
        result: Err(FeedError::NetworkFailure("connection reset".into())),
    });
    assert!(effects.is_empty());
    assert_eq!(feed.len(), 5);
    assert!(matches!(feed.status(), FeedStatus::Failed(FeedError::NetworkFailure(_))));

    // Still on the same item: no silent retry
    assert!(fetches(&show(&mut feed, 3)).is_empty());

    let retried = fetches(&feed.handle(FeedEvent::RetryFetch));
    assert_eq!(retried.len(), 1);
    assert_eq!(retried[0].offset, 5);
    assert_eq!(feed.status(), FeedStatus::Ready);
}

#[test]
fn test_failed_item_needs_explicit_retry() {
    let mut feed = feed();
    let request = fetches(&feed.start())[0];
    load(&mut feed, request, 0..5);
    mount_range(&mut feed, 0..5);

    show(&mut feed, 2);
    feed.handle(FeedEvent::MediaFailed {
        index: 2,
        reason: FailureReason::UnsupportedFormat,
    });
    let failed = Some(PlaybackState::Failed(FailureReason::UnsupportedFormat));
    assert_eq!(feed.playback_state(2), failed);
    assert_eq!(
        feed.item_error(2),
        Some(FeedError::MediaUnsupported { index: 2 })
    );
    assert_eq!(feed.item_error(1), None);

    // Scrolling away and back, late readiness: still failed
    show(&mut feed, 1);
    show(&mut feed, 2);
    feed.handle(FeedEvent::MediaReady(2));
    assert_eq!(feed.playback_state(2), failed);
    // Neighbours are unaffected
    assert_eq!(feed.playback_state(1), Some(PlaybackState::Loading));

    let effects = feed.handle(FeedEvent::Retry(2));
    assert!(effects
        .iter()
        .any(|e| matches!(e, FeedEffect::Media(MediaCommand::Load { index: 2, .. }))));
    assert_eq!(feed.playback_state(2), Some(PlaybackState::Loading));
}

#[test]
fn test_empty_backend_is_a_valid_state() {
    let mut feed = feed();
    let request = fetches(&feed.start())[0];
    assert_eq!(feed.status(), FeedStatus::Loading);

    load(&mut feed, request, 0..0);
    assert_eq!(feed.status(), FeedStatus::Empty);
    assert!(feed.handle(FeedEvent::RetryFetch).is_empty());
}

#[test]
fn test_mount_out_of_range_is_ignored() {
    let mut feed = feed();
    let request = fetches(&feed.start())[0];
    load(&mut feed, request, 0..2);
    assert!(feed.handle(FeedEvent::Mounted(9)).is_empty());
    assert_eq!(feed.playback_state(9), None);
}

#[test]
fn test_unmounted_region_cannot_become_active() {
    let mut feed = feed();
    let request = fetches(&feed.start())[0];
    load(&mut feed, request, 0..5);
    mount_range(&mut feed, 0..3);
    feed.handle(FeedEvent::Unmounted(2));

    assert!(show(&mut feed, 2).is_empty());
    assert_eq!(feed.active_index(), None);
}

/// Small deterministic generator for the scroll simulation
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n.max(1) as u64) as usize
    }
}

#[test]
fn test_rapid_scroll_never_plays_two_items() {
    const CATALOGUE: i64 = 23;

    for seed in 1..=20u64 {
        let mut rng = Lcg(seed);
        let mut feed = feed();
        let mut pending_fetches: Vec<PageRequest> = Vec::new();
        let mut pending_loads: Vec<usize> = Vec::new();
        let mut mounted: BTreeSet<usize> = BTreeSet::new();

        let mut effects = feed.start();

        for _step in 0..400 {
            for effect in effects.drain(..) {
                match effect {
                    FeedEffect::Fetch(request) => pending_fetches.push(request),
                    FeedEffect::Media(MediaCommand::Load { index, .. }) => {
                        pending_loads.push(index)
                    }
                    FeedEffect::Media(MediaCommand::Unload { index }) => {
                        pending_loads.retain(|&i| i != index)
                    }
                    FeedEffect::Media(_) | FeedEffect::Reauthenticate => {}
                }
            }

            assert!(feed.playback().playing_count() <= 1, "seed {}", seed);
            if let Some(playing) = feed.playback().playing_index() {
                assert_eq!(Some(playing), feed.active_index(), "seed {}", seed);
            }

            effects = match rng.below(6) {
                0 if !mounted.is_empty() => {
                    let visible: Vec<usize> = mounted.iter().copied().collect();
                    let batch = (0..1 + rng.below(3))
                        .map(|_| {
                            let index = visible[rng.below(visible.len())];
                            Intersection::new(index, rng.below(11) as f32 / 10.0)
                        })
                        .collect();
                    feed.handle(FeedEvent::Intersections(batch))
                }
                1 if !pending_loads.is_empty() => {
                    let index = pending_loads.swap_remove(rng.below(pending_loads.len()));
                    feed.handle(FeedEvent::MediaReady(index))
                }
                2 if !pending_loads.is_empty() && rng.below(4) == 0 => {
                    let index = pending_loads.swap_remove(rng.below(pending_loads.len()));
                    feed.handle(FeedEvent::MediaFailed {
                        index,
                        reason: FailureReason::Network,
                    })
                }
                3 if !pending_fetches.is_empty() => {
                    let request = pending_fetches.remove(0);
                    let start = (request.offset as i64).min(CATALOGUE);
                    let end = (start + request.limit as i64).min(CATALOGUE);
                    load(&mut feed, request, start..end)
                }
                4 if !feed.is_empty() => {
                    let index = rng.below(feed.len());
                    if mounted.remove(&index) {
                        feed.handle(FeedEvent::Unmounted(index))
                    } else {
                        mounted.insert(index);
                        feed.handle(FeedEvent::Mounted(index))
                    }
                }
                5 if !mounted.is_empty() => {
                    let visible: Vec<usize> = mounted.iter().copied().collect();
                    feed.handle(FeedEvent::Retry(visible[rng.below(visible.len())]))
                }
                _ => Vec::new(),
            };
        }

        assert!(feed.len() as i64 <= CATALOGUE);
    }
}
