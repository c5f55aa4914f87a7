//! Playback controller - per-item playback state machine
//!
//! State per mounted item:
//!
//! ```text
//! Idle -> Loading         item becomes active (media is never preloaded)
//! Loading -> Ready        media buffered, item no longer active
//! Loading -> Playing      media buffered while the item is still active
//! Ready/Paused -> Playing item becomes active again
//! Playing -> Paused       ActiveIndex moved away
//! * -> Failed(reason)     media error (Loading, Ready, Playing or Paused)
//! Failed -> Idle          explicit retry only
//! Ready/Paused -> Idle    evicted to bound buffered media
//! ```
//!
//! At most one item is ever Playing. On an ActiveIndex change the previous
//! item is paused before the new one may start, and readiness is re-checked
//! against the ActiveIndex when it arrives, not when loading began.

use super::error::{FailureReason, FeedError};
use std::collections::BTreeMap;

/// Default number of non-active items allowed to keep buffered media
pub const DEFAULT_RETAIN_BUFFERED: usize = 2;

/// Playback state of one mounted item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Failed(FailureReason),
}

impl PlaybackState {
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Failed(_) => "failed",
        }
    }

    /// Media is buffered and can start without reloading
    pub fn is_buffered(&self) -> bool {
        matches!(
            self,
            PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Paused
        )
    }
}

/// Command for the media subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCommand {
    Load { index: usize, uri: String },
    Play { index: usize },
    Pause { index: usize },
    Unload { index: usize },
}

#[derive(Debug)]
struct ItemPlayback {
    uri: String,
    state: PlaybackState,
}

/// Decides which single item may play
#[derive(Debug)]
pub struct PlaybackController {
    items: BTreeMap<usize, ItemPlayback>,
    active: Option<usize>,
    playing: Option<usize>,
    retain_buffered: usize,
}

impl PlaybackController {
    pub fn new(retain_buffered: usize) -> Self {
        Self {
            items: BTreeMap::new(),
            active: None,
            playing: None,
            retain_buffered,
        }
    }

    /// Item entered the rendering window
    pub fn mount(&mut self, index: usize, uri: impl Into<String>) -> Vec<MediaCommand> {
        if self.items.contains_key(&index) {
            return Vec::new();
        }
        self.items.insert(
            index,
            ItemPlayback {
                uri: uri.into(),
                state: PlaybackState::Idle,
            },
        );

        // Remounting the item that is still active resumes loading it
        if self.active == Some(index) {
            return self.start_loading(index).into_iter().collect();
        }
        Vec::new()
    }

    /// Item left the rendering window; its state is destroyed
    pub fn unmount(&mut self, index: usize) -> Vec<MediaCommand> {
        let Some(item) = self.items.remove(&index) else {
            return Vec::new();
        };
        if self.playing == Some(index) {
            self.playing = None;
        }
        // Failed items may still hold a finished load in the backend
        match item.state {
            PlaybackState::Idle => Vec::new(),
            _ => vec![MediaCommand::Unload { index }],
        }
    }

    /// ActiveIndex moved to `index`
    pub fn activate(&mut self, index: usize) -> Vec<MediaCommand> {
        let mut commands = Vec::new();

        // Free the playing slot before anything else may claim it
        if let Some(previous) = self.playing.filter(|&p| p != index) {
            commands.extend(self.pause(previous));
        }
        self.active = Some(index);

        match self.items.get(&index).map(|item| item.state) {
            Some(PlaybackState::Idle) => commands.extend(self.start_loading(index)),
            Some(PlaybackState::Ready) | Some(PlaybackState::Paused) => {
                commands.extend(self.play(index))
            }
            _ => {}
        }

        commands.extend(self.evict());
        self.check_invariant();
        commands
    }

    /// Media for `index` buffered enough to play
    pub fn media_ready(&mut self, index: usize) -> Vec<MediaCommand> {
        let Some(item) = self.items.get_mut(&index) else {
            tracing::debug!(index, "Ready for unmounted item ignored");
            return Vec::new();
        };
        if item.state != PlaybackState::Loading {
            tracing::debug!(index, state = item.state.label(), "Late ready ignored");
            return Vec::new();
        }
        item.state = PlaybackState::Ready;

        let mut commands = Vec::new();
        // Readiness may arrive long after the user scrolled on
        if self.active == Some(index) {
            if let Some(other) = self.playing.filter(|&p| p != index) {
                commands.extend(self.pause(other));
            }
            commands.extend(self.play(index));
        } else {
            tracing::debug!(index, active = ?self.active, "Ready but no longer active");
        }

        commands.extend(self.evict());
        self.check_invariant();
        commands
    }

    /// Media for `index` failed
    pub fn media_failed(&mut self, index: usize, reason: FailureReason) -> Vec<MediaCommand> {
        let Some(item) = self.items.get_mut(&index) else {
            return Vec::new();
        };
        let previous = item.state;
        match previous {
            PlaybackState::Loading
            | PlaybackState::Ready
            | PlaybackState::Playing
            | PlaybackState::Paused => {
                item.state = PlaybackState::Failed(reason);
            }
            PlaybackState::Idle | PlaybackState::Failed(_) => return Vec::new(),
        }

        tracing::warn!(index, "{}", FeedError::from_media(index, reason));
        if self.playing == Some(index) {
            self.playing = None;
        }
        if previous.is_buffered() {
            vec![MediaCommand::Unload { index }]
        } else {
            Vec::new()
        }
    }

    /// User asked to retry a failed item
    ///
    /// Returns `None` when the item is not Failed; nothing else ever leaves Failed.
    pub fn retry(&mut self, index: usize) -> Option<Vec<MediaCommand>> {
        let item = self.items.get_mut(&index)?;
        if !matches!(item.state, PlaybackState::Failed(_)) {
            return None;
        }
        item.state = PlaybackState::Idle;

        let mut commands = vec![MediaCommand::Unload { index }];
        if self.active == Some(index) {
            commands.extend(self.start_loading(index));
        }
        Some(commands)
    }

    /// Unload everything (feed torn down or session reset)
    pub fn teardown(&mut self) -> Vec<MediaCommand> {
        let commands = self
            .items
            .iter()
            .filter(|(_, item)| item.state != PlaybackState::Idle)
            .map(|(&index, _)| MediaCommand::Unload { index })
            .collect();
        self.items.clear();
        self.active = None;
        self.playing = None;
        commands
    }

    pub fn state(&self, index: usize) -> Option<PlaybackState> {
        self.items.get(&index).map(|item| item.state)
    }

    #[cfg(test)]
    pub fn playing_index(&self) -> Option<usize> {
        self.playing
    }

    #[cfg(test)]
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    #[cfg(test)]
    pub fn mounted(&self) -> impl Iterator<Item = (usize, PlaybackState)> + '_ {
        self.items.iter().map(|(&index, item)| (index, item.state))
    }

    /// Number of items in Playing (never more than one)
    pub fn playing_count(&self) -> usize {
        self.items
            .values()
            .filter(|item| item.state == PlaybackState::Playing)
            .count()
    }

    /// Number of items holding buffered media
    #[cfg(test)]
    pub fn buffered_count(&self) -> usize {
        self.items
            .values()
            .filter(|item| item.state.is_buffered())
            .count()
    }

    fn start_loading(&mut self, index: usize) -> Option<MediaCommand> {
        let item = self.items.get_mut(&index)?;
        item.state = PlaybackState::Loading;
        tracing::debug!(index, "Loading media");
        Some(MediaCommand::Load {
            index,
            uri: item.uri.clone(),
        })
    }

    fn play(&mut self, index: usize) -> Option<MediaCommand> {
        let item = self.items.get_mut(&index)?;
        item.state = PlaybackState::Playing;
        self.playing = Some(index);
        tracing::debug!(index, "Playing");
        Some(MediaCommand::Play { index })
    }

    fn pause(&mut self, index: usize) -> Option<MediaCommand> {
        self.playing = None;
        let item = self.items.get_mut(&index)?;
        if item.state != PlaybackState::Playing {
            return None;
        }
        item.state = PlaybackState::Paused;
        tracing::debug!(index, "Paused");
        Some(MediaCommand::Pause { index })
    }

    /// Keep only the `retain_buffered` non-active buffered items nearest to the ActiveIndex
    fn evict(&mut self) -> Vec<MediaCommand> {
        let Some(active) = self.active else {
            return Vec::new();
        };

        let mut buffered: Vec<usize> = self
            .items
            .iter()
            .filter(|(&index, item)| {
                index != active
                    && matches!(item.state, PlaybackState::Ready | PlaybackState::Paused)
            })
            .map(|(&index, _)| index)
            .collect();
        buffered.sort_by_key(|&index| (index.abs_diff(active), index));

        buffered
            .into_iter()
            .skip(self.retain_buffered)
            .filter_map(|index| {
                let item = self.items.get_mut(&index)?;
                item.state = PlaybackState::Idle;
                tracing::debug!(index, active, "Evicted buffered media");
                Some(MediaCommand::Unload { index })
            })
            .collect()
    }

    fn check_invariant(&self) {
        debug_assert!(
            self.playing_count() <= 1,
            "more than one item playing: {:?}",
            self.items
        );
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new(DEFAULT_RETAIN_BUFFERED)
    }
}
