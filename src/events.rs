// Completions that flow from background tasks back into the feed loop
//
// Fetches and media buffering run as spawned tasks. Their results come back
// through one mpsc channel and are applied by the loop one at a time, in the
// order they arrive, so they can race with newer scroll events but never
// interleave with them.

use crate::feed::{FailureReason, FeedError, PageRequest, VideoRecord};

/// Channel buffer size for completions
/// If the buffer fills up, senders wait (backpressure)
pub const COMPLETION_BUFFER: usize = 1000;

/// Result of a background task
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A page fetch finished
    Page {
        request: PageRequest,
        result: Result<Vec<VideoRecord>, FeedError>,
    },

    /// Media buffering for an item finished
    Media {
        index: usize,
        /// Identifies the load that produced this outcome
        load: u64,
        outcome: MediaOutcome,
    },
}

/// How a buffering task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOutcome {
    Ready { buffered_bytes: usize },
    Failed(FailureReason),
}
