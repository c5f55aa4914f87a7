//! Feed error taxonomy
//!
//! Pagination failures and per-item media failures are kept apart: the former
//! affect the whole feed session, the latter only ever mark one item Failed.

use std::fmt;

/// Errors surfaced by the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Transient failure while fetching a page; loaded pages stay intact
    NetworkFailure(String),
    /// The backend rejected the session; fetching stops until a reset
    AuthRejected,
    /// Media for one item could not be decoded or loaded
    MediaDecodeFailure { index: usize, reason: FailureReason },
    /// Media for one item has a format the player cannot handle
    MediaUnsupported { index: usize },
}

impl FeedError {
    /// Item-scoped error for a media failure
    pub fn from_media(index: usize, reason: FailureReason) -> Self {
        match reason {
            FailureReason::UnsupportedFormat => FeedError::MediaUnsupported { index },
            reason => FeedError::MediaDecodeFailure { index, reason },
        }
    }

    /// Whether the error ends the feed session
    pub fn is_fatal(&self) -> bool {
        matches!(self, FeedError::AuthRejected)
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::NetworkFailure(msg) => write!(f, "Network failure: {}", msg),
            FeedError::AuthRejected => write!(f, "Session rejected, please log in again"),
            FeedError::MediaDecodeFailure { reason, .. } => {
                write!(f, "Video failed to load ({})", reason)
            }
            FeedError::MediaUnsupported { .. } => write!(f, "Unsupported video format"),
        }
    }
}

impl std::error::Error for FeedError {}

/// Why a single item's media failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    Network,
    Decode,
    UnsupportedFormat,
    Aborted,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Network => "network",
            FailureReason::Decode => "decode",
            FailureReason::UnsupportedFormat => "unsupported-format",
            FailureReason::Aborted => "aborted",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_maps_to_media_unsupported() {
        assert_eq!(
            FeedError::from_media(3, FailureReason::UnsupportedFormat),
            FeedError::MediaUnsupported { index: 3 }
        );
        assert_eq!(
            FeedError::from_media(3, FailureReason::Aborted),
            FeedError::MediaDecodeFailure {
                index: 3,
                reason: FailureReason::Aborted
            }
        );
    }

    #[test]
    fn test_only_auth_rejection_is_fatal() {
        assert!(FeedError::AuthRejected.is_fatal());
        assert!(!FeedError::NetworkFailure("timeout".into()).is_fatal());
        assert!(!FeedError::MediaUnsupported { index: 0 }.is_fatal());
    }
}
