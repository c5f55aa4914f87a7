//! Page store - fetched pages of video records and the pagination cursor
//!
//! Pages are appended strictly in fetch order and never reordered or
//! deduplicated: if the backend returns the same id on two pages (a write
//! landed between fetches) both entries are kept.
//!
//! A single in-flight guard per store suppresses overlapping fetches. The
//! store is tagged with a generation so completions that belong to a previous
//! session (before a re-authentication reset) are recognised and dropped.

use super::error::FeedError;
use super::model::{FeedCursor, Page, PageRequest, VideoRecord};

/// Result of applying a fetch completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was applied; `exhausted` is set when it was the last one
    Appended { count: usize, exhausted: bool },
    /// The completion did not match the in-flight request and was ignored
    Stale,
}

/// Paginated store for one feed session
#[derive(Debug)]
pub struct PageStore {
    generation: u64,
    page_size: usize,
    pages: Vec<Page>,
    len: usize,
    cursor: FeedCursor,
    in_flight: Option<PageRequest>,
    last_error: Option<FeedError>,
    auth_rejected: bool,
}

impl PageStore {
    pub fn new(generation: u64, page_size: usize) -> Self {
        Self {
            generation,
            page_size: page_size.max(1),
            pages: Vec::new(),
            len: 0,
            cursor: FeedCursor::default(),
            in_flight: None,
            last_error: None,
            auth_rejected: false,
        }
    }

    /// Claim the in-flight slot for the next page
    ///
    /// Returns `None` while a fetch is already running, once the feed is
    /// exhausted, or after an auth rejection.
    pub fn request_page(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() || !self.cursor.has_more || self.auth_rejected {
            return None;
        }

        let request = PageRequest {
            generation: self.generation,
            offset: self.cursor.next_offset,
            limit: self.page_size,
        };
        self.in_flight = Some(request);
        self.last_error = None;
        Some(request)
    }

    /// Apply the completion of a fetch started by [`request_page`](Self::request_page)
    pub fn complete(
        &mut self,
        request: PageRequest,
        result: Result<Vec<VideoRecord>, FeedError>,
    ) -> Result<FetchOutcome, FeedError> {
        if self.in_flight != Some(request) {
            tracing::debug!(
                generation = request.generation,
                offset = request.offset,
                "Ignoring stale page completion"
            );
            return Ok(FetchOutcome::Stale);
        }
        self.in_flight = None;

        let videos = match result {
            Ok(videos) => videos,
            Err(FeedError::AuthRejected) => {
                self.auth_rejected = true;
                self.last_error = Some(FeedError::AuthRejected);
                return Err(FeedError::AuthRejected);
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                return Err(e);
            }
        };

        let count = videos.len();
        let exhausted = count < request.limit;

        if count > 0 {
            self.len += count;
            self.pages.push(Page {
                offset: request.offset,
                videos,
            });
        }
        self.cursor.next_offset = request.offset + count;
        if exhausted {
            self.cursor.has_more = false;
        }

        Ok(FetchOutcome::Appended { count, exhausted })
    }

    /// Record at a feed-wide index
    pub fn get(&self, index: usize) -> Option<&VideoRecord> {
        let mut remaining = index;
        for page in &self.pages {
            if remaining < page.videos.len() {
                return page.videos.get(remaining);
            }
            remaining -= page.videos.len();
        }
        None
    }

    /// All records in feed order
    #[cfg(test)]
    pub fn videos(&self) -> impl Iterator<Item = &VideoRecord> {
        self.pages.iter().flat_map(|page| page.videos.iter())
    }

    #[cfg(test)]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn cursor(&self) -> FeedCursor {
        self.cursor
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_auth_rejected(&self) -> bool {
        self.auth_rejected
    }

    /// Error from the most recent fetch, cleared when the next one starts
    pub fn last_error(&self) -> Option<&FeedError> {
        self.last_error.as_ref()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    pub(crate) fn record(id: i64) -> VideoRecord {
        VideoRecord {
            id,
            content_uri: format!("/videos/{}/content", id),
            thumbnail_uri: None,
            caption: Some(format!("clip {}", id)),
            created_at: Utc.with_ymd_and_hms(2024, 11, 2, 10, 0, 0).unwrap(),
        }
    }

    pub(crate) fn records(ids: std::ops::Range<i64>) -> Vec<VideoRecord> {
        ids.map(record).collect()
    }

    #[test]
    fn test_pages_sizes_drive_has_more() {
        let mut store = PageStore::new(1, 5);

        let req = store.request_page().unwrap();
        assert_eq!(req.offset, 0);
        store.complete(req, Ok(records(0..5))).unwrap();
        assert!(store.cursor().has_more);

        let req = store.request_page().unwrap();
        assert_eq!(req.offset, 5);
        store.complete(req, Ok(records(5..10))).unwrap();
        assert!(store.cursor().has_more);

        let req = store.request_page().unwrap();
        assert_eq!(req.offset, 10);
        let outcome = store.complete(req, Ok(records(10..13))).unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Appended {
                count: 3,
                exhausted: true
            }
        );
        assert!(!store.cursor().has_more);
        assert_eq!(store.len(), 13);

        // Exhausted for the rest of the session
        assert!(store.request_page().is_none());
    }

    #[test]
    fn test_in_flight_guard_blocks_second_request() {
        let mut store = PageStore::new(1, 5);
        let first = store.request_page();
        assert!(first.is_some());
        assert!(store.request_page().is_none());
        assert!(store.is_fetching());
    }

    #[test]
    fn test_empty_response_ends_pagination() {
        let mut store = PageStore::new(1, 5);
        let req = store.request_page().unwrap();
        store.complete(req, Ok(Vec::new())).unwrap();
        assert!(store.is_empty());
        assert!(!store.cursor().has_more);
        assert!(store.pages().is_empty());
    }

    #[test]
    fn test_network_failure_keeps_pages_and_is_retryable() {
        let mut store = PageStore::new(1, 5);
        let req = store.request_page().unwrap();
        store.complete(req, Ok(records(0..5))).unwrap();

        let req = store.request_page().unwrap();
        let err = store
            .complete(req, Err(FeedError::NetworkFailure("reset".into())))
            .unwrap_err();
        assert_eq!(err, FeedError::NetworkFailure("reset".into()));
        assert_eq!(store.len(), 5);
        assert!(store.last_error().is_some());

        // Same offset is requested again
        let retry = store.request_page().unwrap();
        assert_eq!(retry.offset, 5);
        assert!(store.last_error().is_none());
    }

    #[test]
    fn test_auth_rejection_halts_fetching() {
        let mut store = PageStore::new(1, 5);
        let req = store.request_page().unwrap();
        let err = store.complete(req, Err(FeedError::AuthRejected)).unwrap_err();
        assert!(err.is_fatal());
        assert!(store.is_auth_rejected());
        assert!(store.request_page().is_none());
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut store = PageStore::new(2, 5);
        let req = store.request_page().unwrap();

        let old_session = PageRequest {
            generation: 1,
            ..req
        };
        assert_eq!(
            store.complete(old_session, Ok(records(0..5))).unwrap(),
            FetchOutcome::Stale
        );
        assert!(store.is_empty());
        assert!(store.is_fetching());

        store.complete(req, Ok(records(0..5))).unwrap();
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_duplicate_ids_across_pages_are_kept_in_order() {
        let mut store = PageStore::new(1, 2);
        let req = store.request_page().unwrap();
        store.complete(req, Ok(vec![record(9), record(8)])).unwrap();
        let req = store.request_page().unwrap();
        store.complete(req, Ok(vec![record(8), record(7)])).unwrap();

        let ids: Vec<i64> = store.videos().map(|v| v.id).collect();
        assert_eq!(ids, vec![9, 8, 8, 7]);
        assert_eq!(store.get(2).map(|v| v.id), Some(8));
        assert_eq!(store.pages()[1].offset, 2);
        assert!(store.get(4).is_none());
    }
}
