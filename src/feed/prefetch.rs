//! Prefetch trigger - asks for the next page when the viewer nears the end
//!
//! Debounced by the page store's in-flight guard rather than a timer: while a
//! fetch is running the trigger can be evaluated any number of times without
//! issuing a second request.

use super::model::PageRequest;
use super::page_store::PageStore;

/// Default number of trailing items that count as "near the end"
pub const DEFAULT_PREFETCH_DISTANCE: usize = 2;

#[derive(Debug, Clone)]
pub struct PrefetchTrigger {
    distance: usize,
    near_end: bool,
}

impl PrefetchTrigger {
    pub fn new(distance: usize) -> Self {
        Self {
            distance: distance.max(1),
            near_end: false,
        }
    }

    /// Whether `active` is within `distance` items of the last loaded record
    pub fn is_near_end(&self, active: usize, loaded: usize) -> bool {
        if loaded == 0 {
            return false;
        }
        let remaining = (loaded - 1).saturating_sub(active);
        remaining < self.distance
    }

    /// Last computed nearEnd signal
    #[cfg(test)]
    pub fn near_end(&self) -> bool {
        self.near_end
    }

    /// Recompute nearEnd and claim the next page when it holds
    pub fn evaluate(&mut self, active: Option<usize>, store: &mut PageStore) -> Option<PageRequest> {
        self.near_end = active.is_some_and(|index| self.is_near_end(index, store.len()));
        if !self.near_end {
            return None;
        }

        let request = store.request_page()?;
        tracing::debug!(
            offset = request.offset,
            limit = request.limit,
            active = ?active,
            "Prefetching next page"
        );
        Some(request)
    }

    pub fn reset(&mut self) {
        self.near_end = false;
    }
}

impl Default for PrefetchTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_PREFETCH_DISTANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::page_store::tests::records;

    fn store_with(count: i64) -> PageStore {
        let mut store = PageStore::new(1, 5);
        let req = store.request_page().unwrap();
        store.complete(req, Ok(records(0..count))).unwrap();
        store
    }

    #[test]
    fn test_near_end_starts_two_from_the_end() {
        let trigger = PrefetchTrigger::new(2);
        assert!(!trigger.is_near_end(2, 5));
        assert!(trigger.is_near_end(3, 5));
        assert!(trigger.is_near_end(4, 5));
        assert!(!trigger.is_near_end(0, 0));
    }

    #[test]
    fn test_page_size_distance() {
        let trigger = PrefetchTrigger::new(5);
        assert!(trigger.is_near_end(0, 5));
        assert!(!trigger.is_near_end(0, 6));
    }

    #[test]
    fn test_fires_once_per_plateau() {
        let mut store = store_with(5);
        let mut trigger = PrefetchTrigger::default();

        assert!(trigger.evaluate(Some(1), &mut store).is_none());
        assert!(!trigger.near_end());

        let request = trigger.evaluate(Some(3), &mut store).unwrap();
        assert_eq!(request.offset, 5);

        // Still near the end, fetch in flight
        assert!(trigger.evaluate(Some(4), &mut store).is_none());
        assert!(trigger.near_end());
    }

    #[test]
    fn test_never_fires_once_exhausted() {
        let mut store = store_with(3);
        let mut trigger = PrefetchTrigger::default();
        assert!(trigger.evaluate(Some(2), &mut store).is_none());
        assert!(trigger.near_end());
    }

    #[test]
    fn test_no_active_item_never_fires() {
        let mut store = store_with(5);
        let mut trigger = PrefetchTrigger::default();
        assert!(trigger.evaluate(None, &mut store).is_none());
    }
}
