//! Visibility tracking - which feed item is "in view"
//!
//! The tracker is a capability the feed is handed, so the rendering layer can
//! be a terminal viewport, a virtualised list or anything else able to report
//! per-item visible fractions. Only registered regions are considered; a region
//! is unregistered as soon as its item leaves the rendering window so late
//! reports for a destroyed item have no effect.

use std::collections::BTreeSet;

/// Default fraction of an item that must be visible before it can become active
pub const DEFAULT_VISIBILITY_THRESHOLD: f32 = 0.7;

/// One viewport report for a rendered item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub index: usize,
    /// Visible share of the item's area, 0.0..=1.0
    pub visible_fraction: f32,
}

impl Intersection {
    pub fn new(index: usize, visible_fraction: f32) -> Self {
        Self {
            index,
            visible_fraction,
        }
    }
}

/// ActiveIndex moved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveChange {
    pub previous: Option<usize>,
    pub current: usize,
}

pub type ActiveChangeListener = Box<dyn FnMut(ActiveChange) + Send>;

/// Viewport membership capability consumed by the feed
pub trait VisibilityTracker: Send {
    /// Start observing the region for an item
    fn register_region(&mut self, index: usize);

    /// Stop observing the region; later reports for it are ignored
    fn unregister_region(&mut self, index: usize);

    /// Subscribe to ActiveIndex changes
    fn on_active_change(&mut self, listener: ActiveChangeListener);

    /// Apply one batch of intersection reports, returning the change if any
    fn observe(&mut self, batch: &[Intersection]) -> Option<ActiveChange>;

    /// Current ActiveIndex
    fn active_index(&self) -> Option<usize>;

    /// Drop all regions and forget the ActiveIndex
    fn reset(&mut self);
}

/// Threshold-based tracker modelled on intersection observers
///
/// Within a batch, the last report at or above the threshold wins. There is no
/// ordering by fraction or position.
pub struct IntersectionTracker {
    threshold: f32,
    regions: BTreeSet<usize>,
    active: Option<usize>,
    listeners: Vec<ActiveChangeListener>,
}

impl IntersectionTracker {
    pub fn new(threshold: f32) -> Self {
        let threshold = if threshold > 0.0 && threshold <= 1.0 {
            threshold
        } else {
            tracing::warn!(
                threshold,
                "Visibility threshold out of range, using {}",
                DEFAULT_VISIBILITY_THRESHOLD
            );
            DEFAULT_VISIBILITY_THRESHOLD
        };

        Self {
            threshold,
            regions: BTreeSet::new(),
            active: None,
            listeners: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[cfg(test)]
    pub fn is_registered(&self, index: usize) -> bool {
        self.regions.contains(&index)
    }

    #[cfg(test)]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

impl Default for IntersectionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_VISIBILITY_THRESHOLD)
    }
}

impl std::fmt::Debug for IntersectionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntersectionTracker")
            .field("threshold", &self.threshold)
            .field("regions", &self.regions)
            .field("active", &self.active)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl VisibilityTracker for IntersectionTracker {
    fn register_region(&mut self, index: usize) {
        self.regions.insert(index);
    }

    fn unregister_region(&mut self, index: usize) {
        self.regions.remove(&index);
    }

    fn on_active_change(&mut self, listener: ActiveChangeListener) {
        self.listeners.push(listener);
    }

    fn observe(&mut self, batch: &[Intersection]) -> Option<ActiveChange> {
        let candidate = batch
            .iter()
            .rev()
            .find(|entry| {
                self.regions.contains(&entry.index) && entry.visible_fraction >= self.threshold
            })?
            .index;

        if self.active == Some(candidate) {
            return None;
        }

        let change = ActiveChange {
            previous: self.active,
            current: candidate,
        };
        self.active = Some(candidate);

        for listener in &mut self.listeners {
            listener(change);
        }
        Some(change)
    }

    fn active_index(&self) -> Option<usize> {
        self.active
    }

    fn reset(&mut self) {
        self.regions.clear();
        self.active = None;
    }
}
