// Feed viewport geometry
//
// Cards are laid out back to back, `card_height` rows each, and the viewport
// scrolls over them row by row. Each sync works out which cards fall inside
// the rendering window (visible cards plus overscan) and how much of the focus
// slot each visible card covers, and turns the difference from the previous
// sync into feed events: unmounts first, then mounts, then one intersection
// batch in top-to-bottom order.

use crate::feed::{FeedEvent, Intersection};
use std::collections::BTreeSet;
use std::ops::Range;

/// Cards kept mounted beyond each edge of the viewport
pub const DEFAULT_OVERSCAN: usize = 1;

/// Events produced by one [`FeedViewport::sync`]
#[derive(Debug, Default, PartialEq)]
pub struct ViewportChanges {
    pub unmounted: Vec<usize>,
    pub mounted: Vec<usize>,
    pub intersections: Option<Vec<Intersection>>,
}

impl ViewportChanges {
    pub fn is_empty(&self) -> bool {
        self.unmounted.is_empty() && self.mounted.is_empty() && self.intersections.is_none()
    }

    pub fn into_events(self) -> Vec<FeedEvent> {
        let mut events: Vec<FeedEvent> = self
            .unmounted
            .into_iter()
            .map(FeedEvent::Unmounted)
            .collect();
        events.extend(self.mounted.into_iter().map(FeedEvent::Mounted));
        if let Some(batch) = self.intersections {
            events.push(FeedEvent::Intersections(batch));
        }
        events
    }
}

/// Row-based scroll state over a list of fixed-height cards
#[derive(Debug, Clone)]
pub struct FeedViewport {
    /// Rows scrolled past the top of the first card
    offset: usize,
    /// Configured rows per card (0 = one card per viewport)
    configured_height: usize,
    /// Rows per card in effect
    card_height: usize,
    /// Rows visible
    viewport: usize,
    /// Number of cards
    total: usize,
    overscan: usize,
    mounted: BTreeSet<usize>,
    last_batch: Vec<Intersection>,
    generation: Option<u64>,
}

impl FeedViewport {
    pub fn new(card_height: usize) -> Self {
        Self {
            offset: 0,
            configured_height: card_height,
            card_height: card_height.max(1),
            viewport: 0,
            total: 0,
            overscan: DEFAULT_OVERSCAN,
            mounted: BTreeSet::new(),
            last_batch: Vec::new(),
            generation: None,
        }
    }

    /// Call before every sync with the current card count and viewport rows
    pub fn update_dimensions(&mut self, total: usize, viewport: usize) {
        let card_height = match self.configured_height {
            0 => viewport.max(1),
            rows => rows,
        };
        if card_height != self.card_height {
            // Keep the same card at the top across a resize
            let top = self.offset / self.card_height;
            self.card_height = card_height;
            self.offset = top * card_height;
        }
        self.total = total;
        self.viewport = viewport;
        self.offset = self.offset.min(self.max_offset());
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scrolling
    // ─────────────────────────────────────────────────────────────────────

    /// Scroll by `rows` (negative = up)
    pub fn scroll_by(&mut self, rows: isize) {
        let target = if rows < 0 {
            self.offset.saturating_sub(rows.unsigned_abs())
        } else {
            self.offset.saturating_add(rows as usize)
        };
        self.offset = target.min(self.max_offset());
    }

    /// Align the next card with the top of the viewport
    pub fn snap_next(&mut self) {
        let next = self.offset / self.card_height + 1;
        self.scroll_to_card(next);
    }

    /// Align the current (or previous, if aligned) card with the top
    pub fn snap_prev(&mut self) {
        let top = self.offset / self.card_height;
        if self.offset % self.card_height == 0 {
            self.scroll_to_card(top.saturating_sub(1));
        } else {
            self.scroll_to_card(top);
        }
    }

    pub fn scroll_to_card(&mut self, index: usize) {
        self.offset = (index * self.card_height).min(self.max_offset());
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Geometry
    // ─────────────────────────────────────────────────────────────────────

    fn max_offset(&self) -> usize {
        (self.total * self.card_height).saturating_sub(self.viewport)
    }

    #[cfg(test)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn card_height(&self) -> usize {
        self.card_height
    }

    /// Cards with at least one row on screen
    pub fn visible_range(&self) -> Range<usize> {
        if self.total == 0 || self.viewport == 0 {
            return 0..0;
        }
        let start = self.offset / self.card_height;
        let end = (self.offset + self.viewport).div_ceil(self.card_height);
        start.min(self.total)..end.min(self.total)
    }

    /// Visible cards plus overscan on both sides
    pub fn window(&self) -> Range<usize> {
        let visible = self.visible_range();
        if visible.is_empty() {
            return visible;
        }
        visible.start.saturating_sub(self.overscan)..(visible.end + self.overscan).min(self.total)
    }

    /// Rows visibility is measured against: one card-sized slot, as close
    /// to the middle of the viewport as the card grid allows
    ///
    /// A card taller than the viewport measures against the whole viewport.
    fn focus_band(&self) -> Range<usize> {
        let height = self.card_height.min(self.viewport);
        let slots = (self.viewport - height) / 2 / self.card_height;
        let top = self.offset + slots * self.card_height;
        top..top + height
    }

    /// Share of the focus band covered by card `index`
    pub fn focus_fraction(&self, index: usize) -> f32 {
        if index >= self.total || self.viewport == 0 {
            return 0.0;
        }
        let band = self.focus_band();
        let top = index * self.card_height;
        let bottom = top + self.card_height;
        let overlap = bottom.min(band.end).saturating_sub(top.max(band.start));
        overlap as f32 / band.len() as f32
    }

    /// Rows of card `index` hidden above the viewport
    pub fn clipped_rows(&self, index: usize) -> usize {
        self.offset.saturating_sub(index * self.card_height)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────

    /// Diff the rendering window and visibility against the last sync
    ///
    /// A new `generation` means the feed was reset: nothing is mounted
    /// anymore and scrolling starts over from the top.
    pub fn sync(&mut self, generation: u64) -> ViewportChanges {
        if self.generation != Some(generation) {
            if self.generation.is_some() {
                self.mounted.clear();
                self.last_batch.clear();
                self.offset = 0;
            }
            self.generation = Some(generation);
        }

        let window: BTreeSet<usize> = self.window().collect();
        let unmounted: Vec<usize> = self.mounted.difference(&window).copied().collect();
        let mounted: Vec<usize> = window.difference(&self.mounted).copied().collect();
        self.mounted = window;

        let batch = self.intersection_batch();
        let intersections = if batch != self.last_batch {
            self.last_batch = batch.clone();
            Some(batch)
        } else {
            None
        };

        ViewportChanges {
            unmounted,
            mounted,
            intersections,
        }
    }

    /// Cards overlapping the focus band, top to bottom
    fn intersection_batch(&self) -> Vec<Intersection> {
        self.visible_range()
            .map(|index| Intersection::new(index, self.focus_fraction(index)))
            .filter(|entry| entry.visible_fraction > 0.0)
            .collect()
    }

    #[cfg(test)]
    pub fn is_mounted(&self, index: usize) -> bool {
        self.mounted.contains(&index)
    }
}
