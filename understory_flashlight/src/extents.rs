// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-segment vertical extents with a lazily maintained prefix-sum cache.

use alloc::vec::Vec;

/// Vertical extents of consecutive segments and their running offsets.
///
/// Extents are updated one segment at a time as layouts are computed or
/// replaced; prefix sums are only recomputed from the lowest dirty segment and
/// only as far as a query needs.
#[derive(Clone, Default, Debug)]
pub struct SegmentExtents {
    extents: Vec<f64>,
    prefix_starts: Vec<f64>,
    dirty_from: Option<usize>,
}

impl SegmentExtents {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extents: Vec::new(),
            prefix_starts: Vec::new(),
            dirty_from: Some(0),
        }
    }

    /// Number of segments tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extents.len()
    }

    /// Returns `true` if no segment is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }

    /// Drops every tracked segment.
    pub fn clear(&mut self) {
        self.extents.clear();
        self.prefix_starts.clear();
        self.dirty_from = Some(0);
    }

    /// Truncates to the first `len` segments.
    pub fn truncate(&mut self, len: usize) {
        self.extents.truncate(len);
        self.prefix_starts.truncate(len);
        self.dirty_from = Some(self.dirty_from.unwrap_or(len).min(len));
    }

    /// Appends the extent of the next segment.
    pub fn push(&mut self, extent: f64) {
        let index = self.extents.len();
        self.extents.push(clamp_extent(extent));
        self.prefix_starts.push(0.0);
        self.dirty_from = Some(self.dirty_from.unwrap_or(index).min(index));
    }

    /// Replaces the extent of `segment` and marks offsets dirty from it.
    ///
    /// Segments that are not tracked yet are ignored.
    pub fn set_extent(&mut self, segment: usize, extent: f64) {
        let Some(slot) = self.extents.get_mut(segment) else {
            return;
        };
        let extent = clamp_extent(extent);
        if *slot == extent {
            return;
        }
        *slot = extent;
        self.dirty_from = Some(self.dirty_from.unwrap_or(segment).min(segment));
    }

    /// Extent of `segment`, or zero if it is not tracked.
    #[must_use]
    pub fn extent_of(&self, segment: usize) -> f64 {
        self.extents.get(segment).copied().unwrap_or(0.0)
    }

    fn ensure_prefix_through(&mut self, through: usize) {
        let len = self.extents.len();
        if len == 0 || through >= len {
            return;
        }

        let dirty_from = match self.dirty_from {
            Some(d) if d <= through => d,
            _ => return,
        };

        let mut pos = if dirty_from == 0 {
            0.0
        } else {
            self.prefix_starts[dirty_from - 1] + self.extents[dirty_from - 1]
        };

        for i in dirty_from..=through {
            self.prefix_starts[i] = pos;
            pos += self.extents[i];
        }

        if through >= len - 1 {
            self.dirty_from = None;
        } else {
            self.dirty_from = Some(through + 1);
        }
    }

    /// Offset of the top of `segment`.
    ///
    /// Segments past the tracked range are placed at the end of the last one.
    pub fn offset_of(&mut self, segment: usize) -> f64 {
        let len = self.extents.len();
        if segment == 0 || len == 0 {
            return 0.0;
        }
        if segment >= len {
            return self.total();
        }
        self.ensure_prefix_through(segment);
        self.prefix_starts[segment]
    }

    /// Sum of all tracked extents.
    pub fn total(&mut self) -> f64 {
        let len = self.extents.len();
        if len == 0 {
            return 0.0;
        }
        let last = len - 1;
        self.ensure_prefix_through(last);
        self.prefix_starts[last] + self.extents[last]
    }

    /// Segment whose vertical span contains `offset`.
    ///
    /// Offsets before the first segment map to `0`, offsets past the end to
    /// the last tracked segment.
    pub fn segment_at_offset(&mut self, offset: f64) -> usize {
        let len = self.extents.len();
        if len == 0 {
            return 0;
        }
        self.ensure_prefix_through(len - 1);

        let target = offset.max(0.0);
        match self.prefix_starts.binary_search_by(|pos| {
            pos.partial_cmp(&target)
                .unwrap_or(core::cmp::Ordering::Equal)
        }) {
            // Skip zero-extent segments sharing this start.
            Ok(mut i) => {
                while i + 1 < len && self.prefix_starts[i + 1] <= target {
                    i += 1;
                }
                i
            }
            Err(i) => i.saturating_sub(1),
        }
    }
}

fn clamp_extent(extent: f64) -> f64 {
    debug_assert!(
        extent.is_finite(),
        "SegmentExtents extents must be finite; got {extent:?}"
    );
    if extent.is_sign_negative() || !extent.is_finite() {
        0.0
    } else {
        extent
    }
}

#[cfg(test)]
mod tests {
    use super::SegmentExtents;

    fn extents(values: &[f64]) -> SegmentExtents {
        let mut extents = SegmentExtents::new();
        for value in values {
            extents.push(*value);
        }
        extents
    }

    #[test]
    fn offsets_are_running_sums() {
        let mut index = extents(&[100.0, 50.0, 25.0]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.offset_of(0), 0.0);
        assert_eq!(index.offset_of(1), 100.0);
        assert_eq!(index.offset_of(2), 150.0);
        assert_eq!(index.offset_of(7), 175.0);
        assert_eq!(index.total(), 175.0);
    }

    #[test]
    fn updates_invalidate_downstream_offsets() {
        let mut index = extents(&[10.0, 10.0, 10.0, 10.0]);
        assert_eq!(index.offset_of(3), 30.0);

        index.set_extent(1, 30.0);
        assert_eq!(index.offset_of(1), 10.0);
        assert_eq!(index.offset_of(2), 40.0);
        assert_eq!(index.offset_of(3), 50.0);
        assert_eq!(index.extent_of(1), 30.0);

        // Untracked segments are ignored.
        index.set_extent(9, 5.0);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn segment_lookup_by_offset() {
        let mut index = extents(&[10.0, 0.0, 10.0, 10.0]);
        assert_eq!(index.segment_at_offset(-5.0), 0);
        assert_eq!(index.segment_at_offset(5.0), 0);
        // Segment 1 is empty and shares its start with segment 2.
        assert_eq!(index.segment_at_offset(10.0), 2);
        assert_eq!(index.segment_at_offset(25.0), 3);
        assert_eq!(index.segment_at_offset(500.0), 3);
    }

    #[test]
    fn truncate_and_clear() {
        let mut index = extents(&[10.0, 20.0, 30.0]);
        assert_eq!(index.total(), 60.0);
        index.truncate(2);
        assert_eq!(index.total(), 30.0);
        index.push(5.0);
        assert_eq!(index.offset_of(2), 30.0);
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.total(), 0.0);
    }
}
