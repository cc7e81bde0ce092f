// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scroll-driven mapping from a vertical offset to an item index.
//!
//! The [`LayoutCursor`] remembers the first item of the row at (or above) the
//! viewport top. When the scroll offset moves forward, the cursor walks from
//! that root instead of from index zero:
//!
//! - at a segment boundary, a resolved segment whose cached extent ends at or
//!   above the target offset is skipped whole (fast path);
//! - otherwise the walk steps one row at a time (slow path).
//!
//! Moving backward repositions the root at the segment containing the target
//! offset, found through the segment prefix sums, and walks forward from there.

use crate::Row;

/// One step of a row-by-row walk.
#[derive(Debug)]
pub(crate) enum RowStep {
    /// The row starting at the requested index.
    Row(Row),
    /// No row starts at the requested index; continue at `next`.
    Skip {
        /// Index to continue from.
        next: usize,
    },
    /// The requested index is past the end of the collection.
    End,
}

/// Vertical queries the cursor walk is built on.
pub(crate) trait VerticalIndex {
    /// Number of items per segment.
    fn items_per_request(&self) -> usize;

    /// Exact item count, if known.
    fn len_bound(&self) -> Option<usize>;

    /// Gap above each row.
    fn margin(&self) -> f64;

    /// Start of the row containing `index`, and that row's top offset.
    ///
    /// Indices past a known end resolve to the last row.
    fn locate(&mut self, index: usize) -> (usize, f64);

    /// First item of the segment whose span contains `offset`.
    fn segment_start_at_offset(&mut self, offset: f64) -> usize;

    /// Extent of `segment` if it is resolved, so it can be skipped whole.
    fn resolved_extent(&mut self, segment: usize) -> Option<f64>;

    /// The row starting at `index`.
    fn step(&mut self, index: usize) -> RowStep;
}

/// Position reached by a walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Seek {
    /// First item of the row containing the target offset.
    pub(crate) index: usize,
    /// Top of that row.
    pub(crate) top: f64,
}

/// Walks forward from the row starting at `index` (whose top is `top`) to the
/// row containing `target`.
///
/// The walk stops at the last row of the collection if `target` is past it,
/// and at rows with no vertical extent.
pub(crate) fn seek<V: VerticalIndex + ?Sized>(
    vertical: &mut V,
    mut index: usize,
    mut top: f64,
    target: f64,
) -> Seek {
    let per_segment = vertical.items_per_request();
    let bound = vertical.len_bound();
    let margin = vertical.margin();
    let mut found = Seek { index, top };

    loop {
        if bound.is_some_and(|len| index >= len) {
            break;
        }

        if index % per_segment == 0 {
            let segment = index / per_segment;
            let next = index + per_segment;
            // Never skip past the last segment.
            let has_next = bound.is_none_or(|len| next < len);
            if has_next
                && let Some(extent) = vertical.resolved_extent(segment)
                && top + extent <= target
            {
                #[cfg(feature = "tracing")]
                tracing::trace!(segment, top, extent, "skipping resolved segment");
                index = next;
                top += extent;
                found = Seek { index, top };
                continue;
            }
        }

        match vertical.step(index) {
            RowStep::Row(row) => {
                found = Seek { index, top };
                let extent = row.extent(margin);
                if extent <= 0.0 || top + extent > target {
                    break;
                }
                index = row.end();
                top += extent;
            }
            RowStep::Skip { next } => {
                debug_assert!(next > index, "row walk must make progress");
                index = next;
            }
            RowStep::End => break,
        }
    }
    found
}

/// Tracks the item aligned with the viewport top.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutCursor {
    root_index: usize,
    live_top: f64,
}

impl LayoutCursor {
    /// Creates a cursor at the start of the collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root_index: 0,
            live_top: 0.0,
        }
    }

    /// First item of the row the last walk ended on.
    #[must_use]
    pub const fn root_index(&self) -> usize {
        self.root_index
    }

    /// Current scroll offset.
    #[must_use]
    pub const fn live_top(&self) -> f64 {
        self.live_top
    }

    /// Sets the scroll offset. Negative offsets clamp to zero.
    pub fn set_live_top(&mut self, live_top: f64) {
        self.live_top = if live_top.is_finite() {
            live_top.max(0.0)
        } else {
            0.0
        };
    }

    /// Repositions the root without walking.
    pub fn set_root_index(&mut self, index: usize) {
        self.root_index = index;
    }

    /// Returns the first item of the row containing the scroll offset,
    /// advancing the root to it.
    pub(crate) fn current_index<V: VerticalIndex + ?Sized>(&mut self, vertical: &mut V) -> usize {
        if let Some(len) = vertical.len_bound() {
            self.root_index = self.root_index.min(len.saturating_sub(1));
        }
        let (mut index, mut top) = vertical.locate(self.root_index);
        if self.live_top < top {
            index = vertical.segment_start_at_offset(self.live_top);
            (index, top) = vertical.locate(index);
        }
        let found = seek(vertical, index, top, self.live_top);

        #[cfg(feature = "tracing")]
        tracing::trace!(
            from = self.root_index,
            to = found.index,
            live_top = self.live_top,
            "cursor advanced"
        );

        self.root_index = found.index;
        found.index
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::{LayoutCursor, RowStep, VerticalIndex};
    use crate::pack_row;

    /// Uniform rows of `per_row` squares, each row `row_extent` tall with no margin.
    struct Uniform {
        per_segment: usize,
        per_row: usize,
        len: Option<usize>,
        resolved: Vec<bool>,
        steps: usize,
    }

    impl Uniform {
        fn row_extent(&self) -> f64 {
            10.0
        }

        fn segment_extent(&self) -> f64 {
            (self.per_segment / self.per_row) as f64 * self.row_extent()
        }
    }

    impl VerticalIndex for Uniform {
        fn items_per_request(&self) -> usize {
            self.per_segment
        }

        fn len_bound(&self) -> Option<usize> {
            self.len
        }

        fn margin(&self) -> f64 {
            0.0
        }

        fn locate(&mut self, index: usize) -> (usize, f64) {
            let row = index / self.per_row;
            (row * self.per_row, row as f64 * self.row_extent())
        }

        fn segment_start_at_offset(&mut self, offset: f64) -> usize {
            let segment = (offset / self.segment_extent()) as usize;
            segment * self.per_segment
        }

        fn resolved_extent(&mut self, segment: usize) -> Option<f64> {
            self.resolved
                .get(segment)
                .copied()
                .unwrap_or(false)
                .then(|| self.segment_extent())
        }

        fn step(&mut self, index: usize) -> RowStep {
            self.steps += 1;
            if self.len.is_some_and(|len| index >= len) {
                return RowStep::End;
            }
            // Width chosen so each square row is exactly 10 tall.
            let width = 10.0 * self.per_row as f64;
            RowStep::Row(pack_row(
                index,
                core::iter::repeat_n(1.0, self.per_row),
                self.per_row as f64,
                width,
                0.0,
            ))
        }
    }

    fn uniform(resolved: &[bool], len: Option<usize>) -> Uniform {
        Uniform {
            per_segment: 8,
            per_row: 2,
            len,
            resolved: resolved.to_vec(),
            steps: 0,
        }
    }

    #[test]
    fn walks_rows_to_the_offset() {
        let mut vertical = uniform(&[], None);
        let mut cursor = LayoutCursor::new();

        cursor.set_live_top(25.0);
        assert_eq!(cursor.current_index(&mut vertical), 4);
        assert_eq!(cursor.root_index(), 4);

        // Continues from the root rather than from zero.
        vertical.steps = 0;
        cursor.set_live_top(35.0);
        assert_eq!(cursor.current_index(&mut vertical), 6);
        assert_eq!(vertical.steps, 2);
    }

    #[test]
    fn resolved_segments_are_skipped_whole() {
        // Segments are 40 tall (4 rows of 10).
        let mut vertical = uniform(&[true, true, true, false], None);
        let mut cursor = LayoutCursor::new();

        cursor.set_live_top(135.0);
        assert_eq!(cursor.current_index(&mut vertical), 26);
        // Three skips, then two row steps inside segment 3.
        assert_eq!(vertical.steps, 2);
    }

    #[test]
    fn backward_scroll_repositions_root() {
        let mut vertical = uniform(&[], None);
        let mut cursor = LayoutCursor::new();
        cursor.set_live_top(95.0);
        assert_eq!(cursor.current_index(&mut vertical), 18);

        cursor.set_live_top(41.0);
        assert_eq!(cursor.current_index(&mut vertical), 8);
    }

    #[test]
    fn walk_stops_at_the_last_row() {
        let mut vertical = uniform(&[true, true], Some(12));
        let mut cursor = LayoutCursor::new();
        cursor.set_live_top(10_000.0);
        // Segment 1 is the last one and is never skipped past.
        assert_eq!(cursor.current_index(&mut vertical), 10);
    }

    #[test]
    fn negative_offsets_clamp() {
        let mut cursor = LayoutCursor::new();
        cursor.set_live_top(-3.0);
        assert_eq!(cursor.live_top(), 0.0);
        cursor.set_root_index(7);
        assert_eq!(cursor.root_index(), 7);
    }
}
