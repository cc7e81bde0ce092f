// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Row layout of a whole segment.

use alloc::vec::Vec;
use core::ops::Range;

use crate::{Row, pack_row};

/// Rows of one segment, with their offsets from the segment's top.
///
/// Rows never straddle segments, so a segment's layout only depends on its
/// own items, the container width, the margin and the packing threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentLayout {
    segment: usize,
    range: Range<usize>,
    rows: Vec<Row>,
    /// Offset of each row from the segment top.
    row_tops: Vec<f64>,
    extent: f64,
    placeholder: bool,
}

impl SegmentLayout {
    /// Packs the items in `range` into rows.
    ///
    /// `aspect_ratio_of` returns the aspect ratio to lay an item out with, or
    /// `None` if the item is missing; packing stops at the first missing item.
    pub(crate) fn pack(
        segment: usize,
        range: Range<usize>,
        mut aspect_ratio_of: impl FnMut(usize) -> Option<f64>,
        threshold: f64,
        container_width: f64,
        margin: f64,
        placeholder: bool,
    ) -> Self {
        let mut rows = Vec::new();
        let mut row_tops = Vec::new();
        let mut extent = 0.0;
        let mut index = range.start;
        while index < range.end {
            let row = pack_row(
                index,
                (index..range.end).map_while(&mut aspect_ratio_of),
                threshold,
                container_width,
                margin,
            );
            if row.is_empty() {
                break;
            }
            index = row.end();
            row_tops.push(extent);
            extent += row.extent(margin);
            rows.push(row);
        }
        Self {
            segment,
            range: range.start..index,
            rows,
            row_tops,
            extent,
            placeholder,
        }
    }

    /// Segment index.
    #[must_use]
    pub const fn segment(&self) -> usize {
        self.segment
    }

    /// Item range covered by the rows.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Rows in index order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Total vertical extent of the segment's rows.
    #[must_use]
    pub const fn extent(&self) -> f64 {
        self.extent
    }

    /// Returns `true` if this layout was computed before the segment resolved.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Position of the row containing `index`, and its offset from the segment top.
    #[must_use]
    pub fn row_containing(&self, index: usize) -> Option<(usize, f64)> {
        if !self.range.contains(&index) {
            return None;
        }
        let position = self.rows.partition_point(|row| row.end() <= index);
        let top = self.row_tops.get(position).copied()?;
        Some((position, top))
    }

    /// The row starting exactly at `index`, with its offset from the segment top.
    #[must_use]
    pub fn row_starting_at(&self, index: usize) -> Option<(&Row, f64)> {
        let (position, top) = self.row_containing(index)?;
        let row = &self.rows[position];
        (row.start() == index).then_some((row, top))
    }
}
