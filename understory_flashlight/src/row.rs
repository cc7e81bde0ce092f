// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Greedy justified-row packing.
//!
//! A row takes consecutive items until their accumulated aspect ratio reaches
//! the packing threshold (the base column count), then all items in the row
//! share one height chosen so the row exactly fills the container width:
//!
//! ```text
//! working = container_width - (n + 1) * margin
//! height  = working / sum(aspect_ratio)
//! width_i = aspect_ratio_i * height
//! ```
//!
//! Packing is a single forward pass with no backtracking, so a row costs
//! `O(items in row)`. The last row of a segment may be under-filled.

use kurbo::{Rect, Size};
use smallvec::SmallVec;

use crate::segment::sanitize_aspect_ratio;

/// One item placed in a [`Row`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowItem {
    /// Item index.
    pub index: usize,
    /// Aspect ratio the item was laid out with.
    pub aspect_ratio: f64,
    /// Rendered size of the item.
    pub size: Size,
}

/// A height-justified run of consecutive items.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    start: usize,
    items: SmallVec<[RowItem; 8]>,
    aspect_ratio: f64,
    height: f64,
}

impl Row {
    /// Creates a row with no items starting at `start`.
    #[must_use]
    pub fn empty(start: usize) -> Self {
        Self {
            start,
            items: SmallVec::new(),
            aspect_ratio: 0.0,
            height: 0.0,
        }
    }

    /// Index of the first item.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// One past the index of the last item.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.items.len()
    }

    /// Number of items in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the row has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns `true` if `index` belongs to this row.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end()).contains(&index)
    }

    /// Sum of the item aspect ratios.
    #[must_use]
    pub const fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    /// Shared rendered height of every item in the row.
    #[must_use]
    pub const fn height(&self) -> f64 {
        self.height
    }

    /// Vertical space the row occupies: the gap above it plus its height.
    #[must_use]
    pub fn extent(&self, margin: f64) -> f64 {
        margin + self.height
    }

    /// Items with their computed sizes.
    #[must_use]
    pub fn items(&self) -> &[RowItem] {
        &self.items
    }

    /// Rectangles for each item, given the row's top offset.
    ///
    /// Items are placed left to right starting one margin in from the left
    /// edge, one margin below `top`.
    pub fn item_rects(&self, top: f64, margin: f64) -> impl Iterator<Item = (usize, Rect)> + '_ {
        let y = top + margin;
        let mut x = margin;
        self.items.iter().map(move |item| {
            let rect = Rect::from_origin_size((x, y), item.size);
            x += item.size.width + margin;
            (item.index, rect)
        })
    }
}

/// Packs one row starting at item `start`.
///
/// `aspect_ratios` yields the aspect ratios of items `start, start + 1, ..`
/// and is pulled lazily: packing stops as soon as the accumulated aspect
/// ratio reaches `threshold`, or when the iterator ends. Non-finite or
/// non-positive ratios are treated as placeholders.
///
/// The row height is zero when the row is empty or the container is too
/// narrow to hold its margins.
pub fn pack_row<I>(
    start: usize,
    aspect_ratios: I,
    threshold: f64,
    container_width: f64,
    margin: f64,
) -> Row
where
    I: IntoIterator<Item = f64>,
{
    let mut row = Row::empty(start);
    let mut accumulated = 0.0;
    for (offset, aspect_ratio) in aspect_ratios.into_iter().enumerate() {
        let aspect_ratio = sanitize_aspect_ratio(aspect_ratio);
        row.items.push(RowItem {
            index: start + offset,
            aspect_ratio,
            size: Size::ZERO,
        });
        accumulated += aspect_ratio;
        if accumulated >= threshold {
            break;
        }
    }

    let gutters = (row.items.len() + 1) as f64 * margin;
    let working = container_width - gutters;
    let height = if row.items.is_empty() || accumulated <= 0.0 || working <= 0.0 {
        0.0
    } else {
        working / accumulated
    };

    for item in &mut row.items {
        item.size = Size::new(item.aspect_ratio * height, height);
    }
    row.aspect_ratio = accumulated;
    row.height = height;
    row
}
