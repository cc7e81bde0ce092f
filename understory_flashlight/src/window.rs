// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The realized slice of the grid handed to a renderer.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::Row;

/// A row together with its vertical position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRow {
    /// Top offset of the row (the top of the gap above it).
    pub top: f64,
    /// The row.
    pub row: Row,
}

impl PlacedRow {
    /// Rectangles for each item in the row.
    pub fn item_rects(&self, margin: f64) -> impl Iterator<Item = (usize, Rect)> + '_ {
        self.row.item_rects(self.top, margin)
    }
}

/// Result of a visibility query over the grid.
///
/// Hosts realize items `start..end` at the rectangles given by the rows and
/// reserve `content_extent` of scrollable height.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileWindow {
    /// First realized item (inclusive).
    pub start: usize,
    /// One past the last realized item (exclusive).
    pub end: usize,
    /// Realized rows in index order.
    pub rows: Vec<PlacedRow>,
    /// Vertical space above the first realized row.
    pub before_extent: f64,
    /// Estimated height of the whole grid.
    ///
    /// Unresolved segments contribute their placeholder height, so this grows
    /// or shrinks as data arrives.
    pub content_extent: f64,
}

impl TileWindow {
    /// Returns `true` if no item is realized.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Rectangles of every realized item.
    pub fn item_rects(&self, margin: f64) -> impl Iterator<Item = (usize, Rect)> + '_ {
        self.rows.iter().flat_map(move |row| row.item_rects(margin))
    }
}
