// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A controller that owns the segment cache, layouts, and scroll state of one grid.

use core::fmt;
use core::num::NonZeroUsize;

use alloc::vec::Vec;
use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use kurbo::Size;

use crate::cursor::{RowStep, VerticalIndex, seek};
use crate::{
    GridConfig, ItemDescriptor, ItemSlot, LayoutCursor, PLACEHOLDER_ASPECT_RATIO, Page,
    PageOutcome, PageRequest, PageSource, PlacedRow, Row, SegmentCache, SegmentExtents,
    SegmentLayout, SegmentView, TileWindow, base_item_size, pack_row,
};

#[derive(Debug, Clone, Copy)]
struct Geometry {
    threshold: f64,
    width: f64,
    margin: f64,
}

fn pack_segment<T: ItemDescriptor>(
    cache: &SegmentCache<T>,
    segment: usize,
    geometry: Geometry,
) -> SegmentLayout {
    let start = cache.segment_range(segment).start;
    let len = cache.segment_len(segment);
    SegmentLayout::pack(
        segment,
        start..start + len,
        |index| cache.item(index).layout_aspect_ratio(),
        geometry.threshold,
        geometry.width,
        geometry.margin,
        !cache.is_resolved(segment),
    )
}

fn sanitize_size(size: Size) -> Size {
    let clamp = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
    Size::new(clamp(size.width), clamp(size.height))
}

/// Controller for a justified-row virtual grid over a paged collection.
///
/// This type:
/// - owns a [`PageSource`] and the [`SegmentCache`] filled from it,
/// - lays out segments into rows and caches those layouts per segment,
/// - keeps per-segment extents so offsets are available without laying out
///   every segment,
/// - tracks the scroll offset with a [`LayoutCursor`],
/// - caches the last computed [`TileWindow`].
///
/// It does not draw anything; hosts feed it resize, scroll and fetch
/// completion events and render the window it returns.
pub struct FlashlightGrid<S: PageSource> {
    config: GridConfig,
    source: S,
    cache: SegmentCache<S::Item>,
    layouts: HashMap<usize, SegmentLayout>,
    extents: SegmentExtents,
    /// Placeholder extent of a full segment at the current width.
    full_placeholder_extent: Option<f64>,
    cursor: LayoutCursor,
    container: Size,
    columns: NonZeroUsize,
    overscan: f64,

    dirty: bool,
    last_window: TileWindow,
}

impl<S: PageSource> fmt::Debug for FlashlightGrid<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlashlightGrid")
            .field("config", &self.config)
            .field("container", &self.container)
            .field("columns", &self.columns)
            .field("cursor", &self.cursor)
            .field("resolved_segments", &self.cache.resolved_count())
            .field("pending_segments", &self.cache.pending_count())
            .field("cached_layouts", &self.layouts.len())
            .finish_non_exhaustive()
    }
}

impl<S: PageSource> FlashlightGrid<S> {
    /// Creates a grid with a zero-sized container.
    ///
    /// Nothing is requested from `source` until a layout query needs it.
    #[must_use]
    pub fn new(config: GridConfig, source: S) -> Self {
        let cache = SegmentCache::new(config.items_per_request(), config.reverse());
        let columns = config.breakpoints().columns_for(0.0);
        Self {
            config,
            source,
            cache,
            layouts: HashMap::new(),
            extents: SegmentExtents::new(),
            full_placeholder_extent: None,
            cursor: LayoutCursor::new(),
            container: Size::ZERO,
            columns,
            overscan: 0.0,
            dirty: true,
            last_window: TileWindow::default(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Returns a shared reference to the page source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns a mutable reference to the page source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Returns the segment cache.
    #[must_use]
    pub fn cache(&self) -> &SegmentCache<S::Item> {
        &self.cache
    }

    /// Returns the cursor.
    #[must_use]
    pub const fn cursor(&self) -> &LayoutCursor {
        &self.cursor
    }

    /// Returns the cached layout of `segment`, if any.
    #[must_use]
    pub fn layout(&self, segment: usize) -> Option<&SegmentLayout> {
        self.layouts.get(&segment)
    }

    /// Returns the container size.
    #[must_use]
    pub const fn container_size(&self) -> Size {
        self.container
    }

    /// Base column count for the current container width.
    #[must_use]
    pub const fn base_num_cols(&self) -> NonZeroUsize {
        self.columns
    }

    /// Placeholder cell size for the current container width.
    #[must_use]
    pub fn base_item_size(&self) -> f64 {
        base_item_size(
            self.container.width,
            self.config.sanitized_margin(),
            self.columns,
        )
    }

    fn geometry(&self) -> Geometry {
        Geometry {
            threshold: self.columns.get() as f64,
            width: self.container.width,
            margin: self.config.sanitized_margin(),
        }
    }

    fn invalidate_layouts(&mut self) {
        self.layouts.clear();
        self.extents.clear();
        self.full_placeholder_extent = None;
        self.dirty = true;
    }

    /// Handles a resize of the container.
    ///
    /// A width change recomputes the base columns and discards every cached
    /// layout. The item at the top of the viewport stays there; the scroll
    /// offset moves to keep it in place.
    pub fn set_container_size(&mut self, size: Size) {
        let size = sanitize_size(size);
        if size == self.container {
            return;
        }
        if size.width != self.container.width {
            let anchor = (self.container.width > 0.0).then(|| self.current_index());
            self.container = size;
            self.columns = self.config.breakpoints().columns_for(size.width);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                width = size.width,
                columns = self.columns.get(),
                "container width changed, dropping layouts"
            );

            self.invalidate_layouts();
            if let Some(anchor) = anchor {
                self.scroll_to_index(anchor);
            }
        } else {
            self.container = size;
        }
        self.dirty = true;
    }

    /// Sets the overscan applied above and below the viewport.
    pub fn set_overscan(&mut self, overscan: f64) {
        let overscan = if overscan.is_finite() {
            overscan.max(0.0)
        } else {
            0.0
        };
        if overscan != self.overscan {
            self.overscan = overscan;
            self.dirty = true;
        }
    }

    /// Returns the overscan applied above and below the viewport.
    #[must_use]
    pub const fn overscan(&self) -> f64 {
        self.overscan
    }

    /// Sets (or clears) the known total number of items.
    ///
    /// Offsets past the previous end change, so cached layouts are dropped.
    pub fn set_total_count(&mut self, total: Option<usize>) {
        self.cache.set_total(total);
        self.invalidate_layouts();
    }

    /// Returns the current scroll offset.
    #[must_use]
    pub const fn scroll_offset(&self) -> f64 {
        self.cursor.live_top()
    }

    /// Sets the scroll offset.
    pub fn set_scroll_offset(&mut self, offset: f64) {
        let before = self.cursor.live_top();
        self.cursor.set_live_top(offset);
        if self.cursor.live_top() != before {
            self.dirty = true;
        }
    }

    /// Adjusts the scroll offset by `delta`.
    pub fn scroll_by(&mut self, delta: f64) {
        self.set_scroll_offset(self.cursor.live_top() + delta);
    }

    /// Returns the first item of the row at the scroll offset.
    ///
    /// The cursor walks forward from the previous result, so repeated calls
    /// while scrolling only touch the rows scrolled past.
    pub fn current_index(&mut self) -> usize {
        let mut cursor = self.cursor;
        let index = cursor.current_index(self);
        self.cursor = cursor;
        index
    }

    /// Repositions the cursor root at the row containing `index`.
    ///
    /// The scroll offset is not changed; see [`FlashlightGrid::scroll_to_index`].
    pub fn set_current_index(&mut self, index: usize) {
        let (start, _) = self.locate(index);
        self.cursor.set_root_index(start);
    }

    /// Scrolls so the row containing `index` is at the top of the viewport.
    pub fn scroll_to_index(&mut self, index: usize) {
        let (start, top) = self.locate(index);
        self.cursor.set_root_index(start);
        self.set_scroll_offset(top);
        self.dirty = true;
    }

    /// Top offset of the row containing `index`.
    pub fn top_from_index(&mut self, index: usize) -> f64 {
        self.locate(index).1
    }

    /// What the cache knows about the item at `index`.
    #[must_use]
    pub fn item(&self, index: usize) -> ItemSlot<'_, S::Item> {
        self.cache.item(index)
    }

    /// Returns a view of `segment`, requesting it if needed.
    pub fn segment_data(&mut self, segment: usize) -> SegmentView<'_, S::Item> {
        self.cache.segment_data(segment, &mut self.source)
    }

    /// The row starting at item `start`.
    ///
    /// Requests the containing segment if it is unrequested; unresolved items
    /// are packed with the placeholder aspect ratio. Starting in the middle of
    /// a cached row packs a fresh row from `start` to the end of the segment.
    pub fn item_row(&mut self, start: usize) -> Row {
        let segment = self.cache.segment_of(start);
        if let Some((row, _)) = self.layout_for(segment, true).row_starting_at(start) {
            return row.clone();
        }
        self.pack_from(start)
    }

    /// Packs a row from `start` without consulting the layout cache.
    fn pack_from(&self, start: usize) -> Row {
        let segment = self.cache.segment_of(start);
        let end = self.cache.segment_range(segment).start + self.cache.segment_len(segment);
        let geometry = self.geometry();
        pack_row(
            start,
            (start..end).map_while(|index| self.cache.item(index).layout_aspect_ratio()),
            geometry.threshold,
            geometry.width,
            geometry.margin,
        )
    }

    /// Delivers the outcome of a fetch started for `request`.
    ///
    /// On success the segment's layout is recomputed and the window marked
    /// dirty. On failure the segment becomes unrequested again and is retried
    /// by the next layout query that needs it.
    pub fn complete_page<E>(
        &mut self,
        request: PageRequest,
        result: Result<Page<S::Item>, E>,
    ) -> PageOutcome
    where
        E: fmt::Debug,
    {
        let outcome = self.cache.complete(request, result);
        match outcome {
            PageOutcome::Resolved { segment, more, .. } => {
                self.layouts.remove(&segment);
                if !more && let Some(count) = self.segment_limit() {
                    self.extents.truncate(count);
                    self.layouts.retain(|k, _| *k < count);
                }
                if segment < self.extents.len() {
                    let _ = self.layout_for(segment, false);
                }
                self.dirty = true;
            }
            PageOutcome::Failed { .. } => {
                self.dirty = true;
            }
            PageOutcome::Stale { .. } => {}
        }
        outcome
    }

    /// Changes the number of items per request.
    ///
    /// All cached segments are discarded; the item at the top of the viewport
    /// stays there.
    pub fn set_items_per_request(&mut self, items_per_request: NonZeroUsize) {
        if items_per_request == self.config.items_per_request() {
            return;
        }
        let anchor = self.current_index();
        self.config.set_items_per_request(items_per_request);
        self.cache.set_items_per_request(items_per_request);
        self.invalidate_layouts();
        self.scroll_to_index(anchor);
    }

    /// Discards all cached data and scrolls back to the start.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.invalidate_layouts();
        self.cursor = LayoutCursor::new();
    }

    /// Estimated height of the whole grid, including the bottom margin.
    pub fn content_extent(&mut self) -> f64 {
        let count = self.segment_count_hint();
        if count == 0 {
            return 0.0;
        }
        self.ensure_extents_through(count - 1);
        self.extents.total() + self.config.sanitized_margin()
    }

    /// Computes or returns the cached visible window.
    ///
    /// Rows intersecting the viewport, extended by the overscan on both sides,
    /// are realized. Segments they belong to are requested if needed.
    pub fn visible_window(&mut self) -> &TileWindow {
        if self.dirty {
            self.last_window = self.compute_window();
            self.dirty = false;
        }
        &self.last_window
    }

    fn compute_window(&mut self) -> TileWindow {
        let live_top = self.cursor.live_top();
        let min = (live_top - self.overscan).max(0.0);
        let max = live_top + self.container.height + self.overscan;
        let margin = self.config.sanitized_margin();

        let current = self.current_index();
        let (mut index, mut top) = self.locate(current);
        if min < top {
            let start = self.segment_start_at_offset(min);
            let (start, start_top) = self.locate(start);
            let found = seek(self, start, start_top, min);
            (index, top) = (found.index, found.top);
        }

        let mut rows = Vec::new();
        while top < max {
            match self.row_step(index, true) {
                RowStep::Row(row) => {
                    let extent = row.extent(margin);
                    index = row.end();
                    rows.push(PlacedRow { top, row });
                    top += extent;
                    if extent <= 0.0 {
                        break;
                    }
                }
                RowStep::Skip { next } => index = next,
                RowStep::End => break,
            }
        }

        let start = rows.first().map_or(index, |placed| placed.row.start());
        let end = rows.last().map_or(start, |placed| placed.row.end());
        let before_extent = rows.first().map_or(top, |placed| placed.top);
        let content_extent = self.content_extent().max(top);
        TileWindow {
            start,
            end,
            rows,
            before_extent,
            content_extent,
        }
    }

    /// Number of segments, if the item count is known.
    fn segment_limit(&self) -> Option<usize> {
        self.cache
            .len_bound()
            .map(|len| len.div_ceil(self.cache.items_per_request()))
    }

    fn segment_count_hint(&self) -> usize {
        self.segment_limit().unwrap_or_else(|| {
            let touched = self.cache.highest_segment().map_or(0, |segment| segment + 1);
            touched.max(self.extents.len()).max(1)
        })
    }

    /// Extent of a full unresolved segment at the current width.
    fn placeholder_extent(&mut self, len: usize) -> f64 {
        let full = len == self.cache.items_per_request();
        if full && let Some(extent) = self.full_placeholder_extent {
            return extent;
        }
        let geometry = self.geometry();
        let extent = SegmentLayout::pack(
            0,
            0..len,
            |_| Some(PLACEHOLDER_ASPECT_RATIO),
            geometry.threshold,
            geometry.width,
            geometry.margin,
            true,
        )
        .extent();
        if full {
            self.full_placeholder_extent = Some(extent);
        }
        extent
    }

    /// Tracks extents for every segment up to `segment`, without fetching.
    fn ensure_extents_through(&mut self, segment: usize) {
        let through = match self.segment_limit() {
            Some(0) => return,
            Some(count) => segment.min(count - 1),
            None => segment,
        };
        while self.extents.len() <= through {
            let next = self.extents.len();
            let extent = if self.cache.is_resolved(next) {
                let geometry = self.geometry();
                let layout = match self.layouts.entry(next) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => entry.insert(pack_segment(&self.cache, next, geometry)),
                };
                layout.extent()
            } else {
                let len = self.cache.segment_len(next);
                self.placeholder_extent(len)
            };
            self.extents.push(extent);
        }
    }

    /// Layout of `segment`, computing and caching it if needed.
    ///
    /// Placeholder layouts are replaced once the segment resolves. With
    /// `fetch`, an unrequested segment is requested first.
    fn layout_for(&mut self, segment: usize, fetch: bool) -> &SegmentLayout {
        if fetch {
            self.cache.request(segment, &mut self.source);
        }
        let geometry = self.geometry();
        let resolved = self.cache.is_resolved(segment);
        let layout = match self.layouts.entry(segment) {
            Entry::Occupied(entry) => {
                let slot = entry.into_mut();
                if slot.is_placeholder() && resolved {
                    *slot = pack_segment(&self.cache, segment, geometry);
                }
                slot
            }
            Entry::Vacant(entry) => entry.insert(pack_segment(&self.cache, segment, geometry)),
        };
        self.extents.set_extent(segment, layout.extent());
        layout
    }

    /// The row starting at `index`, or where to continue if none does.
    ///
    /// Only the visible window fetches; walks that merely pass over rows use
    /// placeholders for unrequested segments.
    fn row_step(&mut self, index: usize, fetch: bool) -> RowStep {
        let bound = self.cache.len_bound();
        if bound.is_some_and(|len| index >= len) {
            return RowStep::End;
        }
        let segment = self.cache.segment_of(index);
        self.ensure_extents_through(segment);
        let layout = self.layout_for(segment, fetch);
        if let Some((row, _)) = layout.row_starting_at(index) {
            return RowStep::Row(row.clone());
        }
        let past_segment = index >= layout.range().end;
        if past_segment {
            let next = self.cache.segment_range(segment + 1).start;
            if bound.is_some_and(|len| next >= len) {
                return RowStep::End;
            }
            return RowStep::Skip { next };
        }
        RowStep::Row(self.pack_from(index))
    }
}

impl<S: PageSource> VerticalIndex for FlashlightGrid<S> {
    fn items_per_request(&self) -> usize {
        self.cache.items_per_request()
    }

    fn len_bound(&self) -> Option<usize> {
        self.cache.len_bound()
    }

    fn margin(&self) -> f64 {
        self.config.sanitized_margin()
    }

    fn locate(&mut self, index: usize) -> (usize, f64) {
        let index = match self.cache.len_bound() {
            Some(0) => return (0, 0.0),
            Some(len) => index.min(len - 1),
            None => index,
        };
        let segment = self.cache.segment_of(index);
        self.ensure_extents_through(segment);
        let segment_top = self.extents.offset_of(segment);
        let layout = self.layout_for(segment, false);
        match layout.row_containing(index) {
            Some((position, offset)) => (layout.rows()[position].start(), segment_top + offset),
            None => (index, segment_top + layout.extent()),
        }
    }

    fn segment_start_at_offset(&mut self, offset: f64) -> usize {
        let count = self.segment_count_hint();
        if count == 0 {
            return 0;
        }
        self.ensure_extents_through(count - 1);
        let segment = self.extents.segment_at_offset(offset);
        self.cache.segment_range(segment).start
    }

    fn resolved_extent(&mut self, segment: usize) -> Option<f64> {
        if !self.cache.is_resolved(segment) {
            return None;
        }
        self.ensure_extents_through(segment);
        Some(self.layout_for(segment, false).extent())
    }

    fn step(&mut self, index: usize) -> RowStep {
        self.row_step(index, false)
    }
}
