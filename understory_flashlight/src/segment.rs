// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Segment paging and caching.
//!
//! Items are fetched from a [`PageSource`] in fixed-size *segments* of
//! `items_per_request` consecutive items. Each segment moves through
//! [`SegmentState::Unrequested`] → [`SegmentState::Pending`] →
//! [`SegmentState::Resolved`] at most once per cache lifetime; a failed fetch
//! moves it back to `Unrequested` so a later lookup retries.
//!
//! Fetches are fire-and-forget from the cache's point of view: the source is
//! handed a [`PageRequest`], performs the fetch however it likes, and the host
//! delivers the outcome back with [`SegmentCache::complete`] on the same
//! thread that owns the cache.

use alloc::vec::Vec;
use core::num::NonZeroUsize;
use core::ops::Range;

use hashbrown::HashMap;

/// Aspect ratio assumed for items whose data has not arrived yet.
pub const PLACEHOLDER_ASPECT_RATIO: f64 = 1.0;

/// Per-item metadata the layout engine needs.
///
/// Anything else carried by an item is opaque to this crate and is only
/// handed back to the host through [`ItemSlot::Resolved`].
pub trait ItemDescriptor {
    /// Width divided by height. Expected to be finite and strictly positive.
    fn aspect_ratio(&self) -> f64;
}

impl ItemDescriptor for f64 {
    fn aspect_ratio(&self) -> f64 {
        *self
    }
}

/// Replaces unusable aspect ratios with [`PLACEHOLDER_ASPECT_RATIO`].
pub(crate) fn sanitize_aspect_ratio(aspect_ratio: f64) -> f64 {
    if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
        aspect_ratio
    } else {
        PLACEHOLDER_ASPECT_RATIO
    }
}

/// A request for one segment of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageRequest {
    /// Segment index, `>= 0`.
    pub segment: usize,
    /// Number of items per segment, `> 0`.
    pub page_size: usize,
    /// Whether the source should page from the end of the collection.
    pub reverse: bool,
    /// Identifies this fetch; echo it back through [`SegmentCache::complete`].
    pub ticket: u64,
}

/// A page of results answering a [`PageRequest`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Page<T> {
    /// Items of the segment, in index order.
    pub results: Vec<T>,
    /// `false` if the collection ends within this segment.
    pub more: bool,
}

/// The external collaborator that serves pages of items.
pub trait PageSource {
    /// Item type served by this source.
    type Item: ItemDescriptor;

    /// Starts fetching a page.
    ///
    /// This must not block. The outcome is delivered later through
    /// [`SegmentCache::complete`] (or
    /// [`FlashlightGrid::complete_page`](crate::FlashlightGrid::complete_page)).
    fn request_page(&mut self, request: PageRequest);
}

/// Cache state of one segment.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentState<T> {
    /// Never requested, or the last request failed.
    Unrequested,
    /// A request is outstanding.
    Pending {
        /// Ticket of the outstanding request.
        ticket: u64,
    },
    /// Items have arrived.
    Resolved {
        /// Items of the segment, in index order.
        items: Vec<T>,
        /// `false` if the collection ends within this segment.
        more: bool,
    },
}

/// Borrowed view of a segment's state.
#[derive(Debug, PartialEq)]
pub enum SegmentView<'a, T> {
    /// No request is outstanding and no data is cached.
    Unrequested,
    /// A request is outstanding.
    Pending,
    /// The segment's items.
    Resolved(&'a [T]),
}

impl<T> Clone for SegmentView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SegmentView<'_, T> {}

impl<'a, T> SegmentView<'a, T> {
    /// Returns the items if the segment is resolved.
    #[must_use]
    pub fn items(self) -> Option<&'a [T]> {
        match self {
            Self::Resolved(items) => Some(items),
            Self::Unrequested | Self::Pending => None,
        }
    }
}

/// What the cache knows about a single item index.
#[derive(Debug, PartialEq)]
pub enum ItemSlot<'a, T> {
    /// The item's data has arrived.
    Resolved(&'a T),
    /// The item may exist but its segment is not resolved.
    Placeholder,
    /// The index is past the end of its segment or of the collection.
    Missing,
}

impl<T> Clone for ItemSlot<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ItemSlot<'_, T> {}

impl<'a, T: ItemDescriptor> ItemSlot<'a, T> {
    /// Returns the resolved item, if any.
    #[must_use]
    pub fn resolved(self) -> Option<&'a T> {
        match self {
            Self::Resolved(item) => Some(item),
            Self::Placeholder | Self::Missing => None,
        }
    }

    /// Aspect ratio to lay this slot out with, or `None` if it is missing.
    #[must_use]
    pub fn layout_aspect_ratio(self) -> Option<f64> {
        match self {
            Self::Resolved(item) => Some(sanitize_aspect_ratio(item.aspect_ratio())),
            Self::Placeholder => Some(PLACEHOLDER_ASPECT_RATIO),
            Self::Missing => None,
        }
    }
}

/// Result of delivering a fetch outcome to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The segment resolved; layouts depending on it must be recomputed.
    Resolved {
        /// Segment index.
        segment: usize,
        /// Number of items stored.
        len: usize,
        /// Whether more items follow this segment.
        more: bool,
    },
    /// The fetch failed; the segment is unrequested again.
    Failed {
        /// Segment index.
        segment: usize,
    },
    /// The outcome did not match an outstanding request and was dropped.
    Stale {
        /// Segment index.
        segment: usize,
    },
}

impl PageOutcome {
    /// Returns `true` if cached data changed and the grid should re-render.
    #[must_use]
    pub const fn is_data_changed(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// Segment the outcome refers to.
    #[must_use]
    pub const fn segment(&self) -> usize {
        match *self {
            Self::Resolved { segment, .. }
            | Self::Failed { segment }
            | Self::Stale { segment } => segment,
        }
    }
}

/// Per-segment cache of item metadata.
///
/// Entries are never evicted; [`SegmentCache::clear`] discards everything at
/// once, and any outcome for a request issued before the clear is reported as
/// [`PageOutcome::Stale`].
#[derive(Debug, Clone)]
pub struct SegmentCache<T> {
    items_per_request: NonZeroUsize,
    reverse: bool,
    segments: HashMap<usize, SegmentState<T>>,
    next_ticket: u64,
    /// Item count implied by a page with `more == false`.
    end: Option<usize>,
    /// Item count supplied by the host.
    total: Option<usize>,
    highest_requested: Option<usize>,
}

impl<T: ItemDescriptor> SegmentCache<T> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(items_per_request: NonZeroUsize, reverse: bool) -> Self {
        Self {
            items_per_request,
            reverse,
            segments: HashMap::new(),
            next_ticket: 0,
            end: None,
            total: None,
            highest_requested: None,
        }
    }

    /// Number of items per segment.
    #[must_use]
    pub const fn items_per_request(&self) -> usize {
        self.items_per_request.get()
    }

    /// Changes the segment size, discarding all cached segments.
    pub fn set_items_per_request(&mut self, items_per_request: NonZeroUsize) {
        self.items_per_request = items_per_request;
        self.clear();
    }

    /// Segment containing `index`.
    #[must_use]
    pub const fn segment_of(&self, index: usize) -> usize {
        index / self.items_per_request.get()
    }

    /// Nominal index range of `segment`, ignoring the end of the collection.
    #[must_use]
    pub const fn segment_range(&self, segment: usize) -> Range<usize> {
        let start = segment.saturating_mul(self.items_per_request.get());
        start..start.saturating_add(self.items_per_request.get())
    }

    /// Exact number of items, if known.
    ///
    /// This is the smaller of the host-supplied total and the end reported by
    /// a page with `more == false`.
    #[must_use]
    pub fn len_bound(&self) -> Option<usize> {
        match (self.total, self.end) {
            (Some(total), Some(end)) => Some(total.min(end)),
            (total, end) => total.or(end),
        }
    }

    /// Sets (or clears) the host-supplied total item count.
    pub fn set_total(&mut self, total: Option<usize>) {
        self.total = total;
    }

    /// Index of the last segment, if the item count is known.
    ///
    /// Returns `None` both for an unknown count and for an empty collection;
    /// use [`SegmentCache::len_bound`] to tell them apart.
    #[must_use]
    pub fn last_segment(&self) -> Option<usize> {
        match self.len_bound() {
            Some(0) | None => None,
            Some(len) => Some(self.segment_of(len - 1)),
        }
    }

    /// Highest segment index requested since the cache was last cleared.
    #[must_use]
    pub const fn highest_segment(&self) -> Option<usize> {
        self.highest_requested
    }

    /// Number of items `segment` holds, or is assumed to hold until resolved.
    #[must_use]
    pub fn segment_len(&self, segment: usize) -> usize {
        if let Some(SegmentState::Resolved { items, .. }) = self.segments.get(&segment) {
            return items.len();
        }
        let range = self.segment_range(segment);
        match self.len_bound() {
            Some(len) => range.end.min(len).saturating_sub(range.start),
            None => range.len(),
        }
    }

    /// Returns the raw state of `segment`, or `None` if it was never looked up.
    #[must_use]
    pub fn state(&self, segment: usize) -> Option<&SegmentState<T>> {
        self.segments.get(&segment)
    }

    /// Returns `true` if `segment` has resolved.
    #[must_use]
    pub fn is_resolved(&self, segment: usize) -> bool {
        matches!(
            self.segments.get(&segment),
            Some(SegmentState::Resolved { .. })
        )
    }

    /// Returns a view of `segment` without requesting it.
    #[must_use]
    pub fn peek(&self, segment: usize) -> SegmentView<'_, T> {
        match self.segments.get(&segment) {
            None | Some(SegmentState::Unrequested) => SegmentView::Unrequested,
            Some(SegmentState::Pending { .. }) => SegmentView::Pending,
            Some(SegmentState::Resolved { items, .. }) => SegmentView::Resolved(items),
        }
    }

    /// Returns a view of `segment`, requesting it from `source` if needed.
    ///
    /// The first lookup of an unrequested segment issues exactly one
    /// [`PageSource::request_page`] call and reports [`SegmentView::Pending`].
    /// Lookups while the request is outstanding issue nothing.
    pub fn segment_data<S>(&mut self, segment: usize, source: &mut S) -> SegmentView<'_, T>
    where
        S: PageSource<Item = T> + ?Sized,
    {
        self.request(segment, source);
        self.peek(segment)
    }

    /// Requests `segment` from `source` if it is unrequested.
    ///
    /// Returns `true` if a request was issued.
    pub fn request<S>(&mut self, segment: usize, source: &mut S) -> bool
    where
        S: PageSource<Item = T> + ?Sized,
    {
        let state = self
            .segments
            .entry(segment)
            .or_insert(SegmentState::Unrequested);
        if !matches!(state, SegmentState::Unrequested) {
            return false;
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        *state = SegmentState::Pending { ticket };
        let highest = self.highest_requested.map_or(segment, |h| h.max(segment));
        self.highest_requested = Some(highest);

        #[cfg(feature = "tracing")]
        tracing::debug!(segment, ticket, "requesting segment");

        source.request_page(PageRequest {
            segment,
            page_size: self.items_per_request.get(),
            reverse: self.reverse,
            ticket,
        });
        true
    }

    /// Delivers the outcome of a fetch started for `request`.
    ///
    /// A successful page resolves the segment; extra results beyond the
    /// segment size are dropped. A failure moves the segment back to
    /// unrequested so that a later lookup retries. Outcomes that do not match
    /// the segment's outstanding ticket change nothing.
    pub fn complete<E>(&mut self, request: PageRequest, result: Result<Page<T>, E>) -> PageOutcome
    where
        E: core::fmt::Debug,
    {
        let segment = request.segment;
        let Some(state) = self.segments.get_mut(&segment) else {
            #[cfg(feature = "tracing")]
            tracing::trace!(segment, ticket = request.ticket, "dropping stale page");
            return PageOutcome::Stale { segment };
        };
        if !matches!(state, SegmentState::Pending { ticket } if *ticket == request.ticket) {
            #[cfg(feature = "tracing")]
            tracing::trace!(segment, ticket = request.ticket, "dropping stale page");
            return PageOutcome::Stale { segment };
        }

        match result {
            Ok(Page { mut results, more }) => {
                results.truncate(self.items_per_request.get());
                let len = results.len();
                *state = SegmentState::Resolved {
                    items: results,
                    more,
                };

                let start = self.segment_range(segment).start;
                if more {
                    // The collection grew past a previously reported end.
                    if self.end.is_some_and(|end| end <= start + len) {
                        self.end = None;
                    }
                } else {
                    let reported = start + len;
                    // An empty page past a known end does not move it outward.
                    self.end = Some(match self.end {
                        Some(end) if len == 0 => end.min(reported),
                        _ => reported,
                    });
                }

                #[cfg(feature = "tracing")]
                tracing::debug!(segment, len, more, "segment resolved");

                PageOutcome::Resolved { segment, len, more }
            }
            Err(_error) => {
                *state = SegmentState::Unrequested;

                #[cfg(feature = "tracing")]
                tracing::warn!(segment, error = ?_error, "segment fetch failed");

                PageOutcome::Failed { segment }
            }
        }
    }

    /// Returns what is known about the item at `index`.
    #[must_use]
    pub fn item(&self, index: usize) -> ItemSlot<'_, T> {
        if self.len_bound().is_some_and(|len| index >= len) {
            return ItemSlot::Missing;
        }
        let segment = self.segment_of(index);
        match self.segments.get(&segment) {
            Some(SegmentState::Resolved { items, .. }) => {
                let offset = index - self.segment_range(segment).start;
                items.get(offset).map_or(ItemSlot::Missing, ItemSlot::Resolved)
            }
            None | Some(SegmentState::Unrequested | SegmentState::Pending { .. }) => {
                ItemSlot::Placeholder
            }
        }
    }

    /// Number of resolved segments.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.segments
            .values()
            .filter(|state| matches!(state, SegmentState::Resolved { .. }))
            .count()
    }

    /// Number of segments with an outstanding request.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.segments
            .values()
            .filter(|state| matches!(state, SegmentState::Pending { .. }))
            .count()
    }

    /// Discards every cached segment and the discovered end of the collection.
    ///
    /// The host-supplied total is kept.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.end = None;
        self.highest_requested = None;
    }
}
