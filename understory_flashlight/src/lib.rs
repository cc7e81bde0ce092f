// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Flashlight: a justified-row virtual grid over a paged collection.
//!
//! This crate lays out a very large, lazily fetched collection of items with
//! known aspect ratios (photos, thumbnails, cards) as rows of equal height that
//! exactly fill the container width, and only ever touches the rows near the
//! viewport.
//!
//! The core concepts are:
//!
//! - [`SegmentCache`]: items are fetched from a [`PageSource`] in fixed-size
//!   *segments*. Each segment is requested at most once and moves from
//!   unrequested to pending to resolved; a failed fetch makes it unrequested
//!   again.
//! - [`pack_row`]: greedy justified-row packing. A row takes items until their
//!   summed aspect ratio reaches the base column count, then every item in the
//!   row gets the height that makes the row fill the width.
//! - [`ColumnBreakpoints`]: the width-dependent base column count, which is
//!   both the placeholder grid density and the packing threshold.
//! - [`SegmentLayout`] and [`SegmentExtents`]: rows never cross segments, so
//!   each segment is laid out on its own and contributes one extent to a
//!   prefix-sum index of vertical offsets.
//! - [`LayoutCursor`]: maps the scroll offset to the first item of the row at
//!   the top of the viewport, skipping resolved segments whole and walking row
//!   by row otherwise.
//! - [`FlashlightGrid`]: a controller tying it all together. It handles resize,
//!   scroll and fetch completion, and caches the most recent [`TileWindow`].
//!
//! This crate does not draw anything. Host frameworks are responsible for:
//!
//! - Implementing [`PageSource`] to start fetches without blocking.
//! - Delivering results with [`FlashlightGrid::complete_page`] on the thread
//!   that owns the grid.
//! - Rendering the rows of [`FlashlightGrid::visible_window`] and reserving
//!   [`TileWindow::content_extent`] of scrollable height.
//!
//! ## Minimal example
//!
//! ```rust
//! use kurbo::Size;
//! use understory_flashlight::{FlashlightGrid, GridConfig, Page, PageRequest, PageSource};
//!
//! #[derive(Default)]
//! struct Pending(Vec<PageRequest>);
//!
//! impl PageSource for Pending {
//!     type Item = f64;
//!
//!     fn request_page(&mut self, request: PageRequest) {
//!         self.0.push(request);
//!     }
//! }
//!
//! let mut grid = FlashlightGrid::new(GridConfig::new(), Pending::default());
//! grid.set_container_size(Size::new(1000.0, 600.0));
//! assert_eq!(grid.base_num_cols().get(), 5);
//!
//! // The first window requests segment 0 and lays it out with placeholders.
//! let window = grid.visible_window();
//! assert!(!window.is_empty());
//!
//! // Later, the fetch completes with the real aspect ratios.
//! let request = grid.source_mut().0.remove(0);
//! let page = Page {
//!     results: vec![1.5; request.page_size],
//!     more: true,
//! };
//! grid.complete_page::<()>(request, Ok(page));
//!
//! let window = grid.visible_window();
//! let first = &window.rows[0].row;
//! assert_eq!(first.len(), 4);
//! ```
//!
//! ## Features
//!
//! - `std` (default): enables `std` support in `kurbo`.
//! - `libm`: `no_std` builds with `libm` for floating-point math in `kurbo`.
//! - `tracing`: emits `tracing` events for fetches, failures and cursor walks.
//! - `serde`: `Serialize`/`Deserialize` for configuration and page types.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod columns;
mod config;
mod cursor;
mod extents;
mod grid;
mod layout;
mod row;
mod segment;
mod window;

pub use columns::{ColumnBreakpoints, WidthBreakpoint, base_item_size};
pub use config::{ConfigError, GridConfig};
pub use cursor::LayoutCursor;
pub use extents::SegmentExtents;
pub use grid::FlashlightGrid;
pub use layout::SegmentLayout;
pub use row::{Row, RowItem, pack_row};
pub use segment::{
    ItemDescriptor, ItemSlot, PLACEHOLDER_ASPECT_RATIO, Page, PageOutcome, PageRequest,
    PageSource, SegmentCache, SegmentState, SegmentView,
};
pub use window::{PlacedRow, TileWindow};
