// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for packing, paging and the layout cursor.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use kurbo::Size;
use proptest::prelude::*;
use understory_flashlight::{
    ColumnBreakpoints, FlashlightGrid, GridConfig, ItemSlot, Page, PageRequest, PageSource,
    SegmentCache, pack_row,
};

#[derive(Debug, Default)]
struct Recorder {
    requests: Vec<PageRequest>,
}

impl PageSource for Recorder {
    type Item = f64;

    fn request_page(&mut self, request: PageRequest) {
        self.requests.push(request);
    }
}

fn per_request(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn resolve_segment(grid: &mut FlashlightGrid<Recorder>, segment: usize, ratios: Vec<f64>) {
    let _ = grid.segment_data(segment);
    let request = *grid
        .source()
        .requests
        .iter()
        .rev()
        .find(|r| r.segment == segment)
        .unwrap();
    let _ = grid.complete_page::<()>(
        request,
        Ok(Page {
            results: ratios,
            more: true,
        }),
    );
}

proptest! {
    #[test]
    fn columns_never_decrease_with_width(a in 0.0f64..3000.0, b in 0.0f64..3000.0) {
        let breakpoints = ColumnBreakpoints::default();
        let (narrow, wide) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(breakpoints.columns_for(narrow) <= breakpoints.columns_for(wide));
        prop_assert!(breakpoints.columns_for(wide).get() <= 7);
        prop_assert!(breakpoints.columns_for(narrow).get() >= 2);
    }

    #[test]
    fn rows_fill_the_container_width(
        ratios in prop::collection::vec(0.2f64..5.0, 1..24),
        threshold in 1usize..8,
        width in 300.0f64..2000.0,
        margin in 0.0f64..10.0,
    ) {
        let row = pack_row(0, ratios.iter().copied(), threshold as f64, width, margin);
        prop_assert!(!row.is_empty());

        let sum: f64 = row.items().iter().map(|item| item.aspect_ratio).sum();
        prop_assert!((sum - row.aspect_ratio()).abs() < 1e-9);

        // Either the threshold was reached or the input ran out, and never
        // by more than the last item.
        prop_assert!(row.aspect_ratio() >= threshold as f64 || row.len() == ratios.len());
        let before_last = sum - row.items()[row.len() - 1].aspect_ratio;
        prop_assert!(before_last < threshold as f64);

        if row.height() > 0.0 {
            let widths: f64 = row.items().iter().map(|item| item.size.width).sum();
            let filled = widths + (row.len() + 1) as f64 * margin;
            prop_assert!((filled - width).abs() < 1e-6 * width, "filled {filled} of {width}");
            for item in row.items() {
                prop_assert_eq!(item.size.height, row.height());
            }
        }
    }

    #[test]
    fn each_segment_is_requested_once(lookups in prop::collection::vec(0usize..12, 1..64)) {
        let mut cache = SegmentCache::<f64>::new(per_request(5), false);
        let mut source = Recorder::default();
        for segment in &lookups {
            let _ = cache.segment_data(*segment, &mut source);
        }
        let distinct: BTreeSet<_> = lookups.iter().copied().collect();
        prop_assert_eq!(source.requests.len(), distinct.len());
        prop_assert_eq!(cache.pending_count(), distinct.len());

        let tickets: BTreeSet<_> = source.requests.iter().map(|r| r.ticket).collect();
        prop_assert_eq!(tickets.len(), source.requests.len());
    }

    #[test]
    fn resolved_items_read_back(
        segment in 0usize..8,
        ratios in prop::collection::vec(0.1f64..10.0, 1..=6),
    ) {
        let mut cache = SegmentCache::<f64>::new(per_request(6), false);
        let mut source = Recorder::default();
        let _ = cache.segment_data(segment, &mut source);
        let request = source.requests[0];
        prop_assert_eq!(request.page_size, 6);

        let outcome = cache.complete::<()>(
            request,
            Ok(Page {
                results: ratios.clone(),
                more: true,
            }),
        );
        prop_assert!(outcome.is_data_changed());

        let start = segment * 6;
        for (offset, ratio) in ratios.iter().enumerate() {
            prop_assert_eq!(cache.item(start + offset), ItemSlot::Resolved(ratio));
        }
        prop_assert_eq!(cache.peek(segment).items(), Some(ratios.as_slice()));
    }

    #[test]
    fn current_index_follows_the_scroll_offset(
        pages in prop::collection::vec(prop::collection::vec(0.3f64..3.0, 6), 0..4),
        offsets in prop::collection::vec(0.0f64..4000.0, 1..16),
    ) {
        let config = GridConfig::new()
            .with_margin(4.0)
            .unwrap()
            .with_items_per_request(per_request(6));
        let mut grid = FlashlightGrid::new(config, Recorder::default());
        grid.set_container_size(Size::new(800.0, 400.0));
        for (segment, ratios) in pages.into_iter().enumerate() {
            resolve_segment(&mut grid, segment, ratios);
        }

        let mut offsets = offsets;
        offsets.sort_by(f64::total_cmp);
        let mut previous = 0;
        for offset in offsets {
            grid.set_scroll_offset(offset);
            let index = grid.current_index();
            prop_assert!(index >= previous, "{index} < {previous} at {offset}");
            prop_assert!(grid.top_from_index(index) <= offset + 1e-6);
            previous = index;
        }
    }
}
