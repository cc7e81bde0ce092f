// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Width-dependent base column counts.
//!
//! Before real aspect ratios are known, the grid lays items out as uniform
//! squares. The number of squares per row (the *base column count*) is a step
//! function of the container width, and doubles as the packing threshold for
//! justified rows once aspect ratios arrive.

use core::num::NonZeroUsize;

use smallvec::SmallVec;

use crate::ConfigError;

const fn columns(n: usize) -> NonZeroUsize {
    NonZeroUsize::MIN.saturating_add(n - 1)
}

/// One step of a [`ColumnBreakpoints`] table.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WidthBreakpoint {
    /// Upper width bound of this step.
    pub max_width: f64,
    /// Whether a width exactly equal to `max_width` belongs to this step.
    pub inclusive: bool,
    /// Column count used for widths within this step.
    pub columns: NonZeroUsize,
}

impl WidthBreakpoint {
    /// A step covering widths `<= max_width`.
    #[must_use]
    pub const fn up_to(max_width: f64, columns: NonZeroUsize) -> Self {
        Self {
            max_width,
            inclusive: true,
            columns,
        }
    }

    /// A step covering widths `< max_width`.
    #[must_use]
    pub const fn below(max_width: f64, columns: NonZeroUsize) -> Self {
        Self {
            max_width,
            inclusive: false,
            columns,
        }
    }

    /// Returns `true` if `width` falls at or under this step's bound.
    #[must_use]
    pub fn admits(&self, width: f64) -> bool {
        if self.inclusive {
            width <= self.max_width
        } else {
            width < self.max_width
        }
    }
}

/// Ordered table mapping container widths to base column counts.
///
/// Steps are checked in ascending order of `max_width`; the first step that
/// admits the width wins, and widths past every step use the fallback.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnBreakpoints {
    steps: SmallVec<[WidthBreakpoint; 4]>,
    fallback: NonZeroUsize,
}

impl ColumnBreakpoints {
    /// Creates a table from ascending steps and a fallback column count.
    ///
    /// Returns an error if a bound is not finite or bounds are not strictly
    /// ascending.
    pub fn new(
        steps: impl IntoIterator<Item = WidthBreakpoint>,
        fallback: NonZeroUsize,
    ) -> Result<Self, ConfigError> {
        let steps: SmallVec<[WidthBreakpoint; 4]> = steps.into_iter().collect();
        let mut previous: Option<f64> = None;
        for step in &steps {
            if !step.max_width.is_finite() {
                return Err(ConfigError::NonFiniteBreakpoint(step.max_width));
            }
            if let Some(previous) = previous
                && step.max_width <= previous
            {
                return Err(ConfigError::UnorderedBreakpoints {
                    previous,
                    next: step.max_width,
                });
            }
            previous = Some(step.max_width);
        }
        Ok(Self { steps, fallback })
    }

    /// Returns the steps of this table in ascending order.
    #[must_use]
    pub fn steps(&self) -> &[WidthBreakpoint] {
        &self.steps
    }

    /// Returns the column count used past the last step.
    #[must_use]
    pub const fn fallback(&self) -> NonZeroUsize {
        self.fallback
    }

    /// Returns the base column count for a container `width`.
    #[must_use]
    pub fn columns_for(&self, width: f64) -> NonZeroUsize {
        self.steps
            .iter()
            .find(|step| step.admits(width))
            .map_or(self.fallback, |step| step.columns)
    }
}

impl Default for ColumnBreakpoints {
    /// `<= 600 → 2`, `< 768 → 3`, `< 992 → 4`, `< 1200 → 5`, otherwise `7`.
    fn default() -> Self {
        Self {
            steps: SmallVec::from_buf([
                WidthBreakpoint::up_to(600.0, columns(2)),
                WidthBreakpoint::below(768.0, columns(3)),
                WidthBreakpoint::below(992.0, columns(4)),
                WidthBreakpoint::below(1200.0, columns(5)),
            ]),
            fallback: columns(7),
        }
    }
}

/// Nominal size of one square placeholder cell.
///
/// This is `(width - (columns + 1) * margin) / columns`, clamped to zero for
/// containers too narrow to hold the margins.
#[must_use]
pub fn base_item_size(width: f64, margin: f64, columns: NonZeroUsize) -> f64 {
    let cols = columns.get() as f64;
    let working = width - (cols + 1.0) * margin;
    if working <= 0.0 || !working.is_finite() {
        return 0.0;
    }
    working / cols
}

#[cfg(test)]
mod tests {
    use super::{ColumnBreakpoints, WidthBreakpoint, base_item_size, columns};
    use crate::ConfigError;

    #[test]
    fn default_table_matches_boundaries() {
        let table = ColumnBreakpoints::default();
        let at = |w: f64| table.columns_for(w).get();

        assert_eq!(at(0.0), 2);
        assert_eq!(at(599.0), 2);
        assert_eq!(at(600.0), 2);
        assert_eq!(at(600.5), 3);
        assert_eq!(at(767.0), 3);
        assert_eq!(at(768.0), 4);
        assert_eq!(at(991.0), 4);
        assert_eq!(at(992.0), 5);
        assert_eq!(at(1199.0), 5);
        assert_eq!(at(1200.0), 7);
        assert_eq!(at(4000.0), 7);
    }

    #[test]
    fn unordered_steps_are_rejected() {
        let err = ColumnBreakpoints::new(
            [
                WidthBreakpoint::below(800.0, columns(3)),
                WidthBreakpoint::below(500.0, columns(2)),
            ],
            columns(4),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnorderedBreakpoints {
                previous: 800.0,
                next: 500.0
            }
        );

        let err =
            ColumnBreakpoints::new([WidthBreakpoint::up_to(f64::NAN, columns(2))], columns(3))
                .unwrap_err();
        assert!(matches!(err, ConfigError::NonFiniteBreakpoint(_)));
    }

    #[test]
    fn custom_table_uses_fallback_past_last_step() {
        let table =
            ColumnBreakpoints::new([WidthBreakpoint::below(300.0, columns(1))], columns(3))
                .unwrap();
        assert_eq!(table.columns_for(299.0).get(), 1);
        assert_eq!(table.columns_for(300.0).get(), 3);
        assert_eq!(table.steps().len(), 1);
    }

    #[test]
    fn base_item_size_accounts_for_margins() {
        // 5 columns and 6 gutters of 4px in 1000px.
        assert_eq!(base_item_size(1000.0, 4.0, columns(5)), 195.2);
        // Too narrow to hold the gutters.
        assert_eq!(base_item_size(10.0, 4.0, columns(5)), 0.0);
    }
}
