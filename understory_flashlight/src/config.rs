// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grid configuration and its validation errors.

use core::num::NonZeroUsize;

use crate::ColumnBreakpoints;

/// Errors produced while building a [`GridConfig`] or [`ColumnBreakpoints`].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The margin between items was negative or not finite.
    #[error("grid margin must be finite and non-negative, got {0}")]
    InvalidMargin(f64),
    /// A breakpoint width bound was not finite.
    #[error("breakpoint width must be finite, got {0}")]
    NonFiniteBreakpoint(f64),
    /// Breakpoint width bounds were not strictly ascending.
    #[error("breakpoint widths must be strictly ascending, got {next} after {previous}")]
    UnorderedBreakpoints {
        /// Bound of the preceding step.
        previous: f64,
        /// Bound of the offending step.
        next: f64,
    },
}

/// Static configuration of a [`FlashlightGrid`](crate::FlashlightGrid).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GridConfig {
    margin: f64,
    items_per_request: NonZeroUsize,
    reverse: bool,
    breakpoints: ColumnBreakpoints,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            margin: 4.0,
            items_per_request: NonZeroUsize::MIN.saturating_add(19),
            reverse: false,
            breakpoints: ColumnBreakpoints::default(),
        }
    }
}

impl GridConfig {
    /// Creates the default configuration: 4px margins, 20 items per request,
    /// forward paging and the default breakpoint table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gap between items and around the edges of the grid.
    pub fn with_margin(mut self, margin: f64) -> Result<Self, ConfigError> {
        if !margin.is_finite() || margin.is_sign_negative() {
            return Err(ConfigError::InvalidMargin(margin));
        }
        self.margin = margin;
        Ok(self)
    }

    /// Sets how many items are fetched per page request.
    #[must_use]
    pub fn with_items_per_request(mut self, items_per_request: NonZeroUsize) -> Self {
        self.items_per_request = items_per_request;
        self
    }

    /// Sets the paging direction forwarded to the page source.
    #[must_use]
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Replaces the column breakpoint table.
    #[must_use]
    pub fn with_breakpoints(mut self, breakpoints: ColumnBreakpoints) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    /// Re-checks invariants, for configurations that did not come through the
    /// `with_*` builders (for example, deserialized ones).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.margin.is_finite() || self.margin.is_sign_negative() {
            return Err(ConfigError::InvalidMargin(self.margin));
        }
        ColumnBreakpoints::new(
            self.breakpoints.steps().iter().copied(),
            self.breakpoints.fallback(),
        )
        .map(|_| ())
    }

    /// Gap between items and around the edges of the grid.
    #[must_use]
    pub const fn margin(&self) -> f64 {
        self.margin
    }

    /// Number of items per page request (the segment size).
    #[must_use]
    pub const fn items_per_request(&self) -> NonZeroUsize {
        self.items_per_request
    }

    /// Paging direction forwarded to the page source.
    #[must_use]
    pub const fn reverse(&self) -> bool {
        self.reverse
    }

    /// Column breakpoint table.
    #[must_use]
    pub fn breakpoints(&self) -> &ColumnBreakpoints {
        &self.breakpoints
    }

    /// Margin with invalid values replaced by zero.
    pub(crate) fn sanitized_margin(&self) -> f64 {
        if self.margin.is_finite() && !self.margin.is_sign_negative() {
            self.margin
        } else {
            0.0
        }
    }

    pub(crate) fn set_items_per_request(&mut self, items_per_request: NonZeroUsize) {
        self.items_per_request = items_per_request;
    }
}

#[cfg(test)]
mod tests {
    use core::num::NonZeroUsize;

    use super::{ConfigError, GridConfig};

    #[test]
    fn defaults() {
        let config = GridConfig::new();
        assert_eq!(config.margin(), 4.0);
        assert_eq!(config.items_per_request().get(), 20);
        assert!(!config.reverse());
        assert_eq!(config.breakpoints().columns_for(1000.0).get(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_rejects_bad_margins() {
        assert_eq!(
            GridConfig::new().with_margin(-1.0).unwrap_err(),
            ConfigError::InvalidMargin(-1.0)
        );
        assert!(GridConfig::new().with_margin(f64::INFINITY).is_err());

        let config = GridConfig::new()
            .with_margin(0.0)
            .unwrap()
            .with_items_per_request(NonZeroUsize::new(5).unwrap())
            .with_reverse(true);
        assert_eq!(config.margin(), 0.0);
        assert_eq!(config.items_per_request().get(), 5);
        assert!(config.reverse());
    }
}
