//! # Runtime Tuning
//!
//! Validated user-adjustable parameters. Raw user input is parsed here and
//! rejected with `FlowError::InvalidConfig` instead of being coerced, so a
//! typo can never produce zero-length springs or empty page requests.

use crate::FlowError;
use crate::primitives::{DEFAULT_LINK_DISTANCE, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// LAYOUT DISTANCE
// =============================================================================

/// Rest length of the link springs. Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct LayoutDistance(f64);

impl LayoutDistance {
    /// Validate a numeric distance.
    pub fn new(value: f64) -> Result<Self, FlowError> {
        if !value.is_finite() {
            return Err(invalid_distance(value.to_string(), "must be a finite number"));
        }
        if value <= 0.0 {
            return Err(invalid_distance(value.to_string(), "must be greater than zero"));
        }
        Ok(Self(value))
    }

    /// Parse user input such as `"450"` or `" 320.5 "`.
    pub fn parse(input: &str) -> Result<Self, FlowError> {
        let value: f64 = input
            .trim()
            .parse()
            .map_err(|_| invalid_distance(input.to_string(), "not a number"))?;
        Self::new(value)
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Default for LayoutDistance {
    fn default() -> Self {
        Self(DEFAULT_LINK_DISTANCE)
    }
}

impl TryFrom<f64> for LayoutDistance {
    type Error = FlowError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LayoutDistance> for f64 {
    fn from(distance: LayoutDistance) -> Self {
        distance.0
    }
}

impl fmt::Display for LayoutDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn invalid_distance(value: String, reason: &'static str) -> FlowError {
    FlowError::InvalidConfig {
        field: "layout distance",
        value,
        reason,
    }
}

// =============================================================================
// PAGE LIMIT
// =============================================================================

/// Transactions requested per page. Within `1..=MAX_PAGE_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageLimit(u32);

impl PageLimit {
    pub fn new(value: u32) -> Result<Self, FlowError> {
        if value == 0 {
            return Err(invalid_limit(value.to_string(), "must be greater than zero"));
        }
        if value > MAX_PAGE_LIMIT {
            return Err(invalid_limit(value.to_string(), "exceeds the maximum page size"));
        }
        Ok(Self(value))
    }

    /// Parse user input such as `"100"`.
    pub fn parse(input: &str) -> Result<Self, FlowError> {
        let value: u32 = input
            .trim()
            .parse()
            .map_err(|_| invalid_limit(input.to_string(), "not a positive integer"))?;
        Self::new(value)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        Self(DEFAULT_PAGE_LIMIT)
    }
}

impl TryFrom<u32> for PageLimit {
    type Error = FlowError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PageLimit> for u32 {
    fn from(limit: PageLimit) -> Self {
        limit.0
    }
}

impl fmt::Display for PageLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn invalid_limit(value: String, reason: &'static str) -> FlowError {
    FlowError::InvalidConfig {
        field: "page limit",
        value,
        reason,
    }
}
