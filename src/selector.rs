//! Trial/block selectors and the 1-based → 0-based conversion boundary.
//!
//! Experimenters number trials and blocks from 1.  Every public constructor
//! takes [`Selector`]s in that convention and converts them exactly once, via
//! [`Selector::resolve`], before touching the cube.
//!
//! ```text
//! Fixed(3)      → index 2
//! Range(1, 20)  → slice 0..20   (inclusive 1-based end → exclusive 0-based end)
//! ```
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use thiserror::Error;

use crate::error::{AnalysisError, Result};

/// Which cube axis a selector applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Trial,
    Block,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Trial => f.write_str("trial"),
            Axis::Block => f.write_str("block"),
        }
    }
}

/// A 1-based selection along the trial or block axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// A single trial/block number.
    Fixed(usize),
    /// A closed interval `[start, end]`, both ends included.
    Range(usize, usize),
}

/// A selector after conversion to 0-based storage indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Index(usize),
    Slice(Range<usize>),
}

impl Resolved {
    /// The storage range covered, a single index becoming a length-1 range.
    pub fn as_range(&self) -> Range<usize> {
        match self {
            Resolved::Index(i) => *i..*i + 1,
            Resolved::Slice(r) => r.clone(),
        }
    }
}

impl Selector {
    /// Reject selectors that are malformed independent of any cube.
    pub fn validate(self, axis: Axis) -> Result<Self> {
        let invalid = |reason| AnalysisError::InvalidSelector { axis, selector: self, reason };
        match self {
            Selector::Fixed(0) => Err(invalid("numbering starts at 1")),
            Selector::Range(0, _) => Err(invalid("numbering starts at 1")),
            Selector::Range(a, b) if a > b => Err(invalid("range start is after range end")),
            _ => Ok(self),
        }
    }

    /// Convert to 0-based storage indices, checking against an axis of `len`.
    pub fn resolve(self, axis: Axis, len: usize) -> Result<Resolved> {
        match self.validate(axis)? {
            Selector::Fixed(i) => {
                if i > len {
                    return Err(AnalysisError::OutOfBounds { axis, index: i, len });
                }
                Ok(Resolved::Index(i - 1))
            }
            Selector::Range(a, b) => {
                if b > len {
                    return Err(AnalysisError::OutOfBounds { axis, index: b, len });
                }
                Ok(Resolved::Slice(a - 1..b))
            }
        }
    }
}

impl From<usize> for Selector {
    fn from(i: usize) -> Self {
        Selector::Fixed(i)
    }
}

impl From<(usize, usize)> for Selector {
    fn from((a, b): (usize, usize)) -> Self {
        Selector::Range(a, b)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Fixed(i) => write!(f, "{i}"),
            Selector::Range(a, b) => write!(f, "{a}-{b}"),
        }
    }
}

#[derive(Debug, Error)]
#[error("cannot parse selector '{0}': expected N or START-END")]
pub struct ParseSelectorError(String);

impl FromStr for Selector {
    type Err = ParseSelectorError;

    /// `"3"` → `Fixed(3)`, `"1-20"` → `Range(1, 20)`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || ParseSelectorError(s.to_string());
        let s = s.trim();
        match s.split_once('-') {
            Some((a, b)) => {
                let a = a.trim().parse().map_err(|_| err())?;
                let b = b.trim().parse().map_err(|_| err())?;
                Ok(Selector::Range(a, b))
            }
            None => s.parse().map(Selector::Fixed).map_err(|_| err()),
        }
    }
}
