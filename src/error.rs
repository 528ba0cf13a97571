//! Errors raised by the analysis core.
//!
//! File and configuration loading report through `anyhow`; everything that
//! indexes into a [`DataCube`](crate::DataCube) or builds a signal reports an
//! [`AnalysisError`] so callers can match on the failure kind.
use thiserror::Error;

use crate::selector::{Axis, Selector};

/// Errors from signal extraction and component analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The subject identifier is not in the cube's subject list.
    #[error("subject '{0}' not found in data cube")]
    SubjectNotFound(String),

    /// Both axes fixed to a single index: there is no axis to average over.
    #[error("nothing to average: trial {trial} and block {block} are both single indices; use SingleTrialSignal")]
    NothingToAverage { trial: Selector, block: Selector },

    /// A selector that is malformed regardless of the cube (index 0, start > end).
    #[error("invalid {axis} selector {selector}: {reason}")]
    InvalidSelector {
        axis: Axis,
        selector: Selector,
        reason: &'static str,
    },

    /// A 1-based index past the extent of the cube along `axis`.
    #[error("{axis} {index} out of bounds (cube has {len})")]
    OutOfBounds { axis: Axis, index: usize, len: usize },

    /// Parallel arrays that must share a length do not.
    #[error("{what} has length {got}, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Batch components need every signal on the same timeline.
    #[error("signal {index} does not share the batch timeline")]
    TimelineMismatch { index: usize },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
