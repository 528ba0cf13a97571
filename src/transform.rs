//! Elementwise rescaling helpers for feature vectors.
use ndarray::{Array1, ArrayView1};

use crate::nan;

/// `exp(x) / Σ exp(x)`; the denominator skips missing values, the numerator does not.
pub fn softmax(x: ArrayView1<f64>) -> Array1<f64> {
    let e = x.mapv(f64::exp);
    let denom = nan::nansum(e.iter().copied());
    e.mapv(|v| v / denom)
}

/// Rescale to `[0, 1]` using the NaN-skipping extrema of `x`.
///
/// A constant input yields `NaN` (0 / 0); callers must avoid zero-range inputs.
pub fn zero_one_scale(x: ArrayView1<f64>) -> Array1<f64> {
    let lo = nan::nanmin(x.iter().copied());
    let hi = nan::nanmax(x.iter().copied());
    x.mapv(|v| (v - lo) / (hi - lo))
}
