//! Named, time-windowed ERP components (N100, P200, ...) and their statistics.
//!
//! A component window is located by nearest-sample lookup on the signal's
//! timeline and sliced half-open: `[idx(t1), idx(t2))`.  Every statistic is
//! computed on `values − baseline`.
//!
//! | statistic  | reduction                                          |
//! |------------|----------------------------------------------------|
//! | `sum`      | NaN-skipping sum                                   |
//! | `abs_sum`  | NaN-skipping sum of `|x|`                          |
//! | `rms`      | `sqrt(nanmean(x))`                                 |
//! | `peak`     | N: NaN-skipping min · P: max (NaN-skipping if strict) |
//! | `auc`      | trapezoidal integral over the window timeline      |
use std::fmt;
use std::str::FromStr;

use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use thiserror::Error;
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::nan::{self, NanPolicy};
use crate::signal::Signal;

/// Sign of the deflection that defines a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Negative,
    Positive,
}

impl Orientation {
    pub fn letter(self) -> char {
        match self {
            Orientation::Negative => 'N',
            Orientation::Positive => 'P',
        }
    }

    /// `-1.0` for negative components, `1.0` for positive ones.
    pub fn sign(self) -> f64 {
        match self {
            Orientation::Negative => -1.0,
            Orientation::Positive => 1.0,
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown orientation '{0}': expected N or P")]
pub struct ParseOrientationError(String);

impl FromStr for Orientation {
    type Err = ParseOrientationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "N" | "n" => Ok(Orientation::Negative),
            "P" | "p" => Ok(Orientation::Positive),
            _ => Err(ParseOrientationError(s.to_string())),
        }
    }
}

/// Index of the timeline sample closest to `t`; ties go to the lower index.
pub fn nearest_index(timeline: ArrayView1<f64>, t: f64) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, &x) in timeline.iter().enumerate() {
        let d = (x - t).abs();
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

/// Half-open window `[idx(t1), idx(t2))`; empty when `idx(t2) <= idx(t1)`.
pub fn window_bounds(timeline: ArrayView1<f64>, t1: f64, t2: f64) -> std::ops::Range<usize> {
    let a = nearest_index(timeline, t1);
    let b = nearest_index(timeline, t2);
    a..b.max(a)
}

/// One component cut from one signal.
#[derive(Debug, Clone)]
pub struct Component {
    orientation: Orientation,
    t1: f64,
    t2: f64,
    timeline: Array1<f64>,
    values: Array1<f64>,
    baseline: f64,
    policy: NanPolicy,
}

impl Component {
    /// Cut `[t1, t2)` from `signal` with a zero baseline.
    pub fn new(orientation: Orientation, t1: f64, t2: f64, signal: &Signal) -> Self {
        Self::with_baseline(orientation, t1, t2, signal, 0.0)
    }

    pub fn with_baseline(orientation: Orientation, t1: f64, t2: f64, signal: &Signal, baseline: f64) -> Self {
        let w = window_bounds(signal.timeline().view(), t1, t2);
        debug!(orientation = ?orientation, t1, t2, start = w.start, end = w.end, "component window");
        Self {
            orientation,
            t1,
            t2,
            timeline: signal.timeline().slice(s![w.clone()]).to_owned(),
            values: signal.values().slice(s![w]).to_owned(),
            baseline,
            policy: NanPolicy::default(),
        }
    }

    /// Switch the NaN handling of `peak` (see [`NanPolicy`]).
    pub fn with_policy(mut self, policy: NanPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn t1(&self) -> f64 {
        self.t1
    }

    pub fn t2(&self) -> f64 {
        self.t2
    }

    pub fn timeline(&self) -> &Array1<f64> {
        &self.timeline
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Conventional name, e.g. `N100` for a negative component starting at 100.
    pub fn label(&self) -> String {
        format!("{}{}", self.orientation.letter(), self.t1)
    }

    fn adjusted(&self) -> Array1<f64> {
        self.values.mapv(|v| v - self.baseline)
    }

    pub fn sum(&self) -> f64 {
        sum(self.adjusted().view())
    }

    pub fn abs_sum(&self) -> f64 {
        abs_sum(self.adjusted().view())
    }

    /// `sqrt(nanmean(values − baseline))`; negative means give `NaN`.
    pub fn rms(&self) -> f64 {
        rms(self.adjusted().view())
    }

    pub fn peak(&self) -> f64 {
        peak(self.adjusted().view(), self.orientation, self.policy)
    }

    pub fn auc(&self, absolute: bool) -> f64 {
        auc(self.adjusted().view(), self.timeline.view(), absolute)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component {}{}-{} post-onset", self.orientation.letter(), self.t1, self.t2)
    }
}

/// The same component window cut from several signals on a shared timeline.
///
/// Values are stored `[signals, window]`; each statistic returns one entry
/// per signal.
#[derive(Debug, Clone)]
pub struct ComponentBatch {
    orientation: Orientation,
    t1: f64,
    t2: f64,
    timeline: Array1<f64>,
    values: Array2<f64>,
    baseline: f64,
    policy: NanPolicy,
}

impl ComponentBatch {
    pub fn new(orientation: Orientation, t1: f64, t2: f64, signals: &[Signal], baseline: f64) -> Result<Self> {
        let first = signals.first().ok_or(AnalysisError::LengthMismatch {
            what: "signal batch",
            expected: 1,
            got: 0,
        })?;
        if let Some(i) = signals.iter().position(|sig| sig.timeline() != first.timeline()) {
            return Err(AnalysisError::TimelineMismatch { index: i });
        }
        let w = window_bounds(first.timeline().view(), t1, t2);
        let mut values = Array2::<f64>::zeros((signals.len(), w.len()));
        for (mut row, sig) in values.axis_iter_mut(Axis(0)).zip(signals) {
            row.assign(&sig.values().slice(s![w.clone()]));
        }
        Ok(Self {
            orientation,
            t1,
            t2,
            timeline: first.timeline().slice(s![w]).to_owned(),
            values,
            baseline,
            policy: NanPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: NanPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn t1(&self) -> f64 {
        self.t1
    }

    pub fn t2(&self) -> f64 {
        self.t2
    }

    pub fn timeline(&self) -> &Array1<f64> {
        &self.timeline
    }

    /// `[signals, window]`.
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    fn per_signal(&self, f: impl Fn(ArrayView1<f64>) -> f64) -> Array1<f64> {
        let adjusted = self.values.mapv(|v| v - self.baseline);
        adjusted.axis_iter(Axis(0)).map(f).collect()
    }

    pub fn sum(&self) -> Array1<f64> {
        self.per_signal(sum)
    }

    pub fn abs_sum(&self) -> Array1<f64> {
        self.per_signal(abs_sum)
    }

    pub fn rms(&self) -> Array1<f64> {
        self.per_signal(rms)
    }

    pub fn peak(&self) -> Array1<f64> {
        self.per_signal(|x| peak(x, self.orientation, self.policy))
    }

    pub fn auc(&self, absolute: bool) -> Array1<f64> {
        self.per_signal(|x| auc(x, self.timeline.view(), absolute))
    }
}

// ── Reductions on baseline-adjusted windows ─────────────────────────────────

fn sum(x: ArrayView1<f64>) -> f64 {
    nan::nansum(x.iter().copied())
}

fn abs_sum(x: ArrayView1<f64>) -> f64 {
    nan::nansum(x.iter().map(|v| v.abs()))
}

fn rms(x: ArrayView1<f64>) -> f64 {
    nan::nanmean(x.iter().copied()).sqrt()
}

fn peak(x: ArrayView1<f64>, orientation: Orientation, policy: NanPolicy) -> f64 {
    match (orientation, policy) {
        (Orientation::Negative, _) => nan::nanmin(x.iter().copied()),
        (Orientation::Positive, NanPolicy::Legacy) => nan::max(x.iter().copied()),
        (Orientation::Positive, NanPolicy::Strict) => nan::nanmax(x.iter().copied()),
    }
}

fn auc(x: ArrayView1<f64>, timeline: ArrayView1<f64>, absolute: bool) -> f64 {
    let y: Vec<f64> = if absolute {
        x.iter().map(|v| v.abs()).collect()
    } else {
        x.to_vec()
    };
    nan::trapz(&y, &timeline.to_vec())
}
