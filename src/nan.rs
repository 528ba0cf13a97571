//! Missing-value aware reductions.
//!
//! Missing samples are stored as `NaN`.  The `nan*` reductions skip them; the
//! plain variants let a single `NaN` poison the result.  A reduction over no
//! usable values returns `NaN` (sums return `0.0`), never panics.
//!
//! Standard deviations use population normalisation (`ddof = 0`).

/// How reductions that historically propagated `NaN` should behave.
///
/// `Legacy` keeps the two propagating reductions of the original analysis
/// scripts (joint-average noise, positive peak).  `Strict` makes every
/// reduction skip missing samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NanPolicy {
    #[default]
    Legacy,
    Strict,
}

impl NanPolicy {
    pub fn from_legacy_flag(legacy: bool) -> Self {
        if legacy { NanPolicy::Legacy } else { NanPolicy::Strict }
    }
}

pub fn nansum<I: IntoIterator<Item = f64>>(xs: I) -> f64 {
    xs.into_iter().filter(|v| !v.is_nan()).sum()
}

pub fn nanmean<I: IntoIterator<Item = f64>>(xs: I) -> f64 {
    let (sum, n) = xs
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

pub fn nanstd<I: IntoIterator<Item = f64>>(xs: I) -> f64 {
    let vals: Vec<f64> = xs.into_iter().filter(|v| !v.is_nan()).collect();
    population_std(&vals)
}

pub fn std<I: IntoIterator<Item = f64>>(xs: I) -> f64 {
    let vals: Vec<f64> = xs.into_iter().collect();
    population_std(&vals)
}

fn population_std(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    let n = vals.len() as f64;
    let m = vals.iter().sum::<f64>() / n;
    let var = vals.iter().map(|&v| { let d = v - m; d * d }).sum::<f64>() / n;
    var.sqrt()
}

pub fn nanmin<I: IntoIterator<Item = f64>>(xs: I) -> f64 {
    xs.into_iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
        .unwrap_or(f64::NAN)
}

pub fn nanmax<I: IntoIterator<Item = f64>>(xs: I) -> f64 {
    xs.into_iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .unwrap_or(f64::NAN)
}

/// Maximum that returns `NaN` as soon as any input is `NaN`.
pub fn max<I: IntoIterator<Item = f64>>(xs: I) -> f64 {
    let mut acc: Option<f64> = None;
    for v in xs {
        if v.is_nan() {
            return f64::NAN;
        }
        acc = Some(acc.map_or(v, |a| a.max(v)));
    }
    acc.unwrap_or(f64::NAN)
}

/// Trapezoidal integral of `y` over the sample points `x` (same length).
pub fn trapz(y: &[f64], x: &[f64]) -> f64 {
    debug_assert_eq!(y.len(), x.len());
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yy, xx)| 0.5 * (xx[1] - xx[0]) * (yy[0] + yy[1]))
        .sum()
}
