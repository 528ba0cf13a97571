/// Shared helpers: deterministic synthetic study cubes.
use eegtools::DataCube;
use ndarray::{Array1, Array4};

pub const SUBJECTS: [&str; 3] = ["S01", "S02", "S03"];
pub const GROUPS: [&str; 3] = ["Control", "ASD", "Control"];

/// Timeline -200 .. 800 ms in 4 ms steps (251 samples).
pub fn timeline() -> Array1<f64> {
    Array1::from_iter((0..251).map(|i| -200.0 + 4.0 * i as f64))
}

/// `[3, 251, 12, 4]` cube: a damped oscillation per subject, shifted by
/// trial and block so every cell is distinct.
pub fn synthetic_s2() -> Array4<f64> {
    let tl = timeline();
    Array4::from_shape_fn((3, tl.len(), 12, 4), |(s, t, tr, b)| {
        let ms = tl[t];
        let erp = (-(ms / 300.0).powi(2)).exp() * (ms / 60.0).sin() * 5.0;
        erp + s as f64 * 0.5 + tr as f64 * 0.01 + b as f64 * 0.1
    })
}

#[allow(unused)]
pub fn synthetic_cube() -> DataCube {
    DataCube::new(
        synthetic_s2(),
        timeline(),
        SUBJECTS.iter().map(|s| s.to_string()).collect(),
    )
    .unwrap()
    .with_groups(GROUPS.iter().map(|s| s.to_string()).collect())
    .unwrap()
}

#[allow(unused)]
/// Same cube with every third trial of subject `S02` missing at sample 10.
pub fn cube_with_gaps() -> DataCube {
    let mut s2 = synthetic_s2();
    for tr in (0..12).step_by(3) {
        for b in 0..4 {
            s2[[1, 10, tr, b]] = f64::NAN;
        }
    }
    DataCube::new(s2, timeline(), SUBJECTS.iter().map(|s| s.to_string()).collect()).unwrap()
}

#[allow(unused)]
/// Mean of the non-missing values.
pub fn nanmean(xs: impl IntoIterator<Item = f64>) -> f64 {
    let v: Vec<f64> = xs.into_iter().filter(|x| !x.is_nan()).collect();
    v.iter().sum::<f64>() / v.len() as f64
}

#[allow(unused)]
/// Population standard deviation of the non-missing values.
pub fn nanstd(xs: impl IntoIterator<Item = f64>) -> f64 {
    let v: Vec<f64> = xs.into_iter().filter(|x| !x.is_nan()).collect();
    let m = v.iter().sum::<f64>() / v.len() as f64;
    (v.iter().map(|x| (x - m).powi(2)).sum::<f64>() / v.len() as f64).sqrt()
}
