//! Signals extracted from a [`DataCube`].
//!
//! * [`SingleTrialSignal`] — one subject / trial / block slice, no noise.
//! * [`AveragedSignal`]    — an ERP: trials and/or blocks averaged per sample,
//!   with the per-sample standard deviation as the noise estimate.
//!
//! ```text
//! s2[sub, :, trial, block]            SingleTrialSignal
//! s2[sub, :, t0..t1, block]  → mean   AveragedSignal (over trials)
//! s2[sub, :, trial, b0..b1]  → mean   AveragedSignal (over blocks)
//! s2[sub, :, t0..t1, b0..b1] → mean   AveragedSignal (over both)
//! ```
use ndarray::{s, Array1, Array3, Axis as NdAxis};
use tracing::debug;

use crate::cube::DataCube;
use crate::error::{AnalysisError, Result};
use crate::nan::{self, NanPolicy};
use crate::selector::{Axis, Resolved, Selector};

/// Amplitudes on a timeline, with an optional per-sample noise estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    values: Array1<f64>,
    timeline: Array1<f64>,
    noise: Option<Array1<f64>>,
}

impl Signal {
    pub fn new(values: Array1<f64>, timeline: Array1<f64>, noise: Option<Array1<f64>>) -> Result<Self> {
        if timeline.len() != values.len() {
            return Err(AnalysisError::LengthMismatch {
                what: "timeline",
                expected: values.len(),
                got: timeline.len(),
            });
        }
        if let Some(n) = &noise {
            if n.len() != values.len() {
                return Err(AnalysisError::LengthMismatch {
                    what: "noise",
                    expected: values.len(),
                    got: n.len(),
                });
            }
        }
        Ok(Self { values, timeline, noise })
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn timeline(&self) -> &Array1<f64> {
        &self.timeline
    }

    pub fn noise(&self) -> Option<&Array1<f64>> {
        self.noise.as_ref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One trial of one block for one subject.
pub struct SingleTrialSignal;

impl SingleTrialSignal {
    /// Extract `s2[subject, :, trial - 1, block - 1]` on the cube's timeline.
    pub fn extract(cube: &DataCube, subject: &str, trial: usize, block: usize) -> Result<Signal> {
        Self::extract_with_timeline(cube, subject, trial, block, cube.timeline().clone())
    }

    /// As [`extract`](Self::extract) but on a caller-supplied timeline.
    pub fn extract_with_timeline(
        cube: &DataCube,
        subject: &str,
        trial: usize,
        block: usize,
        timeline: Array1<f64>,
    ) -> Result<Signal> {
        let sub = cube.subject_index(subject)?;
        let t = index_of(Selector::Fixed(trial).resolve(Axis::Trial, cube.n_trials())?);
        let b = index_of(Selector::Fixed(block).resolve(Axis::Block, cube.n_blocks())?);
        let values = cube.s2().slice(s![sub, .., t, b]).to_owned();
        Signal::new(values, timeline, None)
    }
}

fn index_of(r: Resolved) -> usize {
    r.as_range().start
}

/// Which axes an [`AveragedSignal`] reduces over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AveragingMode {
    /// Block fixed, trials ranged.
    Trials,
    /// Trial fixed, blocks ranged.
    Blocks,
    /// Both ranged; every (trial, block) cell pooled.
    TrialsAndBlocks,
}

/// A validated pair of selectors and the averaging mode they imply.
///
/// Only [`AveragingPlan::parse`] builds one, before any array access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AveragingPlan {
    trials: Selector,
    blocks: Selector,
    mode: AveragingMode,
}

impl AveragingPlan {
    pub fn parse(trials: Selector, blocks: Selector) -> Result<Self> {
        let trials = trials.validate(Axis::Trial)?;
        let blocks = blocks.validate(Axis::Block)?;
        let mode = match (trials, blocks) {
            (Selector::Fixed(_), Selector::Fixed(_)) => {
                return Err(AnalysisError::NothingToAverage { trial: trials, block: blocks });
            }
            (Selector::Range(..), Selector::Fixed(_)) => AveragingMode::Trials,
            (Selector::Fixed(_), Selector::Range(..)) => AveragingMode::Blocks,
            (Selector::Range(..), Selector::Range(..)) => AveragingMode::TrialsAndBlocks,
        };
        Ok(Self { trials, blocks, mode })
    }

    pub fn trials(&self) -> Selector {
        self.trials
    }

    pub fn blocks(&self) -> Selector {
        self.blocks
    }

    pub fn mode(&self) -> AveragingMode {
        self.mode
    }
}

/// An event-related potential: a subject's trials/blocks averaged per sample.
///
/// Construction copies the selected `[samples, trials, blocks]` slice out of
/// the cube (a fixed axis keeps length 1); [`fit`](Self::fit) reduces it.
#[derive(Debug, Clone)]
pub struct AveragedSignal {
    subject: String,
    plan: AveragingPlan,
    data: Array3<f64>,
    timeline: Array1<f64>,
}

impl AveragedSignal {
    pub fn new(
        cube: &DataCube,
        subject: &str,
        trials: Selector,
        blocks: Selector,
    ) -> Result<Self> {
        Self::with_timeline(cube, subject, trials, blocks, cube.timeline().clone())
    }

    pub fn with_timeline(
        cube: &DataCube,
        subject: &str,
        trials: Selector,
        blocks: Selector,
        timeline: Array1<f64>,
    ) -> Result<Self> {
        let sub = cube.subject_index(subject)?;
        let plan = AveragingPlan::parse(trials, blocks)?;
        let tr = plan.trials().resolve(Axis::Trial, cube.n_trials())?.as_range();
        let bl = plan.blocks().resolve(Axis::Block, cube.n_blocks())?.as_range();
        if timeline.len() != cube.n_samples() {
            return Err(AnalysisError::LengthMismatch {
                what: "timeline",
                expected: cube.n_samples(),
                got: timeline.len(),
            });
        }
        debug!(
            subject,
            trials = %plan.trials(),
            blocks = %plan.blocks(),
            mode = ?plan.mode(),
            "averaged signal slice"
        );
        let data = cube.s2().slice(s![sub, .., tr, bl]).to_owned();
        Ok(Self { subject: subject.to_string(), plan, data, timeline })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn plan(&self) -> &AveragingPlan {
        &self.plan
    }

    pub fn mode(&self) -> AveragingMode {
        self.plan.mode()
    }

    /// The stored `[samples, trials, blocks]` slice.
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// Average with the default [`NanPolicy::Legacy`].
    pub fn fit(&self) -> Signal {
        self.fit_with(NanPolicy::default())
    }

    /// Per-sample mean and noise over the averaged cells.
    ///
    /// The mean always skips missing cells.  Noise skips them when averaging
    /// over a single axis; when pooling trials and blocks it skips them only
    /// under [`NanPolicy::Strict`].
    pub fn fit_with(&self, policy: NanPolicy) -> Signal {
        let nan_safe_noise = match self.plan.mode() {
            AveragingMode::Trials | AveragingMode::Blocks => true,
            AveragingMode::TrialsAndBlocks => policy == NanPolicy::Strict,
        };
        let n = self.data.len_of(NdAxis(0));
        let mut values = Array1::<f64>::zeros(n);
        let mut noise = Array1::<f64>::zeros(n);
        for (i, cells) in self.data.axis_iter(NdAxis(0)).enumerate() {
            values[i] = nan::nanmean(cells.iter().copied());
            noise[i] = if nan_safe_noise {
                nan::nanstd(cells.iter().copied())
            } else {
                nan::std(cells.iter().copied())
            };
        }
        Signal {
            values,
            timeline: self.timeline.clone(),
            noise: Some(noise),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array4;

    fn cube() -> DataCube {
        // value = trial*10 + block, sample-independent
        let s2 = Array4::from_shape_fn((2, 3, 4, 3), |(s, _t, tr, b)| {
            (s * 100 + tr * 10 + b) as f64
        });
        DataCube::new(s2, Array1::from(vec![-100.0, 0.0, 100.0]), vec!["s1".into(), "s2".into()])
            .unwrap()
    }

    #[test]
    fn signal_length_invariants() {
        let err = Signal::new(Array1::zeros(3), Array1::zeros(2), None).unwrap_err();
        assert!(matches!(err, AnalysisError::LengthMismatch { what: "timeline", .. }));
        let err = Signal::new(Array1::zeros(3), Array1::zeros(3), Some(Array1::zeros(4))).unwrap_err();
        assert!(matches!(err, AnalysisError::LengthMismatch { what: "noise", .. }));
    }

    #[test]
    fn single_trial_uses_one_based_indices() {
        let c = cube();
        let sig = SingleTrialSignal::extract(&c, "s2", 2, 3).unwrap();
        // subject row 1, trial index 1, block index 2.
        assert!(sig.values().iter().all(|&v| v == 112.0));
        assert!(sig.noise().is_none());
        assert_eq!(sig.timeline(), c.timeline());
    }

    #[test]
    fn single_trial_unknown_subject() {
        let err = SingleTrialSignal::extract(&cube(), "nobody", 1, 1).unwrap_err();
        assert_eq!(err, AnalysisError::SubjectNotFound("nobody".into()));
    }

    #[test]
    fn plan_modes() {
        use Selector::*;
        assert_eq!(AveragingPlan::parse(Range(1, 4), Fixed(2)).unwrap().mode(), AveragingMode::Trials);
        assert_eq!(AveragingPlan::parse(Fixed(1), Range(1, 3)).unwrap().mode(), AveragingMode::Blocks);
        assert_eq!(
            AveragingPlan::parse(Range(1, 2), Range(1, 2)).unwrap().mode(),
            AveragingMode::TrialsAndBlocks
        );
        assert!(matches!(
            AveragingPlan::parse(Fixed(3), Fixed(2)),
            Err(AnalysisError::NothingToAverage { .. })
        ));
    }

    #[test]
    fn plan_keeps_validated_selectors() {
        let plan = AveragingPlan::parse(Selector::Fixed(3), Selector::Range(2, 4)).unwrap();
        assert_eq!(plan.trials(), Selector::Fixed(3));
        assert_eq!(plan.blocks(), Selector::Range(2, 4));
        assert_eq!(plan.mode(), AveragingMode::Blocks);
        assert!(matches!(
            AveragingPlan::parse(Selector::Range(0, 4), Selector::Fixed(1)),
            Err(AnalysisError::InvalidSelector { axis: Axis::Trial, .. })
        ));
    }

    #[test]
    fn average_over_trials() {
        let c = cube();
        let erp = AveragedSignal::new(&c, "s1", Selector::Range(1, 4), Selector::Fixed(2)).unwrap();
        assert_eq!(erp.data().dim(), (3, 4, 1));
        let sig = erp.fit();
        // trials 0..4 at block 1: 1, 11, 21, 31 → mean 16
        for &v in sig.values() {
            assert_abs_diff_eq!(v, 16.0, epsilon = 1e-12);
        }
        let expected_std = (((15.0f64).powi(2) * 2.0 + 25.0 * 2.0) / 4.0).sqrt();
        for &v in sig.noise().unwrap() {
            assert_abs_diff_eq!(v, expected_std, epsilon = 1e-12);
        }
    }

    #[test]
    fn average_over_blocks() {
        let c = cube();
        let sig = AveragedSignal::new(&c, "s1", Selector::Fixed(2), Selector::Range(1, 3)).unwrap().fit();
        // trial index 1, blocks 0..3: 10, 11, 12
        assert_abs_diff_eq!(sig.values()[0], 11.0, epsilon = 1e-12);
    }

    #[test]
    fn average_over_both() {
        let c = cube();
        let sig = AveragedSignal::new(&c, "s2", Selector::Range(1, 2), Selector::Range(1, 2)).unwrap().fit();
        // 100, 101, 110, 111 → 105.5
        assert_abs_diff_eq!(sig.values()[2], 105.5, epsilon = 1e-12);
    }

    #[test]
    fn joint_noise_depends_on_policy() {
        let mut s2 = Array4::<f64>::zeros((1, 1, 2, 2));
        s2[[0, 0, 0, 0]] = 1.0;
        s2[[0, 0, 0, 1]] = 3.0;
        s2[[0, 0, 1, 0]] = f64::NAN;
        s2[[0, 0, 1, 1]] = 2.0;
        let c = DataCube::new(s2, Array1::zeros(1), vec!["x".into()]).unwrap();
        let erp = AveragedSignal::new(&c, "x", Selector::Range(1, 2), Selector::Range(1, 2)).unwrap();

        let legacy = erp.fit_with(NanPolicy::Legacy);
        assert_abs_diff_eq!(legacy.values()[0], 2.0, epsilon = 1e-12);
        assert!(legacy.noise().unwrap()[0].is_nan());

        let strict = erp.fit_with(NanPolicy::Strict);
        assert_abs_diff_eq!(strict.noise().unwrap()[0], (2.0f64 / 3.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn fixed_pair_rejected_before_bounds_check() {
        // Indices far outside the cube still report the configuration error.
        let err = AveragedSignal::new(&cube(), "s1", Selector::Fixed(30), Selector::Fixed(20)).unwrap_err();
        assert!(matches!(err, AnalysisError::NothingToAverage { .. }));
    }

    #[test]
    fn range_past_cube_rejected() {
        let err = AveragedSignal::new(&cube(), "s1", Selector::Range(1, 9), Selector::Fixed(1)).unwrap_err();
        assert_eq!(err, AnalysisError::OutOfBounds { axis: Axis::Trial, index: 9, len: 4 });
    }
}
