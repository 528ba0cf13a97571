//! The subject × sample × trial × block data cube.
//!
//! A [`DataCube`] is loaded once (see [`crate::io::load_cube`]) and then only
//! read.  Signals borrow it for the duration of their construction and copy
//! out the slice they need, so one cube can back any number of analyses.
use std::collections::BTreeMap;
use std::ops::Range;

use ndarray::{s, Array1, Array4};

use crate::error::{AnalysisError, Result};

/// In-memory EEG recording for a whole study.
#[derive(Debug, Clone)]
pub struct DataCube {
    /// `[subjects, samples, trials, blocks]`, missing samples as `NaN`.
    s2: Array4<f64>,
    /// Sample times shared by every subject, length `samples`.
    timeline: Array1<f64>,
    /// Subject identifiers, row order of `s2`.
    subjects: Vec<String>,
    /// Optional per-subject group labels (e.g. `Control` / `ASD`).
    groups: Option<Vec<String>>,
}

impl DataCube {
    pub fn new(s2: Array4<f64>, timeline: Array1<f64>, subjects: Vec<String>) -> Result<Self> {
        let (n_sub, n_t, _, _) = s2.dim();
        if timeline.len() != n_t {
            return Err(AnalysisError::LengthMismatch {
                what: "timeline",
                expected: n_t,
                got: timeline.len(),
            });
        }
        if subjects.len() != n_sub {
            return Err(AnalysisError::LengthMismatch {
                what: "subjects",
                expected: n_sub,
                got: subjects.len(),
            });
        }
        Ok(Self { s2, timeline, subjects, groups: None })
    }

    /// Attach one group label per subject.
    pub fn with_groups(mut self, groups: Vec<String>) -> Result<Self> {
        if groups.len() != self.subjects.len() {
            return Err(AnalysisError::LengthMismatch {
                what: "group labels",
                expected: self.subjects.len(),
                got: groups.len(),
            });
        }
        self.groups = Some(groups);
        Ok(self)
    }

    pub fn s2(&self) -> &Array4<f64> {
        &self.s2
    }

    pub fn timeline(&self) -> &Array1<f64> {
        &self.timeline
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn groups(&self) -> Option<&[String]> {
        self.groups.as_deref()
    }

    /// `(subjects, samples, trials, blocks)`.
    pub fn dims(&self) -> (usize, usize, usize, usize) {
        self.s2.dim()
    }

    pub fn n_subjects(&self) -> usize {
        self.s2.dim().0
    }

    pub fn n_samples(&self) -> usize {
        self.s2.dim().1
    }

    pub fn n_trials(&self) -> usize {
        self.s2.dim().2
    }

    pub fn n_blocks(&self) -> usize {
        self.s2.dim().3
    }

    /// Row of `name` in the cube (first match).
    pub fn subject_index(&self, name: &str) -> Result<usize> {
        self.subjects
            .iter()
            .position(|s| s == name)
            .ok_or_else(|| AnalysisError::SubjectNotFound(name.to_string()))
    }

    /// Subject rows grouped by label, labels in sorted order.
    ///
    /// Empty when the cube carries no group labels.
    pub fn group_indices(&self) -> BTreeMap<String, Vec<usize>> {
        let mut out: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, g) in self.groups.iter().flatten().enumerate() {
            out.entry(g.clone()).or_default().push(i);
        }
        out
    }

    /// Subject rows carrying `label`, in row order.
    pub fn group_members(&self, label: &str) -> Vec<usize> {
        self.groups
            .iter()
            .flatten()
            .enumerate()
            .filter(|(_, g)| g.as_str() == label)
            .map(|(i, _)| i)
            .collect()
    }

    /// Sub-cube `[members, samples, trials, blocks]` for one group.
    ///
    /// `trials` and `blocks` are 0-based half-open storage ranges, clamped to
    /// the cube extent.
    pub fn group_partial_data(
        &self,
        label: &str,
        trials: Range<usize>,
        blocks: Range<usize>,
    ) -> Array4<f64> {
        let clamp = |r: Range<usize>, n: usize| {
            let start = r.start.min(n);
            start..r.end.clamp(start, n)
        };
        let trials = clamp(trials, self.n_trials());
        let blocks = clamp(blocks, self.n_blocks());
        let members = self.group_members(label);

        let mut out = Array4::<f64>::zeros((members.len(), self.n_samples(), trials.len(), blocks.len()));
        for (k, &row) in members.iter().enumerate() {
            out.slice_mut(s![k, .., .., ..])
                .assign(&self.s2.slice(s![row, .., trials.clone(), blocks.clone()]));
        }
        out
    }
}
