//! # eegtools — ERP extraction and component analysis
//!
//! `eegtools` turns a study-wide EEG data cube into event-related potentials
//! and scalar component features.
//!
//! ## Data flow
//!
//! ```text
//! study.safetensors
//!   │
//!   ├─ io::load_cube()          DataCube  [subjects, samples, trials, blocks]
//!   ├─ SingleTrialSignal        one trial of one block        → Signal
//!   ├─ AveragedSignal::fit()    mean ± std over trials/blocks → Signal
//!   ├─ Component                [t1, t2) window of a Signal
//!   │     └─ sum · abs_sum · rms · peak · auc   (values − baseline)
//!   └─ figure::Figure           plotly-shaped JSON for plotting
//! ```
//!
//! Trial and block numbers are **1-based** everywhere in the public API.
//!
//! ## Quick start
//!
//! ```no_run
//! use eegtools::{AnalysisConfig, AveragedSignal, Component, Orientation, Selector};
//! use std::path::Path;
//!
//! let cfg  = AnalysisConfig::load(Path::new("config.toml")).unwrap();
//! let cube = cfg.load_cube().unwrap();
//!
//! // Trials 1–20 of block 2, averaged.
//! let erp = AveragedSignal::new(&cube, "S01", Selector::Range(1, 20), Selector::Fixed(2))
//!     .unwrap()
//!     .fit_with(cfg.nan_policy());
//!
//! let n100 = Component::new(Orientation::Negative, 80.0, 120.0, &erp)
//!     .with_policy(cfg.nan_policy());
//! println!("{n100}: peak {:.3}, auc {:.3}", n100.peak(), n100.auc(false));
//! ```
//!
//! ## Missing samples
//!
//! Missing samples are `NaN`.  Means skip them.  Two reductions historically
//! propagate them (noise when pooling trials *and* blocks, and the positive
//! peak); [`NanPolicy::Strict`] makes those skip missing samples too.
//! Undefined results (all-missing windows, zero-range scaling) are returned as
//! `NaN` rather than errors.

pub mod component;
pub mod config;
pub mod cube;
pub mod error;
pub mod figure;
pub mod io;
pub mod nan;
pub mod selector;
pub mod signal;
pub mod transform;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::AnalysisConfig;

// cube
pub use cube::DataCube;

// error
pub use error::AnalysisError;

// selector
pub use selector::{Axis, Resolved, Selector};

// signal
pub use signal::{AveragedSignal, AveragingMode, AveragingPlan, Signal, SingleTrialSignal};

// component
pub use component::{nearest_index, window_bounds, Component, ComponentBatch, Orientation};

// nan
pub use nan::NanPolicy;

// transform
pub use transform::{softmax, zero_one_scale};

// figure
pub use figure::{BaselineSpec, Figure};

// io
pub use io::{load_cube, write_cube, StWriter};
