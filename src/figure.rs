//! Plotly-shaped figure descriptions for trials and ERPs.
//!
//! Nothing here renders.  [`Figure`] serialises to the JSON a plotly front end
//! accepts (`{"data": [...], "layout": {...}}`):
//!
//! * signal traces, colours cycling royalblue → firebrick → green → gold
//! * a dashed black horizontal baseline across x ∈ [-500, 1500]
//! * dashed brown vertical stimulus markers across y ∈ [-13, 13]
//! * text labels for components at `stimulus + latency`, y = ±7 by orientation
use ndarray::ArrayView1;
use serde::Serialize;
use thiserror::Error;

use crate::component::Orientation;
use crate::nan;
use crate::signal::Signal;

const PALETTE: [&str; 4] = ["royalblue", "firebrick", "green", "gold"];
const BASELINE_X: (f64, f64) = (-500.0, 1500.0);
const STIMULUS_Y: (f64, f64) = (-13.0, 13.0);
const LABEL_OFFSET: f64 = 7.0;

#[derive(Debug, Error, PartialEq)]
pub enum FigureError {
    #[error("baseline method {0:?} needs a signal")]
    MissingSignal(BaselineSpec),
    #[error("bad component label '{0}': expected N or P followed by a latency, e.g. N100")]
    BadLabel(String),
}

/// Where the horizontal baseline sits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BaselineSpec {
    Value(f64),
    /// NaN-skipping mean of the signal over samples before time 0.
    PreStimulusMean,
}

impl BaselineSpec {
    pub fn resolve(self, signal: Option<&Signal>) -> Result<f64, FigureError> {
        match self {
            BaselineSpec::Value(v) => Ok(v),
            BaselineSpec::PreStimulusMean => {
                let sig = signal.ok_or(FigureError::MissingSignal(self))?;
                Ok(pre_stimulus_mean(sig))
            }
        }
    }
}

/// Mean of the samples whose time is negative; `NaN` if there are none.
pub fn pre_stimulus_mean(signal: &Signal) -> f64 {
    nan::nanmean(
        signal
            .timeline()
            .iter()
            .zip(signal.values().iter())
            .filter(|(&t, _)| t < 0.0)
            .map(|(_, &v)| v),
    )
}

/// `"N100"` → `(Negative, 100.0)`.
pub fn parse_component_label(label: &str) -> Result<(Orientation, f64), FigureError> {
    let bad = || FigureError::BadLabel(label.to_string());
    let mut chars = label.chars();
    let orientation = chars
        .next()
        .and_then(|c| c.to_string().parse::<Orientation>().ok())
        .ok_or_else(bad)?;
    let latency = chars.as_str().parse::<f64>().map_err(|_| bad())?;
    Ok((orientation, latency))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Line {
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoverinfo: Option<String>,
    pub showlegend: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Shape {
    #[serde(rename = "type")]
    pub kind: String,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub line: Line,
}

impl Shape {
    fn dashed(x0: f64, y0: f64, x1: f64, y1: f64, color: &str) -> Self {
        Self {
            kind: "line".into(),
            x0,
            y0,
            x1,
            y1,
            line: Line { color: color.into(), width: Some(1.0), dash: Some("dash".into()) },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AxisTitle {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Layout {
    pub template: String,
    pub xaxis: AxisTitle,
    pub yaxis: AxisTitle,
    pub shapes: Vec<Shape>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            template: "plotly_white".into(),
            xaxis: AxisTitle { title: "time (ms)".into() },
            yaxis: AxisTitle { title: "signal".into() },
            shapes: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
    #[serde(skip)]
    next_color: usize,
}

impl Figure {
    pub fn new() -> Self {
        Self::default()
    }

    /// A trial figure: baseline, one marker per stimulus, and component labels.
    ///
    /// `components` pairs a stimulus time with a label such as `"P200"`.
    pub fn trial(
        stimuli_times: &[f64],
        baseline: BaselineSpec,
        signal: Option<&Signal>,
        components: &[(f64, &str)],
    ) -> Result<Self, FigureError> {
        let mut fig = Self::new();
        fig.add_baseline(baseline.resolve(signal)?);
        for &t in stimuli_times {
            fig.add_stimulus(t);
        }
        for &(stimulus, label) in components {
            fig.add_component(label, stimulus)?;
        }
        Ok(fig)
    }

    pub fn add_baseline(&mut self, y: f64) {
        self.layout
            .shapes
            .push(Shape::dashed(BASELINE_X.0, y, BASELINE_X.1, y, "black"));
    }

    pub fn add_stimulus(&mut self, time: f64) {
        self.layout
            .shapes
            .push(Shape::dashed(time, STIMULUS_Y.0, time, STIMULUS_Y.1, "brown"));
    }

    /// Place `label` (e.g. `N100`) at `stimulus_time + latency`.
    pub fn add_component(&mut self, label: &str, stimulus_time: f64) -> Result<(), FigureError> {
        let (orientation, latency) = parse_component_label(label)?;
        self.data.push(Trace {
            kind: "scatter".into(),
            x: vec![stimulus_time + latency],
            y: vec![orientation.sign() * LABEL_OFFSET],
            name: None,
            mode: Some("text".into()),
            line: None,
            text: Some(vec![label.to_string()]),
            hoverinfo: Some("skip".into()),
            showlegend: false,
        });
        Ok(())
    }

    /// Append a line trace in the next palette colour.
    pub fn add_signal(&mut self, timeline: ArrayView1<f64>, values: ArrayView1<f64>, name: &str) {
        let color = PALETTE[self.next_color % PALETTE.len()];
        self.next_color += 1;
        self.data.push(Trace {
            kind: "scatter".into(),
            x: timeline.to_vec(),
            y: values.to_vec(),
            name: Some(name.to_string()),
            mode: None,
            line: Some(Line { color: color.into(), width: None, dash: None }),
            text: None,
            hoverinfo: None,
            showlegend: true,
        });
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
