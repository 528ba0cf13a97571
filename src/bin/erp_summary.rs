//! erp_summary: load a study cube, average one subject's trials/blocks into an
//! ERP, and print component statistics.  Optionally writes a plotly figure.
//!
//! Example:
//!   erp_summary --config config.toml --subject S01 --trials 1-20 --blocks 2 \
//!       --component N100:80:120 --component P200:150:250 --figure erp.json
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

use eegtools::figure::parse_component_label;
use eegtools::{
    AnalysisConfig, AveragedSignal, BaselineSpec, Component, Figure, NanPolicy, Orientation,
    Selector,
};

/// `LABEL:T1:T2`, e.g. `N100:80:120`.
#[derive(Debug, Clone)]
struct ComponentArg {
    label: String,
    orientation: Orientation,
    t1: f64,
    t2: f64,
}

impl FromStr for ComponentArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let &[label, t1, t2] = parts.as_slice() else {
            bail!("expected LABEL:T1:T2, got '{s}'");
        };
        let (orientation, _) = parse_component_label(label)?;
        Ok(Self {
            label: label.to_string(),
            orientation,
            t1: t1.parse().with_context(|| format!("bad t1 in '{s}'"))?,
            t2: t2.parse().with_context(|| format!("bad t2 in '{s}'"))?,
        })
    }
}

#[derive(Parser, Debug)]
#[command(name = "erp_summary", about = "ERP component statistics for one subject")]
struct Args {
    /// TOML analysis config (data_filename, data_attr_name, legacy_mode).
    #[arg(long)]
    config: PathBuf,

    /// Subject identifier as stored in the cube.
    #[arg(long)]
    subject: String,

    /// Trial selector: N or START-END (1-based, inclusive).
    #[arg(long)]
    trials: Selector,

    /// Block selector: N or START-END (1-based, inclusive).
    #[arg(long)]
    blocks: Selector,

    /// Component window LABEL:T1:T2 (repeatable).
    #[arg(long = "component")]
    components: Vec<ComponentArg>,

    /// Baseline subtracted before statistics.
    #[arg(long, default_value_t = 0.0)]
    baseline: f64,

    /// Skip missing samples in every reduction (overrides legacy_mode).
    #[arg(long)]
    strict: bool,

    /// Write a plotly figure description to this path.
    #[arg(long)]
    figure: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = AnalysisConfig::load(&args.config)?;
    let policy = if args.strict { NanPolicy::Strict } else { cfg.nan_policy() };
    let cube = cfg.load_cube()?;

    let erp = AveragedSignal::new(&cube, &args.subject, args.trials, args.blocks)?;
    info!(subject = %args.subject, mode = ?erp.mode(), policy = ?policy, "fitting ERP");
    let signal = erp.fit_with(policy);

    println!(
        "{:<8} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "comp", "sum", "abs_sum", "rms", "peak", "auc"
    );
    for c in &args.components {
        let comp = Component::with_baseline(c.orientation, c.t1, c.t2, &signal, args.baseline)
            .with_policy(policy);
        println!(
            "{:<8} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
            c.label,
            comp.sum(),
            comp.abs_sum(),
            comp.rms(),
            comp.peak(),
            comp.auc(false),
        );
    }

    if let Some(path) = &args.figure {
        let labels: Vec<(f64, &str)> = args.components.iter().map(|c| (0.0, c.label.as_str())).collect();
        let mut fig = Figure::trial(&[0.0], BaselineSpec::Value(args.baseline), Some(&signal), &labels)?;
        fig.add_signal(signal.timeline().view(), signal.values().view(), &args.subject);
        std::fs::write(path, fig.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "figure written");
    }

    Ok(())
}
