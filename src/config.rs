//! Analysis configuration.
//!
//! [`AnalysisConfig`] says where the study cube lives and how reductions treat
//! missing samples.  It is read from a small TOML document:
//!
//! ```toml
//! data_filename  = "data/study.safetensors"
//! data_attr_name = "Data_All"
//! legacy_mode    = true
//! ```
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cube::DataCube;
use crate::nan::NanPolicy;

/// Configuration for loading a study and running ERP analyses.
///
/// All fields are `pub`, so struct-update syntax works:
///
/// ```
/// use eegtools::AnalysisConfig;
///
/// let cfg = AnalysisConfig {
///     data_filename: "study.safetensors".into(),
///     legacy_mode:   false,
///     ..AnalysisConfig::default()
/// };
/// assert_eq!(cfg.data_attr_name, "Data_All");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Path to the safetensors study file.
    ///
    /// Relative paths are resolved against the directory of the config file
    /// by [`AnalysisConfig::load`].  `mat_filename` is accepted as an alias.
    ///
    /// Default: `data.safetensors`.
    #[serde(alias = "mat_filename")]
    pub data_filename: PathBuf,

    /// Top-level field holding the `s2`, `time` and `subjects` members.
    ///
    /// Default: `"Data_All"`.
    pub data_attr_name: String,

    /// Member holding one group label per subject (read if present).
    ///
    /// Default: `"group"`.
    pub group_label: String,

    /// Keep the historical NaN behaviour of joint-average noise and positive
    /// peaks.  `false` makes every reduction skip missing samples.
    ///
    /// Default: `true`.
    pub legacy_mode: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_filename: PathBuf::from("data.safetensors"),
            data_attr_name: "Data_All".to_string(),
            group_label: "group".to_string(),
            legacy_mode: true,
        }
    }
}

impl AnalysisConfig {
    /// Read a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut cfg = Self::from_toml(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if cfg.data_filename.is_relative() {
            if let Some(dir) = path.parent() {
                cfg.data_filename = dir.join(&cfg.data_filename);
            }
        }
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn nan_policy(&self) -> NanPolicy {
        NanPolicy::from_legacy_flag(self.legacy_mode)
    }

    /// Load the cube this configuration points at.
    pub fn load_cube(&self) -> Result<DataCube> {
        crate::io::load_cube(&self.data_filename, &self.data_attr_name, &self.group_label)
    }
}
