use crate::error::{CliError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileSimulationCell {
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub c: Option<f64>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FileDepositionType {
    Monatomic,
    Molecule,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileDistribution {
    pub name: String,
    #[serde(default)]
    pub args: Vec<f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FilePostprocessing {
    pub name: String,
    #[serde(default)]
    pub args: Vec<f64>,
    pub strict: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileDriver {
    pub name: Option<String>,
    pub binary: Option<PathBuf>,
    pub input_template: Option<PathBuf>,
    pub arguments: Option<String>,
    pub velocity_scaling_from_metres_per_second: Option<f64>,
    pub time_scaling_from_picoseconds: Option<f64>,
    #[serde(default)]
    pub variables: BTreeMap<String, toml::Value>,
}

/// The settings file as written by the user. Every field is optional here;
/// required values are enforced when the core configuration is built.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub substrate_xyz: Option<PathBuf>,
    pub simulation_cell: Option<FileSimulationCell>,
    pub deposition_type: Option<FileDepositionType>,
    pub element: Option<String>,
    pub molecule_xyz: Option<PathBuf>,
    pub num_deposited_per_iteration: Option<usize>,
    pub deposition_height: Option<f64>,
    pub deposition_temperature: Option<f64>,
    pub min_velocity: Option<f64>,
    pub max_velocity_attempts: Option<usize>,
    pub relaxation_time: Option<f64>,
    pub deposition_time: Option<f64>,
    pub max_total_iterations: Option<u64>,
    pub max_sequential_failures: Option<u64>,
    pub position_distribution: Option<FileDistribution>,
    pub velocity_distribution: Option<FileDistribution>,
    #[serde(default)]
    pub postprocessing: Vec<FilePostprocessing>,
    pub command_prefix: Option<String>,
    pub seed: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub driver: Option<FileDriver>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading settings from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

/// Directory that relative paths in the settings file are resolved against.
pub fn settings_dir(settings: &Path) -> &Path {
    match settings.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// The `log-file` setting, read before logging is initialized. A settings
/// file that cannot be parsed yields `None`; the error surfaces later when
/// the full configuration is built.
pub fn log_file_setting(settings: &Path) -> Option<PathBuf> {
    let log_file = FileConfig::from_file(settings).ok()?.log_file?;
    Some(resolve_relative(settings_dir(settings), &log_file))
}
