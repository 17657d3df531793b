//! Bridges between the deposition loop and external molecular-dynamics engines.
//!
//! A [`Driver`] turns a [`State`] into engine input files, runs the engine as
//! a blocking subprocess and parses its output back into a [`State`]. Drivers
//! are chosen by name from a static registry when the run is configured, so
//! an unknown engine name is reported before any iteration starts.

pub mod gulp;
pub mod lammps;
#[cfg(test)]
pub(crate) mod stub;

use super::config::{ConfigError, DepositionConfig};
use crate::core::io::template::{InputTemplate, TemplateError};
use crate::core::models::state::{State, StateError};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Placeholders every template driver binds itself.
pub const COMMON_RESERVED_KEYWORDS: &[&str] = &["filename"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationStage {
    Relaxation,
    Deposition,
}

impl SimulationStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Relaxation => "relaxation",
            Self::Deposition => "deposition",
        }
    }

    /// Relaxation starts from rest in the engine's own thermostat; only the
    /// deposition stage carries the sampled velocities into the engine.
    pub fn includes_velocities(self) -> bool {
        matches!(self, Self::Deposition)
    }
}

impl fmt::Display for SimulationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to render input template: {0}")]
    Template(#[from] TemplateError),

    #[error("File I/O error for '{path}': {source}")]
    Io { path: String, source: io::Error },

    #[error("Failed to launch '{command}': {source}")]
    Launch { command: String, source: io::Error },

    #[error("Command '{command}' exited unsuccessfully ({status})")]
    ExitStatus { command: String, status: String },

    #[error("Failed to read engine output '{path}': {message}")]
    Output { path: String, message: String },

    #[error("Element '{0}' is not listed in elements_in_potential")]
    UnknownElement(String),

    #[error("Atom type {0} does not correspond to an element in elements_in_potential")]
    UnknownAtomType(usize),

    #[error("Engine output is inconsistent: {0}")]
    State(#[from] StateError),
}

impl DriverError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_string_lossy().to_string(),
            source,
        }
    }

    pub(crate) fn output(path: &Path, message: impl fmt::Display) -> Self {
        Self::Output {
            path: path.to_string_lossy().to_string(),
            message: message.to_string(),
        }
    }
}

/// The capability set of an MD engine adapter.
///
/// `basename` is a path without extension (e.g. `current/deposition004`);
/// drivers derive their input and output file names from it.
pub trait Driver {
    fn name(&self) -> &'static str;

    /// Writes every input file the engine needs for `stage`.
    fn write_inputs(
        &self,
        basename: &Path,
        state: &State,
        stage: SimulationStage,
    ) -> Result<(), DriverError>;

    /// Runs the engine and blocks until it exits.
    fn execute(&self, basename: &Path) -> Result<(), DriverError>;

    /// Parses the final configuration written by the engine.
    fn read_outputs(&self, basename: &Path) -> Result<State, DriverError>;

    /// Factor converting metres per second into the engine's velocity unit.
    fn velocity_scaling(&self) -> f64;
}

pub type DriverFactory = fn(&DepositionConfig, &Path) -> Result<Box<dyn Driver>, ConfigError>;

static REGISTRY: &[(&str, DriverFactory)] = &[
    ("lammps", lammps::LammpsDriver::create),
    ("gulp", gulp::GulpDriver::create),
];

pub fn available_drivers() -> Vec<&'static str> {
    REGISTRY.iter().map(|(name, _)| *name).collect()
}

/// Builds the driver named in `config.driver`, running in `working_dir`.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownPlugin`] for an unregistered name, or the
/// driver's own configuration error (unreadable or inconsistent template,
/// missing driver variables).
pub fn resolve_driver(
    config: &DepositionConfig,
    working_dir: &Path,
) -> Result<Box<dyn Driver>, ConfigError> {
    let requested = config.driver.name.to_ascii_lowercase();
    let factory = REGISTRY
        .iter()
        .find(|(name, _)| *name == requested)
        .map(|(_, factory)| *factory)
        .ok_or_else(|| ConfigError::UnknownPlugin {
            kind: "driver",
            name: config.driver.name.clone(),
            available: available_drivers().join(", "),
        })?;
    factory(config, working_dir)
}

/// Checks that a template and the user's driver variables agree.
///
/// User variables may not take a reserved name, and every template key must
/// be either reserved or provided. Variables in `consumed` are read by the
/// driver itself and are not expected to appear in the template; any other
/// variable the template never uses is logged as a warning.
pub fn validate_template(
    template: &InputTemplate,
    reserved: &[&str],
    consumed: &[&str],
    variables: &BTreeMap<String, String>,
) -> Result<(), ConfigError> {
    if let Some(name) = variables.keys().find(|k| reserved.contains(&k.as_str())) {
        return Err(ConfigError::ReservedVariable(name.clone()));
    }
    if let Some(key) = template
        .keys()
        .iter()
        .find(|k| !reserved.contains(&k.as_str()) && !variables.contains_key(*k))
    {
        return Err(ConfigError::UnboundTemplateKey(key.clone()));
    }
    for name in variables.keys() {
        if !template.keys().contains(name) && !consumed.contains(&name.as_str()) {
            warn!(variable = %name, "Driver variable is not used by the input template.");
        }
    }
    Ok(())
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// How the engine receives its input file on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputStyle {
    /// `binary arguments < input > output`
    Redirect,
    /// `binary arguments -in input > output`
    Flag(&'static str),
}

/// Settings shared by drivers that render an input template and run a
/// command line through the shell.
#[derive(Debug, Clone)]
pub(crate) struct TemplateEngine {
    template: InputTemplate,
    variables: BTreeMap<String, String>,
    binary: PathBuf,
    arguments: String,
    prefix: String,
    relaxation_time: f64,
    deposition_time: f64,
    pub(crate) time_scaling: f64,
    pub(crate) velocity_scaling: f64,
    working_dir: PathBuf,
    environment: Vec<(String, String)>,
    input_style: InputStyle,
}

impl TemplateEngine {
    pub(crate) fn from_config(
        config: &DepositionConfig,
        working_dir: &Path,
        reserved: &[&str],
        consumed: &[&str],
        input_style: InputStyle,
    ) -> Result<Self, ConfigError> {
        let driver = &config.driver;
        let template = InputTemplate::load(&driver.input_template)?;
        let all_reserved: Vec<&str> = COMMON_RESERVED_KEYWORDS
            .iter()
            .chain(reserved)
            .copied()
            .collect();
        validate_template(&template, &all_reserved, consumed, &driver.variables)?;

        Ok(Self {
            template,
            variables: driver.variables.clone(),
            binary: driver.binary.clone(),
            arguments: driver.arguments.clone(),
            prefix: config.command_prefix.clone(),
            relaxation_time: config.relaxation_time,
            deposition_time: config.deposition_time,
            time_scaling: driver.time_scaling_from_picoseconds,
            velocity_scaling: driver.velocity_scaling_from_metres_per_second,
            working_dir: working_dir.to_path_buf(),
            environment: Vec::new(),
            input_style,
        })
    }

    pub(crate) fn with_environment(mut self, key: &str, value: &str) -> Self {
        self.environment.push((key.to_string(), value.to_string()));
        self
    }

    pub(crate) fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Simulated time for `stage`, in picoseconds.
    pub(crate) fn duration_ps(&self, stage: SimulationStage) -> f64 {
        match stage {
            SimulationStage::Relaxation => self.relaxation_time,
            SimulationStage::Deposition => self.deposition_time,
        }
    }

    /// Renders the template with the user's variables plus `reserved`
    /// values and returns the text of the input file.
    pub(crate) fn render(
        &self,
        basename: &Path,
        reserved: impl IntoIterator<Item = (&'static str, String)>,
    ) -> Result<String, DriverError> {
        let mut values = self.variables.clone();
        values.insert(
            "filename".to_string(),
            basename.to_string_lossy().to_string(),
        );
        values.extend(reserved.into_iter().map(|(k, v)| (k.to_string(), v)));
        Ok(self.template.render(&values)?)
    }

    pub(crate) fn command_line(&self, basename: &Path) -> String {
        let input = shell_quote(&with_extension(basename, "input"));
        let input_part = match self.input_style {
            InputStyle::Redirect => format!("< {}", input),
            InputStyle::Flag(flag) => format!("{} {}", flag, input),
        };
        let output_part = format!("> {}", shell_quote(&with_extension(basename, "output")));
        let binary = shell_quote(&self.binary);
        let parts: [&str; 5] = [
            &self.prefix,
            &binary,
            &self.arguments,
            &input_part,
            &output_part,
        ];
        parts
            .iter()
            .filter(|part| !part.trim().is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the engine through `sh -c` in the working directory.
    pub(crate) fn run(&self, basename: &Path) -> Result<(), DriverError> {
        let command = self.command_line(basename);
        info!(command = %command, "Running engine.");
        let status = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&self.working_dir)
            .envs(self.environment.iter().map(|(k, v)| (k, v)))
            .status()
            .map_err(|e| DriverError::Launch {
                command: command.clone(),
                source: e,
            })?;
        if !status.success() {
            return Err(DriverError::ExitStatus {
                command,
                status: status.to_string(),
            });
        }
        debug!("Engine finished successfully.");
        Ok(())
    }
}

/// `basename` with `.extension` appended, keeping any dots already in the name.
pub fn with_extension(basename: &Path, extension: &str) -> PathBuf {
    let mut name = basename.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<(), DriverError> {
    fs::write(path, contents).map_err(|e| DriverError::io(path, e))
}

/// Parses a space separated list of values from a driver variable.
pub(crate) fn parse_list<T: std::str::FromStr>(
    name: &str,
    raw: &str,
) -> Result<Vec<T>, ConfigError> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::DriverVariable {
                name: name.to_string(),
                reason: format!("'{}' is not a valid value", s),
            })
        })
        .collect()
}
