use crate::core::io::template::TemplateError;
use crate::core::models::cell::SimulationCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Unknown {kind} '{name}' (available: {available})")]
    UnknownPlugin {
        kind: &'static str,
        name: String,
        available: String,
    },

    #[error("{kind} '{name}' takes {expected} argument(s), {found} given")]
    ArgumentCount {
        kind: &'static str,
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Input template is invalid: {0}")]
    Template(#[from] TemplateError),

    #[error("Template variable '{0}' is reserved and cannot be set by the user")]
    ReservedVariable(String),

    #[error("Template key '{0}' is neither reserved nor provided as a driver variable")]
    UnboundTemplateKey(String),

    #[error("Driver variable '{name}': {reason}")]
    DriverVariable { name: String, reason: String },

    #[error("Sampling failed: {0}")]
    Sampling(String),
}

/// A plugin selected by name, with its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionSpec {
    pub name: String,
    pub args: Vec<f64>,
}

impl DistributionSpec {
    pub fn new(name: impl Into<String>, args: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostprocessingSpec {
    pub name: String,
    pub args: Vec<f64>,
    /// When false, a failing verdict from this stage is only logged.
    pub strict: bool,
}

impl PostprocessingSpec {
    pub fn new(name: impl Into<String>, args: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            args,
            strict: true,
        }
    }

    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }
}

/// What is added to the system on every deposition step.
#[derive(Debug, Clone, PartialEq)]
pub enum DepositionKind {
    Monatomic { element: String },
    Molecule { xyz_path: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub name: String,
    pub binary: PathBuf,
    pub input_template: PathBuf,
    pub arguments: String,
    pub velocity_scaling_from_metres_per_second: f64,
    pub time_scaling_from_picoseconds: f64,
    /// Extra values substituted into the input template. List-valued settings
    /// are stored space separated.
    pub variables: BTreeMap<String, String>,
}

impl DriverConfig {
    pub fn new(name: impl Into<String>, binary: PathBuf, input_template: PathBuf) -> Self {
        Self {
            name: name.into(),
            binary,
            input_template,
            arguments: String::new(),
            velocity_scaling_from_metres_per_second: 1.0,
            time_scaling_from_picoseconds: 1.0,
            variables: BTreeMap::new(),
        }
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepositionConfig {
    pub cell: SimulationCell,
    pub substrate_xyz: PathBuf,
    pub kind: DepositionKind,
    pub num_deposited_per_iteration: usize,
    pub deposition_height: f64,
    pub deposition_temperature: f64,
    pub min_velocity: f64,
    pub max_velocity_attempts: usize,
    pub relaxation_time: f64,
    pub deposition_time: f64,
    pub max_total_iterations: u64,
    pub max_sequential_failures: u64,
    pub position_distribution: DistributionSpec,
    pub velocity_distribution: DistributionSpec,
    pub postprocessing: Vec<PostprocessingSpec>,
    pub command_prefix: String,
    /// Seed for a fresh run; a resumed run always uses the persisted seed.
    pub seed: Option<u64>,
    pub driver: DriverConfig,
}

pub const DEFAULT_NUM_DEPOSITED: usize = 1;
pub const DEFAULT_DEPOSITION_TEMPERATURE: f64 = 300.0;
pub const DEFAULT_MAX_VELOCITY_ATTEMPTS: usize = 10_000;
pub const MAX_SEED: u64 = i64::MAX as u64;

#[derive(Default)]
pub struct DepositionConfigBuilder {
    cell: Option<SimulationCell>,
    substrate_xyz: Option<PathBuf>,
    kind: Option<DepositionKind>,
    num_deposited_per_iteration: Option<usize>,
    deposition_height: Option<f64>,
    deposition_temperature: Option<f64>,
    min_velocity: Option<f64>,
    max_velocity_attempts: Option<usize>,
    relaxation_time: Option<f64>,
    deposition_time: Option<f64>,
    max_total_iterations: Option<u64>,
    max_sequential_failures: Option<u64>,
    position_distribution: Option<DistributionSpec>,
    velocity_distribution: Option<DistributionSpec>,
    postprocessing: Vec<PostprocessingSpec>,
    command_prefix: Option<String>,
    seed: Option<u64>,
    driver: Option<DriverConfig>,
}

impl DepositionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(mut self, cell: SimulationCell) -> Self {
        self.cell = Some(cell);
        self
    }
    pub fn substrate_xyz(mut self, path: PathBuf) -> Self {
        self.substrate_xyz = Some(path);
        self
    }
    pub fn kind(mut self, kind: DepositionKind) -> Self {
        self.kind = Some(kind);
        self
    }
    pub fn num_deposited_per_iteration(mut self, n: usize) -> Self {
        self.num_deposited_per_iteration = Some(n);
        self
    }
    pub fn deposition_height(mut self, height: f64) -> Self {
        self.deposition_height = Some(height);
        self
    }
    pub fn deposition_temperature(mut self, temperature: f64) -> Self {
        self.deposition_temperature = Some(temperature);
        self
    }
    pub fn min_velocity(mut self, velocity: f64) -> Self {
        self.min_velocity = Some(velocity);
        self
    }
    pub fn max_velocity_attempts(mut self, attempts: usize) -> Self {
        self.max_velocity_attempts = Some(attempts);
        self
    }
    pub fn relaxation_time(mut self, picoseconds: f64) -> Self {
        self.relaxation_time = Some(picoseconds);
        self
    }
    pub fn deposition_time(mut self, picoseconds: f64) -> Self {
        self.deposition_time = Some(picoseconds);
        self
    }
    pub fn max_total_iterations(mut self, n: u64) -> Self {
        self.max_total_iterations = Some(n);
        self
    }
    pub fn max_sequential_failures(mut self, n: u64) -> Self {
        self.max_sequential_failures = Some(n);
        self
    }
    pub fn position_distribution(mut self, spec: DistributionSpec) -> Self {
        self.position_distribution = Some(spec);
        self
    }
    pub fn velocity_distribution(mut self, spec: DistributionSpec) -> Self {
        self.velocity_distribution = Some(spec);
        self
    }
    pub fn postprocessing_stage(mut self, spec: PostprocessingSpec) -> Self {
        self.postprocessing.push(spec);
        self
    }
    pub fn postprocessing(mut self, specs: Vec<PostprocessingSpec>) -> Self {
        self.postprocessing = specs;
        self
    }
    pub fn command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = Some(prefix.into());
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn driver(mut self, driver: DriverConfig) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn build(self) -> Result<DepositionConfig, ConfigError> {
        let config = DepositionConfig {
            cell: self.cell.ok_or(ConfigError::MissingParameter("simulation_cell"))?,
            substrate_xyz: self
                .substrate_xyz
                .ok_or(ConfigError::MissingParameter("substrate_xyz"))?,
            kind: self.kind.ok_or(ConfigError::MissingParameter("deposition_type"))?,
            num_deposited_per_iteration: self
                .num_deposited_per_iteration
                .unwrap_or(DEFAULT_NUM_DEPOSITED),
            deposition_height: self
                .deposition_height
                .ok_or(ConfigError::MissingParameter("deposition_height"))?,
            deposition_temperature: self
                .deposition_temperature
                .unwrap_or(DEFAULT_DEPOSITION_TEMPERATURE),
            min_velocity: self
                .min_velocity
                .ok_or(ConfigError::MissingParameter("min_velocity"))?,
            max_velocity_attempts: self
                .max_velocity_attempts
                .unwrap_or(DEFAULT_MAX_VELOCITY_ATTEMPTS),
            relaxation_time: self
                .relaxation_time
                .ok_or(ConfigError::MissingParameter("relaxation_time"))?,
            deposition_time: self
                .deposition_time
                .ok_or(ConfigError::MissingParameter("deposition_time"))?,
            max_total_iterations: self
                .max_total_iterations
                .ok_or(ConfigError::MissingParameter("max_total_iterations"))?,
            max_sequential_failures: self
                .max_sequential_failures
                .ok_or(ConfigError::MissingParameter("max_sequential_failures"))?,
            position_distribution: self
                .position_distribution
                .unwrap_or_else(|| DistributionSpec::new("uniform", Vec::new())),
            velocity_distribution: self
                .velocity_distribution
                .unwrap_or_else(|| DistributionSpec::new("gaussian", Vec::new())),
            postprocessing: self.postprocessing,
            command_prefix: self.command_prefix.unwrap_or_default(),
            seed: self.seed,
            driver: self.driver.ok_or(ConfigError::MissingParameter("driver"))?,
        };
        config.validate()?;
        Ok(config)
    }
}

impl DepositionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &'static str, reason: &str| {
            Err(ConfigError::InvalidParameter {
                name,
                reason: reason.to_string(),
            })
        };

        if self.num_deposited_per_iteration == 0 {
            return invalid("num_deposited_per_iteration", "must be at least 1");
        }
        if !(self.deposition_height > 0.0) {
            return invalid("deposition_height", "must be strictly positive");
        }
        if !(self.deposition_temperature >= 0.0) {
            return invalid("deposition_temperature", "must not be negative");
        }
        if !(self.min_velocity >= 0.0) {
            return invalid("min_velocity", "must not be negative");
        }
        if self.max_velocity_attempts == 0 {
            return invalid("max_velocity_attempts", "must be at least 1");
        }
        if !(self.relaxation_time > 0.0) {
            return invalid("relaxation_time", "must be strictly positive");
        }
        if !(self.deposition_time > 0.0) {
            return invalid("deposition_time", "must be strictly positive");
        }
        if self.max_total_iterations == 0 {
            return invalid("max_total_iterations", "must be at least 1");
        }
        if self.max_sequential_failures == 0 {
            return invalid("max_sequential_failures", "must be at least 1");
        }
        if !(self.driver.velocity_scaling_from_metres_per_second > 0.0) {
            return invalid(
                "velocity_scaling_from_metres_per_second",
                "must be strictly positive",
            );
        }
        if !(self.driver.time_scaling_from_picoseconds > 0.0) {
            return invalid("time_scaling_from_picoseconds", "must be strictly positive");
        }
        // The checkpoint stores the seed as a TOML integer.
        if self.seed.is_some_and(|seed| seed > MAX_SEED) {
            return invalid("seed", "must fit in a signed 64-bit integer");
        }
        if let DepositionKind::Monatomic { element } = &self.kind {
            if element.trim().is_empty() {
                return invalid("element", "must name an element");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_builder() -> DepositionConfigBuilder {
        DepositionConfigBuilder::new()
            .cell(SimulationCell::orthogonal(20.0, 20.0, 60.0).unwrap())
            .substrate_xyz(PathBuf::from("substrate.xyz"))
            .kind(DepositionKind::Monatomic {
                element: "Al".to_string(),
            })
            .deposition_height(5.0)
            .min_velocity(25.0)
            .relaxation_time(2.0)
            .deposition_time(10.0)
            .max_total_iterations(3)
            .max_sequential_failures(5)
            .driver(DriverConfig::new(
                "lammps",
                PathBuf::from("lmp"),
                PathBuf::from("in.template"),
            ))
    }

    #[test]
    fn build_applies_defaults() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.num_deposited_per_iteration, 1);
        assert_eq!(config.deposition_temperature, 300.0);
        assert_eq!(config.max_velocity_attempts, 10_000);
        assert_eq!(config.position_distribution.name, "uniform");
        assert_eq!(config.velocity_distribution.name, "gaussian");
        assert!(config.postprocessing.is_empty());
        assert_eq!(config.command_prefix, "");
        assert_eq!(config.seed, None);
    }

    #[test]
    fn build_reports_missing_driver() {
        let builder = DepositionConfigBuilder::new()
            .cell(SimulationCell::orthogonal(20.0, 20.0, 60.0).unwrap())
            .substrate_xyz(PathBuf::from("substrate.xyz"))
            .kind(DepositionKind::Monatomic {
                element: "Al".to_string(),
            })
            .deposition_height(5.0)
            .min_velocity(25.0)
            .relaxation_time(2.0)
            .deposition_time(10.0)
            .max_total_iterations(3)
            .max_sequential_failures(5);
        assert_eq!(
            builder.build(),
            Err(ConfigError::MissingParameter("driver"))
        );
    }

    #[test]
    fn build_rejects_non_positive_times() {
        let result = complete_builder().relaxation_time(0.0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "relaxation_time",
                ..
            })
        ));
    }

    #[test]
    fn build_rejects_zero_deposited_particles() {
        let result = complete_builder().num_deposited_per_iteration(0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "num_deposited_per_iteration",
                ..
            })
        ));
    }

    #[test]
    fn postprocessing_stages_keep_configuration_order() {
        let config = complete_builder()
            .postprocessing_stage(PostprocessingSpec::new("neighbour_count", vec![1.0, 9.0, 3.0]))
            .postprocessing_stage(PostprocessingSpec::new("shift_to_origin", vec![]).lenient())
            .build()
            .unwrap();
        let names: Vec<_> = config.postprocessing.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["neighbour_count", "shift_to_origin"]);
        assert!(config.postprocessing[0].strict);
        assert!(!config.postprocessing[1].strict);
    }
}
