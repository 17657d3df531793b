use super::{
    Driver, DriverError, InputStyle, SimulationStage, TemplateEngine, with_extension, write_file,
};
use crate::core::io::traits::StructureFile;
use crate::core::io::xyz::XyzFile;
use crate::core::models::cell::SimulationCell;
use crate::core::models::state::State;
use crate::core::physics;
use crate::engine::config::{ConfigError, DepositionConfig};
use nalgebra::Vector3;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const RESERVED_KEYWORDS: &[&str] = &[
    "production_time_ps",
    "thermostat_damping",
    "x_size",
    "y_size",
    "z_size",
    "alpha",
    "beta",
    "gamma",
];
const TEMPERATURE_VARIABLE: &str = "temperature_of_system";
const LIBRARY_VARIABLE: &str = "GULP_LIB";
const DEFAULT_TEMPERATURE: f64 = 300.0;

// Power-law fit of the Nose-Hoover coupling constant against the canonical
// temperature variance: variance = A * exp(B * damping).
const DAMPING_FIT_A: f64 = 610.0;
const DAMPING_FIT_B: f64 = -49.6;
const MIN_THERMOSTAT_DAMPING: f64 = 1e-4;

/// Coupling constant that gives canonical temperature fluctuations for
/// `num_atoms` particles at `temperature` Kelvin.
pub fn thermostat_damping(num_atoms: usize, temperature: f64) -> f64 {
    let variance = physics::canonical_variance(num_atoms, temperature);
    let damping = (variance.ln() - DAMPING_FIT_A.ln()) / DAMPING_FIT_B;
    let rounded = (damping * 1e6).round() / 1e6;
    rounded.max(MIN_THERMOSTAT_DAMPING)
}

/// Runs GULP molecular dynamics.
///
/// The rendered template is followed by a `cartesian` block and, in the
/// deposition stage, a `velocities` block. The template is expected to make
/// GULP write the final frame to `<basename>.xyz` and an ASCII trajectory to
/// `<basename>.trg`, from which the last velocities are taken.
#[derive(Debug)]
pub struct GulpDriver {
    engine: TemplateEngine,
    cell: SimulationCell,
    temperature: f64,
}

impl GulpDriver {
    pub fn new(config: &DepositionConfig, working_dir: &Path) -> Result<Self, ConfigError> {
        let mut engine = TemplateEngine::from_config(
            config,
            working_dir,
            RESERVED_KEYWORDS,
            &[TEMPERATURE_VARIABLE, LIBRARY_VARIABLE],
            InputStyle::Redirect,
        )?;

        let temperature = match engine.variable(TEMPERATURE_VARIABLE) {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|t| *t > 0.0)
                .ok_or_else(|| ConfigError::DriverVariable {
                    name: TEMPERATURE_VARIABLE.to_string(),
                    reason: format!("'{}' is not a positive temperature", raw),
                })?,
            None => DEFAULT_TEMPERATURE,
        };

        if let Some(library) = engine.variable(LIBRARY_VARIABLE).map(str::to_string) {
            if !Path::new(&library).exists() {
                return Err(ConfigError::DriverVariable {
                    name: LIBRARY_VARIABLE.to_string(),
                    reason: format!("'{}' does not exist", library),
                });
            }
            engine = engine.with_environment(LIBRARY_VARIABLE, &library);
        }

        Ok(Self {
            engine,
            cell: config.cell,
            temperature,
        })
    }

    pub(super) fn create(
        config: &DepositionConfig,
        working_dir: &Path,
    ) -> Result<Box<dyn Driver>, ConfigError> {
        Ok(Box::new(Self::new(config, working_dir)?))
    }

    fn reserved_values(
        &self,
        num_atoms: usize,
        stage: SimulationStage,
    ) -> Vec<(&'static str, String)> {
        let cell = &self.cell;
        vec![
            ("production_time_ps", self.engine.duration_ps(stage).to_string()),
            (
                "thermostat_damping",
                thermostat_damping(num_atoms, self.temperature).to_string(),
            ),
            ("x_size", cell.a.to_string()),
            ("y_size", cell.b.to_string()),
            ("z_size", cell.c.to_string()),
            ("alpha", cell.alpha.to_string()),
            ("beta", cell.beta.to_string()),
            ("gamma", cell.gamma.to_string()),
        ]
    }
}

/// Extracts the last `Velocities` block from a GULP ASCII trajectory.
fn last_velocities(text: &str) -> Option<Vec<Vector3<f64>>> {
    let mut last = None;
    let mut current: Option<Vec<Vector3<f64>>> = None;
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix('#') {
            if let Some(block) = current.take() {
                last = Some(block);
            }
            if header.trim() == "Velocities" {
                current = Some(Vec::new());
            }
            continue;
        }
        if let Some(block) = current.as_mut() {
            let values: Vec<f64> = trimmed
                .split_whitespace()
                .filter_map(|v| v.parse().ok())
                .collect();
            if values.len() >= 3 {
                block.push(Vector3::new(values[0], values[1], values[2]));
            }
        }
    }
    current.or(last)
}

impl Driver for GulpDriver {
    fn name(&self) -> &'static str {
        "gulp"
    }

    fn write_inputs(
        &self,
        basename: &Path,
        state: &State,
        stage: SimulationStage,
    ) -> Result<(), DriverError> {
        let mut input = self
            .engine
            .render(basename, self.reserved_values(state.len(), stage))?;
        if !input.ends_with('\n') {
            input.push('\n');
        }

        input.push_str("cartesian\n");
        for (element, p) in state.elements().iter().zip(state.coordinates()) {
            let _ = writeln!(input, "{} core {:.8} {:.8} {:.8}", element, p.x, p.y, p.z);
        }
        if stage.includes_velocities() {
            input.push_str("velocities\n");
            for (index, v) in state.velocities().iter().enumerate() {
                let _ = writeln!(input, "{} {:.8} {:.8} {:.8}", index + 1, v.x, v.y, v.z);
            }
        }

        write_file(&with_extension(basename, "input"), &input)
    }

    fn execute(&self, basename: &Path) -> Result<(), DriverError> {
        self.engine.run(basename)
    }

    fn read_outputs(&self, basename: &Path) -> Result<State, DriverError> {
        let xyz_path = with_extension(basename, "xyz");
        let structure =
            XyzFile::read_from_path(&xyz_path).map_err(|e| DriverError::output(&xyz_path, e))?;

        let trajectory_path = with_extension(basename, "trg");
        let trajectory = fs::read_to_string(&trajectory_path)
            .map_err(|e| DriverError::io(&trajectory_path, e))?;
        let velocities = last_velocities(&trajectory)
            .ok_or_else(|| DriverError::output(&trajectory_path, "no Velocities block found"))?;

        if velocities.len() != structure.len() {
            return Err(DriverError::output(
                &trajectory_path,
                format!(
                    "{} velocities for {} atoms",
                    velocities.len(),
                    structure.len()
                ),
            ));
        }
        Ok(structure.with_velocities(velocities)?)
    }

    fn velocity_scaling(&self) -> f64 {
        self.engine.velocity_scaling
    }
}
