use super::{
    Driver, DriverError, InputStyle, SimulationStage, TemplateEngine, parse_list, with_extension,
    write_file,
};
use crate::core::io::lammps_data::LammpsData;
use crate::core::models::cell::CellBounds;
use crate::core::models::state::State;
use crate::core::physics;
use crate::engine::config::{ConfigError, DepositionConfig};
use nalgebra::Vector3;
use std::path::Path;
use tracing::debug;

const RESERVED_KEYWORDS: &[&str] = &["num_steps"];
const ELEMENTS_VARIABLE: &str = "elements_in_potential";
const MASSES_VARIABLE: &str = "atomic_masses";

/// Runs LAMMPS with a user-supplied input script.
///
/// Structures travel through data files in `atom_style charge`: the driver
/// writes `<basename>.input_data` for the script to `read_data`, and expects
/// the script to `write_data` the final configuration to
/// `<basename>.output_data`. Atom types are the 1-based positions of the
/// elements in the space separated `elements_in_potential` variable.
#[derive(Debug)]
pub struct LammpsDriver {
    engine: TemplateEngine,
    elements: Vec<String>,
    masses: Vec<f64>,
    bounds: CellBounds,
}

impl LammpsDriver {
    pub fn new(config: &DepositionConfig, working_dir: &Path) -> Result<Self, ConfigError> {
        let engine = TemplateEngine::from_config(
            config,
            working_dir,
            RESERVED_KEYWORDS,
            &[ELEMENTS_VARIABLE, MASSES_VARIABLE],
            InputStyle::Flag("-in"),
        )?;

        let elements: Vec<String> = engine
            .variable(ELEMENTS_VARIABLE)
            .ok_or_else(|| ConfigError::DriverVariable {
                name: ELEMENTS_VARIABLE.to_string(),
                reason: "required by the lammps driver".to_string(),
            })?
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if elements.is_empty() {
            return Err(ConfigError::DriverVariable {
                name: ELEMENTS_VARIABLE.to_string(),
                reason: "must list at least one element".to_string(),
            });
        }

        let masses = match engine.variable(MASSES_VARIABLE) {
            Some(raw) => parse_list(MASSES_VARIABLE, raw)?,
            None => elements
                .iter()
                .map(|e| {
                    physics::atomic_mass(e).ok_or_else(|| ConfigError::DriverVariable {
                        name: MASSES_VARIABLE.to_string(),
                        reason: format!("no standard mass known for '{}'", e),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };
        if masses.len() != elements.len() {
            return Err(ConfigError::DriverVariable {
                name: MASSES_VARIABLE.to_string(),
                reason: format!(
                    "{} masses given for {} elements",
                    masses.len(),
                    elements.len()
                ),
            });
        }

        Ok(Self {
            engine,
            elements,
            masses,
            bounds: *config.cell.bounds(),
        })
    }

    pub(super) fn create(
        config: &DepositionConfig,
        working_dir: &Path,
    ) -> Result<Box<dyn Driver>, ConfigError> {
        Ok(Box::new(Self::new(config, working_dir)?))
    }

    /// Number of integration steps covering the stage's simulated time.
    pub fn num_steps(&self, stage: SimulationStage) -> u64 {
        (self.engine.duration_ps(stage) * self.engine.time_scaling).round() as u64
    }

    fn atom_type(&self, element: &str) -> Result<usize, DriverError> {
        self.elements
            .iter()
            .position(|e| e == element)
            .map(|index| index + 1)
            .ok_or_else(|| DriverError::UnknownElement(element.to_string()))
    }
}

impl Driver for LammpsDriver {
    fn name(&self) -> &'static str {
        "lammps"
    }

    fn write_inputs(
        &self,
        basename: &Path,
        state: &State,
        stage: SimulationStage,
    ) -> Result<(), DriverError> {
        let script = self
            .engine
            .render(basename, [("num_steps", self.num_steps(stage).to_string())])?;
        write_file(&with_extension(basename, "input"), &script)?;

        let data = LammpsData {
            bounds: self.bounds,
            masses: self.masses.clone(),
            atom_types: state
                .elements()
                .iter()
                .map(|e| self.atom_type(e))
                .collect::<Result<_, _>>()?,
            coordinates: state.coordinates().to_vec(),
            velocities: stage
                .includes_velocities()
                .then(|| state.velocities().to_vec()),
        };
        let data_path = with_extension(basename, "input_data");
        data.write_to_path(&data_path)
            .map_err(|e| DriverError::output(&data_path, e))?;
        debug!(path = %data_path.display(), atoms = state.len(), "Wrote LAMMPS data file.");
        Ok(())
    }

    fn execute(&self, basename: &Path) -> Result<(), DriverError> {
        self.engine.run(basename)
    }

    fn read_outputs(&self, basename: &Path) -> Result<State, DriverError> {
        let path = with_extension(basename, "output_data");
        let data = LammpsData::read_from_path(&path).map_err(|e| DriverError::output(&path, e))?;
        let elements = data
            .atom_types
            .iter()
            .map(|&t| {
                t.checked_sub(1)
                    .and_then(|index| self.elements.get(index))
                    .cloned()
                    .ok_or(DriverError::UnknownAtomType(t))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let velocities = data
            .velocities
            .unwrap_or_else(|| vec![Vector3::zeros(); data.coordinates.len()]);
        Ok(State::new(data.coordinates, elements, velocities)?)
    }

    fn velocity_scaling(&self) -> f64 {
        self.engine.velocity_scaling
    }
}
