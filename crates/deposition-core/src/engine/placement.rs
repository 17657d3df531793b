use super::config::{ConfigError, DepositionConfig, DepositionKind};
use super::distributions::{
    self, DistributionError, PositionDistribution, VelocityDistribution,
    sample_directed_velocity,
};
use super::error::EngineError;
use crate::core::io::traits::StructureFile;
use crate::core::io::xyz::XyzFile;
use crate::core::models::cell::SimulationCell;
use crate::core::models::state::State;
use crate::core::physics::{self, ANGSTROM_IN_METRES};
use crate::core::utils::geometry::surface_height;
use nalgebra::{Point3, Vector3};
use rand::RngCore;
use rand_distr::{Distribution, Normal};
use tracing::{debug, info};

/// The unit added on every deposition: one atom, or one rigid molecule
/// described relative to its geometric centre.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    elements: Vec<String>,
    offsets: Vec<Vector3<f64>>,
    masses: Vec<f64>,
}

impl Particle {
    pub fn atom(element: &str) -> Result<Self, ConfigError> {
        let mass = physics::atomic_mass(element).ok_or_else(|| ConfigError::InvalidParameter {
            name: "element",
            reason: format!("unknown element '{}'", element),
        })?;
        Ok(Self {
            elements: vec![element.to_string()],
            offsets: vec![Vector3::zeros()],
            masses: vec![mass],
        })
    }

    pub fn molecule(state: &State) -> Result<Self, ConfigError> {
        if state.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "molecule_xyz",
                reason: "molecule file contains no atoms".to_string(),
            });
        }
        let masses = state
            .elements()
            .iter()
            .map(|element| {
                physics::atomic_mass(element).ok_or_else(|| ConfigError::InvalidParameter {
                    name: "molecule_xyz",
                    reason: format!("unknown element '{}'", element),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let centre = state
            .coordinates()
            .iter()
            .fold(Vector3::zeros(), |sum, p| sum + p.coords)
            / state.len() as f64;
        Ok(Self {
            elements: state.elements().to_vec(),
            offsets: state.coordinates().iter().map(|p| p.coords - centre).collect(),
            masses,
        })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Rotational velocity (m/s) of each atom for one thermal draw of the
    /// angular velocity about the principal axes through the centre of mass.
    /// Axes with a vanishing moment of inertia (the bond of a linear
    /// molecule) do not rotate.
    fn rotational_velocities(
        &self,
        temperature: f64,
        rng: &mut dyn RngCore,
    ) -> Vec<Vector3<f64>> {
        if self.len() < 2 || temperature <= 0.0 {
            return vec![Vector3::zeros(); self.len()];
        }
        let points: Vec<Point3<f64>> = self.offsets.iter().map(|v| Point3::from(*v)).collect();
        let centre = physics::centre_of_mass(&points, &self.masses);
        let principal = physics::principal_axes(&points, &self.masses);

        let mut omega = Vector3::<f64>::zeros();
        for (i, &moment) in principal.moments.iter().enumerate() {
            if moment > 0.0 {
                let sigma = (physics::BOLTZMANN_CONSTANT * temperature / moment).sqrt();
                if let Ok(normal) = Normal::new(0.0, sigma) {
                    omega += principal.axes.column(i) * normal.sample(rng);
                }
            }
        }
        points
            .iter()
            .map(|p| omega.cross(&((p - centre) * ANGSTROM_IN_METRES)))
            .collect()
    }
}

/// Adds new particles above the current surface.
///
/// Built once per run from the configuration; each call to
/// [`deposit`](Depositor::deposit) draws from the random stream it is given.
pub struct Depositor {
    particle: Particle,
    position: Box<dyn PositionDistribution>,
    velocity: Box<dyn VelocityDistribution>,
    cell: SimulationCell,
    count: usize,
    height: f64,
    temperature: f64,
    min_velocity: f64,
    max_velocity_attempts: usize,
}

impl Depositor {
    /// Resolves both distributions and loads the molecule, if any.
    pub fn from_config(config: &DepositionConfig) -> Result<Self, EngineError> {
        let particle = match &config.kind {
            DepositionKind::Monatomic { element } => Particle::atom(element)?,
            DepositionKind::Molecule { xyz_path } => {
                let molecule = XyzFile::read_from_path(xyz_path)
                    .map_err(|e| EngineError::structure(xyz_path, e))?;
                Particle::molecule(&molecule)?
            }
        };
        Ok(Self {
            particle,
            position: distributions::resolve_position(&config.position_distribution)?,
            velocity: distributions::resolve_velocity(&config.velocity_distribution)?,
            cell: config.cell,
            count: config.num_deposited_per_iteration,
            height: config.deposition_height,
            temperature: config.deposition_temperature,
            min_velocity: config.min_velocity,
            max_velocity_attempts: config.max_velocity_attempts,
        })
    }

    /// Number of atoms appended by one call to [`deposit`](Self::deposit).
    pub fn atoms_per_deposition(&self) -> usize {
        self.count * self.particle.len()
    }

    /// Height at which new particles are introduced above `state`.
    pub fn deposition_plane(&self, state: &State) -> f64 {
        let surface = surface_height(&self.cell, state.coordinates())
            .unwrap_or(self.cell.bounds().z_min);
        surface + self.height
    }

    /// Draws one position and one directed velocity, so that a distribution
    /// which can never satisfy the configuration fails before the first
    /// iteration instead of during it.
    pub fn self_test(&self, state: &State, rng: &mut dyn RngCore) -> Result<(), ConfigError> {
        let z = self.deposition_plane(state);
        let footprint = self.cell.footprint_at(z);
        self.position
            .sample(&footprint, z, rng)
            .map_err(|e| ConfigError::Sampling(e.to_string()))?;
        sample_directed_velocity(
            self.velocity.as_ref(),
            self.min_velocity,
            self.max_velocity_attempts,
            rng,
        )
        .map_err(|e| ConfigError::Sampling(e.to_string()))?;
        Ok(())
    }

    /// Appends the configured number of particles to `state`, with velocities
    /// converted to engine units by `velocity_scaling`.
    pub fn deposit(
        &self,
        state: &mut State,
        velocity_scaling: f64,
        rng: &mut dyn RngCore,
    ) -> Result<(), DistributionError> {
        let z = self.deposition_plane(state);
        let footprint = self.cell.footprint_at(z);
        info!(
            count = self.count,
            height = z,
            "Generating positions and velocities for deposited particle(s)."
        );

        for _ in 0..self.count {
            let centre = self.position.sample(&footprint, z, rng)?;
            let translational = sample_directed_velocity(
                self.velocity.as_ref(),
                self.min_velocity,
                self.max_velocity_attempts,
                rng,
            )?;
            let rotational = self.particle.rotational_velocities(self.temperature, rng);
            debug!(
                x = centre.x,
                y = centre.y,
                z = centre.z,
                speed = translational.norm(),
                "Sampled deposited particle."
            );

            for ((element, offset), spin) in self
                .particle
                .elements
                .iter()
                .zip(&self.particle.offsets)
                .zip(rotational)
            {
                state.push(
                    centre + *offset,
                    element,
                    (translational + spin) * velocity_scaling,
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{DepositionConfigBuilder, DistributionSpec, DriverConfig};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn builder(kind: DepositionKind) -> DepositionConfigBuilder {
        DepositionConfigBuilder::new()
            .cell(SimulationCell::orthogonal(20.0, 20.0, 60.0).unwrap())
            .substrate_xyz(PathBuf::from("substrate.xyz"))
            .kind(kind)
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

    fn aluminium() -> DepositionKind {
        DepositionKind::Monatomic {
            element: "Al".to_string(),
        }
    }

    fn substrate() -> State {
        State::at_rest(
            vec![
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(3.0, 1.0, 2.0),
                Point3::new(5.0, 5.0, 55.0),
            ],
            vec!["Al".into(), "O".into(), "O".into()],
        )
        .unwrap()
    }

    #[test]
    fn deposition_adds_one_particle_with_matching_entries() {
        let config = builder(aluminium()).build().unwrap();
        let depositor = Depositor::from_config(&config).unwrap();
        let mut state = substrate();
        let mut rng = StdRng::seed_from_u64(3);

        depositor.deposit(&mut state, 1.0, &mut rng).unwrap();

        assert_eq!(state.len(), 4);
        assert_eq!(state.elements().len(), 4);
        assert_eq!(state.velocities().len(), 4);
        assert_eq!(state.elements()[3], "Al");
        // Surface at z = 2 (the particle at 55 is above 80 % of the cell).
        assert!((state.coordinates()[3].z - 7.0).abs() < 1e-12);
        assert!(state.velocities()[3].norm() >= 25.0);
        assert!(state.velocities()[3].z <= 0.0);
    }

    #[test]
    fn velocities_are_scaled_into_engine_units() {
        let config = builder(aluminium())
            .velocity_distribution(DistributionSpec::new("fixed", vec![0.0, 0.0, -100.0]))
            .build()
            .unwrap();
        let depositor = Depositor::from_config(&config).unwrap();
        let mut state = substrate();
        let mut rng = StdRng::seed_from_u64(0);

        depositor.deposit(&mut state, 0.01, &mut rng).unwrap();

        assert!((state.velocities()[3] - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
    }

    #[test]
    fn several_particles_per_iteration_are_all_appended() {
        let config = builder(aluminium())
            .num_deposited_per_iteration(3)
            .build()
            .unwrap();
        let depositor = Depositor::from_config(&config).unwrap();
        let mut state = substrate();
        let mut rng = StdRng::seed_from_u64(9);

        depositor.deposit(&mut state, 1.0, &mut rng).unwrap();

        assert_eq!(depositor.atoms_per_deposition(), 3);
        assert_eq!(state.len(), 6);
    }

    #[test]
    fn molecules_keep_their_shape_and_share_the_centre_of_motion() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("o2.xyz");
        fs::write(&path, "2\noxygen\nO 0.0 0.0 0.0\nO 1.2 0.0 0.0\n").unwrap();
        let config = builder(DepositionKind::Molecule { xyz_path: path })
            .position_distribution(DistributionSpec::new("fixed", vec![10.0, 10.0]))
            .build()
            .unwrap();
        let depositor = Depositor::from_config(&config).unwrap();
        let mut state = substrate();
        let mut rng = StdRng::seed_from_u64(5);

        depositor.deposit(&mut state, 1.0, &mut rng).unwrap();

        assert_eq!(state.len(), 5);
        let (a, b) = (state.coordinates()[3], state.coordinates()[4]);
        assert!((a - Point3::new(9.4, 10.0, 7.0)).norm() < 1e-12);
        assert!((b - Point3::new(10.6, 10.0, 7.0)).norm() < 1e-12);
        // Rotation about the centre does not change the mean velocity.
        let mean = (state.velocities()[3] + state.velocities()[4]) / 2.0;
        assert!(mean.norm() >= 25.0);
        // A molecule along x cannot spin about x.
        assert!((state.velocities()[3].x - state.velocities()[4].x).abs() < 1e-9);
    }

    #[test]
    fn self_test_reports_an_unreachable_minimum_velocity() {
        let config = builder(aluminium())
            .velocity_distribution(DistributionSpec::new("fixed", vec![0.0, 0.0, -10.0]))
            .max_velocity_attempts(20)
            .build()
            .unwrap();
        let depositor = Depositor::from_config(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            depositor.self_test(&substrate(), &mut rng),
            Err(ConfigError::Sampling(_))
        ));
    }

    #[test]
    fn self_test_reports_a_fixed_position_outside_the_cell() {
        let config = builder(aluminium())
            .position_distribution(DistributionSpec::new("fixed", vec![25.0, 10.0]))
            .build()
            .unwrap();
        let depositor = Depositor::from_config(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            depositor.self_test(&substrate(), &mut rng),
            Err(ConfigError::Sampling(reason)) if reason.contains("outside")
        ));
    }

    #[test]
    fn unknown_monatomic_element_is_a_configuration_error() {
        let config = builder(DepositionKind::Monatomic {
            element: "Xx".to_string(),
        })
        .build()
        .unwrap();
        assert!(matches!(
            Depositor::from_config(&config),
            Err(EngineError::Config(ConfigError::InvalidParameter { .. }))
        ));
    }
}
