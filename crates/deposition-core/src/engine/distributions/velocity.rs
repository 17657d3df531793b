use super::VelocityDistribution;
use crate::core::physics::{ATOMIC_MASS_UNIT_KG, thermal_velocity_sigma};
use crate::engine::config::ConfigError;
use nalgebra::Vector3;
use rand::RngCore;
use rand_distr::{Distribution, Normal};

/// Always returns the configured `(vx, vy, vz)` in m/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedVelocity {
    pub velocity: Vector3<f64>,
}

impl FixedVelocity {
    pub(super) fn build(args: &[f64]) -> Result<Box<dyn VelocityDistribution>, ConfigError> {
        Ok(Box::new(Self {
            velocity: Vector3::new(args[0], args[1], args[2]),
        }))
    }
}

impl VelocityDistribution for FixedVelocity {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn sample(&self, _rng: &mut dyn RngCore) -> Vector3<f64> {
        self.velocity
    }
}

/// Each Cartesian component is drawn independently from a normal
/// distribution with the thermal width `sqrt(k_B T / m)` of an ideal gas.
///
/// Arguments: gas temperature (K), particle mass (amu), mean (m/s).
#[derive(Debug, Clone, Copy)]
pub struct GaussianVelocity {
    component: Normal<f64>,
}

impl GaussianVelocity {
    pub fn new(temperature: f64, mass_amu: f64, mean: f64) -> Result<Self, ConfigError> {
        if !(temperature >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "velocity_distribution",
                reason: format!("gas temperature must not be negative (got {})", temperature),
            });
        }
        if !(mass_amu > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "velocity_distribution",
                reason: format!("particle mass must be positive (got {})", mass_amu),
            });
        }
        let sigma = thermal_velocity_sigma(temperature, mass_amu * ATOMIC_MASS_UNIT_KG);
        let component = Normal::new(mean, sigma).map_err(|e| ConfigError::InvalidParameter {
            name: "velocity_distribution",
            reason: e.to_string(),
        })?;
        Ok(Self { component })
    }

    pub(super) fn build(args: &[f64]) -> Result<Box<dyn VelocityDistribution>, ConfigError> {
        Ok(Box::new(Self::new(args[0], args[1], args[2])?))
    }

    pub fn sigma(&self) -> f64 {
        self.component.std_dev()
    }
}

impl VelocityDistribution for GaussianVelocity {
    fn name(&self) -> &'static str {
        "gaussian"
    }

    fn sample(&self, rng: &mut dyn RngCore) -> Vector3<f64> {
        Vector3::new(
            self.component.sample(rng),
            self.component.sample(rng),
            self.component.sample(rng),
        )
    }
}
