//! Sampling of positions and velocities for newly deposited particles.
//!
//! Both families are resolved by name from static tables. Every variant
//! declares how many arguments it takes and a default argument list, which is
//! used when the configuration gives none.

pub mod position;
pub mod velocity;

use super::config::{ConfigError, DistributionSpec};
use super::registry::{self, Variant};
use nalgebra::{Point2, Point3, Vector3};
use rand::RngCore;
use thiserror::Error;

pub use position::{FixedPosition, UniformPosition};
pub use velocity::{FixedVelocity, GaussianVelocity};

#[derive(Debug, Error, PartialEq)]
pub enum DistributionError {
    #[error("No point inside the deposition footprint found after {0} attempts")]
    PositionExhausted(usize),

    #[error("Position ({x}, {y}) lies outside the deposition footprint")]
    OutsideFootprint { x: f64, y: f64 },

    #[error("No velocity of at least {min_velocity} m/s sampled in {attempts} attempts")]
    VelocityExhausted { min_velocity: f64, attempts: usize },
}

pub trait PositionDistribution {
    fn name(&self) -> &'static str;

    /// Samples a point at height `z` whose xy-projection lies in `footprint`.
    fn sample(
        &self,
        footprint: &[Point2<f64>],
        z: f64,
        rng: &mut dyn RngCore,
    ) -> Result<Point3<f64>, DistributionError>;
}

pub trait VelocityDistribution {
    fn name(&self) -> &'static str;

    /// Samples a raw velocity in metres per second, before it is oriented
    /// toward the substrate.
    fn sample(&self, rng: &mut dyn RngCore) -> Vector3<f64>;
}

pub static POSITION_DISTRIBUTIONS: &[Variant<dyn PositionDistribution>] = &[
    Variant {
        name: "fixed",
        num_arguments: 2,
        default_arguments: &[0.0, 0.0],
        build: FixedPosition::build,
    },
    Variant {
        name: "uniform",
        num_arguments: 0,
        default_arguments: &[],
        build: UniformPosition::build,
    },
];

pub static VELOCITY_DISTRIBUTIONS: &[Variant<dyn VelocityDistribution>] = &[
    Variant {
        name: "fixed",
        num_arguments: 3,
        default_arguments: &[0.0, 0.0, -100.0],
        build: FixedVelocity::build,
    },
    Variant {
        name: "gaussian",
        num_arguments: 3,
        default_arguments: &[300.0, 26.982, 0.0],
        build: GaussianVelocity::build,
    },
];

pub fn resolve_position(
    spec: &DistributionSpec,
) -> Result<Box<dyn PositionDistribution>, ConfigError> {
    registry::resolve(
        POSITION_DISTRIBUTIONS,
        "position distribution",
        &spec.name,
        &spec.args,
    )
}

pub fn resolve_velocity(
    spec: &DistributionSpec,
) -> Result<Box<dyn VelocityDistribution>, ConfigError> {
    registry::resolve(
        VELOCITY_DISTRIBUTIONS,
        "velocity distribution",
        &spec.name,
        &spec.args,
    )
}

/// Draws from `distribution` until the velocity, pointed toward the
/// substrate (negative z), has a magnitude of at least `min_velocity`.
///
/// # Errors
///
/// Returns [`DistributionError::VelocityExhausted`] after `max_attempts`
/// rejected draws.
pub fn sample_directed_velocity(
    distribution: &dyn VelocityDistribution,
    min_velocity: f64,
    max_attempts: usize,
    rng: &mut dyn RngCore,
) -> Result<Vector3<f64>, DistributionError> {
    for _ in 0..max_attempts {
        let mut velocity = distribution.sample(rng);
        velocity.z = -velocity.z.abs();
        if velocity.norm() >= min_velocity {
            return Ok(velocity);
        }
    }
    Err(DistributionError::VelocityExhausted {
        min_velocity,
        attempts: max_attempts,
    })
}
