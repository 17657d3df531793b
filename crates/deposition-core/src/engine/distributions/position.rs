use super::{DistributionError, PositionDistribution};
use crate::core::utils::geometry::{point_in_polygon, polygon_extents};
use crate::engine::config::ConfigError;
use nalgebra::{Point2, Point3};
use rand::{Rng, RngCore};

const MAX_POSITION_ATTEMPTS: usize = 10_000;

/// Always returns the configured `(x, y)`, which must lie in the footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPosition {
    pub x: f64,
    pub y: f64,
}

impl FixedPosition {
    pub(super) fn build(args: &[f64]) -> Result<Box<dyn PositionDistribution>, ConfigError> {
        Ok(Box::new(Self {
            x: args[0],
            y: args[1],
        }))
    }
}

impl PositionDistribution for FixedPosition {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn sample(
        &self,
        footprint: &[Point2<f64>],
        z: f64,
        _rng: &mut dyn RngCore,
    ) -> Result<Point3<f64>, DistributionError> {
        if !point_in_polygon(&Point2::new(self.x, self.y), footprint) {
            return Err(DistributionError::OutsideFootprint {
                x: self.x,
                y: self.y,
            });
        }
        Ok(Point3::new(self.x, self.y, z))
    }
}

/// Uniformly distributed over the footprint, by rejection sampling from its
/// bounding box.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformPosition;

impl UniformPosition {
    pub(super) fn build(_args: &[f64]) -> Result<Box<dyn PositionDistribution>, ConfigError> {
        Ok(Box::new(Self))
    }
}

impl PositionDistribution for UniformPosition {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn sample(
        &self,
        footprint: &[Point2<f64>],
        z: f64,
        rng: &mut dyn RngCore,
    ) -> Result<Point3<f64>, DistributionError> {
        let (min, max) = polygon_extents(footprint);
        if !(min.x < max.x && min.y < max.y) {
            return Err(DistributionError::PositionExhausted(0));
        }
        for _ in 0..MAX_POSITION_ATTEMPTS {
            let candidate = Point2::new(rng.gen_range(min.x..max.x), rng.gen_range(min.y..max.y));
            if point_in_polygon(&candidate, footprint) {
                return Ok(Point3::new(candidate.x, candidate.y, z));
            }
        }
        Err(DistributionError::PositionExhausted(MAX_POSITION_ATTEMPTS))
    }
}
