use super::{PostprocessingStage, Verdict};
use crate::core::models::cell::SimulationCell;
use crate::core::models::state::State;
use crate::core::utils::geometry::wrap_coordinates_in_z;
use crate::engine::config::ConfigError;
use nalgebra::Point3;

/// Moves the structure so that its lowest x, y and z coordinates are zero,
/// after bringing particles that drifted through the top of the cell back
/// underneath. Always passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShiftToOrigin;

impl ShiftToOrigin {
    pub(super) fn build(_args: &[f64]) -> Result<Box<dyn PostprocessingStage>, ConfigError> {
        Ok(Box::new(Self))
    }
}

impl PostprocessingStage for ShiftToOrigin {
    fn name(&self) -> &'static str {
        "shift_to_origin"
    }

    fn apply(
        &self,
        mut state: State,
        cell: &SimulationCell,
        _num_deposited: usize,
    ) -> (State, Verdict) {
        if state.is_empty() {
            return (state, Verdict::Pass);
        }
        let wrapped = wrap_coordinates_in_z(cell, state.coordinates());
        let minimum = wrapped.iter().fold(
            Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            |min, p| Point3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
        );
        for (slot, p) in state.coordinates_mut().iter_mut().zip(wrapped) {
            *slot = Point3::from(p - minimum);
        }
        (state, Verdict::Pass)
    }
}
