use super::{PostprocessingStage, Verdict};
use crate::core::models::cell::SimulationCell;
use crate::core::models::state::State;
use crate::core::utils::geometry::neighbour_counts;
use crate::engine::config::ConfigError;

/// Requires every newly deposited particle to have between `min` and `max`
/// neighbours (inclusive) closer than `bonding_distance`, counting periodic
/// images in x and y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighbourCount {
    pub min: usize,
    pub max: usize,
    pub bonding_distance: f64,
}

impl NeighbourCount {
    pub fn new(min: usize, max: usize, bonding_distance: f64) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidParameter {
                name: "neighbour_count",
                reason: format!("minimum {} exceeds maximum {}", min, max),
            });
        }
        if !(bonding_distance > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "neighbour_count",
                reason: format!("bonding distance must be positive (got {})", bonding_distance),
            });
        }
        Ok(Self {
            min,
            max,
            bonding_distance,
        })
    }

    pub(super) fn build(args: &[f64]) -> Result<Box<dyn PostprocessingStage>, ConfigError> {
        let count = |value: f64| {
            if value >= 0.0 && value.fract() == 0.0 {
                Ok(value as usize)
            } else {
                Err(ConfigError::InvalidParameter {
                    name: "neighbour_count",
                    reason: format!("neighbour bounds must be whole numbers (got {})", value),
                })
            }
        };
        Ok(Box::new(Self::new(count(args[0])?, count(args[1])?, args[2])?))
    }
}

impl PostprocessingStage for NeighbourCount {
    fn name(&self) -> &'static str {
        "neighbour_count"
    }

    fn apply(
        &self,
        state: State,
        cell: &SimulationCell,
        num_deposited: usize,
    ) -> (State, Verdict) {
        let first_new = state.len().saturating_sub(num_deposited);
        let counts = neighbour_counts(
            cell,
            state.coordinates(),
            first_new..state.len(),
            self.bonding_distance,
        );
        let offender = counts
            .iter()
            .enumerate()
            .find(|(_, count)| **count < self.min || **count > self.max);

        let verdict = match offender {
            Some((offset, count)) => Verdict::Fail(format!(
                "particle {} has {} neighbour(s) within {} Å, expected {}..={}",
                first_new + offset,
                count,
                self.bonding_distance,
                self.min,
                self.max
            )),
            None => Verdict::Pass,
        };
        (state, verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn cell() -> SimulationCell {
        SimulationCell::orthogonal(30.0, 30.0, 60.0).unwrap()
    }

    /// `k` substrate atoms on a ring 1.4 Å from the deposited atom, a distant
    /// filler atom, and the deposited atom itself (last).
    fn deposit_with_neighbours(k: usize) -> State {
        let mut coordinates: Vec<Point3<f64>> = (0..k)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / k as f64;
                Point3::new(14.0 + angle.cos(), 15.0 + angle.sin(), 5.5)
            })
            .collect();
        coordinates.push(Point3::new(1.0, 1.0, 1.0));
        coordinates.push(Point3::new(14.0, 15.0, 6.5));
        let elements = vec!["O".to_string(); coordinates.len()];
        State::at_rest(coordinates, elements).unwrap()
    }

    #[test]
    fn passes_iff_neighbours_are_within_range() {
        let stage = NeighbourCount::new(1, 9, 3.0).unwrap();
        for k in 0..=11 {
            let (_, verdict) = stage.apply(deposit_with_neighbours(k), &cell(), 1);
            assert_eq!(verdict.is_pass(), (1..=9).contains(&k), "k = {}", k);
        }
    }

    #[test]
    fn substrate_particles_are_not_judged() {
        // The lone filler atom has no neighbours but was not deposited.
        let stage = NeighbourCount::new(1, 9, 3.0).unwrap();
        let (state, verdict) = stage.apply(deposit_with_neighbours(3), &cell(), 1);
        assert!(verdict.is_pass());
        assert_eq!(state.len(), 5);
    }

    #[test]
    fn build_rejects_fractional_or_inverted_bounds() {
        assert!(NeighbourCount::build(&[1.5, 4.0, 3.0]).is_err());
        assert!(NeighbourCount::build(&[5.0, 4.0, 3.0]).is_err());
        assert!(NeighbourCount::build(&[1.0, 4.0, 0.0]).is_err());
        assert!(NeighbourCount::build(&[1.0, 12.0, 3.0]).is_ok());
    }
}
