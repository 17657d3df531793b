//! Checks and normalisations applied to the final state of an iteration.
//!
//! Stages run in configuration order and each sees the state left by the
//! previous one. A failing verdict from a strict stage fails the iteration;
//! a failing verdict from a lenient stage is only logged, and whatever the
//! stage did to the state is kept.

pub mod neighbour_count;
pub mod shift_to_origin;

use super::config::{ConfigError, PostprocessingSpec};
use super::registry::{self, Variant};
use crate::core::models::cell::SimulationCell;
use crate::core::models::state::State;
use tracing::{debug, warn};

pub use neighbour_count::NeighbourCount;
pub use shift_to_origin::ShiftToOrigin;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(String),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// The particles appended in this iteration are the last
/// `num_deposited` entries of the state.
pub trait PostprocessingStage {
    fn name(&self) -> &'static str;

    fn apply(&self, state: State, cell: &SimulationCell, num_deposited: usize)
    -> (State, Verdict);
}

pub static POSTPROCESSING_STAGES: &[Variant<dyn PostprocessingStage>] = &[
    Variant {
        name: "neighbour_count",
        num_arguments: 3,
        default_arguments: &[1.0, 12.0, 3.0],
        build: NeighbourCount::build,
    },
    Variant {
        name: "shift_to_origin",
        num_arguments: 0,
        default_arguments: &[],
        build: ShiftToOrigin::build,
    },
];

struct ConfiguredStage {
    stage: Box<dyn PostprocessingStage>,
    strict: bool,
}

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<ConfiguredStage>,
}

impl Pipeline {
    pub fn from_specs(specs: &[PostprocessingSpec]) -> Result<Self, ConfigError> {
        let stages = specs
            .iter()
            .map(|spec| {
                registry::resolve(
                    POSTPROCESSING_STAGES,
                    "postprocessing stage",
                    &spec.name,
                    &spec.args,
                )
                .map(|stage| ConfiguredStage {
                    stage,
                    strict: spec.strict,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { stages })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage in order and returns the final state with the
    /// aggregate verdict. Evaluation stops at the first strict failure.
    pub fn run(
        &self,
        mut state: State,
        cell: &SimulationCell,
        num_deposited: usize,
    ) -> (State, Verdict) {
        for ConfiguredStage { stage, strict } in &self.stages {
            let (next, verdict) = stage.apply(state, cell, num_deposited);
            state = next;
            match verdict {
                Verdict::Pass => debug!(stage = stage.name(), "Postprocessing stage passed."),
                Verdict::Fail(reason) if *strict => {
                    return (state, Verdict::Fail(format!("{}: {}", stage.name(), reason)));
                }
                Verdict::Fail(reason) => {
                    warn!(
                        stage = stage.name(),
                        reason = %reason,
                        "Lenient postprocessing stage failed; continuing."
                    );
                }
            }
        }
        (state, Verdict::Pass)
    }
}
