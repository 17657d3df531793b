use super::drivers::{Driver, DriverError, SimulationStage};
use super::error::EngineError;
use super::layout::DepositionLayout;
use super::placement::Depositor;
use super::postprocessing::{Pipeline, Verdict};
use super::progress::{Progress, ProgressReporter};
use crate::core::models::cell::SimulationCell;
use crate::core::models::state::State;
use rand::RngCore;
use tracing::{info, instrument, warn};

/// How an iteration ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The final state passed postprocessing and may be committed.
    Success(State),
    /// The engine failed or a strict postprocessing stage rejected the
    /// result; the reason is kept for the log.
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Everything one relax, deposit and finalize cycle needs, borrowed from the
/// controller that owns it.
pub struct Iteration<'a> {
    pub id: u64,
    pub driver: &'a dyn Driver,
    pub depositor: &'a Depositor,
    pub pipeline: &'a Pipeline,
    pub layout: &'a DepositionLayout,
    pub cell: &'a SimulationCell,
}

impl Iteration<'_> {
    /// Runs the cycle on a working copy of `state`.
    ///
    /// Engine failures (launch errors, non-zero exit, missing or unreadable
    /// output) and strict postprocessing rejections end in
    /// [`Outcome::Failure`]. An `Err` means the run cannot continue: the
    /// input files could not be written, or sampling new particles failed.
    #[instrument(skip_all, name = "iteration", fields(id = self.id))]
    pub fn run(
        &self,
        state: &State,
        rng: &mut dyn RngCore,
        reporter: &ProgressReporter,
    ) -> Result<Outcome, EngineError> {
        info!("Starting iteration.");

        // === Relaxation ===
        reporter.report(Progress::StageStart { name: "Relaxation" });
        let relaxed = match self.simulate(state, SimulationStage::Relaxation)? {
            Ok(relaxed) => relaxed,
            Err(e) => return Ok(self.engine_failure(SimulationStage::Relaxation, e)),
        };

        // === Deposition ===
        reporter.report(Progress::StageStart { name: "Deposition" });
        let mut working = relaxed;
        self.depositor
            .deposit(&mut working, self.driver.velocity_scaling(), rng)?;
        let deposited = match self.simulate(&working, SimulationStage::Deposition)? {
            Ok(deposited) => deposited,
            Err(e) => return Ok(self.engine_failure(SimulationStage::Deposition, e)),
        };

        // === Finalization ===
        reporter.report(Progress::StageStart { name: "Finalization" });
        info!(stages = self.pipeline.len(), "Running postprocessing.");
        let num_deposited = self.depositor.atoms_per_deposition();
        let (candidate, verdict) = self.pipeline.run(deposited, self.cell, num_deposited);
        match verdict {
            Verdict::Pass => {
                info!(particles = candidate.len(), "Iteration succeeded.");
                Ok(Outcome::Success(candidate))
            }
            Verdict::Fail(reason) => {
                warn!(reason = %reason, "Postprocessing rejected the final state.");
                Ok(Outcome::Failure(reason))
            }
        }
    }

    /// Writes inputs for `stage`, runs the engine and reads its result.
    ///
    /// The outer `Result` carries fatal errors; the inner one carries engine
    /// failures, which only fail the iteration.
    fn simulate(
        &self,
        state: &State,
        stage: SimulationStage,
    ) -> Result<Result<State, DriverError>, EngineError> {
        let basename = self.layout.basename(stage.label(), self.id);
        self.driver.write_inputs(&basename, state, stage)?;
        info!(stage = %stage, engine = self.driver.name(), "Running engine.");
        Ok(self
            .driver
            .execute(&basename)
            .and_then(|()| self.driver.read_outputs(&basename)))
    }

    fn engine_failure(&self, stage: SimulationStage, error: DriverError) -> Outcome {
        warn!(stage = %stage, error = %error, "Engine did not complete cleanly.");
        Outcome::Failure(format!("{} stage: {}", stage, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{
        DepositionConfig, DepositionConfigBuilder, DepositionKind, DriverConfig,
        PostprocessingSpec,
    };
    use crate::engine::drivers::stub::EchoDriver;
    use nalgebra::Point3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn config(postprocessing: Vec<PostprocessingSpec>) -> DepositionConfig {
        DepositionConfigBuilder::new()
            .cell(SimulationCell::orthogonal(20.0, 20.0, 60.0).unwrap())
            .substrate_xyz(PathBuf::from("substrate.xyz"))
            .kind(DepositionKind::Monatomic {
                element: "Al".to_string(),
            })
            .deposition_height(2.0)
            .min_velocity(25.0)
            .relaxation_time(2.0)
            .deposition_time(10.0)
            .max_total_iterations(3)
            .max_sequential_failures(5)
            .postprocessing(postprocessing)
            .driver(DriverConfig::new(
                "echo",
                PathBuf::from("echo"),
                PathBuf::from("in.template"),
            ))
            .build()
            .unwrap()
    }

    fn substrate() -> State {
        State::at_rest(
            vec![Point3::new(5.0, 5.0, 1.0), Point3::new(6.0, 5.0, 1.0)],
            vec!["Al".into(), "O".into()],
        )
        .unwrap()
    }

    fn run_with(driver: &EchoDriver, config: &DepositionConfig) -> Outcome {
        let dir = tempdir().unwrap();
        let layout = DepositionLayout::new(dir.path());
        layout.create_directories().unwrap();
        let depositor = Depositor::from_config(config).unwrap();
        let pipeline = Pipeline::from_specs(&config.postprocessing).unwrap();
        let iteration = Iteration {
            id: 1,
            driver,
            depositor: &depositor,
            pipeline: &pipeline,
            layout: &layout,
            cell: &config.cell,
        };
        let mut rng = StdRng::seed_from_u64(1);
        iteration
            .run(&substrate(), &mut rng, &ProgressReporter::new())
            .unwrap()
    }

    #[test]
    fn successful_cycle_returns_the_state_with_the_new_particle() {
        let driver = EchoDriver::succeeding();
        let outcome = run_with(&driver, &config(Vec::new()));

        let Outcome::Success(state) = outcome else {
            panic!("expected success");
        };
        assert_eq!(state.len(), 3);
        assert_eq!(state.elements()[2], "Al");
        let executed = driver.executed.borrow();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].ends_with("current/relaxation001"));
        assert!(executed[1].ends_with("current/deposition001"));
    }

    #[test]
    fn relaxation_failure_skips_deposition() {
        let driver = EchoDriver::failing();
        let outcome = run_with(&driver, &config(Vec::new()));

        assert!(matches!(outcome, Outcome::Failure(reason) if reason.starts_with("relaxation")));
        assert_eq!(driver.executed.borrow().len(), 1);
    }

    #[test]
    fn deposition_failure_fails_the_iteration() {
        let driver = EchoDriver::failing_when(|basename| {
            basename.to_string_lossy().contains("deposition")
        });
        let outcome = run_with(&driver, &config(Vec::new()));

        assert!(matches!(outcome, Outcome::Failure(reason) if reason.starts_with("deposition")));
        assert_eq!(driver.executed.borrow().len(), 2);
    }

    #[test]
    fn strict_postprocessing_rejection_fails_the_iteration() {
        // The new particle lands 2 Å above the surface with no neighbour
        // closer than 0.5 Å.
        let driver = EchoDriver::succeeding();
        let strict = config(vec![PostprocessingSpec::new(
            "neighbour_count",
            vec![1.0, 12.0, 0.5],
        )]);
        assert!(!run_with(&driver, &strict).is_success());

        let lenient = config(vec![
            PostprocessingSpec::new("neighbour_count", vec![1.0, 12.0, 0.5]).lenient(),
        ]);
        assert!(run_with(&EchoDriver::succeeding(), &lenient).is_success());
    }
}
