use crate::core::io::snapshot::{load_state, save_state};
use crate::core::io::traits::StructureFile;
use crate::core::io::xyz::XyzFile;
use crate::core::models::state::State;
use crate::engine::config::{DepositionConfig, MAX_SEED};
use crate::engine::drivers::{Driver, resolve_driver};
use crate::engine::error::EngineError;
use crate::engine::iteration::{Iteration, Outcome};
use crate::engine::layout::{DepositionLayout, STATE_FILE};
use crate::engine::placement::Depositor;
use crate::engine::postprocessing::Pipeline;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::status::Status;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, thread_rng};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Why [`Deposition::run`] returned. Both are expected ends of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured number of iterations has been attempted.
    MaxTotalIterations,
    /// Too many iterations in a row failed.
    MaxSequentialFailures,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxTotalIterations => f.write_str("maximum total iterations reached"),
            Self::MaxSequentialFailures => f.write_str("maximum sequential failures reached"),
        }
    }
}

/// The deposition controller for one working directory.
///
/// Owns the canonical [`State`] and the checkpoint [`Status`]. Each iteration
/// works on a copy of the state; the copy replaces the canonical state only
/// when the iteration succeeds.
pub struct Deposition {
    config: DepositionConfig,
    layout: DepositionLayout,
    driver: Box<dyn Driver>,
    depositor: Depositor,
    pipeline: Pipeline,
    status: Status,
    state: State,
}

impl Deposition {
    /// Resolves the configured driver and prepares a run rooted at `root`.
    ///
    /// # Errors
    ///
    /// Any configuration problem (unknown plugin, bad template, failed
    /// self-test) and any I/O error while loading or creating the checkpoint.
    pub fn from_config(
        config: DepositionConfig,
        root: impl Into<PathBuf>,
    ) -> Result<Self, EngineError> {
        // Engines run with the root as their working directory.
        let root = root.into();
        let root = std::path::absolute(&root).map_err(|e| EngineError::io(&root, e))?;
        let layout = DepositionLayout::new(root);
        let driver = resolve_driver(&config, layout.root())?;
        Self::with_layout(config, layout, driver)
    }

    /// Like [`from_config`](Self::from_config), with a caller-supplied driver.
    pub fn with_driver(
        config: DepositionConfig,
        root: impl Into<PathBuf>,
        driver: Box<dyn Driver>,
    ) -> Result<Self, EngineError> {
        Self::with_layout(config, DepositionLayout::new(root), driver)
    }

    fn with_layout(
        config: DepositionConfig,
        layout: DepositionLayout,
        driver: Box<dyn Driver>,
    ) -> Result<Self, EngineError> {
        let depositor = Depositor::from_config(&config)?;
        let pipeline = Pipeline::from_specs(&config.postprocessing)?;
        let (status, state) = load_or_initialize(&config, &layout)?;

        let mut rng = StdRng::seed_from_u64(status.seed);
        depositor.self_test(&state, &mut rng)?;

        info!(
            driver = driver.name(),
            postprocessing_stages = pipeline.len(),
            particles = state.len(),
            seed = status.seed,
            "Deposition configured."
        );
        Ok(Self {
            config,
            layout,
            driver,
            depositor,
            pipeline,
            status,
            state,
        })
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn layout(&self) -> &DepositionLayout {
        &self.layout
    }

    /// The condition that ends the run, if one already holds. Sequential
    /// failures are checked first.
    pub fn stop_reason(&self) -> Option<StopReason> {
        if self.status.sequential_failures >= self.config.max_sequential_failures {
            Some(StopReason::MaxSequentialFailures)
        } else if self.status.total_iterations >= self.config.max_total_iterations {
            Some(StopReason::MaxTotalIterations)
        } else {
            None
        }
    }

    /// Runs iterations until a stop condition holds.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] only for problems that make continuing
    /// impossible; failed iterations are recorded and the loop carries on.
    #[instrument(skip_all, name = "deposition_workflow")]
    pub fn run(&mut self, reporter: &ProgressReporter) -> Result<StopReason, EngineError> {
        reporter.report(Progress::RunStart {
            completed: self.status.total_iterations,
            total: self.config.max_total_iterations,
        });
        info!(
            completed = self.status.total_iterations,
            total = self.config.max_total_iterations,
            "Starting deposition loop."
        );

        let reason = loop {
            if let Some(reason) = self.stop_reason() {
                break reason;
            }
            let id = self.status.next_iteration_id();
            reporter.report(Progress::IterationStart { id });

            // Seeded per iteration so that a resumed run draws the same
            // numbers as an uninterrupted one.
            let mut rng = StdRng::seed_from_u64(self.status.seed.wrapping_add(id));
            let outcome = Iteration {
                id,
                driver: self.driver.as_ref(),
                depositor: &self.depositor,
                pipeline: &self.pipeline,
                layout: &self.layout,
                cell: &self.config.cell,
            }
            .run(&self.state, &mut rng, reporter)?;

            let success = outcome.is_success();
            self.commit(id, outcome)?;
            reporter.report(Progress::IterationFinish { id, success });
        };

        reporter.report(Progress::RunFinish);
        info!(
            reason = %reason,
            total_iterations = self.status.total_iterations,
            total_failures = self.status.total_failures,
            "Deposition finished."
        );
        Ok(reason)
    }

    /// Archives the iteration's files, then persists the checkpoint. A crash
    /// between the two re-runs the iteration, whose archive is replaced.
    fn commit(&mut self, id: u64, outcome: Outcome) -> Result<(), EngineError> {
        match outcome {
            Outcome::Success(state) => {
                save_state(&state, &self.layout.current_dir().join(STATE_FILE))?;
                self.layout.archive_current(&self.layout.success_dir(id))?;
                self.status.record_success(id);
                self.status.save(&self.layout.status_path())?;
                self.state = state;
                info!(id, particles = self.state.len(), "Committed successful iteration.");
            }
            Outcome::Failure(reason) => {
                self.layout.archive_current(&self.layout.failure_dir(id))?;
                self.status.record_failure();
                self.status.save(&self.layout.status_path())?;
                warn!(
                    id,
                    reason = %reason,
                    sequential_failures = self.status.sequential_failures,
                    "Iteration failed."
                );
            }
        }
        Ok(())
    }
}

/// What [`validate`] resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSummary {
    pub driver: &'static str,
    pub postprocessing_stages: usize,
    pub substrate_particles: usize,
    pub atoms_per_deposition: usize,
}

/// Runs the construction-time checks of [`Deposition`] without creating or
/// modifying anything under `root`.
///
/// The sampling self-test is drawn against the substrate, seeded with the
/// configured seed (or zero).
pub fn validate(
    config: &DepositionConfig,
    root: &Path,
) -> Result<ValidationSummary, EngineError> {
    let driver = resolve_driver(config, root)?;
    let depositor = Depositor::from_config(config)?;
    let pipeline = Pipeline::from_specs(&config.postprocessing)?;

    let substrate = &config.substrate_xyz;
    let state =
        XyzFile::read_from_path(substrate).map_err(|e| EngineError::structure(substrate, e))?;
    let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or_default());
    depositor.self_test(&state, &mut rng)?;

    Ok(ValidationSummary {
        driver: driver.name(),
        postprocessing_stages: pipeline.len(),
        substrate_particles: state.len(),
        atoms_per_deposition: depositor.atoms_per_deposition(),
    })
}

fn load_or_initialize(
    config: &DepositionConfig,
    layout: &DepositionLayout,
) -> Result<(Status, State), EngineError> {
    layout.create_directories()?;
    // Files left by an interrupted iteration belong to no archive.
    layout.reset_current()?;

    let fallback_seed = || config.seed.unwrap_or_else(draw_seed);
    if let Some(status) = Status::load(&layout.status_path(), fallback_seed)? {
        if config.seed.is_some_and(|seed| seed != status.seed) {
            warn!(
                persisted = status.seed,
                "Ignoring the configured seed; resuming with the persisted one."
            );
        }
        let state_path = layout.committed_state_path(status.last_successful_iteration_id);
        let state = load_state(&state_path)?;
        status.save(&layout.status_path())?;
        info!(
            completed = status.total_iterations,
            last_success = status.last_successful_iteration_id,
            "Resuming from checkpoint."
        );
        return Ok((status, state));
    }

    let substrate = &config.substrate_xyz;
    let state =
        XyzFile::read_from_path(substrate).map_err(|e| EngineError::structure(substrate, e))?;
    if state.is_empty() {
        warn!(path = %substrate.display(), "Substrate contains no particles.");
    }
    let seed = config.seed.unwrap_or_else(draw_seed);
    let status = Status::new(seed);
    save_state(&state, &layout.initial_state_path())?;
    status.save(&layout.status_path())?;
    info!(particles = state.len(), seed, "Initialized new deposition.");
    Ok((status, state))
}

fn draw_seed() -> u64 {
    thread_rng().gen_range(0..=MAX_SEED)
}
