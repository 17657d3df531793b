use crate::cli::RunArgs;
use crate::config::builder::build_config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use depokit::engine::progress::ProgressReporter;
use depokit::workflows::deposit::{Deposition, StopReason};
use std::process::ExitCode;
use tracing::{info, warn};

/// Exit code for a run stopped by too many consecutive failed iterations.
pub const PERSISTENT_FAILURE_EXIT_CODE: u8 = 2;

pub fn run(args: RunArgs) -> Result<ExitCode> {
    info!("Merging configuration from file and CLI arguments...");
    let app = build_config(&args.config, &args.workdir)?;

    info!(workdir = %app.working_directory.display(), "Preparing deposition.");
    let mut deposition = Deposition::from_config(app.core_config, &app.working_directory)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let status = deposition.status();
    if status.total_iterations > 0 {
        println!(
            "Resuming deposition after {} iteration(s)...",
            status.total_iterations
        );
    } else {
        println!("Starting deposition (seed {})...", status.seed);
    }

    let reason = deposition.run(&reporter)?;

    let status = deposition.status();
    let (succeeded, failed) = deposition.layout().archived_counts();
    println!("Deposition stopped: {}.", reason);
    println!(
        "  Iterations: {} ({} succeeded, {} failed)",
        status.total_iterations, succeeded, failed
    );
    println!("  Particles in the current state: {}", deposition.state().len());

    Ok(match reason {
        StopReason::MaxTotalIterations => ExitCode::SUCCESS,
        StopReason::MaxSequentialFailures => {
            warn!(
                sequential_failures = status.sequential_failures,
                "Stopped after repeated failures."
            );
            ExitCode::from(PERSISTENT_FAILURE_EXIT_CODE)
        }
    })
}
