use crate::cli::StatusArgs;
use crate::error::Result;
use depokit::engine::error::EngineError;
use depokit::engine::layout::{DepositionLayout, iteration_label};
use depokit::engine::status::Status;

pub fn run(args: StatusArgs) -> Result<()> {
    let layout = DepositionLayout::new(&args.workdir);
    println!("{}", render(&layout)?);
    Ok(())
}

fn render(layout: &DepositionLayout) -> Result<String> {
    let mut seed_recorded = true;
    let loaded = Status::load(&layout.status_path(), || {
        seed_recorded = false;
        0
    });
    let Some(status) = loaded.map_err(EngineError::from)? else {
        return Ok(format!(
            "No checkpoint found in {}.",
            layout.root().display()
        ));
    };
    let seed = if seed_recorded {
        status.seed.to_string()
    } else {
        "not recorded".to_string()
    };
    let (succeeded, failed) = layout.archived_counts();
    let last_success = match status.last_successful_iteration_id {
        0 => "none".to_string(),
        id => iteration_label(id),
    };
    Ok(format!(
        "Checkpoint in {}\n  \
         Total iterations:     {}\n  \
         Total failures:       {}\n  \
         Sequential failures:  {}\n  \
         Last success:         {}\n  \
         Seed:                 {}\n  \
         Archived:             {} succeeded, {} failed",
        layout.root().display(),
        status.total_iterations,
        status.total_failures,
        status.sequential_failures,
        last_success,
        seed,
        succeeded,
        failed
    ))
}
