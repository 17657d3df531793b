use crate::cli::ValidateArgs;
use crate::config::builder::build_config;
use crate::error::Result;
use depokit::workflows::deposit;
use tracing::info;

pub fn run(args: ValidateArgs) -> Result<()> {
    let app = build_config(&args.config, &args.workdir)?;
    info!("Validating drivers, distributions and postprocessing stages...");
    let summary = deposit::validate(&app.core_config, &app.working_directory)?;

    println!("Settings are valid.");
    println!("  Driver:                 {}", summary.driver);
    println!("  Postprocessing stages:  {}", summary.postprocessing_stages);
    println!("  Substrate particles:    {}", summary.substrate_particles);
    println!("  Atoms per deposition:   {}", summary.atoms_per_deposition);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::error::CliError;
    use clap::Parser;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const SETTINGS: &str = r#"
substrate-xyz = "substrate.xyz"
deposition-type = "monatomic"
element = "Al"
deposition-height = 5.0
min-velocity = 25.0
relaxation-time = 2.0
deposition-time = 10.0
max-total-iterations = 10
max-sequential-failures = 3

[simulation-cell]
a = 10.0
b = 10.0
c = 40.0

[driver]
name = "lammps"
binary = "lmp"
input-template = "in.template"
velocity-scaling-from-metres-per-second = 0.01

[driver.variables]
elements_in_potential = ["Al", "O"]
"#;

    fn validate_args(dir: &Path, extra: &[&str]) -> ValidateArgs {
        let settings = dir.join("settings.toml");
        let workdir = dir.join("run");
        let mut argv = vec![
            "deposit",
            "validate",
            "-c",
            settings.to_str().unwrap(),
            "-w",
            workdir.to_str().unwrap(),
        ];
        argv.extend_from_slice(extra);
        let Commands::Validate(args) = Cli::parse_from(argv).command else {
            panic!("expected 'validate' subcommand");
        };
        args
    }

    fn write_inputs(dir: &Path) {
        fs::write(dir.join("settings.toml"), SETTINGS).unwrap();
        fs::write(
            dir.join("substrate.xyz"),
            "2\nslab\nAl 1.0 1.0 1.0\nO 3.0 1.0 1.0\n",
        )
        .unwrap();
        fs::write(
            dir.join("in.template"),
            "read_data ${filename}.input_data\nrun ${num_steps}\n\
             write_data ${filename}.output_data\n",
        )
        .unwrap();
    }

    #[test]
    fn valid_settings_pass_without_creating_the_workdir() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        run(validate_args(dir.path(), &[])).unwrap();
        assert!(!dir.path().join("run").exists());
    }

    #[test]
    fn unknown_distribution_is_reported() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        let result = run(validate_args(
            dir.path(),
            &["--position-distribution", "ring:2.0"],
        ));
        assert!(matches!(result, Err(CliError::Deposition(_))));
    }
}
