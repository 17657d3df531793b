use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Deposition Developers",
    version,
    about = "deposit - Drive iterative deposition simulations through an external MD engine.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// The settings file named by the subcommand, if it takes one.
    pub fn settings_path(&self) -> Option<&Path> {
        match &self.command {
            Commands::Run(args) => Some(&args.config.settings),
            Commands::Validate(args) => Some(&args.config.settings),
            Commands::Status(_) => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run (or resume) a deposition in a working directory.
    Run(RunArgs),
    /// Check a settings file, its plugins and its input template without running anything.
    Validate(ValidateArgs),
    /// Print the checkpoint record of a working directory.
    Status(StatusArgs),
}

/// The settings file plus everything that may override it.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to the deposition settings file in TOML format.
    #[arg(short = 'c', long = "settings", required = true, value_name = "PATH")]
    pub settings: PathBuf,

    /// Override `max-total-iterations` from the settings file.
    #[arg(long, value_name = "INT")]
    pub max_total_iterations: Option<u64>,

    /// Override `max-sequential-failures` from the settings file.
    #[arg(long, value_name = "INT")]
    pub max_sequential_failures: Option<u64>,

    /// Seed for a new run. A resumed run always keeps its persisted seed.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Override the position distribution, e.g. 'uniform' or 'fixed:5.0,5.0'.
    #[arg(long, value_name = "NAME[:ARGS]")]
    pub position_distribution: Option<String>,

    /// Override the velocity distribution, e.g. 'gaussian:300,26.98,0'.
    #[arg(long, value_name = "NAME[:ARGS]")]
    pub velocity_distribution: Option<String>,

    /// Set a specific configuration value, overriding the settings file.
    /// Can be used multiple times. Example: -S deposition-height=4.5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Directory holding the checkpoint and iteration archives.
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub workdir: PathBuf,
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Directory the engine would run in.
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub workdir: PathBuf,
}

/// Arguments for the `status` subcommand.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Directory holding the checkpoint.
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub workdir: PathBuf,
}
