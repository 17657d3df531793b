use super::defaults::DefaultsConfig;
use super::file::{
    FileConfig, FileDepositionType, FileDistribution, FileDriver, resolve_relative, settings_dir,
};
use super::models::AppConfig;
use crate::cli::ConfigArgs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use depokit::core::models::cell::SimulationCell;
use depokit::engine::config::{
    DepositionConfigBuilder, DepositionKind, DistributionSpec, DriverConfig, PostprocessingSpec,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub fn build_config(args: &ConfigArgs, workdir: &Path) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::from_file(&args.settings)?;
    let file_config = apply_set_values(file_config, &args.set_values)?;
    let base = settings_dir(&args.settings);

    let cell = build_cell(&file_config, &defaults)?;
    let kind = build_kind(&file_config, base)?;

    let position_distribution = merge_distribution(
        args.position_distribution.as_deref(),
        file_config.position_distribution,
        &defaults.position_distribution,
    )?;
    let velocity_distribution = merge_distribution(
        args.velocity_distribution.as_deref(),
        file_config.velocity_distribution,
        &defaults.velocity_distribution,
    )?;

    let postprocessing = file_config
        .postprocessing
        .into_iter()
        .map(|stage| PostprocessingSpec {
            name: stage.name,
            args: stage.args,
            strict: stage.strict.unwrap_or(defaults.strict_postprocessing),
        })
        .collect();

    let driver = build_driver(file_config.driver.unwrap_or_default(), base, &defaults)?;

    let mut builder = DepositionConfigBuilder::new()
        .cell(cell)
        .kind(kind)
        .num_deposited_per_iteration(
            file_config
                .num_deposited_per_iteration
                .unwrap_or(defaults.num_deposited_per_iteration),
        )
        .deposition_temperature(
            file_config
                .deposition_temperature
                .unwrap_or(defaults.deposition_temperature),
        )
        .max_velocity_attempts(
            file_config
                .max_velocity_attempts
                .unwrap_or(defaults.max_velocity_attempts),
        )
        .position_distribution(position_distribution)
        .velocity_distribution(velocity_distribution)
        .postprocessing(postprocessing)
        .command_prefix(
            file_config
                .command_prefix
                .unwrap_or_else(|| defaults.command_prefix.clone()),
        )
        .driver(driver);

    if let Some(path) = file_config.substrate_xyz {
        builder = builder.substrate_xyz(resolve_relative(base, &path));
    }
    if let Some(height) = file_config.deposition_height {
        builder = builder.deposition_height(height);
    }
    if let Some(velocity) = file_config.min_velocity {
        builder = builder.min_velocity(velocity);
    }
    if let Some(time) = file_config.relaxation_time {
        builder = builder.relaxation_time(time);
    }
    if let Some(time) = file_config.deposition_time {
        builder = builder.deposition_time(time);
    }
    if let Some(n) = args.max_total_iterations.or(file_config.max_total_iterations) {
        builder = builder.max_total_iterations(n);
    }
    if let Some(n) = args
        .max_sequential_failures
        .or(file_config.max_sequential_failures)
    {
        builder = builder.max_sequential_failures(n);
    }
    if let Some(seed) = args.seed.or(file_config.seed) {
        builder = builder.seed(seed);
    }

    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        working_directory: workdir.to_path_buf(),
        core_config,
    })
}

fn build_cell(file_config: &FileConfig, defaults: &DefaultsConfig) -> Result<SimulationCell> {
    let cell = file_config.simulation_cell.clone().ok_or_else(|| {
        CliError::Config("`simulation-cell` section is required.".to_string())
    })?;
    let length = |value: Option<f64>, name: &str| {
        value.ok_or_else(|| CliError::Config(format!("`simulation-cell` requires `{}`", name)))
    };
    SimulationCell::new(
        length(cell.a, "a")?,
        length(cell.b, "b")?,
        length(cell.c, "c")?,
        cell.alpha.unwrap_or(defaults.cell_angle),
        cell.beta.unwrap_or(defaults.cell_angle),
        cell.gamma.unwrap_or(defaults.cell_angle),
    )
    .map_err(|e| CliError::Config(format!("Invalid simulation cell: {}", e)))
}

fn build_kind(file_config: &FileConfig, base: &Path) -> Result<DepositionKind> {
    match file_config.deposition_type {
        Some(FileDepositionType::Monatomic) => {
            let element = file_config.element.clone().ok_or_else(|| {
                CliError::Config("`deposition-type = \"monatomic\"` requires `element`".to_string())
            })?;
            Ok(DepositionKind::Monatomic { element })
        }
        Some(FileDepositionType::Molecule) => {
            let path = file_config.molecule_xyz.as_ref().ok_or_else(|| {
                CliError::Config(
                    "`deposition-type = \"molecule\"` requires `molecule-xyz`".to_string(),
                )
            })?;
            Ok(DepositionKind::Molecule {
                xyz_path: resolve_relative(base, path),
            })
        }
        None => Err(CliError::Config(
            "`deposition-type` is required (\"monatomic\" or \"molecule\").".to_string(),
        )),
    }
}

fn merge_distribution(
    cli_arg: Option<&str>,
    file_val: Option<FileDistribution>,
    default_name: &str,
) -> Result<DistributionSpec> {
    if let Some(raw) = cli_arg {
        return parser::parse_distribution(raw).map_err(|e| CliError::Argument(e.to_string()));
    }
    Ok(match file_val {
        Some(d) => DistributionSpec::new(d.name, d.args),
        None => DistributionSpec::new(default_name, Vec::new()),
    })
}

fn build_driver(
    file_driver: FileDriver,
    base: &Path,
    defaults: &DefaultsConfig,
) -> Result<DriverConfig> {
    let required = |name: &str| CliError::Config(format!("`driver.{}` is required.", name));

    let name = file_driver.name.ok_or_else(|| required("name"))?;
    let binary = file_driver.binary.ok_or_else(|| required("binary"))?;
    // A bare command name is looked up on PATH by the shell.
    let binary = if binary.components().count() > 1 {
        resolve_relative(base, &binary)
    } else {
        binary
    };
    let input_template = file_driver
        .input_template
        .ok_or_else(|| required("input-template"))?;
    let velocity_scaling = file_driver
        .velocity_scaling_from_metres_per_second
        .ok_or_else(|| required("velocity-scaling-from-metres-per-second"))?;

    let mut driver = DriverConfig::new(name, binary, resolve_relative(base, &input_template));
    driver.arguments = file_driver
        .arguments
        .unwrap_or_else(|| defaults.driver_arguments.clone());
    driver.velocity_scaling_from_metres_per_second = velocity_scaling;
    driver.time_scaling_from_picoseconds = file_driver
        .time_scaling_from_picoseconds
        .unwrap_or(defaults.time_scaling_from_picoseconds);
    driver.variables = convert_variables(file_driver.variables)?;
    Ok(driver)
}

/// Flattens TOML driver variables into template strings. Lists become space
/// separated values.
fn convert_variables(variables: BTreeMap<String, toml::Value>) -> Result<BTreeMap<String, String>> {
    variables
        .into_iter()
        .map(|(name, value)| -> Result<(String, String)> {
            let text = match value {
                toml::Value::Array(items) => items
                    .into_iter()
                    .map(|item| scalar_to_string(&name, item))
                    .collect::<Result<Vec<_>>>()?
                    .join(" "),
                other => scalar_to_string(&name, other)?,
            };
            Ok((name, text))
        })
        .collect()
}

fn scalar_to_string(name: &str, value: toml::Value) -> Result<String> {
    match value {
        toml::Value::String(s) => Ok(s),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        _ => Err(CliError::Config(format!(
            "Driver variable '{}' must be a scalar or a list of scalars.",
            name
        ))),
    }
}

fn parse_value<T: FromStr>(key: &str, value_str: &str) -> Result<T> {
    value_str
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value_str)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value_str) =
            parser::parse_assignment(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;

        if let Some(variable) = key.strip_prefix("driver.variables.") {
            config
                .driver
                .get_or_insert_with(Default::default)
                .variables
                .insert(variable.to_string(), toml::Value::String(value_str.to_string()));
            continue;
        }
        if let Some(field) = key.strip_prefix("simulation-cell.") {
            let cell = config.simulation_cell.get_or_insert_with(Default::default);
            let slot = match field {
                "a" => &mut cell.a,
                "b" => &mut cell.b,
                "c" => &mut cell.c,
                "alpha" => &mut cell.alpha,
                "beta" => &mut cell.beta,
                "gamma" => &mut cell.gamma,
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            };
            *slot = Some(parse_value(key, value_str)?);
            continue;
        }

        match key {
            "substrate-xyz" => config.substrate_xyz = Some(PathBuf::from(value_str)),
            "deposition-type" => {
                config.deposition_type = Some(match value_str {
                    "monatomic" => FileDepositionType::Monatomic,
                    "molecule" => FileDepositionType::Molecule,
                    _ => {
                        return Err(CliError::Config(format!(
                            "Invalid value for {}: {} (expected 'monatomic' or 'molecule')",
                            key, value_str
                        )));
                    }
                })
            }
            "element" => config.element = Some(value_str.to_string()),
            "molecule-xyz" => config.molecule_xyz = Some(PathBuf::from(value_str)),
            "num-deposited-per-iteration" => {
                config.num_deposited_per_iteration = Some(parse_value(key, value_str)?)
            }
            "deposition-height" => config.deposition_height = Some(parse_value(key, value_str)?),
            "deposition-temperature" => {
                config.deposition_temperature = Some(parse_value(key, value_str)?)
            }
            "min-velocity" => config.min_velocity = Some(parse_value(key, value_str)?),
            "max-velocity-attempts" => {
                config.max_velocity_attempts = Some(parse_value(key, value_str)?)
            }
            "relaxation-time" => config.relaxation_time = Some(parse_value(key, value_str)?),
            "deposition-time" => config.deposition_time = Some(parse_value(key, value_str)?),
            "max-total-iterations" => {
                config.max_total_iterations = Some(parse_value(key, value_str)?)
            }
            "max-sequential-failures" => {
                config.max_sequential_failures = Some(parse_value(key, value_str)?)
            }
            "command-prefix" => config.command_prefix = Some(value_str.to_string()),
            "seed" => config.seed = Some(parse_value(key, value_str)?),
            "log-file" => config.log_file = Some(PathBuf::from(value_str)),
            "driver.name" => {
                config.driver.get_or_insert_with(Default::default).name =
                    Some(value_str.to_string())
            }
            "driver.binary" => {
                config.driver.get_or_insert_with(Default::default).binary =
                    Some(PathBuf::from(value_str))
            }
            "driver.input-template" => {
                config.driver.get_or_insert_with(Default::default).input_template =
                    Some(PathBuf::from(value_str))
            }
            "driver.arguments" => {
                config.driver.get_or_insert_with(Default::default).arguments =
                    Some(value_str.to_string())
            }
            "driver.velocity-scaling-from-metres-per-second" => {
                config
                    .driver
                    .get_or_insert_with(Default::default)
                    .velocity_scaling_from_metres_per_second = Some(parse_value(key, value_str)?)
            }
            "driver.time-scaling-from-picoseconds" => {
                config
                    .driver
                    .get_or_insert_with(Default::default)
                    .time_scaling_from_picoseconds = Some(parse_value(key, value_str)?)
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const SETTINGS: &str = r#"
substrate-xyz = "substrate.xyz"
deposition-type = "monatomic"
element = "Al"
deposition-height = 5.0
min-velocity = 25.0
relaxation-time = 2.0
deposition-time = 10.0
max-total-iterations = 100
max-sequential-failures = 5
seed = 11

[simulation-cell]
a = 20.0
b = 20.0
c = 60.0

[[postprocessing]]
name = "neighbour_count"
args = [1, 12, 3.0]
strict = false

[driver]
name = "lammps"
binary = "bin/lmp"
input-template = "in.template"
velocity-scaling-from-metres-per-second = 0.01
time-scaling-from-picoseconds = 1000

[driver.variables]
elements_in_potential = ["Al", "O"]
timestep = 0.25
"#;

    fn write_settings(content: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("settings.toml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn args(settings: PathBuf) -> ConfigArgs {
        ConfigArgs {
            settings,
            max_total_iterations: None,
            max_sequential_failures: None,
            seed: None,
            position_distribution: None,
            velocity_distribution: None,
            set_values: vec![],
        }
    }

    #[test]
    fn file_values_are_merged_with_defaults() {
        let (dir, path) = write_settings(SETTINGS);
        let app = build_config(&args(path), Path::new("runs/a")).unwrap();
        let config = app.core_config;

        assert_eq!(app.working_directory, PathBuf::from("runs/a"));
        assert_eq!(config.substrate_xyz, dir.path().join("substrate.xyz"));
        assert_eq!(
            config.kind,
            DepositionKind::Monatomic {
                element: "Al".to_string()
            }
        );
        assert_eq!(config.cell.alpha, 90.0);
        assert_eq!(config.num_deposited_per_iteration, 1);
        assert_eq!(config.deposition_temperature, 300.0);
        assert_eq!(config.position_distribution, DistributionSpec::new("uniform", vec![]));
        assert_eq!(config.velocity_distribution.name, "gaussian");
        assert_eq!(
            config.postprocessing,
            [PostprocessingSpec::new("neighbour_count", vec![1.0, 12.0, 3.0]).lenient()]
        );
        assert_eq!(config.seed, Some(11));

        let driver = &config.driver;
        assert_eq!(driver.binary, dir.path().join("bin/lmp"));
        assert_eq!(driver.input_template, dir.path().join("in.template"));
        assert_eq!(driver.arguments, "");
        assert_eq!(driver.time_scaling_from_picoseconds, 1000.0);
        assert_eq!(driver.variable("elements_in_potential"), Some("Al O"));
        assert_eq!(driver.variable("timestep"), Some("0.25"));
    }

    #[test]
    fn cli_arguments_override_file_values() {
        let (_dir, path) = write_settings(SETTINGS);
        let mut args = args(path);
        args.max_total_iterations = Some(7);
        args.seed = Some(3);
        args.velocity_distribution = Some("fixed:0,0,-150".to_string());

        let config = build_config(&args, Path::new(".")).unwrap().core_config;
        assert_eq!(config.max_total_iterations, 7);
        assert_eq!(config.max_sequential_failures, 5);
        assert_eq!(config.seed, Some(3));
        assert_eq!(
            config.velocity_distribution,
            DistributionSpec::new("fixed", vec![0.0, 0.0, -150.0])
        );
    }

    #[test]
    fn set_values_override_nested_keys_and_variables() {
        let (_dir, path) = write_settings(SETTINGS);
        let mut args = args(path);
        args.set_values = vec![
            "deposition-height=4.5".to_string(),
            "simulation-cell.gamma=120".to_string(),
            "driver.binary=lmp_mpi".to_string(),
            "driver.arguments=-sf omp".to_string(),
            "driver.variables.pair_style=reax/c NULL".to_string(),
        ];

        let config = build_config(&args, Path::new(".")).unwrap().core_config;
        assert_eq!(config.deposition_height, 4.5);
        assert_eq!(config.cell.gamma, 120.0);
        assert_eq!(config.driver.binary, PathBuf::from("lmp_mpi"));
        assert_eq!(config.driver.arguments, "-sf omp");
        assert_eq!(config.driver.variable("pair_style"), Some("reax/c NULL"));
    }

    #[test]
    fn unsupported_or_malformed_set_values_are_rejected() {
        let (_dir, path) = write_settings(SETTINGS);
        for bad in ["driver.colour=red", "seed=-1", "no-equals-sign", "simulation-cell.d=1"] {
            let mut args = args(path.clone());
            args.set_values = vec![bad.to_string()];
            assert!(
                matches!(build_config(&args, Path::new(".")), Err(CliError::Config(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn missing_required_values_are_reported() {
        let (_dir, path) = write_settings(&SETTINGS.replace("deposition-height = 5.0\n", ""));
        let result = build_config(&args(path), Path::new("."));
        let Err(CliError::Config(msg)) = result else {
            panic!("expected a configuration error");
        };
        assert!(msg.contains("deposition_height"));

        let (_dir, path) = write_settings(
            &SETTINGS.replace("velocity-scaling-from-metres-per-second = 0.01\n", ""),
        );
        let Err(CliError::Config(msg)) = build_config(&args(path), Path::new(".")) else {
            panic!("expected a configuration error");
        };
        assert!(msg.contains("velocity-scaling-from-metres-per-second"));
    }

    #[test]
    fn table_valued_driver_variables_are_rejected() {
        let (_dir, path) = write_settings(&format!("{}nested = {{ a = 1 }}\n", SETTINGS));
        assert!(matches!(
            build_config(&args(path), Path::new(".")),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn molecule_path_is_resolved_against_the_settings_directory() {
        let (dir, path) = write_settings(SETTINGS);
        let mut args = args(path);
        args.set_values = vec![
            "deposition-type=molecule".to_string(),
            "molecule-xyz=o2.xyz".to_string(),
        ];
        let config = build_config(&args, Path::new(".")).unwrap().core_config;
        assert_eq!(
            config.kind,
            DepositionKind::Molecule {
                xyz_path: dir.path().join("o2.xyz")
            }
        );
    }
}
