pub struct DefaultsConfig {
    pub num_deposited_per_iteration: usize,
    pub deposition_temperature: f64,
    pub max_velocity_attempts: usize,
    pub cell_angle: f64,
    pub position_distribution: String,
    pub velocity_distribution: String,
    pub command_prefix: String,
    pub driver_arguments: String,
    pub time_scaling_from_picoseconds: f64,
    pub strict_postprocessing: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            num_deposited_per_iteration: 1,
            deposition_temperature: 300.0,
            max_velocity_attempts: 10_000,
            cell_angle: 90.0,
            position_distribution: "uniform".to_string(),
            velocity_distribution: "gaussian".to_string(),
            command_prefix: String::new(),
            driver_arguments: String::new(),
            time_scaling_from_picoseconds: 1.0,
            strict_postprocessing: true,
        }
    }
}
