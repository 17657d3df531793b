use depokit::engine::config::DepositionConfig;
use std::path::PathBuf;

pub struct AppConfig {
    pub working_directory: PathBuf,
    pub core_config: DepositionConfig,
}
