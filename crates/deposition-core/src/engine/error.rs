use std::io;
use std::path::Path;
use thiserror::Error;

use super::config::ConfigError;
use super::distributions::DistributionError;
use super::drivers::DriverError;
use super::status::StatusError;
use crate::core::io::snapshot::SnapshotError;
use crate::core::io::xyz::XyzError;

/// Errors that stop a deposition run.
///
/// Engine crashes and rejected verdicts are not errors: they fail the
/// iteration and the loop continues. Anything returned as an `EngineError`
/// is fatal to the run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Failed to read structure '{path}': {source}")]
    Structure { path: String, source: XyzError },

    #[error("State snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Checkpoint error: {0}")]
    Status(#[from] StatusError),

    #[error("File I/O error for '{path}': {source}")]
    Io { path: String, source: io::Error },

    #[error("Sampling failed: {0}")]
    Distribution(#[from] DistributionError),
}

impl EngineError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_string_lossy().to_string(),
            source,
        }
    }

    pub(crate) fn structure(path: &Path, source: XyzError) -> Self {
        Self::Structure {
            path: path.to_string_lossy().to_string(),
            source,
        }
    }
}
