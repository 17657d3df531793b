use crate::core::models::state::{State, StateError};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("File I/O error for '{path}': {source}")]
    Io { path: String, source: io::Error },
    #[error("TOML parsing error for '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Inconsistent snapshot '{path}': {source}")]
    Inconsistent { path: String, source: StateError },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateSnapshot {
    elements: Vec<String>,
    coordinates: Vec<[f64; 3]>,
    velocities: Vec<[f64; 3]>,
}

impl From<&State> for StateSnapshot {
    fn from(state: &State) -> Self {
        Self {
            elements: state.elements().to_vec(),
            coordinates: state.coordinates().iter().map(|p| [p.x, p.y, p.z]).collect(),
            velocities: state.velocities().iter().map(|v| [v.x, v.y, v.z]).collect(),
        }
    }
}

/// Writes `contents` to `path` by way of a sibling temporary file, so that a
/// reader never observes a partially written file.
pub fn write_atomically(path: &Path, contents: &str) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)
}

/// Saves a complete state (including velocities) as TOML.
pub fn save_state(state: &State, path: &Path) -> Result<(), SnapshotError> {
    let content = toml::to_string(&StateSnapshot::from(state))?;
    write_atomically(path, &content).map_err(|e| SnapshotError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// Loads a state previously written by [`save_state`].
pub fn load_state(path: &Path) -> Result<State, SnapshotError> {
    let display = || path.to_string_lossy().to_string();
    let content = fs::read_to_string(path).map_err(|e| SnapshotError::Io {
        path: display(),
        source: e,
    })?;
    let snapshot: StateSnapshot = toml::from_str(&content).map_err(|e| SnapshotError::Parse {
        path: display(),
        source: e,
    })?;
    State::new(
        snapshot
            .coordinates
            .into_iter()
            .map(|[x, y, z]| Point3::new(x, y, z))
            .collect(),
        snapshot.elements,
        snapshot
            .velocities
            .into_iter()
            .map(|[x, y, z]| Vector3::new(x, y, z))
            .collect(),
    )
    .map_err(|e| SnapshotError::Inconsistent {
        path: display(),
        source: e,
    })
}
