use crate::core::io::snapshot::write_atomically;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("File I/O error for '{path}': {source}")]
    Io { path: String, source: io::Error },
    #[error("Corrupt checkpoint '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// The durable checkpoint of a deposition run.
///
/// Only the controller mutates a `Status`, and only through
/// [`record_success`](Status::record_success) and
/// [`record_failure`](Status::record_failure), so the counters always move
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Status {
    pub total_iterations: u64,
    pub sequential_failures: u64,
    /// Zero while no iteration has succeeded.
    pub last_successful_iteration_id: u64,
    pub total_failures: u64,
    pub seed: u64,
}

/// A checkpoint as stored on disk. Checkpoints that only carry the three
/// iteration counters are still accepted.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredStatus {
    total_iterations: u64,
    sequential_failures: u64,
    last_successful_iteration_id: u64,
    #[serde(default)]
    total_failures: u64,
    seed: Option<u64>,
}

impl Status {
    pub fn new(seed: u64) -> Self {
        Self {
            total_iterations: 0,
            sequential_failures: 0,
            last_successful_iteration_id: 0,
            total_failures: 0,
            seed,
        }
    }

    pub fn next_iteration_id(&self) -> u64 {
        self.total_iterations + 1
    }

    pub fn record_success(&mut self, iteration_id: u64) {
        self.total_iterations += 1;
        self.sequential_failures = 0;
        self.last_successful_iteration_id = iteration_id;
    }

    pub fn record_failure(&mut self) {
        self.total_iterations += 1;
        self.sequential_failures += 1;
        self.total_failures += 1;
    }

    /// Reads the checkpoint at `path`, or `None` if there is none yet.
    ///
    /// `fallback_seed` is called only when the checkpoint records no seed.
    pub fn load(
        path: &Path,
        fallback_seed: impl FnOnce() -> u64,
    ) -> Result<Option<Self>, StatusError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StatusError::Io {
                    path: path.to_string_lossy().to_string(),
                    source: e,
                });
            }
        };
        let stored: StoredStatus = toml::from_str(&content).map_err(|e| StatusError::Parse {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let seed = match stored.seed {
            Some(seed) => seed,
            None => {
                let seed = fallback_seed();
                warn!(
                    path = %path.display(),
                    seed,
                    "Checkpoint records no seed; using a fallback."
                );
                seed
            }
        };
        Ok(Some(Self {
            total_iterations: stored.total_iterations,
            sequential_failures: stored.sequential_failures,
            last_successful_iteration_id: stored.last_successful_iteration_id,
            total_failures: stored.total_failures,
            seed,
        }))
    }

    pub fn save(&self, path: &Path) -> Result<(), StatusError> {
        let content = toml::to_string(self)?;
        write_atomically(path, &content).map_err(|e| StatusError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn counters_follow_outcomes() {
        let mut status = Status::new(7);
        assert_eq!(status.next_iteration_id(), 1);

        status.record_failure();
        status.record_failure();
        assert_eq!(status.total_iterations, 2);
        assert_eq!(status.sequential_failures, 2);
        assert_eq!(status.total_failures, 2);

        status.record_success(3);
        assert_eq!(status.total_iterations, 3);
        assert_eq!(status.sequential_failures, 0);
        assert_eq!(status.total_failures, 2);
        assert_eq!(status.last_successful_iteration_id, 3);
        assert_eq!(status.next_iteration_id(), 4);
    }

    #[test]
    fn load_returns_none_when_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.toml");
        assert_eq!(Status::load(&path, || 0).unwrap(), None);
    }

    #[test]
    fn save_then_load_restores_every_counter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.toml");
        let mut status = Status::new(u64::MAX / 3);
        status.record_success(1);
        status.record_failure();

        status.save(&path).unwrap();
        assert_eq!(Status::load(&path, || 0).unwrap(), Some(status));
    }

    #[test]
    fn load_rejects_unknown_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.toml");
        fs::write(
            &path,
            "total_iterations = 1\nsequential_failures = 0\nlast_successful_iteration_id = 1\n\
             total_failures = 0\nseed = 1\nextra = 2\n",
        )
        .unwrap();
        assert!(matches!(
            Status::load(&path, || 0),
            Err(StatusError::Parse { .. })
        ));
    }

    #[test]
    fn load_accepts_a_checkpoint_with_only_the_iteration_counters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.toml");
        fs::write(
            &path,
            "total_iterations = 3\nsequential_failures = 1\nlast_successful_iteration_id = 2\n",
        )
        .unwrap();

        let status = Status::load(&path, || 99).unwrap().unwrap();
        assert_eq!(status.total_iterations, 3);
        assert_eq!(status.sequential_failures, 1);
        assert_eq!(status.last_successful_iteration_id, 2);
        assert_eq!(status.total_failures, 0);
        assert_eq!(status.seed, 99);
    }

    #[test]
    fn fallback_seed_is_not_used_when_the_checkpoint_records_one() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.toml");
        Status::new(5).save(&path).unwrap();
        let status = Status::load(&path, || unreachable!()).unwrap().unwrap();
        assert_eq!(status.seed, 5);
    }
}
