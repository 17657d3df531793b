use super::error::EngineError;
use std::fs;
use std::path::{Path, PathBuf};

pub const STATUS_FILE: &str = "status.toml";
pub const INITIAL_STATE_FILE: &str = "initial_state.toml";
pub const STATE_FILE: &str = "state.toml";

const CURRENT_DIR: &str = "current";
const ITERATIONS_DIR: &str = "iterations";
const FAILED_DIR: &str = "failed";

/// Where a deposition run keeps its files, relative to a root directory:
///
/// ```text
/// <root>/status.toml
/// <root>/initial_state.toml
/// <root>/current/            in-flight engine files
/// <root>/iterations/<id>/    successful iterations
/// <root>/failed/<id>/        failed iterations
/// ```
#[derive(Debug, Clone)]
pub struct DepositionLayout {
    root: PathBuf,
}

pub fn iteration_label(id: u64) -> String {
    format!("{:03}", id)
}

impl DepositionLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn status_path(&self) -> PathBuf {
        self.root.join(STATUS_FILE)
    }

    pub fn initial_state_path(&self) -> PathBuf {
        self.root.join(INITIAL_STATE_FILE)
    }

    pub fn current_dir(&self) -> PathBuf {
        self.root.join(CURRENT_DIR)
    }

    pub fn success_dir(&self, id: u64) -> PathBuf {
        self.root.join(ITERATIONS_DIR).join(iteration_label(id))
    }

    pub fn failure_dir(&self, id: u64) -> PathBuf {
        self.root.join(FAILED_DIR).join(iteration_label(id))
    }

    /// Base path (without extension) of the engine files for one stage of
    /// one iteration, e.g. `<root>/current/relaxation007`.
    pub fn basename(&self, stage: &str, id: u64) -> PathBuf {
        self.current_dir()
            .join(format!("{}{}", stage, iteration_label(id)))
    }

    /// Snapshot from which a resumed run continues: the state archived with
    /// the last successful iteration, or the initial substrate.
    pub fn committed_state_path(&self, last_successful_iteration_id: u64) -> PathBuf {
        if last_successful_iteration_id == 0 {
            self.initial_state_path()
        } else {
            self.success_dir(last_successful_iteration_id)
                .join(STATE_FILE)
        }
    }

    pub fn create_directories(&self) -> Result<(), EngineError> {
        for dir in [
            self.current_dir(),
            self.root.join(ITERATIONS_DIR),
            self.root.join(FAILED_DIR),
        ] {
            fs::create_dir_all(&dir).map_err(|e| EngineError::io(&dir, e))?;
        }
        Ok(())
    }

    /// Empties `current/`, discarding files left by an interrupted iteration.
    pub fn reset_current(&self) -> Result<(), EngineError> {
        let current = self.current_dir();
        if current.exists() {
            fs::remove_dir_all(&current).map_err(|e| EngineError::io(&current, e))?;
        }
        fs::create_dir_all(&current).map_err(|e| EngineError::io(&current, e))
    }

    /// Moves everything in `current/` to `destination` and leaves an empty
    /// `current/` behind. An existing `destination` (from an iteration that
    /// was archived but never checkpointed) is replaced.
    pub fn archive_current(&self, destination: &Path) -> Result<(), EngineError> {
        if destination.exists() {
            fs::remove_dir_all(destination).map_err(|e| EngineError::io(destination, e))?;
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }
        let current = self.current_dir();
        fs::rename(&current, destination).map_err(|e| EngineError::io(&current, e))?;
        fs::create_dir_all(&current).map_err(|e| EngineError::io(&current, e))
    }

    /// Number of archived (successful, failed) iterations on disk.
    pub fn archived_counts(&self) -> (usize, usize) {
        let count = |dir: PathBuf| {
            fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .filter_map(Result::ok)
                        .filter(|entry| entry.path().is_dir())
                        .count()
                })
                .unwrap_or(0)
        };
        (
            count(self.root.join(ITERATIONS_DIR)),
            count(self.root.join(FAILED_DIR)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn paths_use_zero_padded_iteration_ids() {
        let layout = DepositionLayout::new("/runs/alumina");
        assert_eq!(
            layout.success_dir(7),
            PathBuf::from("/runs/alumina/iterations/007")
        );
        assert_eq!(
            layout.failure_dir(12),
            PathBuf::from("/runs/alumina/failed/012")
        );
        assert_eq!(
            layout.basename("deposition", 3),
            PathBuf::from("/runs/alumina/current/deposition003")
        );
        assert_eq!(iteration_label(1234), "1234");
    }

    #[test]
    fn committed_state_falls_back_to_initial_snapshot() {
        let layout = DepositionLayout::new("root");
        assert_eq!(
            layout.committed_state_path(0),
            PathBuf::from("root/initial_state.toml")
        );
        assert_eq!(
            layout.committed_state_path(4),
            PathBuf::from("root/iterations/004/state.toml")
        );
    }

    #[test]
    fn archive_moves_current_and_recreates_it() {
        let dir = tempdir().unwrap();
        let layout = DepositionLayout::new(dir.path());
        layout.create_directories().unwrap();
        fs::write(layout.current_dir().join("relaxation001.input"), "run 10").unwrap();

        layout.archive_current(&layout.failure_dir(1)).unwrap();

        assert!(layout.failure_dir(1).join("relaxation001.input").exists());
        assert!(layout.current_dir().is_dir());
        assert_eq!(fs::read_dir(layout.current_dir()).unwrap().count(), 0);
        assert_eq!(layout.archived_counts(), (0, 1));
    }

    #[test]
    fn archive_replaces_a_stale_destination() {
        let dir = tempdir().unwrap();
        let layout = DepositionLayout::new(dir.path());
        layout.create_directories().unwrap();
        fs::create_dir_all(layout.success_dir(2)).unwrap();
        fs::write(layout.success_dir(2).join("stale"), "").unwrap();
        fs::write(layout.current_dir().join("fresh"), "").unwrap();

        layout.archive_current(&layout.success_dir(2)).unwrap();

        assert!(layout.success_dir(2).join("fresh").exists());
        assert!(!layout.success_dir(2).join("stale").exists());
    }

    #[test]
    fn reset_current_discards_leftovers() {
        let dir = tempdir().unwrap();
        let layout = DepositionLayout::new(dir.path());
        layout.create_directories().unwrap();
        fs::write(layout.current_dir().join("partial.output"), "").unwrap();

        layout.reset_current().unwrap();
        assert_eq!(fs::read_dir(layout.current_dir()).unwrap().count(), 0);
    }
}
