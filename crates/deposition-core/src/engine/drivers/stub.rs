//! An in-process driver for tests: the "engine" returns its input unchanged.

use super::{Driver, DriverError, SimulationStage, with_extension, write_file};
use crate::core::models::state::State;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub(crate) struct EchoDriver {
    fail_when: Box<dyn Fn(&Path) -> bool>,
    written: RefCell<HashMap<PathBuf, State>>,
    pub(crate) executed: RefCell<Vec<PathBuf>>,
}

impl EchoDriver {
    pub(crate) fn succeeding() -> Self {
        Self::failing_when(|_| false)
    }

    pub(crate) fn failing() -> Self {
        Self::failing_when(|_| true)
    }

    /// Fails the engine call for every basename matching `predicate`.
    pub(crate) fn failing_when(predicate: impl Fn(&Path) -> bool + 'static) -> Self {
        Self {
            fail_when: Box::new(predicate),
            written: RefCell::new(HashMap::new()),
            executed: RefCell::new(Vec::new()),
        }
    }
}

impl Driver for EchoDriver {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn write_inputs(
        &self,
        basename: &Path,
        state: &State,
        stage: SimulationStage,
    ) -> Result<(), DriverError> {
        write_file(
            &with_extension(basename, "input"),
            &format!("{} {}\n", stage, state.len()),
        )?;
        self.written
            .borrow_mut()
            .insert(basename.to_path_buf(), state.clone());
        Ok(())
    }

    fn execute(&self, basename: &Path) -> Result<(), DriverError> {
        self.executed.borrow_mut().push(basename.to_path_buf());
        if (self.fail_when)(basename) {
            return Err(DriverError::ExitStatus {
                command: "echo".to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }

    fn read_outputs(&self, basename: &Path) -> Result<State, DriverError> {
        self.written
            .borrow()
            .get(basename)
            .cloned()
            .ok_or_else(|| DriverError::output(basename, "no output written"))
    }

    fn velocity_scaling(&self) -> f64 {
        1.0
    }
}
