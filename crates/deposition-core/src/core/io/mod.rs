//! Provides input/output functionality for the plain-text formats used by the
//! orchestrator.
//!
//! Coordinate files share the [`traits::StructureFile`] interface. The
//! remaining modules cover MD-engine input templates, LAMMPS data files and
//! the state snapshots written for checkpoint/restart.

pub mod lammps_data;
pub mod snapshot;
pub mod template;
pub mod traits;
pub mod xyz;
