//! # depokit
//!
//! An orchestration library for iterative deposition simulations: an external
//! molecular-dynamics engine repeatedly relaxes a substrate, new particles are
//! introduced above it, and each cycle is judged a success or a failure before
//! its outcome is carried forward.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture so that each concern can be
//! tested and extended in isolation.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`State`,
//!   `SimulationCell`), file formats (XYZ, LAMMPS data, state snapshots, input
//!   templates) and geometric utilities.
//!
//! - **[`engine`]: The Logic Core.** Configuration, error taxonomy, the three
//!   plugin families (MD-engine drivers, position/velocity distributions,
//!   postprocessing stages), the checkpoint record and the per-cycle
//!   `Iteration` state machine.
//!
//! - **[`workflows`]: The Public API.** The `Deposition` controller that loops
//!   iterations, archives their artifacts and decides when to stop.

pub mod core;
pub mod engine;
pub mod workflows;
