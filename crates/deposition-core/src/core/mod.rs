//! # Core Module
//!
//! Fundamental building blocks shared by every other layer of the library.
//!
//! - **Data models** ([`models`]) - The atomic `State` handed between stages and
//!   the periodic `SimulationCell` it lives in.
//! - **File I/O** ([`io`]) - Readers and writers for the plain-text formats the
//!   orchestrator consumes or produces.
//! - **Utilities** ([`utils`]) - Geometry helpers used by deposition and
//!   postprocessing.
//! - **Physics** ([`physics`]) - Physical constants, element masses and thermal
//!   velocity helpers.

pub mod io;
pub mod models;
pub mod physics;
pub mod utils;
