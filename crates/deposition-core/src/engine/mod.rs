//! # Engine Module
//!
//! The orchestration logic behind a deposition run: everything between the
//! data models in [`crate::core`] and the controller in [`crate::workflows`].
//!
//! ## Overview
//!
//! One deposition cycle relaxes the current structure in an external MD
//! engine, adds new particles above its surface, simulates their arrival and
//! judges the result. The engine module owns each of those steps and the
//! plugin families they are built from. Plugins are chosen by name from
//! static tables while the run is being configured, so every name and
//! argument list is checked before the first engine call.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - The immutable `DepositionConfig` and its builder
//! - **Drivers** ([`drivers`]) - Adapters for external MD engines (LAMMPS, GULP)
//! - **Distributions** ([`distributions`]) - Position and velocity sampling for new particles
//! - **Postprocessing** ([`postprocessing`]) - Ordered checks and normalisations of the final state
//! - **Placement** ([`placement`]) - Adding new atoms or molecules above the surface
//! - **Iteration** ([`iteration`]) - The relax, deposit, finalize state machine
//! - **Checkpoint** ([`status`], [`layout`]) - The durable run record and directory layout
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - The fatal error taxonomy of a run

pub mod config;
pub mod distributions;
pub mod drivers;
pub mod error;
pub mod iteration;
pub mod layout;
pub mod placement;
pub mod postprocessing;
pub mod progress;
pub mod registry;
pub mod status;
