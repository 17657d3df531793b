//! Data models describing the simulated system.
//!
//! A [`state::State`] is the unit of exchange between the controller, the
//! MD-engine drivers and the postprocessing pipeline. A [`cell::SimulationCell`]
//! is the immutable periodic box the state is simulated in.

pub mod cell;
pub mod state;
