//! # Workflows Module
//!
//! High-level entry points that drive a complete deposition run.
//!
//! ## Overview
//!
//! A workflow owns the canonical structure and the checkpoint record for one
//! working directory. It resolves every plugin up front, resumes from an
//! existing checkpoint when there is one, and loops iterations until a stop
//! condition is reached, archiving each iteration's files as it goes.
//!
//! - **Deposition Workflow** ([`deposit`]) - The iterative relax, deposit and
//!   finalize loop with checkpoint/restart.

pub mod deposit;
