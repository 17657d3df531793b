//! Geometric helpers shared by the deposition stage and postprocessing.

pub mod geometry;
