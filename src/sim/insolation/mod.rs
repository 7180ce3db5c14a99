//! Regulatory insolation evaluation.
//!
//! A point receives direct sun in a time slot when the sun is in front of it
//! and no obstacle blocks the ray toward the sun. The resulting free/blocked
//! sequence is classified by a GOST R 57795-2017 style rule in [`evaluate`].

mod evaluator;
mod query;

pub use evaluator::{InsolationNorm, InsolationVerdict, Status, evaluate, evaluate_path};
pub use query::{ParentStatus, QueryPoint, capture_baselines, evaluate_point, free_samples};

/// Minimum `normal · sun` for the sun to count as in front of a surface.
pub const FRONT_FACING_MIN_DOT: f64 = 0.01;
