//! Input validation errors.
//!
//! These are raised before an analysis starts. They travel inside
//! `anyhow::Error`; use `err.downcast_ref::<InputError>()` to match on them.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("obstacle set is empty")]
    EmptyObstacles,
    #[error("no query points to evaluate")]
    NoQueryPoints,
    #[error("no footprint given")]
    EmptyFootprints,
    #[error("degenerate footprint: {0}")]
    DegenerateFootprint(String),
    #[error("no sun direction reaches the minimum altitude of {min_altitude_deg} deg")]
    NoSunDirections { min_altitude_deg: f64 },
    #[error("invalid date {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
