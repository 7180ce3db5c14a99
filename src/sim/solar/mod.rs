//! Sun position model and time sampling.

mod path;
mod position;

pub use path::{SunPath, SunPathConfig, SunSample};
pub use position::{GeoLocation, SolarPosition, julian_day};
