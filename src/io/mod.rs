//! Export of analysis results.

pub mod json;

pub use json::{
    read_growth_result, save_face_verdicts, save_growth_result, save_sun_hours,
    write_face_verdicts, write_growth_result, write_sun_hours,
};
