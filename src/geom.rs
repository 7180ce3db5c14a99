pub mod bboxes;
pub mod footprint;
pub mod mesh;
pub mod point;
pub mod ray;
pub mod transform;
pub mod triangles;
pub mod vector;

/// Geometric precision
pub const EPS: f64 = 1e-10;

/// Approximate equality for floating point scalars.
pub trait IsClose {
    fn is_close(&self, other: f64) -> bool;
}

impl IsClose for f64 {
    fn is_close(&self, other: f64) -> bool {
        (self - other).abs() < EPS
    }
}
