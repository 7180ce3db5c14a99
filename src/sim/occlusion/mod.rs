//! Ray-based occlusion queries.
//!
//! Obstacles are anything implementing [`Occluder`]: the static
//! [`ObstacleScene`] snapshot, a view of it with one surface excluded, or the
//! growing voxel arena. [`OcclusionTester`] applies the self-intersection
//! guard and ray length cap on top of them.

mod grid;
mod scene;
mod tester;

pub use grid::{CellVisit, GridTraversal, Lattice};
pub use scene::{ExcludingSurface, ObstacleScene, ObstacleSurface};
pub use tester::{CastReport, OcclusionConfig, OcclusionTester, SelfIntersectionGuard};

use crate::Point;
use crate::geom::ray::Ray;

/// Closest intersection found along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Distance from the ray origin.
    pub t: f64,
    pub point: Point,
    /// Index of the hit object (surface index or voxel index).
    pub target: usize,
}

/// Geometry that can stop a ray.
pub trait Occluder {
    /// Closest hit with `t_min < t < t_max`.
    fn closest_hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<Hit>;

    fn any_hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> bool {
        self.closest_hit(ray, t_min, t_max).is_some()
    }
}
