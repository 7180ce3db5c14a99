use serde::{Deserialize, Serialize};

use super::{Hit, Occluder};
use crate::geom::ray::Ray;
use crate::{Point, Vector};

/// How a ray leaving a point on a surface avoids hitting that surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "distance", rename_all = "snake_case")]
pub enum SelfIntersectionGuard {
    /// Start the ray this far along its direction.
    OriginOffset(f64),
    /// Start at the point but ignore hits closer than this.
    ///
    /// Needed when the point sits flush on a surface that must not occlude it.
    MinHitDistance(f64),
}

/// Ray casting policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcclusionConfig {
    pub guard: SelfIntersectionGuard,
    /// Hits farther than this are treated as free.
    pub max_distance: f64,
}

impl Default for OcclusionConfig {
    fn default() -> Self {
        Self::origin_offset()
    }
}

impl OcclusionConfig {
    pub fn origin_offset() -> Self {
        Self {
            guard: SelfIntersectionGuard::OriginOffset(0.15),
            max_distance: 1000.0,
        }
    }

    pub fn min_hit_distance() -> Self {
        Self {
            guard: SelfIntersectionGuard::MinHitDistance(0.5),
            max_distance: 1000.0,
        }
    }
}

/// Per-direction results of [`OcclusionTester::cast_all`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CastReport {
    pub blocked: Vec<bool>,
    pub hit_distance: Vec<Option<f64>>,
    pub hit_point: Vec<Option<Point>>,
}

impl CastReport {
    pub fn num_free(&self) -> usize {
        self.blocked.iter().filter(|b| !**b).count()
    }
}

/// Casts guarded, length-capped rays against any [`Occluder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OcclusionTester {
    pub config: OcclusionConfig,
}

impl OcclusionTester {
    pub fn new(config: OcclusionConfig) -> Self {
        Self { config }
    }

    /// Closest obstacle hit from `origin` toward `direction`.
    ///
    /// Distances are measured from `origin` whatever the guard. A zero
    /// direction never hits anything.
    pub fn cast<O>(&self, origin: Point, direction: Vector, obstacles: &O) -> Option<Hit>
    where
        O: Occluder + ?Sized,
    {
        let ray = Ray::new(origin, direction)?;
        let max = self.config.max_distance;
        match self.config.guard {
            SelfIntersectionGuard::OriginOffset(offset) => {
                if offset >= max {
                    return None;
                }
                let shifted = Ray {
                    origin: ray.point_at(offset),
                    direction: ray.direction,
                };
                obstacles
                    .closest_hit(&shifted, 0.0, max - offset)
                    .map(|hit| Hit {
                        t: hit.t + offset,
                        ..hit
                    })
            }
            SelfIntersectionGuard::MinHitDistance(min) => obstacles.closest_hit(&ray, min, max),
        }
    }

    pub fn is_blocked<O>(&self, origin: Point, direction: Vector, obstacles: &O) -> bool
    where
        O: Occluder + ?Sized,
    {
        self.cast(origin, direction, obstacles).is_some()
    }

    pub fn cast_all<O>(&self, origin: Point, directions: &[Vector], obstacles: &O) -> CastReport
    where
        O: Occluder + ?Sized,
    {
        let mut report = CastReport {
            blocked: Vec::with_capacity(directions.len()),
            hit_distance: Vec::with_capacity(directions.len()),
            hit_point: Vec::with_capacity(directions.len()),
        };
        for d in directions {
            let hit = self.cast(origin, *d, obstacles);
            report.blocked.push(hit.is_some());
            report.hit_distance.push(hit.map(|h| h.t));
            report.hit_point.push(hit.map(|h| h.point));
        }
        report
    }
}
