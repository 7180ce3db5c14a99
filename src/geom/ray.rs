//! Ray casting infrastructure.
//!
//! This module provides a Ray struct and the ray-triangle and ray-box tests
//! used by the occlusion queries.

use crate::{Point, Vector};

/// Determinant threshold below which a ray is considered parallel to a triangle.
const PARALLEL_EPS: f64 = 1e-12;

/// A ray defined by an origin point and a direction vector.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray
    pub origin: Point,
    /// Unit direction vector
    pub direction: Vector,
}

impl Ray {
    /// Creates a new ray from origin point and direction vector.
    ///
    /// The direction vector is automatically normalized.
    pub fn new(origin: Point, direction: Vector) -> Option<Self> {
        let normalized = direction.normalize().ok()?;
        Some(Self {
            origin,
            direction: normalized,
        })
    }

    /// Returns the point along the ray at parameter t.
    ///
    /// point = origin + t * direction
    pub fn point_at(&self, t: f64) -> Point {
        self.origin + self.direction * t
    }

    /// Two-sided Möller–Trumbore ray/triangle intersection.
    ///
    /// Returns the ray parameter of the hit if it lies in `(t_min, t_max)`.
    pub fn intersect_triangle(
        &self,
        p0: Point,
        p1: Point,
        p2: Point,
        t_min: f64,
        t_max: f64,
    ) -> Option<f64> {
        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let pvec = self.direction.cross(&e2);
        let det = e1.dot(&pvec);
        if det.abs() < PARALLEL_EPS {
            return None; // Ray parallel to triangle plane (or degenerate triangle)
        }
        let inv_det = 1.0 / det;

        let tvec = self.origin - p0;
        let u = tvec.dot(&pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(&e1);
        let v = self.direction.dot(&qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2.dot(&qvec) * inv_det;
        if t > t_min && t < t_max { Some(t) } else { None }
    }

    /// Slab test against an axis-aligned box.
    ///
    /// Returns the `(t_enter, t_exit)` interval of the infinite line inside the box,
    /// or `None` if the line misses it or the box lies entirely behind the origin.
    pub fn intersect_aabb(&self, pmin: Point, pmax: Point) -> Option<(f64, f64)> {
        let origin = [self.origin.x, self.origin.y, self.origin.z];
        let dir = [self.direction.dx, self.direction.dy, self.direction.dz];
        let lo = [pmin.x, pmin.y, pmin.z];
        let hi = [pmax.x, pmax.y, pmax.z];

        let mut t_enter = f64::NEG_INFINITY;
        let mut t_exit = f64::INFINITY;
        for axis in 0..3 {
            if dir[axis].abs() < PARALLEL_EPS {
                if origin[axis] < lo[axis] || origin[axis] > hi[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir[axis];
            let mut t0 = (lo[axis] - origin[axis]) * inv;
            let mut t1 = (hi[axis] - origin[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }

        if t_exit < 0.0 {
            return None;
        }
        Some((t_enter, t_exit))
    }
}
