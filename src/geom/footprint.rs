//! Planar site footprints.
//!
//! A footprint is a closed simple polygon in the XY plane of the scene.
//! The z coordinate of input points is ignored.

use crate::Point;
use crate::error::InputError;
use crate::geom::EPS;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pts: Vec<(f64, f64)>,
}

impl Footprint {
    /// Creates a footprint from an ordered vertex list.
    ///
    /// A repeated closing vertex is dropped. Fails with
    /// [`InputError::DegenerateFootprint`] for fewer than 3 vertices,
    /// non-finite coordinates, zero area, or self-intersecting edges.
    pub fn new(pts: &[Point]) -> Result<Self> {
        let mut xy: Vec<(f64, f64)> = pts.iter().map(|p| (p.x, p.y)).collect();
        if xy.len() > 1 {
            let (first, last) = (xy[0], xy[xy.len() - 1]);
            if (first.0 - last.0).abs() < EPS && (first.1 - last.1).abs() < EPS {
                xy.pop();
            }
        }
        if xy.len() < 3 {
            return Err(InputError::DegenerateFootprint(format!(
                "{} vertices, at least 3 required",
                xy.len()
            ))
            .into());
        }
        if xy.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(InputError::DegenerateFootprint("non-finite coordinate".into()).into());
        }

        let fp = Self { pts: xy };
        if fp.area() < EPS {
            return Err(InputError::DegenerateFootprint("zero area".into()).into());
        }
        if !fp.is_simple() {
            return Err(InputError::DegenerateFootprint("self-intersecting edges".into()).into());
        }
        Ok(fp)
    }

    /// Axis-aligned rectangle `[x0, x1] x [y0, y1]`.
    pub fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self> {
        Self::new(&[
            Point::new(x0, y0, 0.),
            Point::new(x1, y0, 0.),
            Point::new(x1, y1, 0.),
            Point::new(x0, y1, 0.),
        ])
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.pts
    }

    /// Iterates over the closed edge loop.
    pub fn edges(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        let n = self.pts.len();
        (0..n).map(move |i| (self.pts[i], self.pts[(i + 1) % n]))
    }

    /// Shoelace area (positive for counter-clockwise order).
    pub fn signed_area(&self) -> f64 {
        0.5 * self
            .edges()
            .map(|((x0, y0), (x1, y1))| x0 * y1 - x1 * y0)
            .sum::<f64>()
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Returns `(xmin, ymin, xmax, ymax)`.
    pub fn bbox(&self) -> (f64, f64, f64, f64) {
        self.pts.iter().fold(
            (
                f64::INFINITY,
                f64::INFINITY,
                f64::NEG_INFINITY,
                f64::NEG_INFINITY,
            ),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }

    /// Point-in-polygon test by edge-crossing parity.
    ///
    /// Points exactly on an edge may be classified either way.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let mut inside = false;
        for ((xi, yi), (xj, yj)) in self.edges() {
            if (yi > y) != (yj > y) {
                let x_cross = xi + (y - yi) * (xj - xi) / (yj - yi);
                if x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Checks that no two non-adjacent edges intersect.
    fn is_simple(&self) -> bool {
        let edges: Vec<_> = self.edges().collect();
        let n = edges.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                if adjacent {
                    continue;
                }
                if segments_intersect(edges[i].0, edges[i].1, edges[j].0, edges[j].1) {
                    return false;
                }
            }
        }
        true
    }
}

fn orientation(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    p.0 >= a.0.min(b.0) - EPS
        && p.0 <= a.0.max(b.0) + EPS
        && p.1 >= a.1.min(b.1) - EPS
        && p.1 <= a.1.max(b.1) + EPS
}

fn segments_intersect(p1: (f64, f64), p2: (f64, f64), p3: (f64, f64), p4: (f64, f64)) -> bool {
    let d1 = orientation(p3, p4, p1);
    let d2 = orientation(p3, p4, p2);
    let d3 = orientation(p1, p2, p3);
    let d4 = orientation(p1, p2, p4);

    if ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
        && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
    {
        return true;
    }
    (d1.abs() <= EPS && on_segment(p3, p4, p1))
        || (d2.abs() <= EPS && on_segment(p3, p4, p2))
        || (d3.abs() <= EPS && on_segment(p1, p2, p3))
        || (d4.abs() <= EPS && on_segment(p1, p2, p4))
}
