use crate::geom::IsClose;
use crate::{Point, Vector};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Type for holding vertex indices for a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriangleIndex(pub usize, pub usize, pub usize);

/// A triangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
}

impl Triangle {
    pub fn new(p0: Point, p1: Point, p2: Point) -> Self {
        Self { p0, p1, p2 }
    }

    pub fn area(&self) -> f64 {
        0.5 * (self.p1 - self.p0).cross(&(self.p2 - self.p0)).length()
    }

    /// Unit normal following the counter-clockwise vertex order.
    pub fn normal(&self) -> Result<Vector> {
        Vector::normal(self.p0, self.p1, self.p2)
    }

    pub fn centroid(&self) -> Point {
        Point::new(
            (self.p0.x + self.p1.x + self.p2.x) / 3.0,
            (self.p0.y + self.p1.y + self.p2.y) / 3.0,
            (self.p0.z + self.p1.z + self.p2.z) / 3.0,
        )
    }

    pub fn is_degenerate(&self) -> bool {
        self.area().is_close(0.)
    }

    pub fn vertices(&self) -> [Point; 3] {
        [self.p0, self.p1, self.p2]
    }

    /// Splits the triangle into 4 quadrants through its edge midpoints.
    ///
    /// All children keep the winding (and so the normal) of the parent.
    pub fn split4(&self) -> [Triangle; 4] {
        let m01 = self.p0.midpoint(&self.p1);
        let m12 = self.p1.midpoint(&self.p2);
        let m20 = self.p2.midpoint(&self.p0);
        [
            Triangle::new(self.p0, m01, m20),
            Triangle::new(m01, self.p1, m12),
            Triangle::new(m20, m12, self.p2),
            Triangle::new(m01, m12, m20),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn right_triangle() -> Triangle {
        Triangle::new(
            Point::new(0., 0., 0.),
            Point::new(2., 0., 0.),
            Point::new(0., 2., 0.),
        )
    }

    #[test]
    fn test_area_and_centroid() {
        let t = right_triangle();
        assert!((t.area() - 2.0).abs() < 1e-12);
        assert!(t.centroid().is_close(&Point::new(2. / 3., 2. / 3., 0.)));
        assert!(!t.is_degenerate());
    }

    #[test]
    fn test_normal() -> Result<()> {
        let vn = right_triangle().normal()?;
        assert!(vn.is_close(&Vector::new(0., 0., 1.)));
        let flat = Triangle::new(
            Point::new(0., 0., 0.),
            Point::new(1., 0., 0.),
            Point::new(2., 0., 0.),
        );
        assert!(flat.normal().is_err());
        assert!(flat.is_degenerate());
        Ok(())
    }

    #[test]
    fn test_split4_keeps_area_and_normal() -> Result<()> {
        let t = right_triangle();
        let children = t.split4();
        let total: f64 = children.iter().map(|c| c.area()).sum();
        assert!((total - t.area()).abs() < 1e-12);
        for c in children.iter() {
            assert!((c.area() - t.area() / 4.0).abs() < 1e-12);
            assert!(c.normal()?.is_close(&t.normal()?));
        }
        Ok(())
    }
}
