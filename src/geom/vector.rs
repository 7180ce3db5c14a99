use crate::Point;
use crate::geom::EPS;
use crate::geom::IsClose;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// Direction or displacement in site coordinates (+X east, +Y north, +Z up).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Vector {
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.dy * other.dz - self.dz * other.dy,
            self.dz * other.dx - self.dx * other.dz,
            self.dx * other.dy - self.dy * other.dx,
        )
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.dx * other.dx + self.dy * other.dy + self.dz * other.dz
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn is_close(&self, other: &Self) -> bool {
        self.dx.is_close(other.dx) && self.dy.is_close(other.dy) && self.dz.is_close(other.dz)
    }

    /// Unit vector with the same direction.
    pub fn normalize(&self) -> Result<Self> {
        let len = self.length();
        if len < EPS {
            bail!("zero-length vector has no direction");
        }
        Ok(*self * (1.0 / len))
    }

    /// Unit normal of the plane through three points, oriented by the
    /// right-hand rule over `pt0 -> pt1 -> pt2`.
    pub fn normal(pt0: Point, pt1: Point, pt2: Point) -> Result<Self> {
        (pt1 - pt0).cross(&(pt2 - pt0)).normalize()
    }
}

impl Add for Vector {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.dx + other.dx, self.dy + other.dy, self.dz + other.dz)
    }
}

impl Sub for Vector {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        self + -other
    }
}

impl Mul<f64> for Vector {
    type Output = Self;
    fn mul(self, k: f64) -> Self {
        Self::new(self.dx * k, self.dy * k, self.dz * k)
    }
}

impl Neg for Vector {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.dx, -self.dy, -self.dz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_east_cross_north_is_up() {
        let east = Vector::new(1., 0., 0.);
        let north = Vector::new(0., 1., 0.);
        assert_eq!(east.cross(&north), Vector::new(0., 0., 1.));
        assert_eq!(north.cross(&east), Vector::new(0., 0., -1.));
    }

    #[test]
    fn test_sun_direction_normalizes() {
        let low_sun = Vector::new(0., -3., 4.).normalize().unwrap();
        assert!(low_sun.is_close(&Vector::new(0., -0.6, 0.8)));
        assert!(Vector::default().normalize().is_err());
    }

    #[test]
    fn test_facade_normal_orientation() -> Result<()> {
        // Counter-clockwise seen from the south gives a south-facing wall.
        let n = Vector::normal(
            Point::new(0., 0., 0.),
            Point::new(1., 0., 0.),
            Point::new(0., 0., 1.),
        )?;
        assert!(n.is_close(&Vector::new(0., -1., 0.)));
        assert!(n.dot(&Vector::new(0., -1., 1.)) > 0.);
        Ok(())
    }

    #[test]
    fn test_sub_and_scale() {
        let v = Vector::new(2., 4., 6.) - Vector::new(1., 1., 1.);
        assert_eq!(v * 2., Vector::new(2., 6., 10.));
    }
}
