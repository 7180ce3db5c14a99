use crate::Vector;
use crate::geom::IsClose;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Location in site coordinates, meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_close(&self, other: &Self) -> bool {
        self.x.is_close(other.x) && self.y.is_close(other.y) && self.z.is_close(other.z)
    }

    pub fn midpoint(&self, other: &Self) -> Self {
        *self + (*other - *self) * 0.5
    }
}

impl Add<Vector> for Point {
    type Output = Point;
    fn add(self, v: Vector) -> Self {
        Self::new(self.x + v.dx, self.y + v.dy, self.z + v.dz)
    }
}

impl Sub for Point {
    type Output = Vector;
    fn sub(self, other: Point) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}
