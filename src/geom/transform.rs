//! Affine world transforms for obstacle geometry.

use crate::geom::IsClose;
use crate::{Point, Vector};
use anyhow::{Result, anyhow};
use ndarray as nd;

/// Homogeneous 4x4 affine transform (column-vector convention).
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    m: nd::Array2<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            m: nd::Array::eye(4),
        }
    }

    pub fn translation(v: Vector) -> Self {
        let mut m = nd::Array::eye(4);
        m[[0, 3]] = v.dx;
        m[[1, 3]] = v.dy;
        m[[2, 3]] = v.dz;
        Self { m }
    }

    pub fn uniform_scale(s: f64) -> Self {
        let mut m: nd::Array2<f64> = nd::Array::eye(4);
        for i in 0..3 {
            m[[i, i]] = s;
        }
        Self { m }
    }

    /// Rotation by `phi` radians around the unit axis `u` through the origin.
    ///
    /// Rodrigues' formula:
    /// R = I + sin(phi) W + 2 sin^2(phi/2) W^2,
    /// where W is the cross-product matrix of `u`.
    pub fn rotation(u: &Vector, phi: f64) -> Result<Self> {
        if !u.length().is_close(1.) {
            return Err(anyhow!("Rotation axis must be a unit vector, got {u:?}"));
        }
        let w: nd::Array2<f64> =
            nd::arr2(&[[0., -u.dz, u.dy], [u.dz, 0., -u.dx], [-u.dy, u.dx, 0.]]);
        let r: nd::Array2<f64> =
            nd::Array::eye(3) + phi.sin() * &w + (2. * (phi / 2.).sin().powi(2)) * w.dot(&w);

        let mut m: nd::Array2<f64> = nd::Array::eye(4);
        m.slice_mut(nd::s![0..3, 0..3]).assign(&r);
        Ok(Self { m })
    }

    /// Rotation around the vertical axis, counter-clockwise seen from above.
    pub fn rotation_z(phi: f64) -> Self {
        let mut m: nd::Array2<f64> = nd::Array::eye(4);
        let (s, c) = phi.sin_cos();
        m[[0, 0]] = c;
        m[[0, 1]] = -s;
        m[[1, 0]] = s;
        m[[1, 1]] = c;
        Self { m }
    }

    /// Composition: the returned transform applies `self` first, then `next`.
    pub fn then(&self, next: &Transform) -> Self {
        Self {
            m: next.m.dot(&self.m),
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        let v = nd::arr1(&[p.x, p.y, p.z, 1.0]);
        let r = self.m.dot(&v);
        Point::new(r[0], r[1], r[2])
    }

    pub fn is_identity(&self) -> bool {
        self.m
            .iter()
            .zip(nd::Array2::<f64>::eye(4).iter())
            .all(|(a, b)| a.is_close(*b))
    }
}
