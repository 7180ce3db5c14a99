//! Triangle mesh container.

use crate::Point;
use crate::geom::transform::Transform;
use crate::geom::triangles::{Triangle, TriangleIndex};
use serde::{Deserialize, Serialize};

/// A triangle mesh defined by vertices and face indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Point>,
    pub faces: Vec<TriangleIndex>,
}

impl Mesh {
    /// Creates a new mesh with the given vertices and faces.
    pub fn new(vertices: Vec<Point>, faces: Vec<TriangleIndex>) -> Self {
        Self { vertices, faces }
    }

    /// Returns the number of faces (triangles).
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Iterates over the faces as triangles.
    ///
    /// Faces referencing missing vertices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().filter_map(|f| {
            let p0 = *self.vertices.get(f.0)?;
            let p1 = *self.vertices.get(f.1)?;
            let p2 = *self.vertices.get(f.2)?;
            Some(Triangle::new(p0, p1, p2))
        })
    }

    /// Appends another mesh, offsetting its face indices.
    pub fn append(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|f| TriangleIndex(f.0 + offset, f.1 + offset, f.2 + offset)),
        );
    }

    /// Returns a copy with every vertex mapped through `transform`.
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            vertices: self.vertices.iter().map(|p| transform.apply(*p)).collect(),
            faces: self.faces.clone(),
        }
    }

    /// Closed axis-aligned box with outward-facing triangles.
    pub fn from_box(pmin: Point, pmax: Point) -> Self {
        let (x0, y0, z0) = (pmin.x, pmin.y, pmin.z);
        let (x1, y1, z1) = (pmax.x, pmax.y, pmax.z);
        let vertices = vec![
            Point::new(x0, y0, z0),
            Point::new(x1, y0, z0),
            Point::new(x1, y1, z0),
            Point::new(x0, y1, z0),
            Point::new(x0, y0, z1),
            Point::new(x1, y0, z1),
            Point::new(x1, y1, z1),
            Point::new(x0, y1, z1),
        ];
        let quads = [
            [0, 3, 2, 1], // floor (-z)
            [4, 5, 6, 7], // roof (+z)
            [0, 1, 5, 4], // south (-y)
            [1, 2, 6, 5], // east (+x)
            [2, 3, 7, 6], // north (+y)
            [3, 0, 4, 7], // west (-x)
        ];
        let faces = quads
            .iter()
            .flat_map(|q| {
                [
                    TriangleIndex(q[0], q[1], q[2]),
                    TriangleIndex(q[0], q[2], q[3]),
                ]
            })
            .collect();
        Self { vertices, faces }
    }
}
