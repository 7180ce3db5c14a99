//! Footprint rasterization and cell outlines.

use std::collections::{HashMap, HashSet};

use anyhow::Result;

use crate::Point;
use crate::error::InputError;
use crate::geom::footprint::Footprint;

/// Square cells covering a footprint's bounding box.
///
/// Only cells whose center lies inside the footprint are kept as columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGrid {
    pub x0: f64,
    pub y0: f64,
    pub cell_size: f64,
    pub nx: usize,
    pub ny: usize,
    /// Kept cells in row-major order.
    pub cells: Vec<(usize, usize)>,
}

impl ColumnGrid {
    pub fn rasterize(footprint: &Footprint, cell_size: f64) -> Result<Self> {
        let (xmin, ymin, xmax, ymax) = footprint.bbox();
        let nx = (((xmax - xmin) / cell_size - 1e-9).ceil() as usize).max(1);
        let ny = (((ymax - ymin) / cell_size - 1e-9).ceil() as usize).max(1);
        let mut cells = Vec::new();
        for iy in 0..ny {
            for ix in 0..nx {
                let cx = xmin + (ix as f64 + 0.5) * cell_size;
                let cy = ymin + (iy as f64 + 0.5) * cell_size;
                if footprint.contains(cx, cy) {
                    cells.push((ix, iy));
                }
            }
        }
        if cells.is_empty() {
            return Err(InputError::DegenerateFootprint(format!(
                "no {cell_size} m cell center falls inside the footprint"
            ))
            .into());
        }
        Ok(Self {
            x0: xmin,
            y0: ymin,
            cell_size,
            nx,
            ny,
            cells,
        })
    }

    /// Lower-left corner of a cell.
    pub fn cell_min(&self, ix: usize, iy: usize) -> (f64, f64) {
        (
            self.x0 + ix as f64 * self.cell_size,
            self.y0 + iy as f64 * self.cell_size,
        )
    }

    /// Closed outline loops of the union of `cells`, at elevation `z`.
    ///
    /// Every cell contributes its four edges counter-clockwise. An edge shared
    /// by two cells appears once in each direction and cancels, so only the
    /// boundary survives. Outer loops run counter-clockwise, holes clockwise.
    /// Collinear vertices are merged.
    pub fn outline(&self, cells: &[(usize, usize)], z: f64) -> Vec<Vec<Point>> {
        type Node = (usize, usize);
        let mut edges: HashSet<(Node, Node)> = HashSet::new();
        for &(ix, iy) in cells {
            let corners = [(ix, iy), (ix + 1, iy), (ix + 1, iy + 1), (ix, iy + 1)];
            for k in 0..4 {
                let e = (corners[k], corners[(k + 1) % 4]);
                if !edges.remove(&(e.1, e.0)) {
                    edges.insert(e);
                }
            }
        }

        let mut next: HashMap<Node, Vec<Node>> = HashMap::new();
        for (a, b) in &edges {
            next.entry(*a).or_default().push(*b);
        }
        // Deterministic output regardless of hash order
        let mut starts: Vec<Node> = next.keys().copied().collect();
        starts.sort_by_key(|&(x, y)| (y, x));

        let mut loops = Vec::new();
        for start in starts {
            while let Some(first) = next.get_mut(&start).and_then(|v| v.pop()) {
                let mut nodes = vec![start];
                let mut current = first;
                while current != start {
                    nodes.push(current);
                    match next.get_mut(&current).and_then(|v| v.pop()) {
                        Some(n) => current = n,
                        None => break,
                    }
                }
                let simplified = drop_collinear(&nodes);
                loops.push(
                    simplified
                        .iter()
                        .map(|&(ix, iy)| {
                            let (x, y) = self.cell_min(ix, iy);
                            Point::new(x, y, z)
                        })
                        .collect(),
                );
            }
        }
        loops
    }
}

fn drop_collinear(nodes: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let n = nodes.len();
    if n < 4 {
        return nodes.to_vec();
    }
    let as_i = |p: (usize, usize)| (p.0 as i64, p.1 as i64);
    (0..n)
        .filter(|&i| {
            let (ax, ay) = as_i(nodes[(i + n - 1) % n]);
            let (bx, by) = as_i(nodes[i]);
            let (cx, cy) = as_i(nodes[(i + 1) % n]);
            (bx - ax) * (cy - by) - (by - ay) * (cx - bx) != 0
        })
        .map(|i| nodes[i])
        .collect()
}
