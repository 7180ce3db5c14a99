use std::collections::HashMap;

use crate::Point;
use crate::geom::bboxes::expand_bbox;
use crate::geom::ray::Ray;

/// Regular lattice of cubic cells anchored at `origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    pub origin: Point,
    pub cell_size: f64,
    pub dims: [usize; 3],
}

impl Lattice {
    pub fn max_corner(&self) -> Point {
        Point::new(
            self.origin.x + self.dims[0] as f64 * self.cell_size,
            self.origin.y + self.dims[1] as f64 * self.cell_size,
            self.origin.z + self.dims[2] as f64 * self.cell_size,
        )
    }

    /// Cell containing `p`, clamped to the lattice.
    pub fn cell_of(&self, p: Point) -> [usize; 3] {
        let rel = [
            p.x - self.origin.x,
            p.y - self.origin.y,
            p.z - self.origin.z,
        ];
        let mut cell = [0; 3];
        for axis in 0..3 {
            let c = (rel[axis] / self.cell_size).floor();
            cell[axis] = c.clamp(0.0, (self.dims[axis] - 1) as f64) as usize;
        }
        cell
    }

    /// Cells along `ray` within `(t_min, t_max)`, in traversal order.
    pub fn traverse(&self, ray: &Ray, t_min: f64, t_max: f64) -> GridTraversal {
        GridTraversal::new(self, ray, t_min, t_max)
    }
}

/// One cell visited by a ray and the ray interval inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellVisit {
    pub cell: [usize; 3],
    pub t_enter: f64,
    pub t_exit: f64,
}

/// 3D-DDA walk (Amanatides & Woo) through a [`Lattice`].
pub struct GridTraversal {
    dims: [usize; 3],
    cell: [i64; 3],
    step: [i64; 3],
    t_next: [f64; 3],
    t_delta: [f64; 3],
    t_current: f64,
    t_end: f64,
    done: bool,
}

impl GridTraversal {
    fn new(lattice: &Lattice, ray: &Ray, t_min: f64, t_max: f64) -> Self {
        let mut walk = Self {
            dims: lattice.dims,
            cell: [0; 3],
            step: [0; 3],
            t_next: [f64::INFINITY; 3],
            t_delta: [f64::INFINITY; 3],
            t_current: 0.0,
            t_end: 0.0,
            done: true,
        };
        if lattice.dims.contains(&0) {
            return walk;
        }
        let Some((t_enter, t_exit)) = ray.intersect_aabb(lattice.origin, lattice.max_corner())
        else {
            return walk;
        };
        let t0 = t_enter.max(t_min).max(0.0);
        let t1 = t_exit.min(t_max);
        if t0 > t1 {
            return walk;
        }

        let start = lattice.cell_of(ray.point_at(t0));
        let origin = [ray.origin.x, ray.origin.y, ray.origin.z];
        let dir = [ray.direction.dx, ray.direction.dy, ray.direction.dz];
        let lo = [lattice.origin.x, lattice.origin.y, lattice.origin.z];

        for axis in 0..3 {
            walk.cell[axis] = start[axis] as i64;
            if dir[axis] > 0.0 {
                walk.step[axis] = 1;
                let boundary = lo[axis] + (start[axis] + 1) as f64 * lattice.cell_size;
                walk.t_next[axis] = (boundary - origin[axis]) / dir[axis];
                walk.t_delta[axis] = lattice.cell_size / dir[axis];
            } else if dir[axis] < 0.0 {
                walk.step[axis] = -1;
                let boundary = lo[axis] + start[axis] as f64 * lattice.cell_size;
                walk.t_next[axis] = (boundary - origin[axis]) / dir[axis];
                walk.t_delta[axis] = -lattice.cell_size / dir[axis];
            }
        }
        walk.t_current = t0;
        walk.t_end = t1;
        walk.done = false;
        walk
    }
}

impl Iterator for GridTraversal {
    type Item = CellVisit;

    fn next(&mut self) -> Option<CellVisit> {
        if self.done {
            return None;
        }
        let axis = (0..3)
            .min_by(|&a, &b| self.t_next[a].total_cmp(&self.t_next[b]))
            .unwrap_or(0);
        let t_exit = self.t_next[axis].min(self.t_end);
        let visit = CellVisit {
            cell: [
                self.cell[0] as usize,
                self.cell[1] as usize,
                self.cell[2] as usize,
            ],
            t_enter: self.t_current,
            t_exit,
        };

        if self.t_next[axis] >= self.t_end {
            self.done = true;
        } else {
            self.cell[axis] += self.step[axis];
            self.t_current = self.t_next[axis];
            self.t_next[axis] += self.t_delta[axis];
            if self.cell[axis] < 0 || self.cell[axis] >= self.dims[axis] as i64 {
                self.done = true;
            }
        }
        Some(visit)
    }
}

/// Sparse uniform grid of item indices, keyed by lattice cell.
pub(crate) struct UniformGrid {
    pub lattice: Lattice,
    cells: HashMap<[usize; 3], Vec<usize>>,
}

impl UniformGrid {
    /// Indexes items by their bounding boxes.
    ///
    /// The cell size is picked so that the longest scene extent spans about
    /// `2 * cbrt(n)` cells (between 1 and 128).
    pub fn new(bboxes: &[(Point, Point)], scene_min: Point, scene_max: Point) -> Self {
        // Padding keeps rays that touch the scene boundary inside the lattice
        let (scene_min, scene_max) = expand_bbox(scene_min, scene_max, 1e-3);
        let extent = [
            scene_max.x - scene_min.x,
            scene_max.y - scene_min.y,
            scene_max.z - scene_min.z,
        ];
        let longest = extent.iter().cloned().fold(0.0_f64, f64::max).max(1e-3);
        let per_axis = (2.0 * (bboxes.len().max(1) as f64).cbrt()).clamp(1.0, 128.0);
        let cell_size = (longest / per_axis).max(1e-3);
        let mut dims = [1; 3];
        for axis in 0..3 {
            dims[axis] = ((extent[axis] / cell_size).ceil() as usize).max(1);
        }
        let lattice = Lattice {
            origin: scene_min,
            cell_size,
            dims,
        };

        let mut cells: HashMap<[usize; 3], Vec<usize>> = HashMap::new();
        for (idx, (pmin, pmax)) in bboxes.iter().enumerate() {
            let c0 = lattice.cell_of(*pmin);
            let c1 = lattice.cell_of(*pmax);
            for i in c0[0]..=c1[0] {
                for j in c0[1]..=c1[1] {
                    for k in c0[2]..=c1[2] {
                        cells.entry([i, j, k]).or_default().push(idx);
                    }
                }
            }
        }

        Self { lattice, cells }
    }

    pub fn items_in(&self, cell: &[usize; 3]) -> &[usize] {
        self.cells.get(cell).map(|v| v.as_slice()).unwrap_or(&[])
    }
}
