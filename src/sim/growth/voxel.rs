//! Voxel arena with tombstoned removal.
//!
//! Voxels are never deleted during a run. Removal flips an atomic flag so
//! indices held by ray hits and per-column stacks stay valid, and so a voxel
//! can only be removed once even when several evaluations race for it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::raster::ColumnGrid;
use crate::Point;
use crate::geom::bboxes::union_bboxes;
use crate::geom::ray::Ray;
use crate::sim::occlusion::{Hit, Lattice, Occluder};

/// Zero-length cell visits (a ray grazing an edge or corner) are not hits.
const MIN_CHORD: f64 = 1e-9;

#[derive(Debug)]
pub struct Voxel {
    pub column: usize,
    pub layer: usize,
    removed: AtomicBool,
}

impl Voxel {
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }
}

/// Column footprint cell and its voxel stack, bottom first.
#[derive(Debug, Clone)]
pub struct Column {
    pub ix: usize,
    pub iy: usize,
    pub stack: Vec<usize>,
    /// False once the column lost a voxel; it receives no more layers.
    pub growing: bool,
}

pub struct VoxelArena {
    grid: ColumnGrid,
    lattice: Lattice,
    columns: Vec<Column>,
    voxels: Vec<Voxel>,
    by_cell: HashMap<[usize; 3], usize>,
}

impl VoxelArena {
    pub fn new(grid: ColumnGrid, base_z: f64, num_layers: usize) -> Self {
        let lattice = Lattice {
            origin: Point::new(grid.x0, grid.y0, base_z),
            cell_size: grid.cell_size,
            dims: [grid.nx, grid.ny, num_layers.max(1)],
        };
        let columns = grid
            .cells
            .iter()
            .map(|&(ix, iy)| Column {
                ix,
                iy,
                stack: Vec::new(),
                growing: true,
            })
            .collect();
        Self {
            grid,
            lattice,
            columns,
            voxels: Vec::new(),
            by_cell: HashMap::new(),
        }
    }

    pub fn grid(&self) -> &ColumnGrid {
        &self.grid
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn voxel(&self, idx: usize) -> Option<&Voxel> {
        self.voxels.get(idx)
    }

    pub fn num_voxels(&self) -> usize {
        self.voxels.len()
    }

    pub fn num_active(&self) -> usize {
        self.voxels.iter().filter(|v| !v.is_removed()).count()
    }

    pub fn num_growing(&self) -> usize {
        self.columns.iter().filter(|c| c.growing).count()
    }

    /// Adds a voxel at `layer` on top of every growing column.
    ///
    /// Returns the indices of the new voxels.
    pub fn add_layer(&mut self, layer: usize) -> Vec<usize> {
        let mut added = Vec::new();
        if layer >= self.lattice.dims[2] {
            return added;
        }
        for (c, column) in self.columns.iter_mut().enumerate() {
            if !column.growing {
                continue;
            }
            let idx = self.voxels.len();
            self.voxels.push(Voxel {
                column: c,
                layer,
                removed: AtomicBool::new(false),
            });
            column.stack.push(idx);
            self.by_cell.insert([column.ix, column.iy, layer], idx);
            added.push(idx);
        }
        added
    }

    /// Marks a voxel removed. Returns false if it already was.
    pub fn remove(&self, idx: usize) -> bool {
        self.voxels.get(idx).is_some_and(|v| {
            v.removed
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        })
    }

    pub fn bounds(&self, idx: usize) -> Option<(Point, Point)> {
        let v = self.voxels.get(idx)?;
        let column = &self.columns[v.column];
        Some(self.cell_bounds(column.ix, column.iy, v.layer))
    }

    fn cell_bounds(&self, ix: usize, iy: usize, layer: usize) -> (Point, Point) {
        let s = self.lattice.cell_size;
        let (x, y) = self.grid.cell_min(ix, iy);
        let z = self.lattice.origin.z + layer as f64 * s;
        (Point::new(x, y, z), Point::new(x + s, y + s, z + s))
    }

    /// Bounding box of the given voxels.
    pub fn bbox_of(&self, voxels: &[usize]) -> Option<(Point, Point)> {
        voxels
            .iter()
            .filter_map(|&i| self.bounds(i))
            .reduce(union_bboxes)
    }

    /// Removes every voxel above the first gap of each column and stops
    /// those columns from growing.
    ///
    /// Returns the number of voxels removed here.
    pub fn remove_floating(&mut self) -> usize {
        let mut removed = 0;
        for c in 0..self.columns.len() {
            let stack = &self.columns[c].stack;
            let Some(gap) = stack.iter().position(|&i| self.voxels[i].is_removed()) else {
                continue;
            };
            for &i in &stack[gap + 1..] {
                if self.remove(i) {
                    removed += 1;
                }
            }
            self.columns[c].growing = false;
        }
        removed
    }

    /// Number of contiguous surviving voxels from the ground.
    pub fn column_layers(&self, column: usize) -> usize {
        self.columns[column]
            .stack
            .iter()
            .take_while(|&&i| !self.voxels[i].is_removed())
            .count()
    }

    /// Removes the whole stack of a column.
    pub fn clear_column(&mut self, column: usize) -> usize {
        self.columns[column].growing = false;
        let mut removed = 0;
        for &i in &self.columns[column].stack {
            if self.remove(i) {
                removed += 1;
            }
        }
        removed
    }
}

impl Occluder for VoxelArena {
    fn closest_hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<Hit> {
        for visit in self.lattice.traverse(ray, t_min, t_max) {
            if visit.t_exit - visit.t_enter <= MIN_CHORD {
                continue;
            }
            let Some(&idx) = self.by_cell.get(&visit.cell) else {
                continue;
            };
            if self.voxels[idx].is_removed() {
                continue;
            }
            return Some(Hit {
                t: visit.t_enter,
                point: ray.point_at(visit.t_enter),
                target: idx,
            });
        }
        None
    }
}
