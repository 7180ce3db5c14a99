use serde::{Deserialize, Serialize};

use crate::geom::mesh::Mesh;
use crate::sim::insolation::InsolationVerdict;
use crate::{Point, UID};

/// Buildable stack on one footprint cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRecord {
    pub ix: usize,
    pub iy: usize,
    /// Lower-left corner of the cell.
    pub x: f64,
    pub y: f64,
    pub layers: usize,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoxelRecord {
    pub ix: usize,
    pub iy: usize,
    pub layer: usize,
    pub min: Point,
    pub max: Point,
}

/// Query point verdicts before and after growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointReport {
    pub id: UID,
    pub position: Point,
    pub protected: bool,
    pub baseline: InsolationVerdict,
    pub live: InsolationVerdict,
}

impl PointReport {
    pub fn is_degraded(&self) -> bool {
        self.live.is_worse_than(&self.baseline)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthDiagnostics {
    pub layers_built: usize,
    pub voxels_created: usize,
    pub batch_checks: usize,
    /// Points passed by the pre-filter to the exact check, summed over batches.
    pub candidate_points: usize,
    pub removed_by_rollback: usize,
    pub removed_by_floating: usize,
    pub removed_by_final_sweep: usize,
    pub removed_by_height: usize,
    /// Some rollback loop stopped at its pass cap with violations left.
    pub iteration_limit_hit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthResult {
    pub voxel_size: f64,
    pub base_z: f64,
    pub columns: Vec<ColumnRecord>,
    pub voxels: Vec<VoxelRecord>,
    /// Extruded columns merged into one mesh.
    pub mesh: Mesh,
    /// Closed footprint outline loops of the surviving columns.
    pub outline: Vec<Vec<Point>>,
    pub points: Vec<PointReport>,
    pub diagnostics: GrowthDiagnostics,
}

impl GrowthResult {
    pub fn max_height(&self) -> f64 {
        self.columns.iter().map(|c| c.height).fold(0.0, f64::max)
    }

    pub fn total_volume(&self) -> f64 {
        let footprint = self.voxel_size * self.voxel_size;
        self.columns.iter().map(|c| c.height * footprint).sum()
    }
}

/// Result of a growth run.
#[derive(Debug, Clone, PartialEq)]
pub enum GrowthOutcome {
    Completed(GrowthResult),
    /// Stopped through the cancel flag. No volume is returned.
    Cancelled,
}

impl GrowthOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GrowthOutcome::Cancelled)
    }

    pub fn completed(self) -> Option<GrowthResult> {
        match self {
            GrowthOutcome::Completed(r) => Some(r),
            GrowthOutcome::Cancelled => None,
        }
    }
}
