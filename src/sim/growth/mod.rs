//! Insolation-constrained volumetric growth.
//!
//! [`PotentialGrowth`] stacks voxels over a footprint and rolls back the ones
//! that would worsen the insolation of protected query points.

mod config;
mod engine;
mod raster;
mod result;
mod voxel;

pub use config::GrowthConfig;
pub use engine::PotentialGrowth;
pub use raster::ColumnGrid;
pub use result::{
    ColumnRecord, GrowthDiagnostics, GrowthOutcome, GrowthResult, PointReport, VoxelRecord,
};
pub use voxel::{Column, Voxel, VoxelArena};
