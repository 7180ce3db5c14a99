use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::sim::occlusion::{OcclusionConfig, SelfIntersectionGuard};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Voxel edge length [m].
    pub voxel_size: f64,
    /// Columns that end up lower than this are dropped [m].
    pub min_height: f64,
    /// Growth stops at this height above `base_z` [m].
    pub max_height: f64,
    /// Elevation of the footprint plane.
    pub base_z: f64,
    /// Layers added between two impact checks.
    pub batch_layers: usize,
    /// Rollback passes allowed per impact check.
    pub batch_iterations: usize,
    /// Rollback passes allowed in the final validation.
    pub final_iterations: usize,
    /// Test order of the impact pre-filter: every n-th sun direction is tried
    /// before the rest. Only affects speed, never the candidate set.
    pub sparse_ray_stride: usize,
    /// Query points against the static obstacles.
    pub point_occlusion: OcclusionConfig,
    /// Query points against the voxels.
    pub voxel_occlusion: OcclusionConfig,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            voxel_size: 3.0,
            min_height: 0.0,
            max_height: 75.0,
            base_z: 0.0,
            batch_layers: 3,
            batch_iterations: 30,
            final_iterations: 100,
            sparse_ray_stride: 4,
            point_occlusion: OcclusionConfig::min_hit_distance(),
            voxel_occlusion: OcclusionConfig {
                guard: SelfIntersectionGuard::OriginOffset(0.15),
                max_distance: 500.0,
            },
        }
    }
}

impl GrowthConfig {
    /// Number of layers that fit under `max_height`.
    pub fn num_layers(&self) -> usize {
        (self.max_height / self.voxel_size + 1e-9).floor().max(0.0) as usize
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.voxel_size > 0.0) {
            return Err(InputError::InvalidConfig("voxel_size must be positive".into()).into());
        }
        if self.num_layers() == 0 {
            return Err(InputError::InvalidConfig(format!(
                "max_height {} is below one voxel of {}",
                self.max_height, self.voxel_size
            ))
            .into());
        }
        if self.min_height < 0.0 || self.min_height > self.max_height {
            return Err(InputError::InvalidConfig(
                "min_height must lie between 0 and max_height".into(),
            )
            .into());
        }
        if self.batch_layers == 0 || self.sparse_ray_stride == 0 {
            return Err(InputError::InvalidConfig(
                "batch_layers and sparse_ray_stride must be at least 1".into(),
            )
            .into());
        }
        for occlusion in [&self.point_occlusion, &self.voxel_occlusion] {
            if !(occlusion.max_distance > 0.0) {
                return Err(
                    InputError::InvalidConfig("ray max_distance must be positive".into()).into(),
                );
            }
        }
        Ok(())
    }
}
