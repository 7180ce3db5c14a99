//! Sun-hours heat maps on obstacle surfaces and open ground.
//!
//! Surfaces are split into sub-faces of bounded area, the ground around the
//! selected footprints is covered by a regular grid, and every face counts the
//! sun samples that reach its centroid.

mod faces;
mod sun_hours;

pub use faces::{sample_all_surfaces, sample_ground, sample_surfaces};
pub use sun_hours::{
    FaceVerdict, SunHoursRecord, evaluate_faces_insolation, evaluate_sun_hours,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::sim::insolation::QueryPoint;
use crate::sim::occlusion::{ObstacleScene, OcclusionConfig};
use crate::{Point, UID, Vector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Subdivision stops once a sub-face is at most this large [m^2].
    pub target_face_area: f64,
    pub max_depth: usize,
    /// Total number of surface faces produced.
    pub max_faces: usize,
    /// Area of one ground cell [m^2].
    pub ground_target_area: f64,
    /// Margin around the footprints covered by the ground grid [m].
    pub ground_buffer: f64,
    pub max_ground_cells: usize,
    /// Elevation of the ground plane.
    pub ground_z: f64,
    /// Faces with a lower normal z are undersides and skipped.
    pub min_normal_z: f64,
    pub occlusion: OcclusionConfig,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            target_face_area: 4.0,
            max_depth: 4,
            max_faces: 5000,
            ground_target_area: 4.0,
            ground_buffer: 20.0,
            max_ground_cells: 2500,
            ground_z: 0.0,
            min_normal_z: -0.3,
            occlusion: OcclusionConfig::origin_offset(),
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("target_face_area", self.target_face_area),
            ("ground_target_area", self.ground_target_area),
            ("occlusion.max_distance", self.occlusion.max_distance),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(InputError::InvalidConfig(format!(
                    "{name} must be positive and finite"
                ))
                .into());
            }
        }
        if !(self.ground_buffer >= 0.0 && self.ground_buffer.is_finite()) {
            return Err(InputError::InvalidConfig(
                "ground_buffer must be finite and not negative".into(),
            )
            .into());
        }
        if self.max_faces == 0 || self.max_ground_cells == 0 {
            return Err(InputError::InvalidConfig("face caps must be at least 1".into()).into());
        }
        Ok(())
    }
}

/// Where a sample face comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceSource {
    /// Index of the obstacle surface in the scene.
    Surface(usize),
    /// Cell of the ground grid (row along y, column along x).
    Ground { row: usize, col: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFace {
    pub source: FaceSource,
    pub vertices: Vec<Point>,
    pub centroid: Point,
    /// Outward unit normal.
    pub normal: Vector,
    pub area: f64,
}

impl SampleFace {
    /// Query point at the face centroid.
    ///
    /// Ground faces belong to `ground`, surface faces to their obstacle.
    pub fn to_query_point(&self, scene: &ObstacleScene, ground: &UID) -> QueryPoint {
        let surface = match self.source {
            FaceSource::Surface(idx) => scene.surface_uid(idx).cloned().unwrap_or_default(),
            FaceSource::Ground { .. } => ground.clone(),
        };
        QueryPoint::new(self.centroid, self.normal, surface)
    }
}
