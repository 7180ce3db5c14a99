use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::FRONT_FACING_MIN_DOT;
use super::evaluator::{InsolationNorm, InsolationVerdict, evaluate_path};
use crate::sim::occlusion::{Occluder, OcclusionTester};
use crate::sim::solar::SunPath;
use crate::{Point, UID, Vector};

/// Status of the building a query point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentStatus {
    /// Built; its insolation is protected.
    #[default]
    Existing,
    /// Proposed; it may be shaded by new volume.
    Planned,
}

/// Point on a facade or on the ground whose insolation is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    pub id: UID,
    pub position: Point,
    /// Outward unit normal.
    pub normal: Vector,
    /// Surface the point was sampled from.
    pub surface: UID,
    pub parent: ParentStatus,
    /// Verdict before any candidate volume exists.
    pub baseline: Option<InsolationVerdict>,
}

impl QueryPoint {
    pub fn new(position: Point, normal: Vector, surface: UID) -> Self {
        Self {
            id: UID::new(),
            position,
            normal,
            surface,
            parent: ParentStatus::Existing,
            baseline: None,
        }
    }

    pub fn with_parent(mut self, parent: ParentStatus) -> Self {
        self.parent = parent;
        self
    }

    pub fn is_protected(&self) -> bool {
        self.parent == ParentStatus::Existing
    }

    /// True if the sun direction lies in front of the point.
    pub fn faces(&self, direction: &Vector) -> bool {
        self.normal.dot(direction) > FRONT_FACING_MIN_DOT
    }
}

/// One flag per sample of `sun`: sun in front of the point and not blocked.
pub fn free_samples<O>(
    point: &QueryPoint,
    obstacles: &O,
    sun: &SunPath,
    tester: &OcclusionTester,
) -> Vec<bool>
where
    O: Occluder + ?Sized,
{
    sun.samples()
        .iter()
        .map(|s| {
            point.faces(&s.direction) && !tester.is_blocked(point.position, s.direction, obstacles)
        })
        .collect()
}

/// Live verdict of `point` against `obstacles`.
pub fn evaluate_point<O>(
    point: &QueryPoint,
    obstacles: &O,
    sun: &SunPath,
    tester: &OcclusionTester,
    norm: &InsolationNorm,
) -> InsolationVerdict
where
    O: Occluder + ?Sized,
{
    let free = free_samples(point, obstacles, sun, tester);
    evaluate_path(sun, &free, norm)
}

/// Stores the current verdict of every point as its baseline.
pub fn capture_baselines<O>(
    points: &mut [QueryPoint],
    obstacles: &O,
    sun: &SunPath,
    tester: &OcclusionTester,
    norm: &InsolationNorm,
) where
    O: Occluder + Sync + ?Sized,
{
    points.par_iter_mut().for_each(|p| {
        p.baseline = Some(evaluate_point(p, obstacles, sun, tester, norm));
    });
    debug!("Captured baselines for {} query points", points.len());
}
