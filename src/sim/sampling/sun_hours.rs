use anyhow::Result;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{FaceSource, SampleFace, SamplingConfig};
use crate::error::InputError;
use crate::sim::insolation::{
    FRONT_FACING_MIN_DOT, InsolationNorm, InsolationVerdict, evaluate_path,
};
use crate::{Point, Vector};
use crate::sim::occlusion::{ObstacleScene, OcclusionTester};
use crate::sim::solar::SunPath;

/// Sun exposure of one sample face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunHoursRecord {
    /// Index into the evaluated face list.
    pub face: usize,
    pub source: FaceSource,
    pub centroid: Point,
    /// Number of sun samples reaching the face.
    pub sun_hours: usize,
    /// `sun_hours` converted to hours with the path time step.
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceVerdict {
    pub face: usize,
    pub source: FaceSource,
    pub centroid: Point,
    pub verdict: InsolationVerdict,
}

fn check_inputs(scene: &ObstacleScene, sun: &SunPath, config: &SamplingConfig) -> Result<()> {
    config.validate()?;
    if scene.is_empty() {
        return Err(InputError::EmptyObstacles.into());
    }
    if sun.is_empty() {
        return Err(InputError::NoSunDirections {
            min_altitude_deg: sun.min_altitude_deg(),
        }
        .into());
    }
    Ok(())
}

/// Free flag per sun sample for the centroid of `face`.
///
/// A surface face never occludes itself: its own surface is excluded.
fn face_free_samples(
    face: &SampleFace,
    scene: &ObstacleScene,
    sun: &SunPath,
    tester: &OcclusionTester,
) -> Vec<bool> {
    let front = |d: &Vector| face.normal.dot(d) > FRONT_FACING_MIN_DOT;
    match face.source {
        FaceSource::Surface(idx) => {
            let others = scene.excluding(idx);
            sun.samples()
                .iter()
                .map(|s| {
                    front(&s.direction) && !tester.is_blocked(face.centroid, s.direction, &others)
                })
                .collect()
        }
        FaceSource::Ground { .. } => sun
            .samples()
            .iter()
            .map(|s| front(&s.direction) && !tester.is_blocked(face.centroid, s.direction, scene))
            .collect(),
    }
}

/// Counts, for every face, the sun samples in front of it that no other
/// obstacle blocks.
pub fn evaluate_sun_hours(
    faces: &[SampleFace],
    scene: &ObstacleScene,
    sun: &SunPath,
    config: &SamplingConfig,
) -> Result<Vec<SunHoursRecord>> {
    check_inputs(scene, sun, config)?;
    let tester = OcclusionTester::new(config.occlusion);
    let step_hours = sun.time_step_minutes() / 60.0;

    let records: Vec<SunHoursRecord> = faces
        .par_iter()
        .enumerate()
        .map(|(i, face)| {
            let count = face_free_samples(face, scene, sun, &tester)
                .iter()
                .filter(|f| **f)
                .count();
            SunHoursRecord {
                face: i,
                source: face.source,
                centroid: face.centroid,
                sun_hours: count,
                hours: count as f64 * step_hours,
            }
        })
        .collect();

    info!(
        "Sun hours evaluated for {} faces with {} sun samples",
        records.len(),
        sun.len()
    );
    Ok(records)
}

/// Insolation verdict of every face centroid.
pub fn evaluate_faces_insolation(
    faces: &[SampleFace],
    scene: &ObstacleScene,
    sun: &SunPath,
    config: &SamplingConfig,
    norm: &InsolationNorm,
) -> Result<Vec<FaceVerdict>> {
    check_inputs(scene, sun, config)?;
    let tester = OcclusionTester::new(config.occlusion);

    Ok(faces
        .par_iter()
        .enumerate()
        .map(|(i, face)| FaceVerdict {
            face: i,
            source: face.source,
            centroid: face.centroid,
            verdict: evaluate_path(sun, &face_free_samples(face, scene, sun, &tester), norm),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::footprint::Footprint;
    use crate::sim::insolation::Status;
    use crate::sim::occlusion::{ObstacleSurface, OcclusionConfig};
    use crate::sim::sampling::{sample_all_surfaces, sample_ground};

    fn overhead_and_west() -> Result<SunPath> {
        SunPath::from_directions(
            &[
                Vector::new(0., 0., 1.),
                Vector::new(-1., 0., 1.),
                Vector::new(-1., 0., 0.2),
            ],
            60.0,
        )
    }

    #[test]
    fn test_roof_sees_all_samples_side_walls_some() -> Result<()> {
        let scene = ObstacleScene::new(&[ObstacleSurface::from_box(
            "block",
            Point::new(0., 0., 0.),
            Point::new(4., 4., 4.),
        )]);
        let sun = overhead_and_west()?;
        let faces = sample_all_surfaces(&scene, &SamplingConfig::default());
        let records = evaluate_sun_hours(&faces, &scene, &sun, &SamplingConfig::default())?;
        assert_eq!(records.len(), faces.len());
        for (r, f) in records.iter().zip(&faces) {
            assert!(r.sun_hours <= sun.len());
            if f.normal.dz > 0.99 {
                assert_eq!(r.sun_hours, 3);
                assert_eq!(r.hours, 3.0);
            } else if f.normal.dx < -0.99 {
                assert_eq!(r.sun_hours, 2);
            } else if f.normal.dx > 0.99 {
                assert_eq!(r.sun_hours, 0);
            }
        }
        Ok(())
    }

    #[test]
    fn test_ground_shaded_behind_block() -> Result<()> {
        let scene = ObstacleScene::new(&[ObstacleSurface::from_box(
            "block",
            Point::new(0., 0., 0.),
            Point::new(10., 10., 30.),
        )]);
        let sun = SunPath::from_directions(&[Vector::new(-1., 0., 1.)], 60.0)?;
        let config = SamplingConfig {
            ground_buffer: 10.0,
            ground_target_area: 4.0,
            ..Default::default()
        };
        let ground = sample_ground(&[Footprint::rectangle(0., 0., 10., 10.)?], &config)?;
        let records = evaluate_sun_hours(&ground, &scene, &sun, &config)?;
        let at = |x: f64, y: f64| {
            records
                .iter()
                .find(|r| (r.centroid.x - x).abs() < 1e-9 && (r.centroid.y - y).abs() < 1e-9)
                .map(|r| r.sun_hours)
        };
        // East of the block, under its shadow toward the sun in the west
        assert_eq!(at(13., 5.), Some(0));
        // West of the block, in the open
        assert_eq!(at(-5., 5.), Some(1));
        Ok(())
    }

    #[test]
    fn test_face_verdicts_and_input_errors() -> Result<()> {
        let scene = ObstacleScene::new(&[ObstacleSurface::from_box(
            "block",
            Point::new(0., 0., 0.),
            Point::new(4., 4., 4.),
        )]);
        let sun = SunPath::from_directions(&vec![Vector::new(0., 0., 1.); 15], 10.0)?;
        let faces = sample_all_surfaces(&scene, &SamplingConfig::default());
        let verdicts = evaluate_faces_insolation(
            &faces,
            &scene,
            &sun,
            &SamplingConfig::default(),
            &InsolationNorm::default(),
        )?;
        for (v, f) in verdicts.iter().zip(&faces) {
            let expected = if f.normal.dz > 0.99 { Status::Pass } else { Status::Fail };
            assert_eq!(v.verdict.status, expected);
        }

        let empty = ObstacleScene::empty();
        let err = evaluate_sun_hours(&faces, &empty, &sun, &SamplingConfig::default()).unwrap_err();
        assert_eq!(err.downcast_ref::<InputError>(), Some(&InputError::EmptyObstacles));

        let unbounded = SamplingConfig {
            occlusion: OcclusionConfig {
                max_distance: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = evaluate_faces_insolation(
            &faces,
            &scene,
            &sun,
            &unbounded,
            &InsolationNorm::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::InvalidConfig(_))
        ));
        Ok(())
    }
}
