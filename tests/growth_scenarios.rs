use anyhow::Result;
use std::collections::HashSet;

use insolation3d::sim::growth::{ColumnGrid, VoxelArena};
use insolation3d::sim::insolation::{evaluate_path, free_samples};
use insolation3d::sim::sampling::{SamplingConfig, sample_surfaces};
use insolation3d::{
    CancelFlag, Footprint, GeoLocation, GrowthConfig, GrowthResult, InputError, InsolationNorm,
    ObstacleScene, ObstacleSurface, OcclusionConfig, OcclusionTester, Point, PotentialGrowth,
    QueryPoint, Status, SunPath, SunPathConfig, UID, Vector,
};

fn assert_no_floating(result: &GrowthResult) {
    let present: HashSet<(usize, usize, usize)> =
        result.voxels.iter().map(|v| (v.ix, v.iy, v.layer)).collect();
    for v in &result.voxels {
        if v.layer > 0 {
            assert!(
                present.contains(&(v.ix, v.iy, v.layer - 1)),
                "voxel {:?} floats",
                (v.ix, v.iy, v.layer)
            );
        }
    }
    for c in &result.columns {
        assert_eq!(
            result.voxels.iter().filter(|v| v.ix == c.ix && v.iy == c.iy).count(),
            c.layers
        );
    }
}

#[test]
fn square_site_without_obstacles_grows_to_max_height() -> Result<()> {
    let scene = ObstacleScene::empty();
    let dirs: Vec<Vector> = (0..24)
        .map(|i| {
            let a = std::f64::consts::PI * i as f64 / 23.0;
            Vector::new(a.cos(), -a.sin(), 0.8)
        })
        .collect();
    let sun = SunPath::from_directions(&dirs, 10.0)?;
    let site = Footprint::rectangle(0., 0., 30., 30.)?;
    // Far away and facing away from the site
    let point = QueryPoint::new(Point::new(15., -300., 2.), Vector::new(0., -1., 0.), UID::new());
    let config = GrowthConfig {
        voxel_size: 6.0,
        max_height: 30.0,
        ..Default::default()
    };

    let norm = InsolationNorm::default();
    let growth = PotentialGrowth::new(&scene, &sun, &site, &[point], norm, config)?;
    assert_eq!(growth.num_columns(), 25);
    let result = growth.run().completed().expect("not cancelled");

    assert_eq!(result.columns.len(), 25);
    assert!(result.columns.iter().all(|c| c.layers == 5 && c.height == 30.0));
    assert_eq!(result.voxels.len(), 125);
    assert_eq!(result.total_volume(), 30.0 * 30.0 * 30.0);
    assert_eq!(result.outline.len(), 1);
    let corners: HashSet<(i64, i64)> = result.outline[0]
        .iter()
        .map(|p| (p.x.round() as i64, p.y.round() as i64))
        .collect();
    assert_eq!(corners, HashSet::from([(0, 0), (30, 0), (30, 30), (0, 30)]));
    assert_eq!(result.diagnostics.layers_built, 5);
    assert_eq!(result.diagnostics.removed_by_rollback, 0);
    assert_no_floating(&result);
    Ok(())
}

/// 18 slots: 6 to the south-west, 5 straight at the site, 7 to the south-east.
fn fan_toward_site() -> Result<SunPath> {
    let mut dirs = vec![Vector::new(-0.8, -1.0, 0.5); 6];
    for dx in [-0.1, -0.05, 0.0, 0.05, 0.1] {
        dirs.push(Vector::new(dx, -1.0, 0.2));
    }
    dirs.extend(vec![Vector::new(0.8, -1.0, 0.5); 7]);
    SunPath::from_directions(&dirs, 10.0)
}

#[test]
fn voxel_that_degrades_a_point_is_rolled_back() -> Result<()> {
    let scene = ObstacleScene::empty();
    let sun = fan_toward_site()?;
    let site = Footprint::rectangle(12., 20., 18., 26.)?;
    let point = QueryPoint::new(Point::new(15., 40., 1.5), Vector::new(0., -1., 0.), UID::new());
    let norm = InsolationNorm::default();
    let config = GrowthConfig {
        voxel_size: 6.0,
        max_height: 6.0,
        ..Default::default()
    };

    // Baseline: 180 minutes in one period
    let point_tester = OcclusionTester::new(OcclusionConfig::min_hit_distance());
    let baseline = evaluate_path(&sun, &free_samples(&point, &scene, &sun, &point_tester), &norm);
    assert_eq!(baseline.status, Status::Pass);
    assert_eq!(baseline.total_minutes, 180.0);

    // With the single voxel in place the point drops to a warning
    let mut arena = VoxelArena::new(ColumnGrid::rasterize(&site, 6.0)?, 0.0, 1);
    assert_eq!(arena.add_layer(0).len(), 1);
    let voxel_tester = OcclusionTester::new(config.voxel_occlusion);
    let with_voxel = evaluate_path(&sun, &free_samples(&point, &arena, &sun, &voxel_tester), &norm);
    assert_eq!(with_voxel.status, Status::Warning);
    assert_eq!(with_voxel.total_minutes, 130.0);
    assert_eq!(with_voxel.shortage_minutes, 20.0);

    let result = PotentialGrowth::new(&scene, &sun, &site, &[point], norm, config)?
        .run()
        .completed()
        .expect("not cancelled");
    assert_eq!(result.diagnostics.removed_by_rollback, 1);
    assert!(result.columns.is_empty());
    let report = &result.points[0];
    assert_eq!(report.live.status, Status::Pass);
    assert!(!report.is_degraded());
    Ok(())
}

#[test]
fn facade_points_of_neighbour_are_never_degraded() -> Result<()> {
    // Existing block north of the site; its south facade is protected
    let scene = ObstacleScene::new(&[ObstacleSurface::from_box(
        "north_block",
        Point::new(0., 40., 0.),
        Point::new(30., 50., 15.),
    )]);
    let location = GeoLocation::default();
    let sun = SunPath::generate(
        &location,
        &SunPathConfig {
            hour_step: 0.5,
            ..Default::default()
        },
    )?;
    let faces = sample_surfaces(&scene, &[0], &SamplingConfig::default());
    let ground = UID::from("ground");
    let points: Vec<QueryPoint> = faces
        .iter()
        .filter(|f| f.normal.dy < -0.99)
        .map(|f| f.to_query_point(&scene, &ground))
        .collect();
    assert!(!points.is_empty());

    let site = Footprint::rectangle(0., 0., 30., 30.)?;
    let config = GrowthConfig {
        voxel_size: 6.0,
        max_height: 48.0,
        ..Default::default()
    };
    let norm = InsolationNorm::default();
    let result = PotentialGrowth::new(&scene, &sun, &site, &points, norm, config)?
        .run()
        .completed()
        .expect("not cancelled");

    for report in result.points.iter().filter(|p| p.protected) {
        assert!(
            report.live.status.rank() <= report.baseline.status.rank(),
            "point at {:?} degraded from {} to {}",
            report.position,
            report.baseline.status,
            report.live.status
        );
    }
    // The tallest columns stand away from the protected facade
    assert!(result.max_height() > 0.0);
    assert_no_floating(&result);
    Ok(())
}

#[test]
fn cancellation_discards_the_volume() -> Result<()> {
    let scene = ObstacleScene::empty();
    let sun = fan_toward_site()?;
    let site = Footprint::rectangle(0., 0., 30., 30.)?;
    let point = QueryPoint::new(Point::new(15., 40., 1.5), Vector::new(0., -1., 0.), UID::new());
    let flag = CancelFlag::new();
    let growth = PotentialGrowth::new(
        &scene,
        &sun,
        &site,
        &[point],
        InsolationNorm::default(),
        GrowthConfig::default(),
    )?
    .with_cancel_flag(flag.clone());

    let mut reports = 0;
    let outcome = growth.run_with_progress(|p| {
        reports += 1;
        if p.message.starts_with("Layer") {
            flag.cancel();
        }
    });
    assert!(outcome.is_cancelled());
    assert!(outcome.completed().is_none());
    // Baseline capture and the first layer only
    assert_eq!(reports, 2);
    Ok(())
}

#[test]
fn missing_inputs_abort_before_growth() -> Result<()> {
    let scene = ObstacleScene::empty();
    let sun = fan_toward_site()?;
    let site = Footprint::rectangle(0., 0., 30., 30.)?;
    let err = PotentialGrowth::new(
        &scene,
        &sun,
        &site,
        &[],
        InsolationNorm::default(),
        GrowthConfig::default(),
    )
    .err()
    .expect("no query points");
    assert_eq!(err.downcast_ref::<InputError>(), Some(&InputError::NoQueryPoints));

    let err = Footprint::new(&[Point::new(0., 0., 0.), Point::new(1., 0., 0.)]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<InputError>(),
        Some(InputError::DegenerateFootprint(_))
    ));
    Ok(())
}
