use anyhow::Result;
use log::{debug, info, warn};
use rayon::prelude::*;

use super::config::GrowthConfig;
use super::raster::ColumnGrid;
use super::result::{
    ColumnRecord, GrowthDiagnostics, GrowthOutcome, GrowthResult, PointReport, VoxelRecord,
};
use super::voxel::VoxelArena;
use crate::error::InputError;
use crate::geom::footprint::Footprint;
use crate::geom::mesh::Mesh;
use crate::geom::ray::Ray;
use crate::sim::insolation::{
    InsolationNorm, InsolationVerdict, QueryPoint, Status, evaluate_path, free_samples,
};
use crate::sim::occlusion::{ObstacleScene, OcclusionTester};
use crate::sim::progress::{CancelFlag, FnProgress, NoProgress, Progress, ProgressReporter};
use crate::sim::solar::SunPath;
use crate::{Point, UID};

/// Query point state fixed at baseline capture.
struct TrackedPoint {
    id: UID,
    position: Point,
    /// Per sun sample: in front of the point and clear of static obstacles.
    static_free: Vec<bool>,
    baseline: InsolationVerdict,
    /// Existing building and not already failing.
    protected: bool,
}

/// Rollback loop outcome.
struct Resolution {
    removed: usize,
    /// Points still violating when the pass cap was reached.
    remaining: Vec<usize>,
}

/// Grows the tallest voxel volume over a footprint that does not worsen the
/// insolation verdict of any protected query point.
///
/// Layers are added bottom up. After every batch of layers the points that
/// can see the new voxels are re-evaluated and, while one of them is worse
/// than its baseline, the first voxel on one of its sun rays is removed.
/// Columns with a removed voxel stop growing and lose everything above it.
pub struct PotentialGrowth<'a> {
    scene: &'a ObstacleScene,
    sun: &'a SunPath,
    grid: ColumnGrid,
    points: Vec<QueryPoint>,
    norm: InsolationNorm,
    config: GrowthConfig,
    cancel: CancelFlag,
}

impl<'a> PotentialGrowth<'a> {
    /// Validates the inputs. Nothing is computed until [`Self::run`].
    pub fn new(
        scene: &'a ObstacleScene,
        sun: &'a SunPath,
        footprint: &Footprint,
        points: &[QueryPoint],
        norm: InsolationNorm,
        config: GrowthConfig,
    ) -> Result<Self> {
        config.validate()?;
        if points.is_empty() {
            return Err(InputError::NoQueryPoints.into());
        }
        if sun.is_empty() {
            return Err(InputError::NoSunDirections {
                min_altitude_deg: sun.min_altitude_deg(),
            }
            .into());
        }
        let grid = ColumnGrid::rasterize(footprint, config.voxel_size)?;
        Ok(Self {
            scene,
            sun,
            grid,
            points: points.to_vec(),
            norm,
            config,
            cancel: CancelFlag::new(),
        })
    }

    /// Uses `flag` to stop the run between layers.
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Number of footprint columns.
    pub fn num_columns(&self) -> usize {
        self.grid.cells.len()
    }

    pub fn run(self) -> GrowthOutcome {
        self.run_with_reporter(NoProgress)
    }

    /// Same as [`Self::run`], calling `report` at coarse milestones.
    pub fn run_with_progress<F>(self, report: F) -> GrowthOutcome
    where
        F: FnMut(&Progress),
    {
        self.run_with_reporter(FnProgress { f: report })
    }

    fn run_with_reporter<R: ProgressReporter>(self, mut reporter: R) -> GrowthOutcome {
        let point_tester = OcclusionTester::new(self.config.point_occlusion);
        let voxel_tester = OcclusionTester::new(self.config.voxel_occlusion);

        reporter.report("Capturing baselines", 0.0);
        let tracked = self.capture_baselines(&point_tester);
        let num_protected = tracked.iter().filter(|p| p.protected).count();
        info!(
            "Growth over {} columns, {} of {} query points protected, {} sun samples",
            self.grid.cells.len(),
            num_protected,
            tracked.len(),
            self.sun.len()
        );

        let num_layers = self.config.num_layers();
        let mut arena = VoxelArena::new(self.grid.clone(), self.config.base_z, num_layers);
        let mut diag = GrowthDiagnostics::default();
        let mut pending: Vec<usize> = Vec::new();
        let mut unresolved: Vec<usize> = Vec::new();

        for layer in 0..num_layers {
            if self.cancel.is_cancelled() {
                info!("Growth cancelled before layer {}", layer);
                return GrowthOutcome::Cancelled;
            }
            let added = arena.add_layer(layer);
            if added.is_empty() {
                debug!("No growing columns left at layer {}", layer);
                break;
            }
            diag.layers_built += 1;
            diag.voxels_created += added.len();
            pending.extend(added);

            if (layer + 1) % self.config.batch_layers == 0 || layer + 1 == num_layers {
                let mut candidates = self.impact_candidates(&tracked, &arena, &pending);
                candidates.append(&mut unresolved);
                candidates.sort_unstable();
                candidates.dedup();
                diag.batch_checks += 1;
                diag.candidate_points += candidates.len();

                let res = self.resolve(
                    &tracked,
                    &arena,
                    &voxel_tester,
                    candidates,
                    self.config.batch_iterations,
                );
                diag.removed_by_rollback += res.removed;
                if !res.remaining.is_empty() {
                    warn!(
                        "Batch at layer {} hit the cap of {} passes with {} points still violating",
                        layer,
                        self.config.batch_iterations,
                        res.remaining.len()
                    );
                    diag.iteration_limit_hit = true;
                }
                unresolved = res.remaining;
                diag.removed_by_floating += arena.remove_floating();
                pending.clear();
                debug!(
                    "Batch check at layer {}: {} removed so far, {} columns growing",
                    layer,
                    diag.removed_by_rollback,
                    arena.num_growing()
                );
            }

            reporter.report(
                &format!("Layer {}/{}", layer + 1, num_layers),
                5.0 + 85.0 * (layer + 1) as f64 / num_layers as f64,
            );
        }

        if self.cancel.is_cancelled() {
            info!("Growth cancelled before final validation");
            return GrowthOutcome::Cancelled;
        }

        reporter.report("Final validation", 90.0);
        let all: Vec<usize> = (0..tracked.len()).filter(|&i| tracked[i].protected).collect();
        let res = self.resolve(
            &tracked,
            &arena,
            &voxel_tester,
            all,
            self.config.final_iterations,
        );
        diag.removed_by_rollback += res.removed;
        if !res.remaining.is_empty() {
            warn!(
                "Final validation hit the cap of {} passes, clearing all sun rays of {} points",
                self.config.final_iterations,
                res.remaining.len()
            );
            diag.iteration_limit_hit = true;
            diag.removed_by_final_sweep +=
                self.clear_sun_rays(&tracked, &arena, &voxel_tester, &res.remaining);
        }
        diag.removed_by_floating += arena.remove_floating();
        diag.removed_by_height += self.drop_low_columns(&mut arena);

        reporter.report("Finalizing", 95.0);
        let result = self.finalize(&tracked, &arena, &voxel_tester, diag);
        info!(
            "Growth done: {} columns, max height {:.1} m, {} voxels removed by rollback",
            result.columns.len(),
            result.max_height(),
            result.diagnostics.removed_by_rollback
        );
        reporter.report("Done", 100.0);
        GrowthOutcome::Completed(result)
    }

    fn capture_baselines(&self, tester: &OcclusionTester) -> Vec<TrackedPoint> {
        self.points
            .par_iter()
            .map(|p| {
                let static_free = free_samples(p, self.scene, self.sun, tester);
                let baseline = evaluate_path(self.sun, &static_free, &self.norm);
                TrackedPoint {
                    id: p.id.clone(),
                    position: p.position,
                    protected: p.is_protected() && baseline.status != Status::Fail,
                    static_free,
                    baseline,
                }
            })
            .collect()
    }

    fn live_verdict(
        &self,
        point: &TrackedPoint,
        arena: &VoxelArena,
        tester: &OcclusionTester,
    ) -> InsolationVerdict {
        let samples = self.sun.samples();
        let free: Vec<bool> = point
            .static_free
            .iter()
            .zip(samples)
            .map(|(free, s)| *free && !tester.is_blocked(point.position, s.direction, arena))
            .collect();
        evaluate_path(self.sun, &free, &self.norm)
    }

    fn is_violating(
        &self,
        point: &TrackedPoint,
        arena: &VoxelArena,
        tester: &OcclusionTester,
    ) -> bool {
        point.protected
            && self
                .live_verdict(point, arena, tester)
                .is_worse_than(&point.baseline)
    }

    /// Protected points with a sun ray that may cross the new voxels.
    ///
    /// Each statically free ray is tested against the bounding box of the new
    /// voxels. Every n-th ray goes first so that most affected points are
    /// accepted after a few tests; the full scan only runs for points the
    /// sparse rays miss. The set over-approximates, it never misses a point.
    fn impact_candidates(
        &self,
        tracked: &[TrackedPoint],
        arena: &VoxelArena,
        new_voxels: &[usize],
    ) -> Vec<usize> {
        let Some((bmin, bmax)) = arena.bbox_of(new_voxels) else {
            return Vec::new();
        };
        let max_distance = self.config.voxel_occlusion.max_distance;
        let stride = self.config.sparse_ray_stride;
        let samples = self.sun.samples();

        let crosses = |p: &TrackedPoint, i: usize| {
            Ray::new(p.position, samples[i].direction)
                .and_then(|ray| ray.intersect_aabb(bmin, bmax))
                .is_some_and(|(t_enter, t_exit)| t_exit > 0.0 && t_enter < max_distance)
        };

        tracked
            .par_iter()
            .enumerate()
            .filter(|(_, p)| p.protected)
            .filter(|(_, p)| {
                let free: Vec<usize> = (0..p.static_free.len())
                    .filter(|&i| p.static_free[i])
                    .collect();
                free.iter().step_by(stride).any(|&i| crosses(*p, i))
                    || free.iter().any(|&i| crosses(*p, i))
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// First active voxel on the earliest statically free sun ray that
    /// reaches one.
    fn first_blocking_voxel(
        &self,
        point: &TrackedPoint,
        arena: &VoxelArena,
        tester: &OcclusionTester,
    ) -> Option<usize> {
        self.sun
            .samples()
            .iter()
            .zip(&point.static_free)
            .filter(|(_, free)| **free)
            .find_map(|(s, _)| tester.cast(point.position, s.direction, arena))
            .map(|hit| hit.target)
    }

    /// Removes one voxel per violating point and pass until no candidate
    /// violates or `max_passes` is reached.
    ///
    /// Verdicts are computed in parallel; removals happen one at a time.
    fn resolve(
        &self,
        tracked: &[TrackedPoint],
        arena: &VoxelArena,
        tester: &OcclusionTester,
        candidates: Vec<usize>,
        max_passes: usize,
    ) -> Resolution {
        let violating = |set: &[usize]| -> Vec<usize> {
            set.par_iter()
                .copied()
                .filter(|&i| self.is_violating(&tracked[i], arena, tester))
                .collect()
        };

        let mut removed = 0;
        let mut current = candidates;
        for _ in 0..max_passes {
            current = violating(&current);
            if current.is_empty() {
                return Resolution {
                    removed,
                    remaining: current,
                };
            }
            for &i in &current {
                if let Some(voxel) = self.first_blocking_voxel(&tracked[i], arena, tester) {
                    if arena.remove(voxel) {
                        removed += 1;
                    }
                }
            }
        }
        Resolution {
            removed,
            remaining: violating(&current),
        }
    }

    /// Removes every voxel on every statically free sun ray of `points`.
    ///
    /// Afterwards those points see exactly their baseline sky.
    fn clear_sun_rays(
        &self,
        tracked: &[TrackedPoint],
        arena: &VoxelArena,
        tester: &OcclusionTester,
        points: &[usize],
    ) -> usize {
        let mut removed = 0;
        for &i in points {
            let p = &tracked[i];
            for (s, _) in self
                .sun
                .samples()
                .iter()
                .zip(&p.static_free)
                .filter(|(_, free)| **free)
            {
                while let Some(hit) = tester.cast(p.position, s.direction, arena) {
                    if !arena.remove(hit.target) {
                        break;
                    }
                    removed += 1;
                }
            }
        }
        removed
    }

    fn drop_low_columns(&self, arena: &mut VoxelArena) -> usize {
        if self.config.min_height <= 0.0 {
            return 0;
        }
        let mut removed = 0;
        for c in 0..arena.columns().len() {
            let layers = arena.column_layers(c);
            let height = layers as f64 * self.config.voxel_size;
            if layers > 0 && height + 1e-9 < self.config.min_height {
                removed += arena.clear_column(c);
            }
        }
        removed
    }

    fn finalize(
        &self,
        tracked: &[TrackedPoint],
        arena: &VoxelArena,
        tester: &OcclusionTester,
        diagnostics: GrowthDiagnostics,
    ) -> GrowthResult {
        let size = self.config.voxel_size;
        let base_z = self.config.base_z;
        let mut columns = Vec::new();
        let mut voxels = Vec::new();
        let mut mesh = Mesh::default();
        let mut cells = Vec::new();

        for (c, column) in arena.columns().iter().enumerate() {
            let layers = arena.column_layers(c);
            if layers == 0 {
                continue;
            }
            let (x, y) = arena.grid().cell_min(column.ix, column.iy);
            let height = layers as f64 * size;
            for &v in &column.stack[..layers] {
                if let (Some(voxel), Some((min, max))) = (arena.voxel(v), arena.bounds(v)) {
                    voxels.push(VoxelRecord {
                        ix: column.ix,
                        iy: column.iy,
                        layer: voxel.layer,
                        min,
                        max,
                    });
                }
            }
            mesh.append(&Mesh::from_box(
                Point::new(x, y, base_z),
                Point::new(x + size, y + size, base_z + height),
            ));
            cells.push((column.ix, column.iy));
            columns.push(ColumnRecord {
                ix: column.ix,
                iy: column.iy,
                x,
                y,
                layers,
                height,
            });
        }

        let outline = arena.grid().outline(&cells, base_z);
        let points = tracked
            .par_iter()
            .map(|p| PointReport {
                id: p.id.clone(),
                position: p.position,
                protected: p.protected,
                baseline: p.baseline.clone(),
                live: self.live_verdict(p, arena, tester),
            })
            .collect();

        GrowthResult {
            voxel_size: size,
            base_z,
            columns,
            voxels,
            mesh,
            outline,
            points,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vector;
    use crate::sim::insolation::ParentStatus;

    fn open_site() -> Result<(ObstacleScene, SunPath, Footprint)> {
        let sun = SunPath::from_directions(&vec![Vector::new(0., -1., 1.); 18], 10.0)?;
        let fp = Footprint::rectangle(0., 0., 12., 12.)?;
        Ok((ObstacleScene::empty(), sun, fp))
    }

    fn small_config() -> GrowthConfig {
        GrowthConfig {
            voxel_size: 3.0,
            max_height: 12.0,
            ..Default::default()
        }
    }

    /// South of the site, facing south, with the sun in the south.
    fn south_point() -> QueryPoint {
        QueryPoint::new(Point::new(6., -20., 1.), Vector::new(0., -1., 0.), UID::new())
    }

    /// North of the site facing south: its sun rays pass over the site.
    fn north_point(x: f64) -> QueryPoint {
        QueryPoint::new(Point::new(x, 14., 2.5), Vector::new(0., -1., 0.), UID::new())
    }

    fn layers_at(result: &GrowthResult, ix: usize, iy: usize) -> Option<usize> {
        result
            .columns
            .iter()
            .find(|c| c.ix == ix && c.iy == iy)
            .map(|c| c.layers)
    }

    #[test]
    fn test_rejects_missing_inputs() -> Result<()> {
        let (scene, sun, fp) = open_site()?;
        let norm = InsolationNorm::default();
        let err = PotentialGrowth::new(&scene, &sun, &fp, &[], norm, small_config())
            .err()
            .unwrap();
        assert_eq!(err.downcast_ref::<InputError>(), Some(&InputError::NoQueryPoints));

        let empty = SunPath::from_directions(&[], 10.0)?;
        let point = QueryPoint::new(Point::new(0., 50., 1.), Vector::new(0., 1., 0.), UID::new());
        let err = PotentialGrowth::new(&scene, &empty, &fp, &[point], norm, small_config())
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::NoSunDirections { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_unaffected_point_lets_site_grow_fully() -> Result<()> {
        let (scene, sun, fp) = open_site()?;
        let points = [south_point()];
        let norm = InsolationNorm::default();
        let growth = PotentialGrowth::new(&scene, &sun, &fp, &points, norm, small_config())?;
        assert_eq!(growth.num_columns(), 16);
        let result = growth.run().completed().unwrap();
        assert_eq!(result.columns.len(), 16);
        assert!(result.columns.iter().all(|c| c.layers == 4));
        assert_eq!(result.max_height(), 12.0);
        assert_eq!(result.voxels.len(), 64);
        assert_eq!(result.mesh.face_count(), 16 * 12);
        assert_eq!(result.outline.len(), 1);
        assert_eq!(result.outline[0].len(), 4);
        assert_eq!(result.diagnostics.removed_by_rollback, 0);
        assert!(!result.diagnostics.iteration_limit_hit);
        Ok(())
    }

    #[test]
    fn test_protected_point_north_of_site_keeps_its_sun() -> Result<()> {
        let (scene, sun, fp) = open_site()?;
        let protected = north_point(7.5);
        let planned = protected.clone().with_parent(ParentStatus::Planned);
        let growth = PotentialGrowth::new(
            &scene,
            &sun,
            &fp,
            &[protected, planned],
            InsolationNorm::default(),
            small_config(),
        )?;
        let result = growth.run().completed().unwrap();
        let report = &result.points[0];
        assert!(report.protected);
        assert_eq!(report.baseline.status, Status::Pass);
        assert!(!report.is_degraded());
        assert!(!result.points[1].protected);
        // Only the columns under the sun ray are cut down
        assert_eq!(result.diagnostics.removed_by_rollback, 4);
        assert_eq!(result.max_height(), 12.0);
        assert_eq!(layers_at(&result, 2, 3), Some(1));
        assert_eq!(layers_at(&result, 2, 2), Some(2));
        assert_eq!(layers_at(&result, 2, 1), Some(3));
        assert_eq!(layers_at(&result, 2, 0), Some(4));
        assert_eq!(layers_at(&result, 0, 3), Some(4));
        Ok(())
    }

    #[test]
    fn test_pass_cap_falls_back_to_clearing_sun_rays() -> Result<()> {
        let (scene, sun, fp) = open_site()?;
        let points = [north_point(1.5), north_point(7.5)];
        let config = GrowthConfig {
            batch_iterations: 0,
            final_iterations: 0,
            ..small_config()
        };
        let growth =
            PotentialGrowth::new(&scene, &sun, &fp, &points, InsolationNorm::default(), config)?;
        let result = growth.run().completed().unwrap();
        let diag = &result.diagnostics;
        assert!(diag.iteration_limit_hit);
        assert_eq!(diag.removed_by_rollback, 0);
        // Five voxels lie on the sun ray of each point
        assert_eq!(diag.removed_by_final_sweep, 10);
        assert!(result.points.iter().all(|p| p.protected && !p.is_degraded()));
        for ix in [0, 2] {
            assert_eq!(layers_at(&result, ix, 3), Some(1));
            assert_eq!(layers_at(&result, ix, 2), Some(2));
            assert_eq!(layers_at(&result, ix, 1), Some(3));
            assert_eq!(layers_at(&result, ix, 0), Some(4));
        }
        assert_eq!(layers_at(&result, 1, 3), Some(4));
        Ok(())
    }

    #[test]
    fn test_min_height_drops_short_columns() -> Result<()> {
        let (scene, sun, fp) = open_site()?;
        let points = [north_point(7.5)];
        let config = GrowthConfig {
            min_height: 6.0,
            ..small_config()
        };
        let growth =
            PotentialGrowth::new(&scene, &sun, &fp, &points, InsolationNorm::default(), config)?;
        let result = growth.run().completed().unwrap();
        // The one-voxel column next to the point is dropped, the two-voxel one stays
        assert_eq!(result.diagnostics.removed_by_height, 1);
        assert_eq!(result.columns.len(), 15);
        assert_eq!(layers_at(&result, 2, 3), None);
        assert_eq!(layers_at(&result, 2, 2), Some(2));
        assert!(result.columns.iter().all(|c| c.height >= 6.0));
        assert!(!result.points[0].is_degraded());
        Ok(())
    }

    #[test]
    fn test_ray_stride_does_not_change_result() -> Result<()> {
        let (scene, sun, fp) = open_site()?;
        let points = [north_point(1.5), north_point(7.5), south_point()];
        let run = |stride| -> Result<GrowthResult> {
            let config = GrowthConfig {
                sparse_ray_stride: stride,
                ..small_config()
            };
            let norm = InsolationNorm::default();
            let growth = PotentialGrowth::new(&scene, &sun, &fp, &points, norm, config)?;
            Ok(growth.run().completed().unwrap())
        };
        let dense = run(1)?;
        let sparse = run(4)?;
        assert_eq!(dense.columns, sparse.columns);
        assert_eq!(dense.diagnostics, sparse.diagnostics);
        Ok(())
    }

    #[test]
    fn test_cancelled_before_start() -> Result<()> {
        let (scene, sun, fp) = open_site()?;
        let points = [south_point()];
        let flag = CancelFlag::new();
        let norm = InsolationNorm::default();
        let growth = PotentialGrowth::new(&scene, &sun, &fp, &points, norm, small_config())?
            .with_cancel_flag(flag.clone());
        flag.cancel();
        assert!(growth.run().is_cancelled());
        Ok(())
    }

    #[test]
    fn test_progress_reaches_100() -> Result<()> {
        let (scene, sun, fp) = open_site()?;
        let points = [south_point()];
        let norm = InsolationNorm::default();
        let growth = PotentialGrowth::new(&scene, &sun, &fp, &points, norm, small_config())?;
        let mut seen = Vec::new();
        let outcome = growth.run_with_progress(|p| seen.push(p.percent));
        assert!(!outcome.is_cancelled());
        assert_eq!(seen.first(), Some(&0.0));
        assert_eq!(seen.last(), Some(&100.0));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        Ok(())
    }
}
