use anyhow::Result;
use log::{debug, warn};

use super::{FaceSource, SampleFace, SamplingConfig};
use crate::error::InputError;
use crate::geom::footprint::Footprint;
use crate::geom::triangles::Triangle;
use crate::sim::occlusion::ObstacleScene;
use crate::{Point, Vector};

/// Sub-faces of every surface in the scene.
pub fn sample_all_surfaces(scene: &ObstacleScene, config: &SamplingConfig) -> Vec<SampleFace> {
    let all: Vec<usize> = (0..scene.num_surfaces()).collect();
    sample_surfaces(scene, &all, config)
}

/// Splits the triangles of the selected surfaces into quadrants until each
/// piece is small enough or the depth limit is reached.
///
/// Undersides are skipped. Output stops at `config.max_faces`.
pub fn sample_surfaces(
    scene: &ObstacleScene,
    surfaces: &[usize],
    config: &SamplingConfig,
) -> Vec<SampleFace> {
    let mut faces = Vec::new();
    let mut skipped = 0;

    'surfaces: for &idx in surfaces {
        for tri in scene.surface_triangles(idx) {
            let Ok(normal) = tri.normal() else {
                continue;
            };
            if normal.dz < config.min_normal_z {
                skipped += 1;
                continue;
            }
            subdivide(tri, 0, idx, normal, config, &mut faces);
            if faces.len() >= config.max_faces {
                warn!(
                    "Face cap of {} reached, remaining surfaces are not sampled",
                    config.max_faces
                );
                break 'surfaces;
            }
        }
    }

    debug!(
        "Sampled {} faces from {} surfaces ({} underside triangles skipped)",
        faces.len(),
        surfaces.len(),
        skipped
    );
    faces
}

fn subdivide(
    tri: &Triangle,
    depth: usize,
    surface: usize,
    normal: Vector,
    config: &SamplingConfig,
    out: &mut Vec<SampleFace>,
) {
    if out.len() >= config.max_faces {
        return;
    }
    let area = tri.area();
    if area <= config.target_face_area || depth >= config.max_depth {
        out.push(SampleFace {
            source: FaceSource::Surface(surface),
            vertices: tri.vertices().to_vec(),
            centroid: tri.centroid(),
            normal,
            area,
        });
        return;
    }
    for child in tri.split4() {
        subdivide(&child, depth + 1, surface, normal, config, out);
    }
}

/// Regular grid of upward-facing ground cells around the footprints.
///
/// The grid covers the combined bounding box of `footprints` grown by
/// `config.ground_buffer`. Cells are ordered row by row (rows along y). When
/// the nominal cell size would exceed `config.max_ground_cells`, cells are
/// enlarged until the grid fits.
pub fn sample_ground(
    footprints: &[Footprint],
    config: &SamplingConfig,
) -> Result<Vec<SampleFace>> {
    config.validate()?;
    if footprints.is_empty() {
        return Err(InputError::EmptyFootprints.into());
    }
    let (mut x0, mut y0, mut x1, mut y1) = footprints[0].bbox();
    for fp in &footprints[1..] {
        let (a0, b0, a1, b1) = fp.bbox();
        x0 = x0.min(a0);
        y0 = y0.min(b0);
        x1 = x1.max(a1);
        y1 = y1.max(b1);
    }
    let b = config.ground_buffer;
    let (x0, y0, x1, y1) = (x0 - b, y0 - b, x1 + b, y1 + b);
    let (width, depth) = (x1 - x0, y1 - y0);

    let mut cell = config.ground_target_area.sqrt();
    let grid_dims = |cell: f64| {
        (
            ((width / cell).ceil() as usize).max(1),
            ((depth / cell).ceil() as usize).max(1),
        )
    };
    let (mut ncols, mut nrows) = grid_dims(cell);
    while ncols.saturating_mul(nrows) > config.max_ground_cells {
        let excess = ncols.saturating_mul(nrows) as f64 / config.max_ground_cells as f64;
        cell *= excess.sqrt().max(1.01);
        (ncols, nrows) = grid_dims(cell);
    }
    if cell * cell > config.ground_target_area * 1.0001 {
        debug!(
            "Ground cell enlarged to {:.2} m to stay within {} cells",
            cell, config.max_ground_cells
        );
    }

    let z = config.ground_z;
    let up = Vector::new(0., 0., 1.);
    let mut faces = Vec::with_capacity(ncols * nrows);
    for row in 0..nrows {
        let ya = y0 + row as f64 * cell;
        let yb = ya + cell;
        for col in 0..ncols {
            let xa = x0 + col as f64 * cell;
            let xb = xa + cell;
            faces.push(SampleFace {
                source: FaceSource::Ground { row, col },
                vertices: vec![
                    Point::new(xa, ya, z),
                    Point::new(xb, ya, z),
                    Point::new(xb, yb, z),
                    Point::new(xa, yb, z),
                ],
                centroid: Point::new(0.5 * (xa + xb), 0.5 * (ya + yb), z),
                normal: up,
                area: cell * cell,
            });
        }
    }
    Ok(faces)
}
