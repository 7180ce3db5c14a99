use log::debug;

use super::grid::UniformGrid;
use super::{Hit, Occluder};
use crate::geom::bboxes::{bounding_box, union_bboxes};
use crate::geom::mesh::Mesh;
use crate::geom::ray::Ray;
use crate::geom::transform::Transform;
use crate::geom::triangles::Triangle;
use crate::{Point, UID};

/// Opaque triangulated obstacle owned by the host application.
#[derive(Debug, Clone)]
pub struct ObstacleSurface {
    pub uid: UID,
    pub name: String,
    /// Geometry in local coordinates.
    pub mesh: Mesh,
    /// Local-to-world transform.
    pub transform: Transform,
}

impl ObstacleSurface {
    pub fn new(name: &str, mesh: Mesh) -> Self {
        Self {
            uid: UID::new(),
            name: name.to_string(),
            mesh,
            transform: Transform::identity(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Box-shaped obstacle (a simple building mass).
    pub fn from_box(name: &str, pmin: Point, pmax: Point) -> Self {
        Self::new(name, Mesh::from_box(pmin, pmax))
    }

    /// Triangles in world coordinates.
    pub fn world_triangles(&self) -> Vec<Triangle> {
        if self.transform.is_identity() {
            self.mesh.triangles().collect()
        } else {
            self.mesh.transformed(&self.transform).triangles().collect()
        }
    }
}

#[derive(Debug, Clone)]
struct SurfaceEntry {
    uid: UID,
    name: String,
    first_triangle: usize,
    num_triangles: usize,
}

/// World-space snapshot of all obstacle surfaces, indexed for ray queries.
///
/// The snapshot is taken once; later edits to the source surfaces are not seen.
pub struct ObstacleScene {
    surfaces: Vec<SurfaceEntry>,
    triangles: Vec<Triangle>,
    owners: Vec<usize>,
    grid: Option<UniformGrid>,
    bbox: Option<(Point, Point)>,
}

impl ObstacleScene {
    pub fn new(surfaces: &[ObstacleSurface]) -> Self {
        let mut entries = Vec::with_capacity(surfaces.len());
        let mut triangles = Vec::new();
        let mut owners = Vec::new();

        for (idx, surface) in surfaces.iter().enumerate() {
            let world: Vec<Triangle> = surface
                .world_triangles()
                .into_iter()
                .filter(|t| !t.is_degenerate())
                .collect();
            entries.push(SurfaceEntry {
                uid: surface.uid.clone(),
                name: surface.name.clone(),
                first_triangle: triangles.len(),
                num_triangles: world.len(),
            });
            owners.extend(std::iter::repeat_n(idx, world.len()));
            triangles.extend(world);
        }

        let tri_bboxes: Vec<(Point, Point)> = triangles
            .iter()
            .filter_map(|t| bounding_box(&t.vertices()))
            .collect();
        let bbox = tri_bboxes.iter().copied().reduce(union_bboxes);
        let grid = bbox.map(|(pmin, pmax)| UniformGrid::new(&tri_bboxes, pmin, pmax));

        if let Some(g) = &grid {
            debug!(
                "Obstacle scene: {} surfaces, {} triangles, grid {:?} cells of {:.2} m",
                entries.len(),
                triangles.len(),
                g.lattice.dims,
                g.lattice.cell_size
            );
        }

        Self {
            surfaces: entries,
            triangles,
            owners,
            grid,
            bbox,
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn num_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    pub fn bbox(&self) -> Option<(Point, Point)> {
        self.bbox
    }

    pub fn surface_uid(&self, idx: usize) -> Option<&UID> {
        self.surfaces.get(idx).map(|s| &s.uid)
    }

    pub fn surface_name(&self, idx: usize) -> Option<&str> {
        self.surfaces.get(idx).map(|s| s.name.as_str())
    }

    pub fn surface_index(&self, uid: &UID) -> Option<usize> {
        self.surfaces.iter().position(|s| &s.uid == uid)
    }

    /// World triangles of one surface.
    pub fn surface_triangles(&self, idx: usize) -> &[Triangle] {
        match self.surfaces.get(idx) {
            Some(s) => &self.triangles[s.first_triangle..s.first_triangle + s.num_triangles],
            None => &[],
        }
    }

    /// View of the scene that ignores one surface.
    pub fn excluding(&self, surface: usize) -> ExcludingSurface<'_> {
        ExcludingSurface {
            scene: self,
            surface,
        }
    }

    /// Closest hit by testing every triangle.
    pub fn closest_hit_brute(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<Hit> {
        let mut best: Option<Hit> = None;
        for idx in 0..self.triangles.len() {
            self.test_triangle(ray, idx, t_min, t_max, None, &mut best);
        }
        best
    }

    fn test_triangle(
        &self,
        ray: &Ray,
        idx: usize,
        t_min: f64,
        t_max: f64,
        skip: Option<usize>,
        best: &mut Option<Hit>,
    ) {
        let owner = self.owners[idx];
        if skip == Some(owner) {
            return;
        }
        let limit = best.map_or(t_max, |b| b.t);
        let tri = &self.triangles[idx];
        if let Some(t) = ray.intersect_triangle(tri.p0, tri.p1, tri.p2, t_min, limit) {
            *best = Some(Hit {
                t,
                point: ray.point_at(t),
                target: owner,
            });
        }
    }

    fn closest_hit_skipping(
        &self,
        ray: &Ray,
        t_min: f64,
        t_max: f64,
        skip: Option<usize>,
    ) -> Option<Hit> {
        let grid = self.grid.as_ref()?;
        let mut best: Option<Hit> = None;
        for visit in grid.lattice.traverse(ray, t_min, t_max) {
            for &idx in grid.items_in(&visit.cell) {
                self.test_triangle(ray, idx, t_min, t_max, skip, &mut best);
            }
            // Hits beyond this cell may still be beaten by triangles in later cells
            if let Some(hit) = best {
                if hit.t <= visit.t_exit {
                    break;
                }
            }
        }
        best
    }
}

impl Occluder for ObstacleScene {
    fn closest_hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<Hit> {
        self.closest_hit_skipping(ray, t_min, t_max, None)
    }
}

/// Scene view with one surface removed from ray queries.
pub struct ExcludingSurface<'a> {
    scene: &'a ObstacleScene,
    surface: usize,
}

impl Occluder for ExcludingSurface<'_> {
    fn closest_hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<Hit> {
        self.scene
            .closest_hit_skipping(ray, t_min, t_max, Some(self.surface))
    }
}
