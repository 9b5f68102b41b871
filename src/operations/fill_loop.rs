use tracing::{debug, warn};

use crate::boundary::{densify, BoundaryLoop, FillPlan, LoopSplitter};
use crate::error::{BoundaryError, ErrorKind, Result};
use crate::geometry::Aabb;
use crate::topology::{MeshEditor, TriangleId, VertexLookup};
use crate::triangulation::TriangulationParams;

/// Options of a [`FillLoop`] run.
#[derive(Debug, Clone)]
pub struct FillParams {
    pub triangulation: TriangulationParams,
    /// Grow the mesh bounds as triangles are added.
    pub build_on_fly: bool,
    /// Subdivide chords introduced by a split.
    pub densify: bool,
}

impl Default for FillParams {
    fn default() -> Self {
        Self {
            triangulation: TriangulationParams::default(),
            build_on_fly: true,
            densify: true,
        }
    }
}

/// Fills a boundary loop with triangles.
///
/// A planar loop is triangulated as is. A loop running over several faces
/// of a box is split into one sub-loop per face first.
pub struct FillLoop {
    boundary: BoundaryLoop,
    bounds: Option<Aabb>,
    params: FillParams,
}

impl FillLoop {
    /// Creates a new `FillLoop` operation.
    #[must_use]
    pub fn new(boundary: BoundaryLoop) -> Self {
        Self {
            boundary,
            bounds: None,
            params: FillParams::default(),
        }
    }

    /// Box used to split a non-planar loop. Defaults to the mesh bounds,
    /// then to the loop's own box.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = Some(bounds);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: FillParams) -> Self {
        self.params = params;
        self
    }

    /// Executes the fill, returning the new triangles.
    ///
    /// Every sub-loop is planned before the first triangle is added, so a
    /// failing sub-loop leaves the mesh without new triangles. Sub-loops are
    /// also planned once before densification adds any point; a refused
    /// plan leaves at most the box corner of a corner split in the mesh.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::InvalidInput` for a degenerate loop,
    /// `UnsupportedSplitConfiguration` when a non-planar loop cannot be
    /// split, and any error raised while triangulating a sub-loop.
    pub fn execute(&self, mesh: &mut impl MeshEditor) -> Result<Vec<TriangleId>> {
        if self.boundary.is_coplanar(&*mesh)?.is_some() {
            return self.fill_planar(mesh);
        }
        match self.boundary.plane_frame(&*mesh) {
            Ok(_) => return self.fill_planar(mesh),
            Err(e) if e.kind() != ErrorKind::NonPlanarLoop => return Err(e),
            Err(_) => {}
        }

        let bounds = match self.bounds.or_else(|| mesh.mesh_bounds()) {
            Some(bounds) => bounds,
            None => {
                let positions = self.boundary.positions(&*mesh)?;
                let Some(own) = Aabb::from_points(&positions) else {
                    return Err(BoundaryError::TooFewPoints { count: 0 }.into());
                };
                warn!("mesh has no bounds, splitting against the loop's own box");
                own
            }
        };

        let mut split = LoopSplitter::new(bounds)
            .split(&self.boundary, mesh)
            .inspect_err(|e| warn!(error = %e, "loop refused by the splitter"))?;
        let mut plans = self.plan_all(&split.loops, &*mesh)?;
        if self.params.densify {
            let created = densify(
                &mut split.loops,
                &split.chords,
                split.average_segment_length,
                mesh,
            )?;
            if created > 0 {
                plans = self.plan_all(&split.loops, &*mesh)?;
            }
        }

        let mut added = Vec::with_capacity(plans.iter().map(FillPlan::len).sum());
        for plan in &plans {
            added.extend(plan.commit(mesh, self.params.build_on_fly)?);
        }
        debug!(
            loops = plans.len(),
            triangles = added.len(),
            "split loop filled"
        );
        Ok(added)
    }

    fn plan_all(
        &self,
        loops: &[BoundaryLoop],
        lookup: &impl VertexLookup,
    ) -> Result<Vec<FillPlan>> {
        loops
            .iter()
            .map(|sub| sub.plan(lookup, &self.params.triangulation))
            .collect()
    }

    fn fill_planar(&self, mesh: &mut impl MeshEditor) -> Result<Vec<TriangleId>> {
        self.boundary
            .triangulate(mesh, &self.params.triangulation, self.params.build_on_fly)
    }
}
