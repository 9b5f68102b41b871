use tracing::debug;

use crate::error::{BoundaryError, Result};
use crate::geometry::Aabb;
use crate::math::polygon_2d::{locate_point, signed_area, PointLocation};
use crate::math::{Axis, PlaneFrame, Point2, Point3, Vector3, COPLANAR_TOLERANCE, PLANE_TOLERANCE};
use crate::topology::{MeshEditor, SharedVertexId, TriangleId, VertexLookup};
use crate::triangulation::{InsertionOrder, TriangulationParams, Triangulator};

/// A closed boundary of shared vertices with optional holes.
///
/// The outer points and each inner loop close back on their first point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryLoop {
    points: Vec<SharedVertexId>,
    inner_loops: Vec<Vec<SharedVertexId>>,
}

/// A triangle waiting to be added to the mesh.
///
/// The three vertices are distinct shared vertices of the planned loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTriangle {
    pub vertices: [SharedVertexId; 3],
    pub normal: Vector3,
}

/// Triangles computed for a loop, not yet added to any mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillPlan {
    pub triangles: Vec<PlannedTriangle>,
}

impl FillPlan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Adds every planned triangle to `mesh`, flagged non-original.
    ///
    /// `build_on_fly` grows the mesh bounds as triangles arrive.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::IndexOutOfRange` when a planned handle went stale
    /// after planning.
    pub fn commit(&self, mesh: &mut impl MeshEditor, build_on_fly: bool) -> Result<Vec<TriangleId>> {
        let mut added = Vec::with_capacity(self.triangles.len());
        for planned in &self.triangles {
            let [a, b, c] = planned.vertices;
            let id = mesh.add_triangle(a, b, c, planned.normal, build_on_fly, true)?;
            mesh.set_original(id, false)?;
            added.push(id);
        }
        Ok(added)
    }
}

impl BoundaryLoop {
    /// Creates a loop over `points` with no holes.
    #[must_use]
    pub fn new(points: Vec<SharedVertexId>) -> Self {
        Self {
            points,
            inner_loops: Vec::new(),
        }
    }

    #[must_use]
    pub fn points(&self) -> &[SharedVertexId] {
        &self.points
    }

    #[must_use]
    pub fn inner_loops(&self) -> &[Vec<SharedVertexId>] {
        &self.inner_loops
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shared vertex at position `index` of the outer boundary.
    ///
    /// # Errors
    ///
    /// Returns `BoundaryError::IndexOutOfRange` past the end.
    pub fn vertex(&self, index: usize) -> std::result::Result<SharedVertexId, BoundaryError> {
        self.points
            .get(index)
            .copied()
            .ok_or(BoundaryError::IndexOutOfRange {
                index,
                len: self.points.len(),
            })
    }

    pub fn push(&mut self, point: SharedVertexId) {
        self.points.push(point);
    }

    /// Adds a hole.
    pub fn add_inner_loop(&mut self, points: Vec<SharedVertexId>) {
        self.inner_loops.push(points);
    }

    /// Removes and returns the outer point at `index`.
    ///
    /// # Errors
    ///
    /// Returns `BoundaryError::IndexOutOfRange` past the end.
    pub fn erase(&mut self, index: usize) -> std::result::Result<SharedVertexId, BoundaryError> {
        if index >= self.points.len() {
            return Err(BoundaryError::IndexOutOfRange {
                index,
                len: self.points.len(),
            });
        }
        Ok(self.points.remove(index))
    }

    /// Drops every point and hole.
    pub fn clear(&mut self) {
        self.points.clear();
        self.inner_loops.clear();
    }

    /// Whether `id` is on the outer boundary.
    #[must_use]
    pub fn contains(&self, id: SharedVertexId) -> bool {
        self.points.contains(&id)
    }

    pub(crate) fn points_mut(&mut self) -> &mut Vec<SharedVertexId> {
        &mut self.points
    }

    pub(crate) fn inner_loops_mut(&mut self) -> &mut [Vec<SharedVertexId>] {
        &mut self.inner_loops
    }

    /// Positions of the outer boundary.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::IndexOutOfRange` for a stale shared vertex.
    pub fn positions(&self, lookup: &impl VertexLookup) -> Result<Vec<Point3>> {
        positions_of(&self.points, lookup)
    }

    /// Open-chain length of the outer boundary divided by its point count.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::IndexOutOfRange` for a stale shared vertex.
    #[allow(clippy::cast_precision_loss)]
    pub fn average_segment_length(&self, lookup: &impl VertexLookup) -> Result<f64> {
        let positions = self.positions(lookup)?;
        if positions.is_empty() {
            return Ok(0.0);
        }
        let total: f64 = positions.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
        Ok(total / positions.len() as f64)
    }

    /// The single coordinate axis held constant by every outer point.
    ///
    /// Returns `None` when no axis, or more than one, stays within
    /// [`COPLANAR_TOLERANCE`].
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::IndexOutOfRange` for a stale shared vertex.
    pub fn is_coplanar(&self, lookup: &impl VertexLookup) -> Result<Option<Axis>> {
        let positions = self.positions(lookup)?;
        let Some(bounds) = Aabb::from_points(&positions) else {
            return Ok(None);
        };
        let spread = bounds.max - bounds.min;
        let mut constant = Axis::ALL
            .into_iter()
            .filter(|axis| spread[axis.index()] <= COPLANAR_TOLERANCE);
        Ok(match (constant.next(), constant.next()) {
            (Some(axis), None) => Some(axis),
            _ => None,
        })
    }

    /// Fits the loop plane and checks every point against it.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::InvalidInput` for fewer than three points or no
    /// non-collinear triple, and `ErrorKind::NonPlanarLoop` when a point of
    /// the boundary or a hole is off the plane.
    pub fn plane_frame(&self, lookup: &impl VertexLookup) -> Result<PlaneFrame> {
        let outer = self.positions(lookup)?;
        if outer.len() < 3 {
            return Err(BoundaryError::TooFewPoints { count: outer.len() }.into());
        }
        let frame = PlaneFrame::from_points(&outer).ok_or(BoundaryError::DegeneratePlane)?;

        let tolerance = plane_tolerance(&outer);
        let mut all = outer;
        for hole in &self.inner_loops {
            all.extend(positions_of(hole, lookup)?);
        }
        // indices run over the outer boundary, then each hole
        for (index, p) in all.iter().enumerate() {
            let distance = frame.distance(p).abs();
            if distance > tolerance {
                return Err(BoundaryError::NonPlanar { index, distance }.into());
            }
        }
        Ok(frame)
    }

    /// Computes the triangles that fill this loop without touching the mesh.
    ///
    /// Every triangle joins three distinct shared vertices of the loop, so
    /// committing a plan never creates vertices. Triangles follow the
    /// winding of the outer boundary.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`BoundaryLoop::plane_frame`] plus any raised
    /// while triangulating the projected contours, and
    /// `ErrorKind::InvalidInput` when a triangle would repeat a vertex.
    pub fn plan(&self, lookup: &impl VertexLookup, params: &TriangulationParams) -> Result<FillPlan> {
        let frame = self.plane_frame(lookup)?;

        let outer = project_contour(&frame, &self.points, lookup)?;
        let holes = self
            .inner_loops
            .iter()
            .map(|hole| project_contour(&frame, hole, lookup))
            .collect::<Result<Vec<_>>>()?;

        let flip = signed_area(&outer) < 0.0;
        let indices = Triangulator::new(params.clone()).triangulate(&outer, &holes)?;
        // triangulator indices address the outer points, then each hole
        let handles: Vec<SharedVertexId> = self
            .points
            .iter()
            .chain(self.inner_loops.iter().flatten())
            .copied()
            .collect();
        let handle = |i: usize| {
            handles.get(i).copied().ok_or(BoundaryError::IndexOutOfRange {
                index: i,
                len: handles.len(),
            })
        };

        let mut triangles = Vec::with_capacity(indices.len());
        for tri in indices {
            let [a, b, c] = if flip { [tri[0], tri[2], tri[1]] } else { tri };
            let vertices = [handle(a)?, handle(b)?, handle(c)?];
            if vertices[0] == vertices[1] || vertices[1] == vertices[2] || vertices[0] == vertices[2] {
                return Err(BoundaryError::RepeatedVertex {
                    triangle: triangles.len(),
                }
                .into());
            }
            let positions = [
                lookup.position_of(vertices[0])?,
                lookup.position_of(vertices[1])?,
                lookup.position_of(vertices[2])?,
            ];
            let normal = triangle_normal(&positions).unwrap_or_else(|| {
                if flip {
                    -frame.normal()
                } else {
                    *frame.normal()
                }
            });
            triangles.push(PlannedTriangle { vertices, normal });
        }

        debug!(
            points = self.points.len(),
            holes = self.inner_loops.len(),
            triangles = triangles.len(),
            "loop planned"
        );
        Ok(FillPlan { triangles })
    }

    /// Triangulates the loop and adds the triangles to `mesh`.
    ///
    /// Returns the new triangles, all flagged non-original.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`BoundaryLoop::plan`] and
    /// [`FillPlan::commit`]; nothing is added when planning fails.
    pub fn triangulate(
        &self,
        mesh: &mut impl MeshEditor,
        params: &TriangulationParams,
        build_on_fly: bool,
    ) -> Result<Vec<TriangleId>> {
        let plan = self.plan(&*mesh, params)?;
        plan.commit(mesh, build_on_fly)
    }

    /// Whether `point` lies strictly inside the loop and outside its holes.
    ///
    /// Points off the loop plane, on a vertex or on an edge are not inside.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::IndexOutOfRange` for a stale shared vertex.
    pub fn point_inside(&self, point: &Point3, lookup: &impl VertexLookup) -> Result<bool> {
        let outer = self.positions(lookup)?;
        if outer.len() < 3 {
            return Ok(false);
        }
        let Some(frame) = PlaneFrame::from_points(&outer) else {
            return Ok(false);
        };
        if frame.distance(point).abs() > plane_tolerance(&outer) {
            return Ok(false);
        }

        let q = frame.project(point);
        let flat: Vec<Point2> = outer.iter().map(|p| frame.project(p)).collect();
        if locate_point(&q, &flat) != PointLocation::Inside {
            return Ok(false);
        }
        for hole in &self.inner_loops {
            let flat: Vec<Point2> = positions_of(hole, lookup)?
                .iter()
                .map(|p| frame.project(p))
                .collect();
            if locate_point(&q, &flat) != PointLocation::Outside {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Renders the loop as a Triangle `.poly` file in the loop's plane frame.
    ///
    /// Vertices and segments are numbered from 1, outer boundary first. Each
    /// hole is marked by a point inside it.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`BoundaryLoop::plane_frame`]. A hole that
    /// cannot be triangulated to find its marker point is an error too.
    pub fn poly_file(&self, lookup: &impl VertexLookup) -> Result<String> {
        let frame = self.plane_frame(lookup)?;
        let contours: Vec<Vec<Point2>> = std::iter::once(&self.points)
            .chain(self.inner_loops.iter())
            .map(|c| Ok(positions_of(c, lookup)?.iter().map(|p| frame.project(p)).collect()))
            .collect::<Result<_>>()?;
        let total: usize = contours.iter().map(Vec::len).sum();

        let mut lines = vec![
            format!("# boundary loop, {} holes", self.inner_loops.len()),
            format!("{total} 2 0 1"),
        ];
        let mut number = 1usize;
        for (ci, contour) in contours.iter().enumerate() {
            for p in contour {
                lines.push(format!("{number} {} {} {}", p.x, p.y, ci + 1));
                number += 1;
            }
        }

        lines.push(format!("{total} 1"));
        let mut first = 1usize;
        for (ci, contour) in contours.iter().enumerate() {
            let n = contour.len();
            for i in 0..n {
                let a = first + i;
                let b = first + (i + 1) % n;
                lines.push(format!("{a} {a} {b} {}", ci + 1));
            }
            first += n;
        }

        let marker = Triangulator::new(TriangulationParams {
            order: InsertionOrder::AsGiven,
        });
        lines.push(format!("{}", contours.len() - 1));
        for (hi, hole) in contours.iter().skip(1).enumerate() {
            let tris = marker.triangulate(hole, &[])?;
            let Some(t) = tris.first() else {
                return Err(BoundaryError::TooFewPoints { count: hole.len() }.into());
            };
            let c = Point2::from((hole[t[0]].coords + hole[t[1]].coords + hole[t[2]].coords) / 3.0);
            lines.push(format!("{} {} {}", hi + 1, c.x, c.y));
        }

        let mut out = lines.join("\n");
        out.push('\n');
        Ok(out)
    }
}

fn project_contour(
    frame: &PlaneFrame,
    contour: &[SharedVertexId],
    lookup: &impl VertexLookup,
) -> Result<Vec<Point2>> {
    Ok(positions_of(contour, lookup)?
        .iter()
        .map(|p| frame.project(p))
        .collect())
}

fn positions_of(contour: &[SharedVertexId], lookup: &impl VertexLookup) -> Result<Vec<Point3>> {
    contour
        .iter()
        .map(|&id| Ok(lookup.position_of(id)?))
        .collect()
}

/// [`PLANE_TOLERANCE`] grown with the loop extent past one unit.
fn plane_tolerance(points: &[Point3]) -> f64 {
    let extent = Aabb::from_points(points).map_or(0.0, |b| (b.max - b.min).amax());
    PLANE_TOLERANCE * extent.max(1.0)
}

fn triangle_normal(corners: &[Point3; 3]) -> Option<Vector3> {
    let n = (corners[1] - corners[0]).cross(&(corners[2] - corners[0]));
    n.try_normalize(f64::EPSILON)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::topology::MeshStore;
    use approx::assert_relative_eq;

    fn loop_at(mesh: &mut MeshStore, points: &[[f64; 3]]) -> BoundaryLoop {
        BoundaryLoop::new(
            points
                .iter()
                .map(|p| mesh.add_shared_vertex(Point3::new(p[0], p[1], p[2]), true))
                .collect(),
        )
    }

    fn square(mesh: &mut MeshStore, z: f64) -> BoundaryLoop {
        loop_at(
            mesh,
            &[[0.0, 0.0, z], [4.0, 0.0, z], [4.0, 4.0, z], [0.0, 4.0, z]],
        )
    }

    fn hole(mesh: &mut MeshStore, z: f64) -> Vec<SharedVertexId> {
        [[1.0, 1.0], [1.0, 3.0], [3.0, 3.0], [3.0, 1.0]]
            .iter()
            .map(|p| mesh.add_shared_vertex(Point3::new(p[0], p[1], z), true))
            .collect()
    }

    #[test]
    fn square_fills_with_two_non_original_triangles() {
        let mut mesh = MeshStore::new();
        let lp = square(&mut mesh, 2.0);
        let before = mesh.shared_vertex_count();

        let added = lp
            .triangulate(&mut mesh, &TriangulationParams::seeded(5), true)
            .unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(mesh.shared_vertex_count(), before);
        for id in &added {
            let t = mesh.triangle(*id).unwrap();
            assert!(!t.original);
            assert_relative_eq!(t.normal.z, 1.0, epsilon = 1e-9);
            assert!(t.vertices.iter().all(|v| lp.contains(*v)));
        }
        assert_relative_eq!(mesh.bounds().unwrap().max.x, 4.0);
    }

    #[test]
    fn triangles_follow_loop_winding() {
        let mut mesh = MeshStore::new();
        let mut lp = square(&mut mesh, 0.0);
        lp.points_mut().reverse();
        let added = lp
            .triangulate(&mut mesh, &TriangulationParams::seeded(11), false)
            .unwrap();
        for id in added {
            assert_relative_eq!(mesh.triangle(id).unwrap().normal.z, -1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn square_with_hole_fills_the_ring() {
        let mut mesh = MeshStore::new();
        let mut lp = square(&mut mesh, 1.0);
        let inner = hole(&mut mesh, 1.0);
        lp.add_inner_loop(inner.clone());

        let plan = lp.plan(&mesh, &TriangulationParams::seeded(3)).unwrap();
        assert_eq!(plan.len(), 8);
        assert_eq!(mesh.triangle_count(), 0);

        let added = plan.commit(&mut mesh, false).unwrap();
        let area: f64 = added
            .iter()
            .map(|id| {
                let [a, b, c] = mesh.triangle_positions(*id).unwrap();
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum();
        assert_relative_eq!(area, 12.0, epsilon = 1e-9);
        for id in &added {
            let t = mesh.triangle(*id).unwrap();
            assert!(t.vertices.iter().all(|v| lp.contains(*v) || inner.contains(v)));
        }
    }

    #[test]
    fn near_duplicate_seam_vertices_stay_distinct() {
        for seed in 0..10 {
            let mut mesh = MeshStore::new();
            // two handles 5e-7 apart, closer than the position tolerance
            let lp = BoundaryLoop::new(
                [
                    [0.0, 0.0],
                    [2.0, 0.0],
                    [2.0, 2.0],
                    [1.0, 2.0],
                    [1.0 + 5e-7, 2.0 + 5e-7],
                    [0.0, 2.0],
                ]
                .iter()
                .map(|p| mesh.add_shared_vertex(Point3::new(p[0], p[1], 0.0), false))
                .collect(),
            );
            assert_eq!(mesh.shared_vertex_count(), 6);

            let plan = lp.plan(&mesh, &TriangulationParams::seeded(seed)).unwrap();
            assert_eq!(plan.len(), 4);
            for t in &plan.triangles {
                let [a, b, c] = t.vertices;
                assert!(a != b && b != c && a != c);
            }
            let added = plan.commit(&mut mesh, false).unwrap();
            assert_eq!(added.len(), 4);
            assert_eq!(mesh.triangle_count(), 4);
            assert_eq!(mesh.shared_vertex_count(), 6);
        }
    }

    #[test]
    fn point_inside_excludes_boundary_and_holes() {
        let mut mesh = MeshStore::new();
        let mut lp = square(&mut mesh, 0.0);
        assert!(lp.point_inside(&Point3::new(2.0, 2.0, 0.0), &mesh).unwrap());
        assert!(!lp.point_inside(&Point3::new(9.0, 9.0, 0.0), &mesh).unwrap());
        assert!(!lp.point_inside(&Point3::new(4.0, 4.0, 0.0), &mesh).unwrap());
        assert!(!lp.point_inside(&Point3::new(2.0, 0.0, 0.0), &mesh).unwrap());
        assert!(!lp.point_inside(&Point3::new(2.0, 2.0, 0.5), &mesh).unwrap());

        lp.add_inner_loop(hole(&mut mesh, 0.0));
        assert!(!lp.point_inside(&Point3::new(2.0, 2.0, 0.0), &mesh).unwrap());
        assert!(lp.point_inside(&Point3::new(0.5, 2.0, 0.0), &mesh).unwrap());
    }

    #[test]
    fn coplanar_axis_detection() {
        let mut mesh = MeshStore::new();
        let flat = square(&mut mesh, 3.0);
        assert_eq!(flat.is_coplanar(&mesh).unwrap(), Some(Axis::Z));

        let wall = loop_at(
            &mut mesh,
            &[[1.0, 0.0, 0.0], [1.0, 2.0, 0.0], [1.0, 2.0, 2.0], [1.0, 0.0, 2.0]],
        );
        assert_eq!(wall.is_coplanar(&mesh).unwrap(), Some(Axis::X));

        let tilted = loop_at(
            &mut mesh,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 0.0]],
        );
        assert_eq!(tilted.is_coplanar(&mesh).unwrap(), None);
        // planar even though no axis is constant
        assert!(tilted.plane_frame(&mesh).is_ok());
    }

    #[test]
    fn bad_loops_are_refused() {
        let mut mesh = MeshStore::new();
        let two = loop_at(&mut mesh, &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        let err = two.plan(&mesh, &TriangulationParams::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let line = loop_at(
            &mut mesh,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
        );
        assert_eq!(
            line.plane_frame(&mesh).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );

        let bent = loop_at(
            &mut mesh,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.5]],
        );
        let err = bent
            .triangulate(&mut mesh, &TriangulationParams::default(), false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonPlanarLoop);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn editing_and_measuring() {
        let mut mesh = MeshStore::new();
        let mut lp = loop_at(
            &mut mesh,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        );
        assert_relative_eq!(lp.average_segment_length(&mesh).unwrap(), 0.75);

        let first = lp.vertex(0).unwrap();
        assert!(lp.vertex(4).is_err());
        assert_eq!(lp.erase(0).unwrap(), first);
        assert!(!lp.contains(first));
        assert!(lp.erase(9).is_err());
        lp.push(first);
        assert_eq!(lp.len(), 4);
        lp.clear();
        assert!(lp.is_empty());
    }

    #[test]
    fn poly_file_lists_vertices_segments_and_holes() {
        let mut mesh = MeshStore::new();
        let mut lp = square(&mut mesh, 0.0);
        lp.add_inner_loop(hole(&mut mesh, 0.0));
        let text = lp.poly_file(&mesh).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with('#'));
        assert_eq!(lines[1], "8 2 0 1");
        assert_eq!(lines[10], "8 1");
        assert_eq!(lines[14], "4 4 1 1");
        assert_eq!(lines[18], "8 8 5 2");
        assert_eq!(lines[19], "1");

        let hole_line: Vec<f64> = lines[20]
            .split_whitespace()
            .skip(1)
            .map(|v| v.parse().unwrap())
            .collect();
        assert!(hole_line[0] > 1.0 && hole_line[0] < 3.0);
        assert!(hole_line[1] > 1.0 && hole_line[1] < 3.0);
        assert_eq!(lines.len(), 21);
    }
}
