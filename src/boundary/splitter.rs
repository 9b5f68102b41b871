use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::error::{Result, SplitError};
use crate::geometry::{Aabb, BoxCorner, BoxEdge};
use crate::topology::{MeshEditor, SharedVertexId, VertexLookup};

use super::{BoundaryLoop, Chord};

/// Sub-loops produced by splitting a loop against a bounding box.
#[derive(Debug, Clone, Default)]
pub struct SplitLoops {
    pub loops: Vec<BoundaryLoop>,
    /// Edges the split introduced, candidates for densification.
    pub chords: Vec<Chord>,
    /// Average segment length of the parent loop.
    pub average_segment_length: f64,
}

/// Partitions a loop that runs over several faces of a box into sub-loops
/// that each lie on one face.
///
/// Vertices sitting on a box edge are transition points. Pairs of them on
/// the same edge close a sub-loop; three single points on the edges of one
/// corner are tied together through that corner.
#[derive(Debug, Clone, Copy)]
pub struct LoopSplitter {
    bounds: Aabb,
}

impl LoopSplitter {
    #[must_use]
    pub fn new(bounds: Aabb) -> Self {
        Self { bounds }
    }

    #[must_use]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Loop indices lying on each box edge, in loop order.
    ///
    /// # Errors
    ///
    /// Returns an error if a loop vertex cannot be resolved.
    pub fn transition_points(
        &self,
        boundary: &BoundaryLoop,
        lookup: &impl VertexLookup,
    ) -> Result<BTreeMap<BoxEdge, Vec<usize>>> {
        let mut edges: BTreeMap<BoxEdge, Vec<usize>> = BTreeMap::new();
        for (i, &id) in boundary.points().iter().enumerate() {
            let p = lookup.position_of(id)?;
            if let Some(edge) = self.bounds.classify_edge(&p) {
                edges.entry(edge).or_default().push(i);
            }
        }
        Ok(edges)
    }

    /// Splits `boundary` into sub-loops.
    ///
    /// The three-edge configuration creates the shared box corner through
    /// `mesh`; no triangle is added.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::UnsupportedSplitConfiguration` when there are no
    /// transition points, more than three edges carry them, an edge holds an
    /// odd count, a three-edge split is not one point per edge, or a walk
    /// cannot avoid other transition points in either direction.
    pub fn split(&self, boundary: &BoundaryLoop, mesh: &mut impl MeshEditor) -> Result<SplitLoops> {
        let edges = self.transition_points(boundary, &*mesh)?;
        let average_segment_length = boundary.average_segment_length(&*mesh)?;
        debug!(
            points = boundary.len(),
            edges = edges.len(),
            transitions = edges.values().map(Vec::len).sum::<usize>(),
            "splitting loop against bounds"
        );

        let (loops, chords) = match edges.len() {
            0 => return Err(SplitError::NoTransitionPoints.into()),
            1 | 2 => split_pairs(boundary, &edges, &*mesh)?,
            3 => self.split_corner(boundary, &edges, mesh)?,
            count => return Err(SplitError::TooManyEdges { count }.into()),
        };

        debug!(loops = loops.len(), chords = chords.len(), "loop split");
        Ok(SplitLoops {
            loops,
            chords,
            average_segment_length,
        })
    }

    fn split_corner(
        &self,
        boundary: &BoundaryLoop,
        edges: &BTreeMap<BoxEdge, Vec<usize>>,
        mesh: &mut impl MeshEditor,
    ) -> Result<(Vec<BoundaryLoop>, Vec<Chord>)> {
        let mut counts = [0usize; 3];
        for (count, indices) in counts.iter_mut().zip(edges.values()) {
            *count = indices.len();
        }
        if counts.iter().any(|&c| c != 1) {
            return Err(SplitError::AmbiguousTripleEdge { counts }.into());
        }

        let total: u32 = edges.keys().map(|edge| edge.id()).sum();
        let corner = BoxCorner::from_edge_total(total).ok_or(SplitError::UnknownCorner { total })?;
        if !boundary.inner_loops().is_empty() {
            warn!(
                holes = boundary.inner_loops().len(),
                "inner loops dropped by a corner split"
            );
        }

        let tps: Vec<usize> = edges.values().flatten().copied().collect();
        let transitions: HashSet<usize> = tps.iter().copied().collect();
        let points = boundary.points();
        let mut paths = Vec::with_capacity(3);
        for (i, &start) in tps.iter().enumerate() {
            let stop = tps[(i + 1) % tps.len()];
            paths.push((start, walk_either_way(points, start, stop, &transitions)?.0));
        }

        // the corner vertex is only created once every walk succeeded
        let corner_id = mesh.add_shared_vertex(self.bounds.corner(corner), true);
        let mut loops = Vec::with_capacity(3);
        let mut chords = Vec::with_capacity(3);
        for (start, path) in paths {
            let mut sub = Vec::with_capacity(path.len() + 1);
            sub.push(corner_id);
            sub.extend(path);
            loops.push(BoundaryLoop::new(sub));
            chords.push(Chord::new(corner_id, points[start]));
        }
        debug!(corner = corner.index(), "loop split around box corner");
        Ok((loops, chords))
    }
}

/// One sub-loop per sorted pair on each edge, then the remaining main loop.
fn split_pairs(
    boundary: &BoundaryLoop,
    edges: &BTreeMap<BoxEdge, Vec<usize>>,
    lookup: &impl VertexLookup,
) -> Result<(Vec<BoundaryLoop>, Vec<Chord>)> {
    let transitions: HashSet<usize> = edges.values().flatten().copied().collect();
    let points = boundary.points();
    let mut loops = Vec::new();
    let mut chords = Vec::new();
    let mut used = Vec::new();

    for (&edge, indices) in edges {
        if indices.len() % 2 != 0 {
            return Err(SplitError::OddTransitionCount {
                edge,
                count: indices.len(),
            }
            .into());
        }

        let axis = edge.sort_axis().index();
        let mut keyed = Vec::with_capacity(indices.len());
        for &i in indices {
            keyed.push((lookup.position_of(points[i])?[axis], i));
        }
        keyed.sort_by(|l, r| l.0.total_cmp(&r.0));

        for pair in keyed.chunks_exact(2) {
            let (start, stop) = (pair[0].1, pair[1].1);
            let (sub, interior) = walk_either_way(points, start, stop, &transitions)?;
            used.extend(interior);
            loops.push(BoundaryLoop::new(sub));
            chords.push(Chord::new(points[start], points[stop]));
        }
    }

    loops.push(main_loop(boundary, used)?);
    Ok((loops, chords))
}

/// Walks `start -> stop`, falling back to `stop -> start`.
fn walk_either_way(
    points: &[SharedVertexId],
    start: usize,
    stop: usize,
    transitions: &HashSet<usize>,
) -> Result<(Vec<SharedVertexId>, Vec<usize>)> {
    if let Some(found) = walk(points, start, stop, transitions) {
        return Ok(found);
    }
    warn!(start, stop, "walk crosses a transition point, retrying reversed");
    walk(points, stop, start, transitions).ok_or_else(|| SplitError::CannotSplit { start, stop }.into())
}

/// Copies `points[start..=stop]`, wrapping past the end. `None` when an
/// interior index is a transition point. Also returns the interior indices.
fn walk(
    points: &[SharedVertexId],
    start: usize,
    stop: usize,
    transitions: &HashSet<usize>,
) -> Option<(Vec<SharedVertexId>, Vec<usize>)> {
    let n = points.len();
    if start >= n || stop >= n || start == stop {
        return None;
    }
    let mut sub = vec![points[start]];
    let mut interior = Vec::new();
    let mut i = (start + 1) % n;
    while i != stop {
        if transitions.contains(&i) {
            return None;
        }
        sub.push(points[i]);
        interior.push(i);
        i = (i + 1) % n;
    }
    sub.push(points[stop]);
    Some((sub, interior))
}

/// The parent loop, holes included, minus the walked interior indices.
fn main_loop(boundary: &BoundaryLoop, mut used: Vec<usize>) -> Result<BoundaryLoop> {
    used.sort_unstable();
    used.dedup();
    let mut main = boundary.clone();
    for &index in used.iter().rev() {
        if index >= main.len() {
            return Err(SplitError::IndexOutOfRange {
                index,
                len: main.len(),
            }
            .into());
        }
        main.erase(index)?;
    }
    Ok(main)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::math::Point3;
    use crate::topology::MeshStore;

    fn unit_box() -> Aabb {
        Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
    }

    fn make_loop(mesh: &mut MeshStore, coords: &[[f64; 3]]) -> BoundaryLoop {
        BoundaryLoop::new(
            coords
                .iter()
                .map(|c| mesh.add_shared_vertex(Point3::new(c[0], c[1], c[2]), true))
                .collect(),
        )
    }

    #[test]
    fn loop_over_two_faces_splits_into_two() {
        let mut mesh = MeshStore::new();
        // top face rectangle folded down the front face
        let lp = make_loop(
            &mut mesh,
            &[
                [0.25, 0.0, 1.0],
                [0.25, 0.5, 1.0],
                [0.75, 0.5, 1.0],
                [0.75, 0.0, 1.0],
                [0.75, 0.0, 0.5],
                [0.25, 0.0, 0.5],
            ],
        );
        let p = lp.points().to_vec();
        let split = LoopSplitter::new(unit_box()).split(&lp, &mut mesh).unwrap();

        assert_eq!(split.loops.len(), 2);
        assert_eq!(split.loops[0].points(), &[p[0], p[1], p[2], p[3]]);
        assert_eq!(split.loops[1].points(), &[p[0], p[3], p[4], p[5]]);
        assert_eq!(split.chords, vec![Chord::new(p[0], p[3])]);
        assert!(split.average_segment_length > 0.0);

        for sub in &split.loops {
            assert!(sub.is_coplanar(&mesh).unwrap().is_some());
        }
    }

    #[test]
    fn band_over_three_faces_splits_on_two_edges() {
        let mut mesh = MeshStore::new();
        // front and back faces joined across the top
        let lp = make_loop(
            &mut mesh,
            &[
                [0.25, 0.0, 0.5],
                [0.25, 0.0, 1.0],
                [0.25, 1.0, 1.0],
                [0.25, 1.0, 0.5],
                [0.75, 1.0, 0.5],
                [0.75, 1.0, 1.0],
                [0.75, 0.0, 1.0],
                [0.75, 0.0, 0.5],
            ],
        );
        let p = lp.points().to_vec();
        let split = LoopSplitter::new(unit_box()).split(&lp, &mut mesh).unwrap();

        assert_eq!(split.loops.len(), 3);
        // the forward walk 1 -> 6 crosses index 2, so it runs backwards
        assert_eq!(split.loops[0].points(), &[p[6], p[7], p[0], p[1]]);
        assert_eq!(split.loops[1].points(), &[p[2], p[3], p[4], p[5]]);
        assert_eq!(split.loops[2].points(), &[p[1], p[2], p[5], p[6]]);
        assert_eq!(
            split.chords,
            vec![Chord::new(p[1], p[6]), Chord::new(p[2], p[5])]
        );
        for sub in &split.loops {
            assert!(sub.is_coplanar(&mesh).unwrap().is_some());
        }
    }

    #[test]
    fn interleaved_pairs_cannot_be_walked() {
        let mut mesh = MeshStore::new();
        // sorted along x the pairs are (0, 4) and (2, 6); both walks of the
        // first pair cross a transition point
        let lp = make_loop(
            &mut mesh,
            &[
                [0.2, 0.0, 1.0],
                [0.3, 0.5, 1.0],
                [0.6, 0.0, 1.0],
                [0.5, 0.0, 0.5],
                [0.4, 0.0, 1.0],
                [0.5, 0.5, 1.0],
                [0.8, 0.0, 1.0],
                [0.5, 0.0, 0.3],
            ],
        );
        let err = LoopSplitter::new(unit_box()).split(&lp, &mut mesh).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedSplitConfiguration);
        assert!(matches!(
            err,
            crate::error::LoopfillError::Split(SplitError::CannotSplit { start: 0, stop: 4 })
        ));
    }

    #[test]
    fn edges_without_a_common_corner_are_refused() {
        let mut mesh = MeshStore::new();
        let lp = make_loop(
            &mut mesh,
            &[
                [0.5, 0.0, 0.0],
                [0.5, 0.5, 0.5],
                [0.5, 1.0, 1.0],
                [0.2, 0.6, 0.8],
                [0.0, 0.5, 1.0],
                [0.3, 0.2, 0.4],
            ],
        );
        let edges = LoopSplitter::new(unit_box()).transition_points(&lp, &mesh).unwrap();
        assert_eq!(
            edges.keys().copied().collect::<Vec<_>>(),
            vec![BoxEdge::ZminYmin, BoxEdge::ZmaxYmax, BoxEdge::XminZmax]
        );

        let before = mesh.shared_vertex_count();
        let err = LoopSplitter::new(unit_box()).split(&lp, &mut mesh).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedSplitConfiguration);
        assert!(matches!(
            err,
            crate::error::LoopfillError::Split(SplitError::UnknownCorner { .. })
        ));
        assert_eq!(mesh.shared_vertex_count(), before);
    }

    #[test]
    fn odd_edge_count_is_refused() {
        let mut mesh = MeshStore::new();
        let lp = make_loop(
            &mut mesh,
            &[
                [0.25, 0.0, 1.0],
                [0.5, 0.0, 1.0],
                [0.75, 0.0, 1.0],
                [0.5, 0.5, 1.0],
            ],
        );
        let err = LoopSplitter::new(unit_box()).split(&lp, &mut mesh).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedSplitConfiguration);
        assert!(matches!(
            err,
            crate::error::LoopfillError::Split(SplitError::OddTransitionCount { count: 3, .. })
        ));
    }

    #[test]
    fn loop_around_a_corner_uses_the_box_corner() {
        let mut mesh = MeshStore::new();
        let lp = make_loop(
            &mut mesh,
            &[
                [0.5, 1.0, 1.0],
                [0.6, 0.6, 1.0],
                [1.0, 0.5, 1.0],
                [1.0, 0.6, 0.6],
                [1.0, 1.0, 0.5],
                [0.6, 1.0, 0.6],
            ],
        );
        let p = lp.points().to_vec();
        let before = mesh.shared_vertex_count();
        let split = LoopSplitter::new(unit_box()).split(&lp, &mut mesh).unwrap();
        assert_eq!(mesh.shared_vertex_count(), before + 1);

        let corner = mesh.find_shared_vertex(&Point3::new(1.0, 1.0, 1.0)).unwrap();
        assert_eq!(split.loops.len(), 3);
        assert_eq!(split.loops[0].points(), &[corner, p[4], p[5], p[0]]);
        assert_eq!(split.loops[1].points(), &[corner, p[2], p[3], p[4]]);
        assert_eq!(split.loops[2].points(), &[corner, p[0], p[1], p[2]]);
        assert_eq!(split.chords.len(), 3);
        assert!(split.chords.iter().all(|c| c.a == corner));
        for sub in &split.loops {
            assert!(sub.is_coplanar(&mesh).unwrap().is_some());
        }
    }

    #[test]
    fn triple_edge_needs_one_point_per_edge() {
        let mut mesh = MeshStore::new();
        let lp = make_loop(
            &mut mesh,
            &[
                [0.5, 1.0, 1.0],
                [0.3, 1.0, 1.0],
                [0.6, 0.6, 1.0],
                [1.0, 0.5, 1.0],
                [1.0, 0.6, 0.6],
                [1.0, 1.0, 0.5],
                [0.6, 1.0, 0.6],
            ],
        );
        let err = LoopSplitter::new(unit_box()).split(&lp, &mut mesh).unwrap_err();
        assert!(matches!(
            err,
            crate::error::LoopfillError::Split(SplitError::AmbiguousTripleEdge { .. })
        ));
    }

    #[test]
    fn edge_counts_outside_one_to_three_are_refused() {
        let mut mesh = MeshStore::new();
        let inner = make_loop(
            &mut mesh,
            &[[0.2, 0.2, 1.0], [0.8, 0.2, 1.0], [0.5, 0.8, 1.0]],
        );
        let err = LoopSplitter::new(unit_box()).split(&inner, &mut mesh).unwrap_err();
        assert!(matches!(
            err,
            crate::error::LoopfillError::Split(SplitError::NoTransitionPoints)
        ));

        // one point on each of four top edges
        let wide = make_loop(
            &mut mesh,
            &[[0.5, 0.0, 1.0], [1.0, 0.5, 1.0], [0.5, 1.0, 1.0], [0.0, 0.5, 1.0]],
        );
        let err = LoopSplitter::new(unit_box()).split(&wide, &mut mesh).unwrap_err();
        assert!(matches!(
            err,
            crate::error::LoopfillError::Split(SplitError::TooManyEdges { count: 4 })
        ));
    }

    #[test]
    fn transition_points_are_grouped_by_edge() {
        let mut mesh = MeshStore::new();
        let lp = make_loop(
            &mut mesh,
            &[
                [0.25, 0.0, 1.0],
                [0.25, 0.5, 1.0],
                [0.75, 0.5, 1.0],
                [0.75, 0.0, 1.0],
            ],
        );
        let edges = LoopSplitter::new(unit_box())
            .transition_points(&lp, &mesh)
            .unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[&BoxEdge::ZmaxYmin], vec![0, 3]);
    }
}
