use tracing::debug;

use crate::error::Result;
use crate::math::Point3;
use crate::topology::{MeshEditor, SharedVertexId};

use super::BoundaryLoop;

/// A straight edge the splitter introduced between two loop vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chord {
    pub a: SharedVertexId,
    pub b: SharedVertexId,
}

impl Chord {
    #[must_use]
    pub fn new(a: SharedVertexId, b: SharedVertexId) -> Self {
        Self { a, b }
    }
}

/// Parameters along `[0, 1]` that bisect a chord of `length` until every
/// piece is at most `max_length` long, in increasing order.
#[must_use]
pub fn bisection_params(length: f64, max_length: f64) -> Vec<f64> {
    if max_length.is_nan() || max_length <= 0.0 || length <= max_length {
        return Vec::new();
    }
    let mut params = Vec::new();
    let mut work = vec![(0.0_f64, 1.0_f64)];
    while let Some((t0, t1)) = work.pop() {
        if (t1 - t0) * length <= max_length {
            continue;
        }
        let mid = 0.5 * (t0 + t1);
        params.push(mid);
        work.push((t0, mid));
        work.push((mid, t1));
    }
    params.sort_by(f64::total_cmp);
    params
}

/// Subdivides every chord longer than `max_length` and threads the new
/// points into each loop where the chord's endpoints are neighbours.
///
/// New points come from the mesh factory. Returns how many were created.
///
/// # Errors
///
/// Returns `ErrorKind::IndexOutOfRange` for a stale chord endpoint.
pub fn densify(
    loops: &mut [BoundaryLoop],
    chords: &[Chord],
    max_length: f64,
    mesh: &mut impl MeshEditor,
) -> Result<usize> {
    let mut created = 0usize;
    for chord in chords {
        let pa = mesh.position_of(chord.a)?;
        let pb = mesh.position_of(chord.b)?;
        let params = bisection_params((pb - pa).norm(), max_length);
        if params.is_empty() {
            continue;
        }

        let inserted: Vec<(Point3, SharedVertexId)> = params
            .iter()
            .map(|&t| {
                let p = pa + (pb - pa) * t;
                (p, mesh.add_shared_vertex(p, true))
            })
            .collect();
        created += inserted.len();

        for lp in loops.iter_mut() {
            insert_between(lp.points_mut(), chord, &inserted, &pa, &pb);
            for inner in lp.inner_loops_mut() {
                insert_between(inner, chord, &inserted, &pa, &pb);
            }
        }
    }
    debug!(chords = chords.len(), created, max_length, "chords densified");
    Ok(created)
}

/// Splices the new points between every adjacent occurrence of the chord
/// endpoints, nearest to the preceding endpoint first.
fn insert_between(
    points: &mut Vec<SharedVertexId>,
    chord: &Chord,
    inserted: &[(Point3, SharedVertexId)],
    pa: &Point3,
    pb: &Point3,
) {
    let mut i = 0usize;
    while i < points.len() {
        let n = points.len();
        let j = (i + 1) % n;
        let preceding = match (points[i], points[j]) {
            (x, y) if x == chord.a && y == chord.b => Some(pa),
            (x, y) if x == chord.b && y == chord.a => Some(pb),
            _ => None,
        };
        let Some(from) = preceding else {
            i += 1;
            continue;
        };

        let mut run: Vec<&(Point3, SharedVertexId)> = inserted.iter().collect();
        run.sort_by(|l, r| (l.0 - from).norm().total_cmp(&(r.0 - from).norm()));
        let ids: Vec<SharedVertexId> = run.into_iter().map(|(_, id)| *id).collect();
        let count = ids.len();
        // j == 0 closes the loop; appending keeps the order after the last point
        let at = if j == 0 { n } else { j };
        points.splice(at..at, ids);
        i += count + 1;
    }
}
