use crate::error::TriangulationError;
use crate::math::polygon_2d::cross;

use crate::math::Point2;

use super::monotone::{ChainElement, MonotonePolygons};
use super::segment::{greater_than, less_than};
use super::TriResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SingleEdgeSide {
    Left,
    Right,
}

/// Triangulates every monotone polygon, returning vertex index triples.
///
/// # Errors
///
/// Returns `TriangulationError::ReflexStackOverflow` when a chain outgrows
/// the reflex stack, `InvalidInput` for a degenerate chain, and
/// `IndexOutOfRange` for an inconsistent chain table.
pub fn triangulate_monotone_polygons(polygons: &MonotonePolygons) -> TriResult<Vec<[usize; 3]>> {
    let chain = &polygons.chain;
    let mut marked = vec![false; chain.len()];
    let mut triangles = Vec::with_capacity(polygons.vertices.len());

    for &start in &polygons.anchors {
        let first = element(polygons, start)?;
        let vfirst = first.vnum;
        let mut ymax = point(polygons, vfirst)?;
        let mut ymin = ymax;
        let mut posmax = start;
        mark(&mut marked, start)?;

        let mut p = first.next;
        let mut vcount = 1usize;
        let mut processed = false;
        loop {
            let v = element(polygons, p)?.vnum;
            if v == vfirst {
                break;
            }
            if *marked.get(p).unwrap_or(&true) {
                processed = true;
                break;
            }
            mark(&mut marked, p)?;
            let pt = point(polygons, v)?;
            if greater_than(&pt, &ymax) {
                ymax = pt;
                posmax = p;
            }
            if less_than(&pt, &ymin) {
                ymin = pt;
            }
            p = element(polygons, p)?.next;
            vcount += 1;
        }

        if processed {
            continue;
        }

        if vcount == 3 {
            let e = element(polygons, p)?;
            triangles.push([
                e.vnum,
                element(polygons, e.next)?.vnum,
                element(polygons, e.prev)?.vnum,
            ]);
        } else {
            let after_top = element(polygons, element(polygons, posmax)?.next)?.vnum;
            let side = if point(polygons, after_top)? == ymin {
                SingleEdgeSide::Left
            } else {
                SingleEdgeSide::Right
            };
            triangulate_single_polygon(polygons, posmax, side, &mut triangles)?;
        }
    }
    Ok(triangles)
}

/// Reflex-chain sweep of one monotone polygon from its top vertex.
fn triangulate_single_polygon(
    polygons: &MonotonePolygons,
    posmax: usize,
    side: SingleEdgeSide,
    out: &mut Vec<[usize; 3]>,
) -> TriResult<()> {
    let capacity = polygons.vertices.len();
    let mut reflex = Vec::with_capacity(capacity);

    let top = element(polygons, posmax)?;
    let (mut vpos, endv) = match side {
        SingleEdgeSide::Right => {
            let second = element(polygons, top.next)?;
            reflex.push(top.vnum);
            reflex.push(second.vnum);
            (second.next, element(polygons, top.prev)?.vnum)
        }
        SingleEdgeSide::Left => {
            let second = element(polygons, top.next)?;
            let third = element(polygons, second.next)?;
            reflex.push(second.vnum);
            reflex.push(third.vnum);
            (third.next, top.vnum)
        }
    };
    let mut v = element(polygons, vpos)?.vnum;

    while v != endv || reflex.len() > 2 {
        if reflex.len() > capacity {
            return Err(TriangulationError::ReflexStackOverflow { capacity });
        }
        let convex = match reflex.as_slice() {
            [.., a, b] => {
                let turn = cross(&point(polygons, v)?, &point(polygons, *a)?, &point(polygons, *b)?);
                (turn > 0.0).then_some((*a, *b))
            }
            _ => None,
        };
        if let Some((a, b)) = convex {
            out.push([a, b, v]);
            reflex.pop();
        } else {
            reflex.push(v);
            vpos = element(polygons, vpos)?.next;
            v = element(polygons, vpos)?.vnum;
        }
    }

    match reflex.as_slice() {
        [.., a, b] => {
            out.push([*a, *b, v]);
            Ok(())
        }
        _ => Err(TriangulationError::InvalidInput(
            "monotone chain collapsed before its last vertex".into(),
        )),
    }
}

fn element(polygons: &MonotonePolygons, index: usize) -> TriResult<&ChainElement> {
    polygons
        .chain
        .get(index)
        .ok_or(TriangulationError::IndexOutOfRange {
            table: "monotone chain",
            index,
            len: polygons.chain.len(),
        })
}

fn point(polygons: &MonotonePolygons, vnum: usize) -> TriResult<Point2> {
    polygons
        .vertices
        .get(vnum)
        .map(|v| v.pt)
        .ok_or(TriangulationError::IndexOutOfRange {
            table: "vertex chain",
            index: vnum,
            len: polygons.vertices.len(),
        })
}

fn mark(marked: &mut [bool], index: usize) -> TriResult<()> {
    let len = marked.len();
    let flag = marked.get_mut(index).ok_or(TriangulationError::IndexOutOfRange {
        table: "monotone chain",
        index,
        len,
    })?;
    *flag = true;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::triangulation::segment::SegmentTable;
    use crate::triangulation::trapezoidation::Trapezoidation;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn triangulate(contours: &[&[Point2]]) -> Vec<[usize; 3]> {
        let segments = SegmentTable::from_contours(contours).unwrap();
        let n = segments.len();
        let trap = Trapezoidation::build(segments, &(0..n).collect::<Vec<_>>()).unwrap();
        let polys = MonotonePolygons::extract(&trap).unwrap();
        triangulate_monotone_polygons(&polys).unwrap()
    }

    #[test]
    fn triangle_is_emitted_once() {
        let tri = vec![p(0.0, 0.0), p(2.0, 0.0), p(1.0, 1.5)];
        let out = triangulate(&[&tri]);
        assert_eq!(out.len(), 1);
        let mut t = out[0];
        t.sort_unstable();
        assert_eq!(t, [0, 1, 2]);
    }

    #[test]
    fn convex_fan_count() {
        // regular-ish hexagon
        let hex = vec![
            p(2.0, 0.0),
            p(1.0, 1.7),
            p(-1.0, 1.7),
            p(-2.0, 0.1),
            p(-1.0, -1.7),
            p(1.1, -1.7),
        ];
        assert_eq!(triangulate(&[&hex]).len(), 4);
    }

    #[test]
    fn zigzag_chain_uses_the_reflex_stack() {
        // right side is a single edge, left side zigzags
        let poly = vec![
            p(0.0, 0.0),
            p(4.0, -1.0),
            p(4.5, 6.0),
            p(1.0, 5.0),
            p(2.0, 4.0),
            p(1.0, 3.0),
            p(2.0, 2.0),
            p(1.0, 1.0),
        ];
        let out = triangulate(&[&poly]);
        assert_eq!(out.len(), poly.len() - 2);
        for t in &out {
            assert!(t[0] != t[1] && t[1] != t[2] && t[0] != t[2]);
        }
    }
}
