use tracing::debug;

use crate::error::TriangulationError;
use crate::math::{Point2, Vector2};

use super::trapezoid::Trapezoid;
use super::trapezoidation::Trapezoidation;
use super::TriResult;

/// Splices a vertex can take part in; each diagonal uses one more.
const MAX_VERTEX_SLOTS: usize = 4;

/// Element of the doubly linked monotone chains.
#[derive(Debug, Clone)]
pub struct ChainElement {
    pub vnum: usize,
    pub next: usize,
    pub prev: usize,
}

/// Per-vertex record of which chain elements start at the vertex.
#[derive(Debug, Clone)]
pub struct VertexChain {
    pub pt: Point2,
    /// Vertex that follows along each chain through this vertex.
    pub vnext: [Option<usize>; MAX_VERTEX_SLOTS],
    /// Chain element of each slot.
    pub vpos: [usize; MAX_VERTEX_SLOTS],
    pub nextfree: usize,
}

/// Set of y-monotone polygons covering the interior.
#[derive(Debug, Clone)]
pub struct MonotonePolygons {
    pub(crate) chain: Vec<ChainElement>,
    pub(crate) vertices: Vec<VertexChain>,
    /// One chain element per polygon.
    pub(crate) anchors: Vec<usize>,
}

impl MonotonePolygons {
    /// Decomposes the interior of `trapezoidation` into monotone polygons.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::InvalidInput` when no interior trapezoid
    /// exists, and `IndexOutOfRange` or `BrokenLink` for inconsistent tables.
    pub fn extract(trapezoidation: &Trapezoidation) -> TriResult<Self> {
        let mut extractor = Extractor::new(trapezoidation);
        extractor.run()?;
        let polygons = Self {
            chain: extractor.chain,
            vertices: extractor.vertices,
            anchors: extractor.anchors,
        };
        debug!(polygons = polygons.len(), "monotone decomposition");
        Ok(polygons)
    }

    /// Number of monotone polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Whether there are no polygons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Vertex numbers of polygon `index`, in chain order.
    ///
    /// Walks at most one lap of the chain.
    #[must_use]
    pub fn polygon(&self, index: usize) -> Vec<usize> {
        let Some(&start) = self.anchors.get(index) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut p = start;
        loop {
            let Some(e) = self.chain.get(p) else {
                break;
            };
            out.push(e.vnum);
            p = e.next;
            if p == start || out.len() > self.chain.len() {
                break;
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Approach {
    FromAbove,
    FromBelow,
}

#[derive(Debug, Clone, Copy)]
enum Chain {
    Current,
    New,
}

/// Pending trapezoid visit.
struct Visit {
    mcur: usize,
    trnum: usize,
    from: usize,
    dir: Approach,
}

/// What to do with one trapezoid: an optional diagonal, then the neighbours
/// to visit in order.
struct Plan {
    split: Option<(usize, usize)>,
    visits: Vec<(Chain, Option<usize>, Approach)>,
}

fn up(chain: Chain, t: Option<usize>) -> (Chain, Option<usize>, Approach) {
    (chain, t, Approach::FromBelow)
}

fn down(chain: Chain, t: Option<usize>) -> (Chain, Option<usize>, Approach) {
    (chain, t, Approach::FromAbove)
}

struct Extractor<'a> {
    trap: &'a Trapezoidation,
    chain: Vec<ChainElement>,
    vertices: Vec<VertexChain>,
    anchors: Vec<usize>,
    visited: Vec<bool>,
}

impl<'a> Extractor<'a> {
    fn new(trap: &'a Trapezoidation) -> Self {
        let segments = trap.segments();
        let n = segments.len();
        let mut chain = Vec::with_capacity(3 * n);
        let mut vertices = Vec::with_capacity(n);
        for (i, s) in segments.iter().enumerate() {
            chain.push(ChainElement {
                vnum: i,
                next: s.next,
                prev: s.prev,
            });
            vertices.push(VertexChain {
                pt: s.v0,
                vnext: [Some(s.next), None, None, None],
                vpos: [i, 0, 0, 0],
                nextfree: 1,
            });
        }
        Self {
            trap,
            chain,
            vertices,
            anchors: vec![0],
            visited: vec![false; trap.trapezoids().len()],
        }
    }

    fn run(&mut self) -> TriResult<()> {
        let seed = self.find_seed()?;
        let start = self.trap.trapezoid(seed)?;
        let first = if let Some(u0) = start.u0 {
            Visit {
                mcur: 0,
                trnum: seed,
                from: u0,
                dir: Approach::FromAbove,
            }
        } else if let Some(d0) = start.d0 {
            Visit {
                mcur: 0,
                trnum: seed,
                from: d0,
                dir: Approach::FromBelow,
            }
        } else {
            return Err(TriangulationError::BrokenLink {
                table: "trapezoid",
                detail: "seed trapezoid has no neighbours",
            });
        };
        self.traverse(first)
    }

    /// First valid trapezoid that is inside and triangular.
    fn find_seed(&self) -> TriResult<usize> {
        for (i, t) in self.trap.trapezoids().iter_valid() {
            if t.is_triangular() && self.trap.is_inside(i)? {
                return Ok(i);
            }
        }
        Err(TriangulationError::InvalidInput(
            "no interior trapezoid; check contour orientation".into(),
        ))
    }

    /// Depth-first walk over the trapezoid graph.
    ///
    /// Children are pushed in reverse so they pop in the same order a
    /// recursive walk would visit them.
    fn traverse(&mut self, first: Visit) -> TriResult<()> {
        let mut stack = vec![first];
        while let Some(Visit {
            mcur,
            trnum,
            from,
            dir,
        }) = stack.pop()
        {
            let seen = self
                .visited
                .get_mut(trnum)
                .ok_or(TriangulationError::IndexOutOfRange {
                    table: "visited",
                    index: trnum,
                    len: self.trap.trapezoids().len(),
                })?;
            if *seen {
                continue;
            }
            *seen = true;

            let t = self.trap.trapezoid(trnum)?.clone();
            let plan = self.plan(&t, from, dir)?;
            let mnew = match plan.split {
                Some((v0, v1)) => self.make_new_monotone_poly(mcur, v0, v1)?,
                None => mcur,
            };
            for &(chain, next, approach) in plan.visits.iter().rev() {
                if let Some(next) = next {
                    stack.push(Visit {
                        mcur: match chain {
                            Chain::Current => mcur,
                            Chain::New => mnew,
                        },
                        trnum: next,
                        from: trnum,
                        dir: approach,
                    });
                }
            }
        }
        Ok(())
    }

    fn lseg(t: &Trapezoid) -> TriResult<usize> {
        t.lseg.ok_or(TriangulationError::BrokenLink {
            table: "trapezoid",
            detail: "interior trapezoid without a left segment",
        })
    }

    fn rseg(t: &Trapezoid) -> TriResult<usize> {
        t.rseg.ok_or(TriangulationError::BrokenLink {
            table: "trapezoid",
            detail: "interior trapezoid without a right segment",
        })
    }

    fn lseg_of(&self, index: usize) -> TriResult<usize> {
        Self::lseg(self.trap.trapezoid(index)?)
    }

    fn rseg_of(&self, index: usize) -> TriResult<usize> {
        Self::rseg(self.trap.trapezoid(index)?)
    }

    /// Classifies `t` by its neighbour pattern and picks the diagonal to cut.
    #[allow(clippy::too_many_lines)]
    fn plan(&self, t: &Trapezoid, from: usize, dir: Approach) -> TriResult<Plan> {
        use Chain::{Current as Cur, New};

        let segments = self.trap.segments();
        let from = Some(from);
        let (u0, u1, d0, d1) = (t.u0, t.u1, t.d0, t.d1);
        let pass = |visits| Plan {
            split: None,
            visits,
        };
        let cut = |v0, v1, visits| Plan {
            split: Some((v0, v1)),
            visits,
        };

        let plan = if u0.is_none() && u1.is_none() {
            if let (Some(_), Some(dd1)) = (d0, d1) {
                // downward opening triangle
                let v0 = self.lseg_of(dd1)?;
                let v1 = Self::lseg(t)?;
                if from == d1 {
                    cut(v1, v0, vec![down(Cur, d1), down(New, d0)])
                } else {
                    cut(v0, v1, vec![down(Cur, d0), down(New, d1)])
                }
            } else {
                pass(vec![up(Cur, u0), up(Cur, u1), down(Cur, d0), down(Cur, d1)])
            }
        } else if d0.is_none() && d1.is_none() {
            if let (Some(uu0), Some(_)) = (u0, u1) {
                // upward opening triangle
                let v0 = Self::rseg(t)?;
                let v1 = self.rseg_of(uu0)?;
                if from == u1 {
                    cut(v1, v0, vec![up(Cur, u1), up(New, u0)])
                } else {
                    cut(v0, v1, vec![up(Cur, u0), up(New, u1)])
                }
            } else {
                pass(vec![up(Cur, u0), up(Cur, u1), down(Cur, d0), down(Cur, d1)])
            }
        } else if let (Some(uu0), Some(_)) = (u0, u1) {
            if let (Some(_), Some(dd1)) = (d0, d1) {
                // downward and upward cusps
                let v0 = self.lseg_of(dd1)?;
                let v1 = self.rseg_of(uu0)?;
                if (dir == Approach::FromBelow && d1 == from) || (dir == Approach::FromAbove && u1 == from) {
                    cut(
                        v1,
                        v0,
                        vec![up(Cur, u1), down(Cur, d1), up(New, u0), down(New, d0)],
                    )
                } else {
                    cut(
                        v0,
                        v1,
                        vec![up(Cur, u0), down(Cur, d0), up(New, u1), down(New, d1)],
                    )
                }
            } else {
                // downward cusp only
                let lseg = Self::lseg(t)?;
                let left = segments.get(lseg)?;
                if t.lo == left.v1 {
                    let v0 = self.rseg_of(uu0)?;
                    let v1 = left.next;
                    if dir == Approach::FromAbove && u0 == from {
                        cut(
                            v1,
                            v0,
                            vec![up(Cur, u0), down(New, d0), up(New, u1), down(New, d1)],
                        )
                    } else {
                        cut(
                            v0,
                            v1,
                            vec![up(Cur, u1), down(Cur, d0), down(Cur, d1), up(New, u0)],
                        )
                    }
                } else {
                    let v0 = Self::rseg(t)?;
                    let v1 = self.rseg_of(uu0)?;
                    if dir == Approach::FromAbove && u1 == from {
                        cut(
                            v1,
                            v0,
                            vec![up(Cur, u1), down(New, d1), down(New, d0), up(New, u0)],
                        )
                    } else {
                        cut(
                            v0,
                            v1,
                            vec![up(Cur, u0), down(Cur, d0), down(Cur, d1), up(New, u1)],
                        )
                    }
                }
            }
        } else if let (Some(_), Some(dd1)) = (d0, d1) {
            // upward cusp only
            let lseg = Self::lseg(t)?;
            if t.hi == segments.get(lseg)?.v0 {
                let v0 = self.lseg_of(dd1)?;
                let v1 = lseg;
                if dir == Approach::FromBelow && d0 == from {
                    cut(
                        v0,
                        v1,
                        vec![down(Cur, d0), up(New, u0), up(New, u1), down(New, d1)],
                    )
                } else {
                    cut(
                        v1,
                        v0,
                        vec![up(Cur, u1), down(Cur, d1), up(Cur, u0), down(New, d0)],
                    )
                }
            } else {
                let v0 = self.lseg_of(dd1)?;
                let v1 = segments.get(Self::rseg(t)?)?.next;
                if dir == Approach::FromBelow && d1 == from {
                    cut(
                        v1,
                        v0,
                        vec![down(Cur, d1), up(New, u1), up(New, u0), down(New, d0)],
                    )
                } else {
                    cut(
                        v0,
                        v1,
                        vec![up(Cur, u0), down(Cur, d0), up(Cur, u1), down(New, d1)],
                    )
                }
            }
        } else {
            // no cusp: one neighbour above and one below
            let lseg = Self::lseg(t)?;
            let rseg = Self::rseg(t)?;
            let left = segments.get(lseg)?;
            let right = segments.get(rseg)?;
            let diagonal = if t.hi == left.v0 && t.lo == right.v0 {
                Some((rseg, lseg))
            } else if t.hi == right.v1 && t.lo == left.v1 {
                Some((right.next, left.next))
            } else {
                None
            };
            match diagonal {
                Some((v0, v1)) if dir == Approach::FromAbove => cut(
                    v1,
                    v0,
                    vec![up(Cur, u0), up(Cur, u1), down(New, d1), down(New, d0)],
                ),
                Some((v0, v1)) => cut(
                    v0,
                    v1,
                    vec![down(Cur, d1), down(Cur, d0), up(New, u0), up(New, u1)],
                ),
                None => pass(vec![up(Cur, u0), down(Cur, d0), up(Cur, u1), down(Cur, d1)]),
            }
        };
        Ok(plan)
    }

    fn vertex(&self, v: usize) -> TriResult<&VertexChain> {
        self.vertices
            .get(v)
            .ok_or(TriangulationError::IndexOutOfRange {
                table: "vertex chain",
                index: v,
                len: self.vertices.len(),
            })
    }

    fn vertex_mut(&mut self, v: usize) -> TriResult<&mut VertexChain> {
        let len = self.vertices.len();
        self.vertices
            .get_mut(v)
            .ok_or(TriangulationError::IndexOutOfRange {
                table: "vertex chain",
                index: v,
                len,
            })
    }

    fn element(&self, i: usize) -> TriResult<&ChainElement> {
        self.chain.get(i).ok_or(TriangulationError::IndexOutOfRange {
            table: "monotone chain",
            index: i,
            len: self.chain.len(),
        })
    }

    fn element_mut(&mut self, i: usize) -> TriResult<&mut ChainElement> {
        let len = self.chain.len();
        self.chain
            .get_mut(i)
            .ok_or(TriangulationError::IndexOutOfRange {
                table: "monotone chain",
                index: i,
                len,
            })
    }

    /// Slot of `from` whose outgoing chain turns least before reaching `to`.
    fn best_slot(&self, from: usize, to: usize) -> TriResult<usize> {
        let origin = self.vertex(from)?;
        let target = self.vertex(to)?.pt;
        let mut best = 0;
        let mut best_angle = -4.0;
        for (slot, next) in origin.vnext.iter().enumerate() {
            let Some(next) = *next else {
                continue;
            };
            let angle = get_angle(&origin.pt, &self.vertex(next)?.pt, &target);
            if angle > best_angle {
                best_angle = angle;
                best = slot;
            }
        }
        Ok(best)
    }

    /// Cuts the chain `mcur` along the diagonal `v0 -> v1`.
    ///
    /// The two halves get fresh chain elements for `v0` and `v1`; `mcur` keeps
    /// one half and the returned polygon index names the other.
    fn make_new_monotone_poly(&mut self, mcur: usize, v0: usize, v1: usize) -> TriResult<usize> {
        let ip = self.best_slot(v0, v1)?;
        let iq = self.best_slot(v1, v0)?;
        let p = self.vertex(v0)?.vpos[ip];
        let q = self.vertex(v1)?.vpos[iq];

        let i = self.chain.len();
        let j = i + 1;
        let p_next = self.element(p)?.next;
        self.chain.push(ChainElement {
            vnum: v0,
            next: p_next,
            prev: j,
        });
        self.chain.push(ChainElement {
            vnum: v1,
            next: i,
            prev: 0,
        });
        self.element_mut(p_next)?.prev = i;
        let q_prev = self.element(q)?.prev;
        self.element_mut(j)?.prev = q_prev;
        self.element_mut(q_prev)?.next = j;
        self.element_mut(p)?.next = q;
        self.element_mut(q)?.prev = p;

        let after_i = self.element(p_next)?.vnum;
        {
            let a = self.vertex_mut(v0)?;
            let nf0 = a.nextfree;
            if nf0 >= MAX_VERTEX_SLOTS {
                return Err(TriangulationError::IndexOutOfRange {
                    table: "vertex slots",
                    index: nf0,
                    len: MAX_VERTEX_SLOTS,
                });
            }
            a.vnext[ip] = Some(v1);
            a.vpos[nf0] = i;
            a.vnext[nf0] = Some(after_i);
            a.nextfree += 1;
        }
        {
            let b = self.vertex_mut(v1)?;
            let nf1 = b.nextfree;
            if nf1 >= MAX_VERTEX_SLOTS {
                return Err(TriangulationError::IndexOutOfRange {
                    table: "vertex slots",
                    index: nf1,
                    len: MAX_VERTEX_SLOTS,
                });
            }
            b.vpos[nf1] = j;
            b.vnext[nf1] = Some(v0);
            b.nextfree += 1;
        }

        let mnew = self.anchors.len();
        self.anchors.push(i);
        let slot = self
            .anchors
            .get_mut(mcur)
            .ok_or(TriangulationError::IndexOutOfRange {
                table: "monotone anchor",
                index: mcur,
                len: mnew,
            })?;
        *slot = p;
        Ok(mnew)
    }
}

/// Monotone key of the turn `vp0 -> vpnext` against `vp0 -> vp1`.
///
/// Counter-clockwise turns map to the cosine in `[-1, 1]`, clockwise ones
/// below `-1`, so larger means a tighter left turn.
fn get_angle(vp0: &Point2, vpnext: &Point2, vp1: &Point2) -> f64 {
    let v0: Vector2 = vpnext - vp0;
    let v1: Vector2 = vp1 - vp0;
    let cos = v0.dot(&v1) / v0.norm() / v1.norm();
    if v0.perp(&v1) >= 0.0 {
        cos
    } else {
        -cos - 2.0
    }
}
