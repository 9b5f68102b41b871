use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::error::TriangulationError;
use crate::math::Point2;

use super::query::{NodeKind, QueryDag};
use super::segment::{greater_than, greater_than_equal_to, less_than, Endpoint, Segment, SegmentTable};
use super::trapezoid::{Side, Trapezoid, TrapezoidTable};
use super::TriResult;

/// Number of times `log2` can be applied to `n` before it drops below 1.
#[allow(clippy::cast_precision_loss)]
fn log_star(n: usize) -> usize {
    let mut v = n as f64;
    let mut i = 0usize;
    while v >= 1.0 {
        v = v.log2();
        i += 1;
    }
    i.saturating_sub(1)
}

/// Segments inserted by the end of phase `h`: `ceil(n / log2^(h)(n))`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn phase_end(n: usize, h: usize) -> usize {
    let mut v = n as f64;
    for _ in 0..h {
        v = v.log2();
    }
    ((n as f64 / v).ceil() as usize).min(n)
}

/// Canonicalized view of the segment being inserted.
struct Insertion {
    segnum: usize,
    /// Copy of the segment with `v0` above `v1`.
    segment: Segment,
    is_swapped: bool,
    /// The lower endpoint was already present before this insertion.
    tribot: bool,
    tlast: usize,
}

/// Trapezoidal decomposition of a set of contours plus its query DAG.
///
/// All tables live on the value, so independent builds never share state.
#[derive(Debug, Clone)]
pub struct Trapezoidation {
    segments: SegmentTable,
    trapezoids: TrapezoidTable,
    dag: QueryDag,
    root: usize,
}

impl Trapezoidation {
    /// Inserts every segment of `segments` in the given order.
    ///
    /// `order` must be a permutation of `0..segments.len()`. Between the
    /// log*(n) insertion phases every pending segment refreshes the DAG nodes
    /// its endpoints are located from.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::InvalidInput` when `order` is not a
    /// permutation, and `IndexOutOfRange` or `BrokenLink` when an internal
    /// table reference is stale.
    pub fn build(segments: SegmentTable, order: &[usize]) -> TriResult<Self> {
        let n = segments.len();
        check_permutation(order, n)?;

        let mut this = Self {
            trapezoids: TrapezoidTable::with_segments(n),
            dag: QueryDag::with_segments(n),
            segments,
            root: 0,
        };

        this.root = this.init_query_structure(order[0])?;
        for i in 0..n {
            let seg = this.segments.get_mut(i)?;
            seg.root0 = this.root;
            seg.root1 = this.root;
        }

        let mut next = 1;
        for h in 1..=log_star(n) {
            let end = phase_end(n, h);
            while next < end {
                this.add_segment(order[next])?;
                next += 1;
            }
            for i in 0..n {
                this.find_new_roots(i)?;
            }
        }
        while next < n {
            this.add_segment(order[next])?;
            next += 1;
        }

        debug!(
            segments = n,
            trapezoids = this.trapezoids.len(),
            nodes = this.dag.len(),
            "trapezoidation built"
        );
        Ok(this)
    }

    /// The boundary segments.
    #[must_use]
    pub fn segments(&self) -> &SegmentTable {
        &self.segments
    }

    /// The trapezoid table, including invalidated entries.
    #[must_use]
    pub fn trapezoids(&self) -> &TrapezoidTable {
        &self.trapezoids
    }

    /// Number of DAG nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.dag.len()
    }

    /// Trapezoid containing `point`.
    ///
    /// # Errors
    ///
    /// Returns an error when the DAG references a missing or merged entry.
    pub fn locate(&self, point: &Point2) -> TriResult<usize> {
        self.locate_endpoint(point, point, self.root)
    }

    /// Whether the trapezoid at `index` lies inside the polygon.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::IndexOutOfRange` for an unknown index.
    pub fn is_inside(&self, index: usize) -> TriResult<bool> {
        let t = self.trapezoids.get(index)?;
        match (t.valid, t.lseg, t.rseg) {
            (true, Some(_), Some(rseg)) => {
                let s = self.segments.get(rseg)?;
                Ok(greater_than(&s.v1, &s.v0))
            }
            _ => Ok(false),
        }
    }

    /// `(lseg, rseg)` pairs of every inside trapezoid.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::IndexOutOfRange` for a stale segment index.
    pub fn inside_pairs(&self) -> TriResult<BTreeSet<(usize, usize)>> {
        let mut pairs = BTreeSet::new();
        for (i, t) in self.trapezoids.iter_valid() {
            if let (true, Some(l), Some(r)) = (self.is_inside(i)?, t.lseg, t.rseg) {
                pairs.insert((l, r));
            }
        }
        Ok(pairs)
    }

    /// Descends the DAG from `root` to the trapezoid holding `v`.
    ///
    /// `vo` is the other endpoint of the segment `v` belongs to; it decides
    /// the side when `v` lies on a Y-line or is an endpoint of an X-segment.
    #[allow(clippy::float_cmp)]
    pub(crate) fn locate_endpoint(&self, v: &Point2, vo: &Point2, root: usize) -> TriResult<usize> {
        let mut r = root;
        loop {
            match &self.dag.get(r)?.kind {
                NodeKind::Sink { trapezoid } => {
                    self.trapezoids.get_valid(*trapezoid)?;
                    return Ok(*trapezoid);
                }
                NodeKind::Y { yval, left, right } => {
                    r = if greater_than(v, yval) || (v == yval && greater_than(vo, yval)) {
                        *right
                    } else {
                        *left
                    };
                }
                NodeKind::X {
                    segment,
                    left,
                    right,
                } => {
                    let seg = self.segments.get(*segment)?;
                    let goes_left = if *v == seg.v0 || *v == seg.v1 {
                        if v.y == vo.y {
                            vo.x < v.x
                        } else {
                            self.segments.is_left_of(*segment, vo)?
                        }
                    } else {
                        self.segments.is_left_of(*segment, v)?
                    };
                    r = if goes_left { *left } else { *right };
                }
            }
        }
    }

    pub(crate) fn trapezoid(&self, index: usize) -> TriResult<&Trapezoid> {
        self.trapezoids.get(index)
    }

    fn trapezoid_mut(&mut self, index: usize) -> TriResult<&mut Trapezoid> {
        self.trapezoids.get_mut(index)
    }

    /// Splits the unbounded plane with the first segment.
    ///
    /// Produces the top, bottom, middle-left and middle-right trapezoids under
    /// two Y-nodes and one X-node, and returns the root node.
    fn init_query_structure(&mut self, segnum: usize) -> TriResult<usize> {
        let s = self.segments.get(segnum)?.clone();
        let (hi, lo) = if greater_than(&s.v0, &s.v1) {
            (s.v0, s.v1)
        } else {
            (s.v1, s.v0)
        };

        let t1 = self.trapezoids.push(Trapezoid::default());
        let t2 = self.trapezoids.push(Trapezoid::default());
        let t3 = self.trapezoids.push(Trapezoid::default());
        let t4 = self.trapezoids.push(Trapezoid::default());

        let placeholder_y = |yval| NodeKind::Y {
            yval,
            left: 0,
            right: 0,
        };
        let i1 = self.dag.push(placeholder_y(hi), None);
        let i2 = self.dag.push_sink(t4, Some(i1));
        let i3 = self.dag.push(placeholder_y(lo), Some(i1));
        self.dag.replace(
            i1,
            NodeKind::Y {
                yval: hi,
                left: i3,
                right: i2,
            },
        )?;
        let i4 = self.dag.push_sink(t3, Some(i3));
        let i5 = self.dag.push(
            NodeKind::X {
                segment: segnum,
                left: 0,
                right: 0,
            },
            Some(i3),
        );
        self.dag.replace(
            i3,
            NodeKind::Y {
                yval: lo,
                left: i4,
                right: i5,
            },
        )?;
        let i6 = self.dag.push_sink(t1, Some(i5));
        let i7 = self.dag.push_sink(t2, Some(i5));
        self.dag.replace(
            i5,
            NodeKind::X {
                segment: segnum,
                left: i6,
                right: i7,
            },
        )?;

        *self.trapezoid_mut(t1)? = Trapezoid {
            hi,
            lo,
            rseg: Some(segnum),
            u0: Some(t4),
            d0: Some(t3),
            sink: i6,
            ..Trapezoid::default()
        };
        *self.trapezoid_mut(t2)? = Trapezoid {
            hi,
            lo,
            lseg: Some(segnum),
            u0: Some(t4),
            d0: Some(t3),
            sink: i7,
            ..Trapezoid::default()
        };
        *self.trapezoid_mut(t3)? = Trapezoid {
            hi: lo,
            lo: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            u0: Some(t1),
            u1: Some(t2),
            sink: i4,
            ..Trapezoid::default()
        };
        *self.trapezoid_mut(t4)? = Trapezoid {
            hi: Point2::new(f64::INFINITY, f64::INFINITY),
            lo: hi,
            d0: Some(t1),
            d1: Some(t2),
            sink: i2,
            ..Trapezoid::default()
        };

        self.segments.get_mut(segnum)?.is_inserted = true;
        Ok(i1)
    }

    /// Cuts `tu` horizontally at `v` and returns the new lower half.
    fn split_horizontally(&mut self, tu: usize, v: Point2) -> TriResult<usize> {
        let mut lower = self.trapezoid(tu)?.clone();
        lower.hi = v;
        lower.u0 = Some(tu);
        lower.u1 = None;
        let tl = self.trapezoids.push(lower);

        let sk = {
            let upper = self.trapezoid_mut(tu)?;
            upper.lo = v;
            upper.d0 = Some(tl);
            upper.d1 = None;
            upper.sink
        };

        let below = self.trapezoid(tl)?.clone();
        for d in [below.d0, below.d1].into_iter().flatten() {
            let t = self.trapezoid_mut(d)?;
            if t.u0 == Some(tu) {
                t.u0 = Some(tl);
            }
            if t.u1 == Some(tu) {
                t.u1 = Some(tl);
            }
        }

        let i1 = self.dag.push_sink(tu, Some(sk));
        let i2 = self.dag.push_sink(tl, Some(sk));
        self.dag.replace(
            sk,
            NodeKind::Y {
                yval: v,
                left: i2,
                right: i1,
            },
        )?;
        self.trapezoid_mut(tu)?.sink = i1;
        self.trapezoid_mut(tl)?.sink = i2;
        Ok(tl)
    }

    /// Adds one segment: endpoint splits, the downward walk, then merging.
    fn add_segment(&mut self, segnum: usize) -> TriResult<()> {
        let mut s = self.segments.get(segnum)?.clone();
        let is_swapped = greater_than(&s.v1, &s.v0);
        if is_swapped {
            std::mem::swap(&mut s.v0, &mut s.v1);
            std::mem::swap(&mut s.root0, &mut s.root1);
        }
        let (upper_end, lower_end) = if is_swapped {
            (Endpoint::Last, Endpoint::First)
        } else {
            (Endpoint::First, Endpoint::Last)
        };
        trace!(segnum, is_swapped, "inserting segment");

        let tfirst = {
            let tu = self.locate_endpoint(&s.v0, &s.v1, s.root0)?;
            if self.segments.inserted(segnum, upper_end)? {
                tu
            } else {
                self.split_horizontally(tu, s.v0)?
            }
        };
        let (tlast, tribot) = {
            let tu = self.locate_endpoint(&s.v1, &s.v0, s.root1)?;
            if self.segments.inserted(segnum, lower_end)? {
                (tu, true)
            } else {
                self.split_horizontally(tu, s.v1)?;
                (tu, false)
            }
        };

        let ins = Insertion {
            segnum,
            segment: s,
            is_swapped,
            tribot,
            tlast,
        };

        let mut tfirstr = None;
        let mut tlastr = None;
        let mut cursor = Some(tfirst);
        while let Some(t) = cursor {
            let tlast_lo = self.trapezoid(tlast)?.lo;
            let cur = self.trapezoid(t)?.clone();
            if !greater_than_equal_to(&cur.lo, &tlast_lo) {
                break;
            }

            let sk = cur.sink;
            let tn = self.trapezoids.push(cur.clone());
            let i1 = self.dag.push_sink(t, Some(sk));
            let i2 = self.dag.push_sink(tn, Some(sk));
            self.dag.replace(
                sk,
                NodeKind::X {
                    segment: segnum,
                    left: i1,
                    right: i2,
                },
            )?;
            self.trapezoid_mut(t)?.sink = i1;
            self.trapezoid_mut(tn)?.sink = i2;

            if t == tfirst {
                tfirstr = Some(tn);
            }
            if cur.lo == tlast_lo {
                tlastr = Some(tn);
            }

            cursor = match (cur.d0, cur.d1) {
                (None, None) => {
                    return Err(TriangulationError::BrokenLink {
                        table: "trapezoid",
                        detail: "split trapezoid has no lower neighbour",
                    })
                }
                (Some(d), None) => self.thread_single_below(&ins, t, tn, d, false)?,
                (None, Some(d)) => self.thread_single_below(&ins, t, tn, d, true)?,
                (Some(d0), Some(d1)) => self.thread_double_below(&ins, t, tn, d0, d1)?,
            };

            self.trapezoid_mut(t)?.rseg = Some(segnum);
            self.trapezoid_mut(tn)?.lseg = Some(segnum);
        }

        let (Some(tfirstr), Some(tlastr)) = (tfirstr, tlastr) else {
            return Err(TriangulationError::BrokenLink {
                table: "trapezoid",
                detail: "segment walk never reached its lower endpoint",
            });
        };
        self.merge_trapezoids(segnum, tfirst, tlast, Side::Left)?;
        self.merge_trapezoids(segnum, tfirstr, tlastr, Side::Right)?;

        self.segments.get_mut(segnum)?.is_inserted = true;
        Ok(())
    }

    fn at_bottom(&self, ins: &Insertion, t: usize) -> TriResult<bool> {
        Ok(ins.tribot && self.trapezoid(t)?.lo == self.trapezoid(ins.tlast)?.lo)
    }

    /// Rewires the upper neighbours of `t` after it was split into `t | tn`.
    fn thread_upper(&mut self, t: usize, tn: usize, v1: &Point2) -> TriResult<()> {
        let cur = self.trapezoid(t)?.clone();
        match (cur.u0, cur.u1) {
            (Some(u0), Some(u1)) => {
                // continuation of a chain from above
                if let Some(usave) = cur.usave {
                    if cur.uside == Side::Left {
                        {
                            let right = self.trapezoid_mut(tn)?;
                            right.u0 = Some(u1);
                            right.u1 = Some(usave);
                        }
                        self.trapezoid_mut(t)?.u1 = None;
                        self.trapezoid_mut(u0)?.d0 = Some(t);
                        self.trapezoid_mut(u1)?.d0 = Some(tn);
                        self.trapezoid_mut(usave)?.d0 = Some(tn);
                    } else {
                        {
                            let right = self.trapezoid_mut(tn)?;
                            right.u0 = Some(u1);
                            right.u1 = None;
                        }
                        {
                            let left = self.trapezoid_mut(t)?;
                            left.u0 = Some(usave);
                            left.u1 = Some(u0);
                        }
                        self.trapezoid_mut(usave)?.d0 = Some(t);
                        self.trapezoid_mut(u0)?.d0 = Some(t);
                        self.trapezoid_mut(u1)?.d0 = Some(tn);
                    }
                    self.trapezoid_mut(t)?.usave = None;
                    self.trapezoid_mut(tn)?.usave = None;
                } else {
                    {
                        let right = self.trapezoid_mut(tn)?;
                        right.u0 = Some(u1);
                        right.u1 = None;
                    }
                    self.trapezoid_mut(t)?.u1 = None;
                    self.trapezoid_mut(u1)?.d0 = Some(tn);
                }
            }
            (Some(u), None) => {
                let above = self.trapezoid(u)?.clone();
                if let (Some(td0), Some(_)) = (above.d0, above.d1) {
                    // upward cusp
                    let right_of_cusp = match self.trapezoid(td0)?.rseg {
                        Some(rseg) => !self.segments.is_left_of(rseg, v1)?,
                        None => false,
                    };
                    if right_of_cusp {
                        {
                            let left = self.trapezoid_mut(t)?;
                            left.u0 = None;
                            left.u1 = None;
                        }
                        self.trapezoid_mut(tn)?.u1 = None;
                        self.trapezoid_mut(u)?.d1 = Some(tn);
                    } else {
                        {
                            let right = self.trapezoid_mut(tn)?;
                            right.u0 = None;
                            right.u1 = None;
                        }
                        self.trapezoid_mut(t)?.u1 = None;
                        self.trapezoid_mut(u)?.d0 = Some(t);
                    }
                } else {
                    // fresh segment
                    let above = self.trapezoid_mut(u)?;
                    above.d0 = Some(t);
                    above.d1 = Some(tn);
                }
            }
            _ => {
                return Err(TriangulationError::BrokenLink {
                    table: "trapezoid",
                    detail: "split trapezoid has no upper neighbour",
                })
            }
        }
        Ok(())
    }

    /// Threads the segment through `t` when only one trapezoid lies below.
    ///
    /// `via_d1` tells which lower slot holds `d`. Returns the next trapezoid
    /// of the walk.
    fn thread_single_below(
        &mut self,
        ins: &Insertion,
        t: usize,
        tn: usize,
        d: usize,
        via_d1: bool,
    ) -> TriResult<Option<usize>> {
        self.thread_upper(t, tn, &ins.segment.v1)?;

        if self.at_bottom(ins, t)? {
            // bottom forms a triangle
            let seg = self.segments.get(ins.segnum)?;
            let tmptriseg = if ins.is_swapped { seg.prev } else { seg.next };
            if self.segments.is_left_of(tmptriseg, &ins.segment.v0)? {
                // L-R downward cusp
                self.trapezoid_mut(d)?.u0 = Some(t);
                let right = self.trapezoid_mut(tn)?;
                right.d0 = None;
                right.d1 = None;
            } else {
                // R-L downward cusp
                self.trapezoid_mut(d)?.u1 = Some(tn);
                let left = self.trapezoid_mut(t)?;
                left.d0 = None;
                left.d1 = None;
            }
        } else {
            let below = self.trapezoid_mut(d)?;
            if let (Some(du0), Some(du1)) = (below.u0, below.u1) {
                if du0 == t {
                    below.usave = Some(du1);
                    below.uside = Side::Left;
                } else {
                    below.usave = Some(du0);
                    below.uside = Side::Right;
                }
            }
            below.u0 = Some(t);
            below.u1 = Some(tn);
        }

        let cur = self.trapezoid(t)?;
        Ok(if via_d1 { cur.d1 } else { cur.d0 })
    }

    /// Threads the segment through `t` when two trapezoids lie below.
    #[allow(clippy::float_cmp)]
    fn thread_double_below(
        &mut self,
        ins: &Insertion,
        t: usize,
        tn: usize,
        d0: usize,
        d1: usize,
    ) -> TriResult<Option<usize>> {
        let s = &ins.segment;
        let lo = self.trapezoid(t)?.lo;
        let through_d0 = if lo.y == s.v0.y {
            lo.x > s.v0.x
        } else {
            let yt = (lo.y - s.v0.y) / (s.v1.y - s.v0.y);
            let crossing = Point2::new(s.v0.x + yt * (s.v1.x - s.v0.x), lo.y);
            less_than(&crossing, &lo)
        };

        self.thread_upper(t, tn, &s.v1)?;

        if self.at_bottom(ins, t)? {
            {
                let a = self.trapezoid_mut(d0)?;
                a.u0 = Some(t);
                a.u1 = None;
            }
            {
                let b = self.trapezoid_mut(d1)?;
                b.u0 = Some(tn);
                b.u1 = None;
            }
            {
                let right = self.trapezoid_mut(tn)?;
                right.d0 = Some(d1);
                right.d1 = None;
            }
            self.trapezoid_mut(t)?.d1 = None;
            Ok(None)
        } else if through_d0 {
            {
                let a = self.trapezoid_mut(d0)?;
                a.u0 = Some(t);
                a.u1 = Some(tn);
            }
            {
                let b = self.trapezoid_mut(d1)?;
                b.u0 = Some(tn);
                b.u1 = None;
            }
            self.trapezoid_mut(t)?.d1 = None;
            Ok(self.trapezoid(t)?.d0)
        } else {
            {
                let a = self.trapezoid_mut(d0)?;
                a.u0 = Some(t);
                a.u1 = None;
            }
            {
                let b = self.trapezoid_mut(d1)?;
                b.u0 = Some(t);
                b.u1 = Some(tn);
            }
            {
                let right = self.trapezoid_mut(tn)?;
                right.d0 = Some(d1);
                right.d1 = None;
            }
            Ok(self.trapezoid(t)?.d1)
        }
    }

    /// Merges vertically adjacent trapezoids on one side of `segnum` that are
    /// bounded by the same pair of segments.
    fn merge_trapezoids(&mut self, segnum: usize, tfirst: usize, tlast: usize, side: Side) -> TriResult<()> {
        let bounded_by_segment = |this: &Self, index: Option<usize>| -> TriResult<bool> {
            let Some(index) = index else {
                return Ok(false);
            };
            let t = this.trapezoid(index)?;
            Ok(match side {
                Side::Left => t.rseg == Some(segnum),
                Side::Right => t.lseg == Some(segnum),
            })
        };

        let mut cursor = Some(tfirst);
        while let Some(t) = cursor {
            let tlast_lo = self.trapezoid(tlast)?.lo;
            let cur = self.trapezoid(t)?.clone();
            if !greater_than_equal_to(&cur.lo, &tlast_lo) {
                break;
            }

            let mut tnext = cur.d0;
            let mut cond = bounded_by_segment(self, tnext)?;
            if !cond {
                tnext = cur.d1;
                cond = bounded_by_segment(self, tnext)?;
            }
            let Some(tnext) = tnext else {
                break;
            };

            let next = self.trapezoid(tnext)?.clone();
            if cond && next.lseg == cur.lseg && next.rseg == cur.rseg {
                let parent = self.dag.get(next.sink)?.parent.ok_or(TriangulationError::BrokenLink {
                    table: "query node",
                    detail: "merged sink has no parent",
                })?;
                self.dag.redirect_child(parent, next.sink, cur.sink)?;

                {
                    let merged = self.trapezoid_mut(t)?;
                    merged.d0 = next.d0;
                    merged.d1 = next.d1;
                    merged.lo = next.lo;
                }
                for below in [next.d0, next.d1].into_iter().flatten() {
                    let b = self.trapezoid_mut(below)?;
                    if b.u0 == Some(tnext) {
                        b.u0 = Some(t);
                    } else if b.u1 == Some(tnext) {
                        b.u1 = Some(t);
                    }
                }
                self.trapezoid_mut(tnext)?.valid = false;
            } else {
                cursor = Some(tnext);
            }
        }
        Ok(())
    }

    /// Refreshes the DAG shortcuts of a pending segment.
    fn find_new_roots(&mut self, segnum: usize) -> TriResult<()> {
        let s = self.segments.get(segnum)?.clone();
        if s.is_inserted {
            return Ok(());
        }
        let t0 = self.locate_endpoint(&s.v0, &s.v1, s.root0)?;
        let t1 = self.locate_endpoint(&s.v1, &s.v0, s.root1)?;
        let root0 = self.trapezoid(t0)?.sink;
        let root1 = self.trapezoid(t1)?.sink;
        let seg = self.segments.get_mut(segnum)?;
        seg.root0 = root0;
        seg.root1 = root1;
        Ok(())
    }
}

fn check_permutation(order: &[usize], n: usize) -> TriResult<()> {
    if n == 0 {
        return Err(TriangulationError::InvalidInput("no segments".into()));
    }
    if order.len() != n {
        return Err(TriangulationError::InvalidInput(format!(
            "insertion order has {} entries for {n} segments",
            order.len()
        )));
    }
    let mut seen = vec![false; n];
    for &i in order {
        match seen.get_mut(i) {
            Some(flag) if !*flag => *flag = true,
            _ => {
                return Err(TriangulationError::InvalidInput(format!(
                    "insertion order repeats or exceeds segment {i}"
                )))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn build(contours: &[&[Point2]], order: &[usize]) -> Trapezoidation {
        let segments = SegmentTable::from_contours(contours).unwrap();
        Trapezoidation::build(segments, order).unwrap()
    }

    fn identity(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    fn star() -> Vec<Point2> {
        vec![
            p(0.0, -3.0),
            p(1.0, -1.0),
            p(3.0, 0.0),
            p(1.0, 1.0),
            p(0.0, 3.0),
            p(-1.0, 1.2),
            p(-3.0, 0.1),
            p(-1.1, -1.0),
        ]
    }

    #[test]
    fn phase_schedule() {
        assert_eq!(log_star(1), 0);
        assert_eq!(log_star(4), 2);
        assert_eq!(log_star(16), 3);
        assert_eq!(phase_end(16, 0), 1);
        assert_eq!(phase_end(16, 3), 16);
        assert!(phase_end(1000, 1) < phase_end(1000, 2));
    }

    // ── single segment ──

    #[test]
    fn first_segment_makes_four_trapezoids() {
        let tri = vec![p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0)];
        let segments = SegmentTable::from_contours(&[&tri]).unwrap();
        let mut t = Trapezoidation {
            trapezoids: TrapezoidTable::default(),
            dag: QueryDag::default(),
            segments,
            root: 0,
        };
        t.root = t.init_query_structure(1).unwrap();
        assert_eq!(t.trapezoids.len(), 4);
        assert_eq!(t.dag.len(), 7);
        // left of the edge from (1,0) up to (0,1)
        let left = t.locate(&p(0.2, 0.5)).unwrap();
        assert_eq!(t.trapezoid(left).unwrap().rseg, Some(1));
        let right = t.locate(&p(0.8, 0.5)).unwrap();
        assert_eq!(t.trapezoid(right).unwrap().lseg, Some(1));
        let top = t.locate(&p(0.0, 5.0)).unwrap();
        assert!(t.trapezoid(top).unwrap().lseg.is_none());
    }

    // ── full builds ──

    #[test]
    fn square_interior_is_one_column() {
        let sq = vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)];
        let t = build(&[&sq], &identity(4));
        // horizontal edges leave sliver trapezoids against the sides
        let pairs = t.inside_pairs().unwrap();
        assert!(pairs.contains(&(3, 1)));
        assert!(pairs.is_subset(&BTreeSet::from([(3, 0), (3, 1), (2, 1)])));
        let inside = t.locate(&p(0.5, 0.5)).unwrap();
        assert!(t.is_inside(inside).unwrap());
        let outside = t.locate(&p(2.0, 0.5)).unwrap();
        assert!(!t.is_inside(outside).unwrap());
    }

    #[test]
    fn inside_pairs_do_not_depend_on_order() {
        let s = star();
        let n = s.len();
        let forward = build(&[&s], &identity(n)).inside_pairs().unwrap();
        let reversed: Vec<usize> = (0..n).rev().collect();
        assert_eq!(build(&[&s], &reversed).inside_pairs().unwrap(), forward);
        let interleaved = vec![3, 7, 0, 5, 1, 6, 2, 4];
        assert_eq!(build(&[&s], &interleaved).inside_pairs().unwrap(), forward);
    }

    #[test]
    fn hole_splits_interior() {
        let outer = vec![p(0.0, 0.0), p(4.0, 0.0), p(4.0, 4.0), p(0.0, 4.0)];
        let hole = vec![p(1.0, 1.0), p(1.0, 3.0), p(3.0, 3.0), p(3.0, 1.0)];
        let t = build(&[&outer, &hole], &[5, 0, 7, 2, 4, 1, 6, 3]);
        let inside_hole = t.locate(&p(2.0, 2.0)).unwrap();
        assert!(!t.is_inside(inside_hole).unwrap());
        let left_of_hole = t.locate(&p(0.5, 2.0)).unwrap();
        assert!(t.is_inside(left_of_hole).unwrap());
        let right_of_hole = t.locate(&p(3.5, 2.0)).unwrap();
        assert!(t.is_inside(right_of_hole).unwrap());
    }

    #[test]
    fn rejects_bad_permutations() {
        let sq = vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)];
        let segments = SegmentTable::from_contours(&[&sq]).unwrap();
        assert!(Trapezoidation::build(segments.clone(), &[0, 1, 2]).is_err());
        assert!(Trapezoidation::build(segments.clone(), &[0, 1, 1, 2]).is_err());
        assert!(Trapezoidation::build(segments, &[0, 1, 2, 9]).is_err());
    }
}
