use crate::math::{Axis, Point3, BOX_EDGE_TOLERANCE};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// Creates a box from two opposite corners.
    #[must_use]
    pub fn new(a: Point3, b: Point3) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Smallest box holding every point, or `None` for an empty slice.
    #[must_use]
    pub fn from_points(points: &[Point3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut aabb = Self::new(*first, *first);
        for p in rest {
            aabb.expand(p);
        }
        Some(aabb)
    }

    /// Grows the box to hold `point`.
    pub fn expand(&mut self, point: &Point3) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Coordinate of the face selected by `axis` and `extreme`.
    #[must_use]
    pub fn face(&self, axis: Axis, extreme: Extreme) -> f64 {
        match extreme {
            Extreme::Min => self.min[axis.index()],
            Extreme::Max => self.max[axis.index()],
        }
    }

    /// Position of one of the eight corners.
    #[must_use]
    pub fn corner(&self, corner: BoxCorner) -> Point3 {
        let pick = |axis: Axis| self.face(axis, corner.extreme(axis));
        Point3::new(pick(Axis::X), pick(Axis::Y), pick(Axis::Z))
    }

    /// First box edge, in [`BoxEdge::ALL`] order, that holds `point`.
    #[must_use]
    pub fn classify_edge(&self, point: &Point3) -> Option<BoxEdge> {
        BoxEdge::ALL.into_iter().find(|edge| edge.contains(self, point))
    }
}

/// Lower or upper face along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extreme {
    Min,
    Max,
}

/// One of the twelve edges of an [`Aabb`], named by its two fixed faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoxEdge {
    ZminYmin,
    XminYmin,
    ZmaxYmin,
    XmaxYmin,
    ZminYmax,
    XminYmax,
    ZmaxYmax,
    XmaxYmax,
    XmaxZmin,
    XminZmin,
    XminZmax,
    XmaxZmax,
}

impl BoxEdge {
    /// Every edge, in classification order.
    pub const ALL: [BoxEdge; 12] = [
        BoxEdge::ZminYmin,
        BoxEdge::XminYmin,
        BoxEdge::ZmaxYmin,
        BoxEdge::XmaxYmin,
        BoxEdge::ZminYmax,
        BoxEdge::XminYmax,
        BoxEdge::ZmaxYmax,
        BoxEdge::XmaxYmax,
        BoxEdge::XmaxZmin,
        BoxEdge::XminZmin,
        BoxEdge::XminZmax,
        BoxEdge::XmaxZmax,
    ];

    /// Bit identifier; the sum of three distinct ids is unique.
    #[must_use]
    pub fn id(self) -> u32 {
        1 << (self as u32)
    }

    /// The two faces whose intersection is this edge.
    #[must_use]
    pub fn faces(self) -> [(Axis, Extreme); 2] {
        use Axis::{X, Y, Z};
        use Extreme::{Max, Min};
        match self {
            BoxEdge::ZminYmin => [(Z, Min), (Y, Min)],
            BoxEdge::XminYmin => [(X, Min), (Y, Min)],
            BoxEdge::ZmaxYmin => [(Z, Max), (Y, Min)],
            BoxEdge::XmaxYmin => [(X, Max), (Y, Min)],
            BoxEdge::ZminYmax => [(Z, Min), (Y, Max)],
            BoxEdge::XminYmax => [(X, Min), (Y, Max)],
            BoxEdge::ZmaxYmax => [(Z, Max), (Y, Max)],
            BoxEdge::XmaxYmax => [(X, Max), (Y, Max)],
            BoxEdge::XmaxZmin => [(X, Max), (Z, Min)],
            BoxEdge::XminZmin => [(X, Min), (Z, Min)],
            BoxEdge::XminZmax => [(X, Min), (Z, Max)],
            BoxEdge::XmaxZmax => [(X, Max), (Z, Max)],
        }
    }

    /// Axis the edge runs along, used to order points on it.
    #[must_use]
    pub fn sort_axis(self) -> Axis {
        let [(a, _), (b, _)] = self.faces();
        Axis::ALL
            .into_iter()
            .find(|&axis| axis != a && axis != b)
            .unwrap_or(Axis::X)
    }

    /// Whether `point` lies on this edge of `aabb`.
    #[must_use]
    pub fn contains(self, aabb: &Aabb, point: &Point3) -> bool {
        self.faces().iter().all(|&(axis, extreme)| {
            (point[axis.index()] - aabb.face(axis, extreme)).abs() <= BOX_EDGE_TOLERANCE
        })
    }

    /// Whether `corner` is one of this edge's endpoints.
    #[must_use]
    pub fn touches(self, corner: BoxCorner) -> bool {
        self.faces()
            .iter()
            .all(|&(axis, extreme)| corner.extreme(axis) == extreme)
    }
}

/// One of the eight corners of an [`Aabb`].
///
/// Bit 0 selects max x, bit 1 max y, bit 2 max z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxCorner(u8);

impl BoxCorner {
    /// Corner from its bit index, `None` past 7.
    #[must_use]
    pub fn new(index: u8) -> Option<Self> {
        (index < 8).then_some(Self(index))
    }

    /// Bit index of the corner.
    #[must_use]
    pub fn index(self) -> u8 {
        self.0
    }

    /// Which face of `axis` the corner sits on.
    #[must_use]
    pub fn extreme(self, axis: Axis) -> Extreme {
        if self.0 & (1 << axis.index()) == 0 {
            Extreme::Min
        } else {
            Extreme::Max
        }
    }

    /// The three edges meeting at this corner.
    #[must_use]
    pub fn edges(self) -> Vec<BoxEdge> {
        BoxEdge::ALL
            .into_iter()
            .filter(|edge| edge.touches(self))
            .collect()
    }

    /// Sum of the ids of the three edges meeting here.
    #[must_use]
    pub fn edge_total(self) -> u32 {
        self.edges().into_iter().map(BoxEdge::id).sum()
    }

    /// Corner whose three edge ids add up to `total`.
    #[must_use]
    pub fn from_edge_total(total: u32) -> Option<Self> {
        (0..8)
            .map(Self)
            .find(|corner| corner.edge_total() == total)
    }
}
