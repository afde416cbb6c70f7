//! # Geometry
//!
//! Plain polygon types plus the two operations the fitness pipeline needs:
//! the exact intersection *area* of two polygons ([`intersect`]) and the
//! intersection *shape* obtained from a boolean clipper ([`clipping`]).
//!
//! Only simple closed polygons are supported. A polygon is stored without a
//! repeated closing vertex; the edge from the last point back to the first is
//! implicit.

pub mod clipping;
pub mod intersect;

use std::fmt;
use std::sync::Arc;

pub use clipping::{
    Clipper, ClipperFactory, ClipperLease, ClipperPool, ClippingOptions, IntPoint, OverlayClipper,
    PathRole, PolygonClipper,
};
pub use intersect::intersection_area;

/// A point in the plane.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    /// An inverted box that any point will expand.
    pub fn empty() -> Self {
        Self {
            min: Point::new(f64::MAX, f64::MAX),
            max: Point::new(-f64::MAX, -f64::MAX),
        }
    }

    pub fn include(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Strict overlap test; boxes that only touch do not overlap.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// An immutable simple polygon. Zero points is the empty polygon.
///
/// Cloning is cheap; the vertex list is shared.
#[derive(Clone, PartialEq, Default)]
pub struct Polygon {
    points: Arc<[Point]>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points: points.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for &p in self.points.iter() {
            bbox.include(p);
        }
        bbox
    }

    /// Shoelace area; positive for counter-clockwise vertex order.
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.points)
    }

    /// Even-odd ray casting. Points exactly on the boundary may land on
    /// either side.
    pub fn contains(&self, p: Point) -> bool {
        let pts = &self.points;
        if pts.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = pts.len() - 1;
        for i in 0..pts.len() {
            let (a, b) = (pts[i], pts[j]);
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

impl From<Vec<(f64, f64)>> for Polygon {
    fn from(points: Vec<(f64, f64)>) -> Self {
        Self::new(points.into_iter().map(Point::from).collect())
    }
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "polygon(")?;
        for p in self.points.iter() {
            write!(f, "{{{},{}}}, ", p.x, p.y)?;
        }
        write!(f, ")")
    }
}

/// Shoelace area of an implicitly closed ring.
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for i in 0..points.len() {
        let j = (i + 1) % points.len();
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }
    area * 0.5
}
