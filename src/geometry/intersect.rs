//! # Polygon Intersection Area
//!
//! Computes the area of the intersection of two simple polygons without
//! constructing the intersection shape.
//!
//! Both polygons are quantized into a shared integer grid spanning
//! [`GAMUT`] units per axis, so every orientation test is exact 64-bit integer
//! arithmetic. The low three bits of each quantized coordinate are replaced by
//! tie-breaking "fudge" bits: bit 1 distinguishes the two polygons and bit 0
//! alternates between consecutive vertices of one polygon. No vertex of one
//! polygon can then lie exactly on an edge of the other, so every edge pair
//! either properly crosses or does not.
//!
//! The area is accumulated as a sum of signed trapezoids:
//! - for every crossing edge pair, the trapezoids between the crossing point
//!   and the following vertex on each polygon;
//! - for every edge of one polygon that lies inside the other, the edge's own
//!   trapezoid, weighted by the current inside/outside winding.
//!
//! The result has little more accuracy than an `f32`, independent of the input
//! scale, and is deterministic: identical inputs always yield the same area.

use super::{BoundingBox, Point, Polygon};

/// Size of the integer grid each axis is mapped onto.
pub const GAMUT: f64 = 500_000_000.0;
const MID: f64 = GAMUT / 2.0;

/// Fudge bits used for the first and second polygon.
const FUDGE_FIRST: i32 = 0;
const FUDGE_SECOND: i32 = 2;

/// Area of the intersection of `a` and `b`.
///
/// Returns `0.0` if either polygon has fewer than three points or if the
/// combined bounding box is degenerate. The result is never negative.
///
/// # Example
///
/// ```rust
/// use sprinkler_ga::geometry::{intersection_area, Polygon};
///
/// let a = Polygon::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
/// let b = Polygon::from(vec![(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]);
/// assert!((intersection_area(&a, &b) - 1.0).abs() < 1e-6);
/// ```
pub fn intersection_area(a: &Polygon, b: &Polygon) -> f64 {
    intersection_area_of(a.points(), b.points())
}

/// Slice form of [`intersection_area`].
pub fn intersection_area_of(a: &[Point], b: &[Point]) -> f64 {
    if a.len() < 3 || b.len() < 3 {
        return 0.0;
    }

    let mut bbox = BoundingBox::empty();
    a.iter().chain(b.iter()).for_each(|&p| bbox.include(p));

    let (width, height) = (bbox.width(), bbox.height());
    if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
        return 0.0;
    }

    let mut accumulator = Accumulator {
        sum: 0,
        sclx: GAMUT / width,
        scly: GAMUT / height,
    };
    accumulator.run(a, b, &bbox).abs()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct IPoint {
    x: i32,
    y: i32,
}

/// Closed-open extent of one edge along one axis.
#[derive(Debug, Clone, Copy)]
struct Span {
    min: i32,
    max: i32,
}

impl Span {
    fn between(a: i32, b: i32) -> Self {
        if a < b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    fn overlaps(&self, other: &Span) -> bool {
        self.min < other.max && other.min < self.max
    }
}

/// A quantized vertex together with the extent of the edge leaving it.
#[derive(Debug, Clone, Copy)]
struct Vertex {
    ip: IPoint,
    rx: Span,
    ry: Span,
    /// Net number of times the edge leaving this vertex enters the other polygon.
    winding: i32,
}

/// Twice the signed area of triangle `(a, p, q)`.
fn area(a: IPoint, p: IPoint, q: IPoint) -> i64 {
    let (ax, ay) = (a.x as i64, a.y as i64);
    let (px, py) = (p.x as i64, p.y as i64);
    let (qx, qy) = (q.x as i64, q.y as i64);
    px * qy - py * qx + ax * (py - qy) + ay * (qx - px)
}

struct Accumulator {
    sum: i64,
    sclx: f64,
    scly: f64,
}

impl Accumulator {
    fn run(&mut self, a: &[Point], b: &[Point], bbox: &BoundingBox) -> f64 {
        let mut ipa = self.fit(a, FUDGE_FIRST, bbox);
        let mut ipb = self.fit(b, FUDGE_SECOND, bbox);
        let (na, nb) = (a.len(), b.len());

        for j in 0..na {
            for k in 0..nb {
                if !(ipa[j].rx.overlaps(&ipb[k].rx) && ipa[j].ry.overlaps(&ipb[k].ry)) {
                    continue;
                }

                let (a0, a1) = (ipa[j].ip, ipa[j + 1].ip);
                let (b0, b1) = (ipb[k].ip, ipb[k + 1].ip);

                let s1 = -area(a0, b0, b1);
                let s2 = area(a1, b0, b1);
                let o = s1 < 0;
                if o != (s2 < 0) {
                    continue;
                }

                let s3 = area(b0, a0, a1);
                let s4 = -area(b1, a0, a1);
                if (s3 < 0) != (s4 < 0) {
                    continue;
                }

                if o {
                    self.cross(a0, a1, b0, b1, s1, s2, s3, s4);
                    ipa[j].winding += 1;
                    ipb[k].winding -= 1;
                } else {
                    self.cross(b0, b1, a0, a1, s3, s4, s1, s2);
                    ipb[k].winding += 1;
                    ipa[j].winding -= 1;
                }
            }
        }

        self.inness(&ipa, &ipb);
        self.inness(&ipb, &ipa);

        self.sum as f64 / (self.sclx * self.scly)
    }

    /// Quantizes a polygon. The returned vector carries a copy of the first
    /// vertex at the end so edge `c` always runs from `c` to `c + 1`.
    fn fit(&self, points: &[Point], fudge: i32, bbox: &BoundingBox) -> Vec<Vertex> {
        let n = points.len();
        let mut ips: Vec<IPoint> = points
            .iter()
            .enumerate()
            .map(|(c, p)| IPoint {
                x: (((p.x - bbox.min.x) * self.sclx - MID) as i32 & !7) | fudge | (c as i32 & 1),
                y: (((p.y - bbox.min.y) * self.scly - MID) as i32 & !7) | fudge,
            })
            .collect();

        // An odd vertex count would give the closing edge two even endpoints.
        ips[0].y += (n & 1) as i32;
        ips.push(ips[0]);

        (0..=n)
            .map(|c| {
                let next = ips[(c + 1).min(n)];
                Vertex {
                    ip: ips[c],
                    rx: Span::between(ips[c].x, next.x),
                    ry: Span::between(ips[c].y, next.y),
                    winding: 0,
                }
            })
            .collect()
    }

    fn contribute(&mut self, from: IPoint, to: IPoint, weight: i32) {
        self.sum += weight as i64 * (to.x as i64 - from.x as i64) * (to.y as i64 + from.y as i64)
            / 2;
    }

    /// Edge `a -> b` crosses edge `c -> d`, entering the other polygon.
    #[allow(clippy::too_many_arguments)]
    fn cross(&mut self, a: IPoint, b: IPoint, c: IPoint, d: IPoint, a1: i64, a2: i64, a3: i64, a4: i64) {
        let (a1, a2, a3, a4) = (a1 as f64, a2 as f64, a3 as f64, a4 as f64);
        let r1 = a1 / (a1 + a2);
        let r2 = a3 / (a3 + a4);

        let on_ab = IPoint {
            x: (a.x as f64 + r1 * (b.x as f64 - a.x as f64)) as i32,
            y: (a.y as f64 + r1 * (b.y as f64 - a.y as f64)) as i32,
        };
        let on_cd = IPoint {
            x: (c.x as f64 + r2 * (d.x as f64 - c.x as f64)) as i32,
            y: (c.y as f64 + r2 * (d.y as f64 - c.y as f64)) as i32,
        };

        self.contribute(on_ab, b, 1);
        self.contribute(d, on_cd, 1);
    }

    /// Decides by ray parity whether the first vertex of `p` starts inside
    /// `q`, then walks `p` adding every edge that lies inside `q`.
    fn inness(&mut self, p: &[Vertex], q: &[Vertex]) {
        let cp = p.len() - 1;
        let cq = q.len() - 1;
        let start = p[0].ip;

        let mut s: i32 = 0;
        for c in 0..cq {
            if q[c].rx.min < start.x && start.x < q[c].rx.max {
                let sgn = 0 < area(start, q[c].ip, q[c + 1].ip);
                s += if sgn != (q[c].ip.x < q[c + 1].ip.x) {
                    0
                } else if sgn {
                    -1
                } else {
                    1
                };
            }
        }

        for j in 0..cp {
            if s != 0 {
                self.contribute(p[j].ip, p[j + 1].ip, s);
            }
            s += p[j].winding;
        }
    }
}
