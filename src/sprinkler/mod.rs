//! # Sprinkler
//!
//! A sprinkler is the gene of a layout: a position, a throw range and the
//! angular sector `[start_angle, end_angle]` it waters. Its footprint is a
//! discretised circular sector, the coverage polygon, built lazily and cached.

pub mod terrain;
pub mod validator;

use std::f64::consts::TAU;
use std::fmt;
use std::sync::OnceLock;

use crate::geometry::{Point, Polygon};

pub use terrain::Terrain;
pub use validator::{CommonSenseValidator, CompositeValidator, TerrainValidator, Validator};

/// Angular step between two arc samples of a coverage polygon, in radians.
pub const SPLIT_ANGLE: f64 = 0.1;

const FULL_CIRCLE_EPSILON: f64 = 1e-9;

/// A single sprinkler.
///
/// Sprinklers are immutable. `Clone` shares the cached coverage polygon.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone)]
pub struct Sprinkler {
    position: Point,
    range: f64,
    start_angle: f64,
    end_angle: f64,
    #[cfg_attr(feature = "serde", serde(skip))]
    coverage: OnceLock<Polygon>,
}

impl Sprinkler {
    /// Number of numeric fields, see [`Sprinkler::to_fields`].
    pub const FIELDS: usize = 5;

    pub fn new(position: Point, range: f64, start_angle: f64, end_angle: f64) -> Self {
        Self {
            position,
            range,
            start_angle,
            end_angle,
            coverage: OnceLock::new(),
        }
    }

    /// A full-circle sprinkler.
    pub fn circle(position: Point, range: f64) -> Self {
        Self::new(position, range, 0.0, TAU)
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    pub fn start_angle(&self) -> f64 {
        self.start_angle
    }

    pub fn end_angle(&self) -> f64 {
        self.end_angle
    }

    /// The fields as `[x, y, range, start_angle, end_angle]`.
    pub fn to_fields(&self) -> [f64; Self::FIELDS] {
        [
            self.position.x,
            self.position.y,
            self.range,
            self.start_angle,
            self.end_angle,
        ]
    }

    pub fn from_fields(fields: [f64; Self::FIELDS]) -> Self {
        let [x, y, range, start_angle, end_angle] = fields;
        Self::new(Point::new(x, y), range, start_angle, end_angle)
    }

    /// The watered area as a polygon, sampled every [`SPLIT_ANGLE`] radians.
    ///
    /// A partial sector starts and ends at the center. A full circle is the
    /// ring of arc samples alone. Sectors narrower than half a step, and
    /// sprinklers without a positive range, cover nothing.
    pub fn coverage(&self) -> &Polygon {
        self.coverage.get_or_init(|| self.sample_coverage())
    }

    pub fn coverage_area(&self) -> f64 {
        self.coverage().signed_area().abs()
    }

    fn sample_coverage(&self) -> Polygon {
        let span = self.end_angle - self.start_angle;
        if !self.range.is_finite()
            || self.range <= 0.0
            || !span.is_finite()
            || !self.position.is_finite()
        {
            return Polygon::empty();
        }

        let samples = (span / SPLIT_ANGLE).round();
        if samples < 1.0 {
            return Polygon::empty();
        }
        let samples = samples as usize;

        let full_circle = span >= TAU - FULL_CIRCLE_EPSILON;
        let mut points = Vec::with_capacity(samples + 2);
        if !full_circle {
            points.push(self.position);
        }
        for i in 0..samples {
            points.push(self.arc_point(self.start_angle + i as f64 * SPLIT_ANGLE));
        }
        if !full_circle {
            points.push(self.arc_point(self.end_angle));
        }
        Polygon::new(points)
    }

    fn arc_point(&self, angle: f64) -> Point {
        Point::new(
            self.position.x + self.range * angle.cos(),
            self.position.y + self.range * angle.sin(),
        )
    }
}

impl PartialEq for Sprinkler {
    fn eq(&self, other: &Self) -> bool {
        self.to_fields() == other.to_fields()
    }
}

impl fmt::Debug for Sprinkler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sprinkler")
            .field("position", &self.position)
            .field("range", &self.range)
            .field("start_angle", &self.start_angle)
            .field("end_angle", &self.end_angle)
            .finish()
    }
}
