use std::sync::OnceLock;

use crate::error::{GeneticError, Result};
use crate::geometry::{intersection_area, BoundingBox, Point, Polygon};

/// The area to be watered. Loaded once before a run and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Terrain {
    boundary: Polygon,
    area: OnceLock<f64>,
}

impl Terrain {
    /// Fails when the boundary has fewer than three points or a non-finite
    /// coordinate.
    pub fn new(boundary: Polygon) -> Result<Self> {
        if boundary.len() < 3 {
            return Err(GeneticError::Geometry(format!(
                "Terrain boundary needs at least 3 points, got {}",
                boundary.len()
            )));
        }
        if let Some(p) = boundary.points().iter().find(|p| !p.is_finite()) {
            return Err(GeneticError::Geometry(format!(
                "Terrain boundary has a non-finite point ({}, {})",
                p.x, p.y
            )));
        }
        Ok(Self {
            boundary,
            area: OnceLock::new(),
        })
    }

    pub fn boundary(&self) -> &Polygon {
        &self.boundary
    }

    /// Total area, computed once with the intersection kernel.
    pub fn area(&self) -> f64 {
        *self
            .area
            .get_or_init(|| intersection_area(&self.boundary, &self.boundary))
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.boundary.bounding_box()
    }

    pub fn contains(&self, point: Point) -> bool {
        self.boundary.contains(point)
    }
}
