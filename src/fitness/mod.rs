//! # Fitness
//!
//! A layout is scored in two steps. The [`FitnessPipeline`] measures it
//! against the terrain and produces a [`FitnessInput`]; a
//! [`FitnessCalculator`] then folds those areas into a single scalar.

pub mod pipeline;

use std::fmt::Debug;

pub use pipeline::FitnessPipeline;

/// Areas measured for one layout.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FitnessInput {
    pub num_sprinklers: usize,
    pub terrain_area: f64,
    /// Terrain area watered by at least one sprinkler.
    pub covered_area: f64,
    /// Terrain area watered by two or more sprinklers, counted per pair.
    pub overlap_area: f64,
    /// Sprinkler area that falls outside the terrain.
    pub outside_area: f64,
}

impl FitnessInput {
    /// The input of a layout without sprinklers.
    pub fn empty(terrain_area: f64) -> Self {
        Self {
            terrain_area,
            ..Self::default()
        }
    }

    /// Covered fraction of the terrain, `0` for a terrain without area.
    pub fn coverage_ratio(&self) -> f64 {
        if self.terrain_area > 0.0 {
            self.covered_area / self.terrain_area
        } else {
            0.0
        }
    }
}

/// A scored layout.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Evaluation {
    pub input: FitnessInput,
    pub score: f64,
}

/// Folds measured areas into a fitness value. Higher is better.
pub trait FitnessCalculator: Debug + Send + Sync {
    fn compute(&self, input: &FitnessInput) -> f64;
}

/// `max(0, cover·covered − outside·min(1, outside) − overlap·min(1, overlap))`,
/// every area taken relative to the terrain area.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedFitness {
    pub cover: f64,
    pub outside: f64,
    pub overlap: f64,
}

impl WeightedFitness {
    pub fn new(cover: f64, outside: f64, overlap: f64) -> Self {
        Self {
            cover,
            outside,
            overlap,
        }
    }

    /// Coverage against spill-over only; overlap is not penalised.
    pub fn simple() -> Self {
        Self::new(1.0, 0.5, 0.0)
    }
}

impl Default for WeightedFitness {
    fn default() -> Self {
        Self::new(1.0, 2.0, 4.0)
    }
}

impl FitnessCalculator for WeightedFitness {
    fn compute(&self, input: &FitnessInput) -> f64 {
        if input.num_sprinklers == 0 || input.terrain_area.is_nan() || input.terrain_area <= 0.0 {
            return 0.0;
        }

        let terrain = input.terrain_area;
        let covered = input.covered_area / terrain;
        let outside = (input.outside_area / terrain).min(1.0);
        let overlap = (input.overlap_area / terrain).min(1.0);

        (self.cover * covered - self.outside * outside - self.overlap * overlap).max(0.0)
    }
}
