use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use super::{Evaluation, FitnessCalculator, FitnessInput};
use crate::geometry::{intersection_area, Polygon, PolygonClipper};
use crate::sprinkler::{Sprinkler, Terrain};

/// Measures a layout against a terrain and scores it.
///
/// Every sprinkler is clipped to the terrain first. The pairwise overlap of
/// the clipped footprints is then subtracted from each sprinkler's
/// contribution in gene order, so a sprinkler only gets credit for area no
/// earlier sprinkler already waters.
///
/// Clips run on the shared [`PolygonClipper`]; with at least
/// `parallel_threshold` sprinklers they are issued from the rayon pool.
#[derive(Clone)]
pub struct FitnessPipeline {
    clipper: Arc<PolygonClipper>,
    calculator: Arc<dyn FitnessCalculator>,
    parallel_threshold: usize,
}

impl FitnessPipeline {
    pub fn new(clipper: Arc<PolygonClipper>, calculator: Arc<dyn FitnessCalculator>) -> Self {
        Self {
            clipper,
            calculator,
            parallel_threshold: 8,
        }
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn calculator(&self) -> &dyn FitnessCalculator {
        self.calculator.as_ref()
    }

    /// Measures and scores `sprinklers`.
    pub fn evaluate(&self, sprinklers: &[Sprinkler], terrain: &Terrain) -> Evaluation {
        let input = self.measure(sprinklers, terrain);
        let score = self.calculator.compute(&input);
        Evaluation { input, score }
    }

    /// Computes covered, overlap and outside areas. A layout without
    /// sprinklers touches no geometry at all.
    pub fn measure(&self, sprinklers: &[Sprinkler], terrain: &Terrain) -> FitnessInput {
        let terrain_area = terrain.area();
        if sprinklers.is_empty() {
            return FitnessInput::empty(terrain_area);
        }

        let started = Instant::now();
        let parallel = sprinklers.len() >= self.parallel_threshold;

        let clip_to_terrain = |s: &Sprinkler| -> (Polygon, f64) {
            let inside = self.clipper.intersection(s.coverage(), terrain.boundary());
            (inside, self_area(s.coverage()))
        };
        let clipped: Vec<(Polygon, f64)> = if parallel {
            sprinklers.par_iter().map(clip_to_terrain).collect()
        } else {
            sprinklers.iter().map(clip_to_terrain).collect()
        };

        let raw_area: f64 = clipped.iter().map(|(_, raw)| raw).sum();
        let inside: Vec<&Polygon> = clipped.iter().map(|(polygon, _)| polygon).collect();
        let overlaps = self.pairwise_overlaps(&inside, parallel);

        let mut covered = 0.0;
        let mut overlap = 0.0;
        for (i, polygon) in inside.iter().enumerate() {
            let contribution = (self_area(polygon) - overlaps[i]).max(0.0);
            covered += contribution;
            overlap += overlaps[i];
        }
        let outside = (raw_area - covered).max(0.0);

        debug!(
            sprinklers = sprinklers.len(),
            terrain = terrain_area,
            covered,
            overlap,
            outside,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Sprinkler system run"
        );

        FitnessInput {
            num_sprinklers: sprinklers.len(),
            terrain_area,
            covered_area: covered,
            overlap_area: overlap,
            outside_area: outside,
        }
    }

    /// For every `i`, the summed overlap area of `inside[i]` with all
    /// `inside[j]`, `j < i`.
    fn pairwise_overlaps(&self, inside: &[&Polygon], parallel: bool) -> Vec<f64> {
        let pairs: Vec<(usize, usize)> = (0..inside.len())
            .flat_map(|i| (0..i).map(move |j| (i, j)))
            .collect();

        let overlap_of = |&(i, j): &(usize, usize)| -> f64 {
            self_area(&self.clipper.intersection(inside[i], inside[j]))
        };
        let areas: Vec<f64> = if parallel {
            pairs.par_iter().map(overlap_of).collect()
        } else {
            pairs.iter().map(overlap_of).collect()
        };

        let mut per_sprinkler = vec![0.0; inside.len()];
        for (&(i, _), area) in pairs.iter().zip(areas) {
            per_sprinkler[i] += area;
        }
        per_sprinkler
    }
}

fn self_area(polygon: &Polygon) -> f64 {
    intersection_area(polygon, polygon)
}

impl fmt::Debug for FitnessPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitnessPipeline")
            .field("calculator", &self.calculator)
            .field("parallel_threshold", &self.parallel_threshold)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::WeightedFitness;
    use crate::geometry::{ClippingOptions, Point};
    use crate::telemetry::{Counter, InMemoryRecorder};
    use std::f64::consts::PI;

    fn pipeline(recorder: Arc<InMemoryRecorder>, threshold: usize) -> FitnessPipeline {
        let options = ClippingOptions {
            workers: 2,
            ..ClippingOptions::default()
        };
        let clipper = PolygonClipper::new(options, recorder).unwrap();
        FitnessPipeline::new(Arc::new(clipper), Arc::new(WeightedFitness::default()))
            .with_parallel_threshold(threshold)
    }

    fn square_terrain(side: f64) -> Terrain {
        Terrain::new(Polygon::from(vec![
            (0.0, 0.0),
            (side, 0.0),
            (side, side),
            (0.0, side),
        ]))
        .unwrap()
    }

    #[test]
    fn test_empty_layout_makes_no_geometry_calls() {
        let recorder = Arc::new(InMemoryRecorder::new());
        let evaluation = pipeline(recorder.clone(), 8).evaluate(&[], &square_terrain(4.0));

        assert_eq!(evaluation.score, 0.0);
        assert_eq!(evaluation.input.num_sprinklers, 0);
        assert_eq!(evaluation.input.covered_area, 0.0);
        assert_eq!(recorder.get(Counter::Intersections), 0);
    }

    #[test]
    fn test_sprinkler_inside_terrain() {
        let recorder = Arc::new(InMemoryRecorder::new());
        let sprinkler = Sprinkler::circle(Point::new(5.0, 5.0), 2.0);
        let input = pipeline(recorder, 8).measure(&[sprinkler.clone()], &square_terrain(10.0));

        // clip space truncation moves vertices by at most 1e-3
        assert!((input.covered_area - sprinkler.coverage_area()).abs() < 0.05);
        assert!(input.overlap_area.abs() < 1e-9);
        assert!(input.outside_area < 0.05);
        assert!((input.terrain_area - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_half_outside_sprinkler() {
        let recorder = Arc::new(InMemoryRecorder::new());
        // centered on the left edge, half of the disc spills out
        let sprinkler = Sprinkler::circle(Point::new(0.0, 5.0), 2.0);
        let input = pipeline(recorder, 8).measure(&[sprinkler], &square_terrain(10.0));

        let half = PI * 2.0;
        assert!((input.covered_area - half).abs() / half < 0.01);
        assert!((input.outside_area - half).abs() / half < 0.01);
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let terrain = square_terrain(10.0);
        let layout: Vec<Sprinkler> = (0..5)
            .map(|i| Sprinkler::circle(Point::new(2.0 + 1.5 * i as f64, 4.0 + 0.5 * i as f64), 2.0))
            .collect();

        let sequential = pipeline(Arc::new(InMemoryRecorder::new()), 100).measure(&layout, &terrain);
        let parallel = pipeline(Arc::new(InMemoryRecorder::new()), 1).measure(&layout, &terrain);

        assert!((sequential.covered_area - parallel.covered_area).abs() < 1e-9);
        assert!((sequential.overlap_area - parallel.overlap_area).abs() < 1e-9);
        assert!((sequential.outside_area - parallel.outside_area).abs() < 1e-9);
        assert!(sequential.overlap_area > 0.0);
    }

    #[test]
    fn test_pairwise_clip_count() {
        let recorder = Arc::new(InMemoryRecorder::new());
        let layout: Vec<Sprinkler> = (0..4)
            .map(|i| Sprinkler::circle(Point::new(2.0 + i as f64, 5.0), 1.5))
            .collect();
        pipeline(recorder.clone(), 8).measure(&layout, &square_terrain(10.0));

        // 4 terrain clips + 6 pairs
        assert_eq!(recorder.get(Counter::Intersections), 10);
    }
}
