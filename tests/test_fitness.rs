use std::f64::consts::PI;
use std::sync::Arc;

use sprinkler_ga::{
    fitness::{FitnessCalculator, FitnessInput, FitnessPipeline, WeightedFitness},
    geometry::{ClippingOptions, Point, Polygon, PolygonClipper},
    sprinkler::{Sprinkler, Terrain},
    telemetry::{Counter, InMemoryRecorder},
};

fn pipeline(recorder: Arc<InMemoryRecorder>, calculator: WeightedFitness) -> FitnessPipeline {
    let options = ClippingOptions {
        workers: 4,
        ..ClippingOptions::default()
    };
    let clipper = PolygonClipper::new(options, recorder).unwrap();
    FitnessPipeline::new(Arc::new(clipper), Arc::new(calculator))
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

/// Area of a disc of radius `r` minus the cap cut off by a chord at
/// distance `d` from the center, for each of `caps` disjoint chords.
fn disc_minus_caps(r: f64, d: f64, caps: usize) -> f64 {
    let cap = r * r * (d / r).acos() - d * (r * r - d * d).sqrt();
    PI * r * r - caps as f64 * cap
}

#[test]
fn test_circle_in_small_square() {
    let recorder = Arc::new(InMemoryRecorder::new());
    let terrain = square_terrain(4.0);
    let sprinkler = Sprinkler::circle(Point::new(2.0, 2.0), 2.2);

    let evaluation = pipeline(recorder.clone(), WeightedFitness::default())
        .evaluate(&[sprinkler.clone()], &terrain);
    let input = evaluation.input;

    // the disc pokes out of all four sides
    let expected = disc_minus_caps(2.2, 2.0, 4);
    assert!((input.covered_area - expected).abs() / expected < 0.01);
    assert!((input.outside_area - (sprinkler.coverage_area() - input.covered_area)).abs() < 0.05);
    assert!(input.outside_area > 0.0);
    assert_eq!(input.overlap_area, 0.0);
    assert!((input.terrain_area - 16.0).abs() < 1e-4);
    assert!(evaluation.score > 0.0);
    assert_eq!(recorder.get(Counter::Intersections), 1);
}

#[test]
fn test_disc_covering_whole_terrain() {
    let recorder = Arc::new(InMemoryRecorder::new());
    let terrain = square_terrain(4.0);
    let sprinkler = Sprinkler::circle(Point::new(2.0, 2.0), 4.0);

    let input = pipeline(recorder, WeightedFitness::simple()).measure(&[sprinkler], &terrain);

    assert!((input.covered_area - 16.0).abs() < 0.05);
    assert!((input.coverage_ratio() - 1.0).abs() < 0.01);
    let spill = PI * 16.0 - 16.0;
    assert!((input.outside_area - spill).abs() / spill < 0.01);
}

#[test]
fn test_duplicate_sprinkler_scores_lower() {
    let terrain = square_terrain(10.0);
    let sprinkler = Sprinkler::circle(Point::new(5.0, 5.0), 2.0);

    let single = pipeline(Arc::new(InMemoryRecorder::new()), WeightedFitness::default())
        .evaluate(&[sprinkler.clone()], &terrain);
    let doubled = pipeline(Arc::new(InMemoryRecorder::new()), WeightedFitness::default())
        .evaluate(&[sprinkler.clone(), sprinkler.clone()], &terrain);

    assert!(doubled.input.overlap_area > 0.0);
    assert!((doubled.input.covered_area - single.input.covered_area).abs() < 0.05);
    assert!(doubled.score < single.score);
}

#[test]
fn test_sector_on_the_edge() {
    let terrain = square_terrain(10.0);
    // half disc facing into the terrain from the bottom edge
    let inward = Sprinkler::new(Point::new(5.0, 0.0), 3.0, 0.0, PI);
    // the same half disc facing away
    let outward = Sprinkler::new(Point::new(5.0, 0.0), 3.0, PI, 2.0 * PI);

    let pipeline = pipeline(Arc::new(InMemoryRecorder::new()), WeightedFitness::default());
    let half = PI * 9.0 / 2.0;

    let inside = pipeline.measure(&[inward], &terrain);
    assert!((inside.covered_area - half).abs() / half < 0.01);
    assert!(inside.outside_area < 0.05);

    let outside = pipeline.measure(&[outward], &terrain);
    assert!(outside.covered_area < 0.05);
    assert!((outside.outside_area - half).abs() / half < 0.01);
    assert!(pipeline.calculator().compute(&outside) == 0.0);
}

#[test]
fn test_disjoint_sprinklers_add_up() {
    let terrain = square_terrain(10.0);
    let left = Sprinkler::circle(Point::new(2.5, 5.0), 2.0);
    let right = Sprinkler::circle(Point::new(7.5, 5.0), 2.0);

    let pipeline = pipeline(Arc::new(InMemoryRecorder::new()), WeightedFitness::default());
    let both = pipeline.measure(&[left.clone(), right.clone()], &terrain);
    let alone = pipeline.measure(&[left], &terrain);

    assert!(both.overlap_area < 1e-6);
    assert!((both.covered_area - 2.0 * alone.covered_area).abs() < 0.05);
    assert_eq!(both.num_sprinklers, 2);
}

#[test]
fn test_weighted_fitness_penalties() {
    let base = FitnessInput {
        num_sprinklers: 3,
        terrain_area: 100.0,
        covered_area: 60.0,
        overlap_area: 0.0,
        outside_area: 0.0,
    };
    let weighted = WeightedFitness::default();
    assert!((weighted.compute(&base) - 0.6).abs() < 1e-12);

    let spilled = FitnessInput {
        outside_area: 10.0,
        ..base
    };
    assert!((weighted.compute(&spilled) - 0.4).abs() < 1e-12);
    assert!((WeightedFitness::simple().compute(&spilled) - 0.55).abs() < 1e-12);

    let crowded = FitnessInput {
        overlap_area: 20.0,
        ..base
    };
    assert_eq!(weighted.compute(&crowded), 0.0);
    assert!((WeightedFitness::simple().compute(&crowded) - 0.6).abs() < 1e-12);
}
