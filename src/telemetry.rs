//! # Telemetry
//!
//! Counters and per-generation series reported by the search. The core only
//! talks to the [`Recorder`] trait; [`NoopRecorder`] discards everything and
//! [`InMemoryRecorder`] keeps the values for inspection.
//!
//! [`GenerationLogger`] is the stock population listener: it feeds the
//! recorder and writes one `info` line per generation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::info;

use crate::chromosome::SprinklerSystem;
use crate::evolution::{Chromosome, Population, PopulationListener};

/// Event counters.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Counter {
    Intersections,
    IntersectionTimeouts,
    IntersectionMultipleAreas,
    IntersectionEmpty,
    IntersectionErrors,
    Generations,
    Individuals,
    Crossovers,
    CrossoverExhausted,
    Mutations,
    MutationsInsert,
    MutationsChange,
    MutationsRemove,
    MutationFieldExhausted,
    InvalidCandidates,
}

impl Counter {
    pub const ALL: [Counter; 15] = [
        Counter::Intersections,
        Counter::IntersectionTimeouts,
        Counter::IntersectionMultipleAreas,
        Counter::IntersectionEmpty,
        Counter::IntersectionErrors,
        Counter::Generations,
        Counter::Individuals,
        Counter::Crossovers,
        Counter::CrossoverExhausted,
        Counter::Mutations,
        Counter::MutationsInsert,
        Counter::MutationsChange,
        Counter::MutationsRemove,
        Counter::MutationFieldExhausted,
        Counter::InvalidCandidates,
    ];

    /// Stable metric name.
    pub fn name(&self) -> &'static str {
        match self {
            Counter::Intersections => "counter.terrain-sprinkler.intersection",
            Counter::IntersectionTimeouts => "errors.terrain-sprinkler.intersection.timeout",
            Counter::IntersectionMultipleAreas => {
                "errors.terrain-sprinkler.intersection.multiple-intersection-areas"
            }
            Counter::IntersectionEmpty => "counter.terrain-sprinkler.no-intersection",
            Counter::IntersectionErrors => "errors.terrain-sprinkler.intersection.failure",
            Counter::Generations => "counter.genetic-algorithm.generations",
            Counter::Individuals => "counter.genetic-algorithm.individuals",
            Counter::Crossovers => "counter.genetic-algorithm.crossovers",
            Counter::CrossoverExhausted => "errors.genetic-algorithm.crossovers.no-solution",
            Counter::Mutations => "counter.genetic-algorithm.mutations",
            Counter::MutationsInsert => "counter.genetic-algorithm.mutations-insert",
            Counter::MutationsChange => "counter.genetic-algorithm.mutations-change",
            Counter::MutationsRemove => "counter.genetic-algorithm.mutations-delete",
            Counter::MutationFieldExhausted => {
                "errors.genetic-algorithm.mutations-change.no-solution"
            }
            Counter::InvalidCandidates => "errors.genetic-algorithm.invalid-candidates",
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

/// Per-generation series.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    GenerationFitness,
    GenerationCoveredArea,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::GenerationFitness => "histogram.genetic-algorithm.fitness",
            Metric::GenerationCoveredArea => "histogram.genetic-algorithm.covered-area",
        }
    }
}

/// Sink for telemetry. Implementations must tolerate concurrent calls.
pub trait Recorder: Send + Sync {
    fn increment(&self, counter: Counter, by: u64);

    /// Records one value of a per-generation series.
    fn observe(&self, _metric: Metric, _generation: usize, _value: f64) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn increment(&self, _counter: Counter, _by: u64) {}
}

/// Keeps counters and series in memory.
#[derive(Debug, Default)]
pub struct InMemoryRecorder {
    counters: [AtomicU64; 15],
    series: Mutex<HashMap<Metric, Vec<(usize, f64)>>>,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter.slot()].load(Ordering::Relaxed)
    }

    /// All counters with their metric names, in catalog order.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        Counter::ALL
            .iter()
            .map(|counter| (counter.name(), self.get(*counter)))
            .collect()
    }

    /// Recorded `(generation, value)` pairs for a series.
    pub fn series(&self, metric: Metric) -> Vec<(usize, f64)> {
        let series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        series.get(&metric).cloned().unwrap_or_default()
    }
}

impl Recorder for InMemoryRecorder {
    fn increment(&self, counter: Counter, by: u64) {
        self.counters[counter.slot()].fetch_add(by, Ordering::Relaxed);
    }

    fn observe(&self, metric: Metric, generation: usize, value: f64) {
        let mut series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        series.entry(metric).or_default().push((generation, value));
    }
}

/// Reports every generation to a [`Recorder`] and the log.
#[derive(Clone)]
pub struct GenerationLogger {
    recorder: Arc<dyn Recorder>,
}

impl GenerationLogger {
    pub fn new(recorder: Arc<dyn Recorder>) -> Self {
        Self { recorder }
    }
}

impl PopulationListener<SprinklerSystem> for GenerationLogger {
    fn on_population(
        &self,
        population: &Population<SprinklerSystem>,
        generation: usize,
        elapsed: Duration,
    ) {
        let size = population.len();
        self.recorder.increment(Counter::Individuals, size as u64);
        if size == 0 {
            return;
        }

        let mean_fitness = population.iter().map(Chromosome::fitness).sum::<f64>() / size as f64;
        let mean_covered = population
            .iter()
            .map(|c| c.evaluation().input.covered_area)
            .sum::<f64>()
            / size as f64;
        let best = population.fittest().map(Chromosome::fitness).unwrap_or(0.0);

        self.recorder
            .observe(Metric::GenerationFitness, generation, mean_fitness);
        self.recorder
            .observe(Metric::GenerationCoveredArea, generation, mean_covered);

        info!(
            generation,
            best_fitness = best,
            mean_fitness,
            mean_covered_area = mean_covered,
            elapsed_ms = elapsed.as_millis() as u64,
            "Completed generation"
        );
    }
}
