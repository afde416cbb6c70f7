//! # Evolution
//!
//! The generic half of the search: the roles a genetic algorithm is built
//! from, expressed as traits, plus the [`GeneticAlgorithm`] driving them.
//!
//! - [`Chromosome`]: an immutable candidate with a memoised fitness.
//! - [`Population`]: a bounded, ordered set of chromosomes, replaced
//!   wholesale every generation.
//! - [`SelectionPolicy`]: picks two distinct parents.
//! - [`CrossoverPolicy`] / [`MutationPolicy`]: produce new chromosomes.
//! - [`StoppingCondition`]: decides when the run ends.
//! - [`PopulationListener`]: observes every new generation.

pub mod launcher;
pub mod options;

use std::fmt::Debug;
use std::slice::Iter;
use std::time::Duration;

use crate::error::{GeneticError, Result};
use crate::rng::RandomNumberGenerator;

pub use crate::selection::SelectionPolicy;
pub use launcher::GeneticAlgorithm;
pub use options::{
    CountRange, CrossoverOptions, GeneticAlgorithmOptions, MutationOptions, PopulationOptions,
    SamplingRanges,
};

/// A candidate solution.
///
/// Chromosomes never change after construction, so `fitness` must return the
/// same value on every call. Implementations are expected to compute it once
/// and cache it.
pub trait Chromosome: Clone + Debug + Send + Sync {
    fn fitness(&self) -> f64;
}

/// Recombines two parents into two children.
pub trait CrossoverPolicy<C: Chromosome>: Send + Sync {
    fn crossover(&self, first: &C, second: &C, rng: &mut RandomNumberGenerator)
        -> Result<(C, C)>;
}

/// Derives a new chromosome from an existing one.
pub trait MutationPolicy<C: Chromosome>: Send + Sync {
    fn mutate(&self, original: &C, rng: &mut RandomNumberGenerator) -> Result<C>;
}

/// Ends a run.
pub trait StoppingCondition<C: Chromosome> {
    /// `generation` counts the generations evolved so far.
    fn is_satisfied(&self, population: &Population<C>, generation: usize) -> bool;
}

/// Observes each generation right after it is produced.
pub trait PopulationListener<C: Chromosome>: Send + Sync {
    fn on_population(&self, population: &Population<C>, generation: usize, elapsed: Duration);
}

/// Stops after a fixed number of generations.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedGenerationCount {
    generations: usize,
}

impl FixedGenerationCount {
    pub fn new(generations: usize) -> Self {
        Self { generations }
    }

    pub fn generations(&self) -> usize {
        self.generations
    }
}

impl<C: Chromosome> StoppingCondition<C> for FixedGenerationCount {
    fn is_satisfied(&self, _population: &Population<C>, generation: usize) -> bool {
        generation >= self.generations
    }
}

/// Chromosomes of one generation, at most `capacity` of them.
#[derive(Debug, Clone)]
pub struct Population<C> {
    chromosomes: Vec<C>,
    capacity: usize,
}

impl<C: Chromosome> Population<C> {
    pub fn new(chromosomes: Vec<C>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(GeneticError::Configuration(
                "Population capacity cannot be zero".to_string(),
            ));
        }
        if chromosomes.len() > capacity {
            return Err(GeneticError::Configuration(format!(
                "{} chromosomes exceed the population capacity of {}",
                chromosomes.len(),
                capacity
            )));
        }
        Ok(Self {
            chromosomes,
            capacity,
        })
    }

    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn chromosomes(&self) -> &[C] {
        &self.chromosomes
    }

    pub fn get(&self, index: usize) -> Option<&C> {
        self.chromosomes.get(index)
    }

    pub fn iter(&self) -> Iter<'_, C> {
        self.chromosomes.iter()
    }

    pub fn into_chromosomes(self) -> Vec<C> {
        self.chromosomes
    }

    /// The chromosome with the highest fitness. NaN never wins.
    pub fn fittest(&self) -> Option<&C> {
        self.chromosomes
            .iter()
            .filter(|c| !c.fitness().is_nan())
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
            .or_else(|| self.chromosomes.first())
    }

    pub fn mean_fitness(&self) -> Option<f64> {
        if self.chromosomes.is_empty() {
            return None;
        }
        Some(self.chromosomes.iter().map(C::fitness).sum::<f64>() / self.len() as f64)
    }
}

impl<'a, C> IntoIterator for &'a Population<C> {
    type Item = &'a C;
    type IntoIter = Iter<'a, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.chromosomes.iter()
    }
}
