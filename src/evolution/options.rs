//! # GeneticAlgorithmOptions
//!
//! The `GeneticAlgorithmOptions` struct holds every tunable of a run: the
//! generation count, selection pressure, crossover and mutation rates,
//! elitism, population sizing and chromosome length bounds. Mutation details
//! live in [`MutationOptions`].
//!
//! ## Example
//!
//! ```rust
//! use sprinkler_ga::evolution::options::{CountRange, GeneticAlgorithmOptions};
//!
//! let options = GeneticAlgorithmOptions::builder()
//!     .generations(50)
//!     .tournament_arity(3)
//!     .elitism_rate(0.2)
//!     .population_size(40, 40)
//!     .chromosome_length(CountRange::new(2, 12))
//!     .build();
//!
//! assert!(options.validate().is_ok());
//! assert_eq!(options.get_generations(), 50);
//! ```
//!
//! Options are consumed by the algorithm, never changed by it. Call
//! [`GeneticAlgorithmOptions::validate`] before a run; the algorithm does so
//! too.

use std::f64::consts::{PI, TAU};

use crate::error::{GeneticError, Result};

const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Closed integer range `[min, max]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRange {
    pub min: usize,
    pub max: usize,
}

impl CountRange {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: usize) -> bool {
        self.min <= value && value <= self.max
    }

    fn validate(&self, what: &str) -> Result<()> {
        if self.min > self.max {
            return Err(GeneticError::Configuration(format!(
                "{}: minimum {} exceeds maximum {}",
                what, self.min, self.max
            )));
        }
        Ok(())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationOptions {
    pub initial_size: usize,
    pub maximum_size: usize,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossoverOptions {
    /// Parents shorter than this are rejected.
    pub minimum_length: usize,
    /// Cut pairs drawn before giving up and returning the parents.
    pub max_attempts: usize,
}

/// Value ranges fresh genes are drawn from. Positions default to the
/// terrain bounding box.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingRanges {
    pub x: Option<(f64, f64)>,
    pub y: Option<(f64, f64)>,
    pub range: (f64, f64),
    pub angle: (f64, f64),
}

impl Default for SamplingRanges {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            range: (0.0, 10.0),
            angle: (0.0, TAU),
        }
    }
}

/// Structural and field-level mutation settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOptions {
    pub insert_probability: f64,
    pub insert_count: CountRange,
    pub change_probability: f64,
    pub change_count: CountRange,
    pub remove_probability: f64,
    pub remove_count: CountRange,
    /// Chance of perturbing x, y, range, start angle and end angle.
    pub field_change_probabilities: [f64; 5],
    pub position_delta: f64,
    pub range_delta: f64,
    pub angle_delta: f64,
    /// Perturbation attempts per field before the old value is kept.
    pub field_retry_limit: usize,
    pub sampling: SamplingRanges,
}

impl MutationOptions {
    /// Maximum perturbation of each field, in field order.
    pub fn deltas(&self) -> [f64; 5] {
        [
            self.position_delta,
            self.position_delta,
            self.range_delta,
            self.angle_delta,
            self.angle_delta,
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("insert probability", self.insert_probability),
            ("change probability", self.change_probability),
            ("remove probability", self.remove_probability),
        ] {
            check_rate(name, p)?;
        }
        let total = self.insert_probability + self.change_probability + self.remove_probability;
        if total > 1.0 + PROBABILITY_TOLERANCE {
            return Err(GeneticError::Configuration(format!(
                "Insert, change and remove probabilities add up to {}",
                total
            )));
        }
        for p in self.field_change_probabilities {
            check_rate("field change probability", p)?;
        }

        self.insert_count.validate("insert count")?;
        self.change_count.validate("change count")?;
        self.remove_count.validate("remove count")?;

        for (name, delta) in [
            ("position delta", self.position_delta),
            ("range delta", self.range_delta),
            ("angle delta", self.angle_delta),
        ] {
            if !delta.is_finite() || delta < 0.0 {
                return Err(GeneticError::Configuration(format!(
                    "{} must be non-negative, got {}",
                    name, delta
                )));
            }
        }
        if self.field_retry_limit == 0 {
            return Err(GeneticError::Configuration(
                "Field retry limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MutationOptions {
    fn default() -> Self {
        Self {
            insert_probability: 0.3,
            insert_count: CountRange::new(1, 2),
            change_probability: 0.5,
            change_count: CountRange::new(1, 3),
            remove_probability: 0.2,
            remove_count: CountRange::new(1, 1),
            field_change_probabilities: [0.5; 5],
            position_delta: 1.0,
            range_delta: 1.0,
            angle_delta: PI / 18.0,
            field_retry_limit: 100,
            sampling: SamplingRanges::default(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct GeneticAlgorithmOptions {
    generations: usize,
    tournament_arity: usize,
    crossover_rate: f64,
    mutation_rate: f64,
    elitism_rate: f64,
    population: PopulationOptions,
    crossover: CrossoverOptions,
    chromosome_length: CountRange,
    mutation: MutationOptions,
    /// Minimum population size for parallel fitness evaluation.
    parallel_threshold: usize,
}

impl GeneticAlgorithmOptions {
    pub fn get_generations(&self) -> usize {
        self.generations
    }

    pub fn get_tournament_arity(&self) -> usize {
        self.tournament_arity
    }

    pub fn get_crossover_rate(&self) -> f64 {
        self.crossover_rate
    }

    pub fn get_mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    pub fn get_elitism_rate(&self) -> f64 {
        self.elitism_rate
    }

    pub fn get_population(&self) -> &PopulationOptions {
        &self.population
    }

    pub fn get_crossover(&self) -> &CrossoverOptions {
        &self.crossover
    }

    pub fn get_chromosome_length(&self) -> CountRange {
        self.chromosome_length
    }

    pub fn get_mutation(&self) -> &MutationOptions {
        &self.mutation
    }

    pub fn get_parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    /// Sets the number of generations.
    pub fn set_generations(&mut self, generations: usize) {
        self.generations = generations;
    }

    /// Sets the initial and maximum population sizes.
    pub fn set_population(&mut self, population: PopulationOptions) {
        self.population = population;
    }

    /// Sets the mutation options.
    pub fn set_mutation(&mut self, mutation: MutationOptions) {
        self.mutation = mutation;
    }

    /// Sets the parallel threshold.
    pub fn set_parallel_threshold(&mut self, threshold: usize) {
        self.parallel_threshold = threshold;
    }

    /// Number of chromosomes carried over unchanged each generation.
    pub fn elite_count(&self, population_size: usize) -> usize {
        ((self.elitism_rate * population_size as f64).floor() as usize).min(population_size)
    }

    /// Checks every option and the relations between them.
    pub fn validate(&self) -> Result<()> {
        if self.population.maximum_size == 0 || self.population.initial_size == 0 {
            return Err(GeneticError::Configuration(
                "Population size cannot be zero".to_string(),
            ));
        }
        if self.population.initial_size > self.population.maximum_size {
            return Err(GeneticError::Configuration(format!(
                "Initial population {} exceeds maximum {}",
                self.population.initial_size, self.population.maximum_size
            )));
        }
        if self.tournament_arity == 0 {
            return Err(GeneticError::Configuration(
                "Tournament arity must be at least 1".to_string(),
            ));
        }
        check_rate("crossover rate", self.crossover_rate)?;
        check_rate("mutation rate", self.mutation_rate)?;
        check_rate("elitism rate", self.elitism_rate)?;

        self.chromosome_length.validate("chromosome length")?;
        if self.crossover.minimum_length == 0 {
            return Err(GeneticError::Configuration(
                "Crossover minimum length must be at least 1".to_string(),
            ));
        }
        if self.crossover.max_attempts == 0 {
            return Err(GeneticError::Configuration(
                "Crossover needs at least one attempt".to_string(),
            ));
        }

        self.mutation.validate()
    }

    /// Returns a builder for creating a `GeneticAlgorithmOptions` instance.
    pub fn builder() -> GeneticAlgorithmOptionsBuilder {
        GeneticAlgorithmOptionsBuilder::default()
    }
}

impl Default for GeneticAlgorithmOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn check_rate(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(GeneticError::Configuration(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

/// Builder for `GeneticAlgorithmOptions`.
///
/// Unset values fall back to the defaults.
#[derive(Debug, Clone, Default)]
pub struct GeneticAlgorithmOptionsBuilder {
    generations: Option<usize>,
    tournament_arity: Option<usize>,
    crossover_rate: Option<f64>,
    mutation_rate: Option<f64>,
    elitism_rate: Option<f64>,
    population: Option<PopulationOptions>,
    crossover: Option<CrossoverOptions>,
    chromosome_length: Option<CountRange>,
    mutation: Option<MutationOptions>,
    parallel_threshold: Option<usize>,
}

impl GeneticAlgorithmOptionsBuilder {
    pub fn generations(mut self, value: usize) -> Self {
        self.generations = Some(value);
        self
    }

    pub fn tournament_arity(mut self, value: usize) -> Self {
        self.tournament_arity = Some(value);
        self
    }

    pub fn crossover_rate(mut self, value: f64) -> Self {
        self.crossover_rate = Some(value);
        self
    }

    pub fn mutation_rate(mut self, value: f64) -> Self {
        self.mutation_rate = Some(value);
        self
    }

    pub fn elitism_rate(mut self, value: f64) -> Self {
        self.elitism_rate = Some(value);
        self
    }

    /// Sets the initial and maximum population size.
    pub fn population_size(mut self, initial_size: usize, maximum_size: usize) -> Self {
        self.population = Some(PopulationOptions {
            initial_size,
            maximum_size,
        });
        self
    }

    pub fn crossover(mut self, value: CrossoverOptions) -> Self {
        self.crossover = Some(value);
        self
    }

    pub fn chromosome_length(mut self, value: CountRange) -> Self {
        self.chromosome_length = Some(value);
        self
    }

    pub fn mutation(mut self, value: MutationOptions) -> Self {
        self.mutation = Some(value);
        self
    }

    pub fn parallel_threshold(mut self, value: usize) -> Self {
        self.parallel_threshold = Some(value);
        self
    }

    /// Builds the `GeneticAlgorithmOptions` instance.
    pub fn build(self) -> GeneticAlgorithmOptions {
        GeneticAlgorithmOptions {
            generations: self.generations.unwrap_or(100),
            tournament_arity: self.tournament_arity.unwrap_or(3),
            crossover_rate: self.crossover_rate.unwrap_or(0.8),
            mutation_rate: self.mutation_rate.unwrap_or(0.2),
            elitism_rate: self.elitism_rate.unwrap_or(0.1),
            population: self.population.unwrap_or(PopulationOptions {
                initial_size: 50,
                maximum_size: 50,
            }),
            crossover: self.crossover.unwrap_or(CrossoverOptions {
                minimum_length: 1,
                max_attempts: 50,
            }),
            chromosome_length: self.chromosome_length.unwrap_or(CountRange::new(1, 30)),
            mutation: self.mutation.unwrap_or_default(),
            parallel_threshold: self.parallel_threshold.unwrap_or(16),
        }
    }
}
