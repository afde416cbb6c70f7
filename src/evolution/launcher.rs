use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::{
    options::GeneticAlgorithmOptions, Chromosome, CrossoverPolicy, MutationPolicy,
    Population, PopulationListener, SelectionPolicy, StoppingCondition,
};
use crate::{
    error::{GeneticError, OptionExt, Result},
    rng::RandomNumberGenerator,
    telemetry::{Counter, Recorder},
};

/// Parent pairs tried per open slot before the generation is padded.
const ATTEMPTS_PER_SLOT: usize = 10;

/// Drives a generational genetic algorithm.
///
/// Each generation is built from the previous one:
///
/// 1. rank the population by fitness, best first, and carry the top
///    `⌊elitism_rate × size⌋` chromosomes over unchanged;
/// 2. fill the remaining slots with children: select two distinct parents,
///    cross them over with probability `crossover_rate` (otherwise copy
///    them), then mutate each child with probability `mutation_rate`;
/// 3. notify the listeners.
///
/// Every generation has `population.maximum_size` members. Children that
/// fail validation are dropped; if too many are dropped, the remaining slots
/// are filled with the best chromosomes of the previous generation.
pub struct GeneticAlgorithm<C, X, M, S>
where
    C: Chromosome,
    X: CrossoverPolicy<C>,
    M: MutationPolicy<C>,
    S: SelectionPolicy<C>,
{
    crossover: X,
    mutation: M,
    selection: S,
    options: GeneticAlgorithmOptions,
    recorder: Arc<dyn Recorder>,
    listeners: Vec<Arc<dyn PopulationListener<C>>>,
    _marker: PhantomData<C>,
}

impl<C, X, M, S> GeneticAlgorithm<C, X, M, S>
where
    C: Chromosome,
    X: CrossoverPolicy<C>,
    M: MutationPolicy<C>,
    S: SelectionPolicy<C>,
{
    pub fn new(
        crossover: X,
        mutation: M,
        selection: S,
        options: GeneticAlgorithmOptions,
        recorder: Arc<dyn Recorder>,
    ) -> Self {
        Self {
            crossover,
            mutation,
            selection,
            options,
            recorder,
            listeners: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Adds a listener notified after every generation.
    pub fn with_listener(mut self, listener: Arc<dyn PopulationListener<C>>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn options(&self) -> &GeneticAlgorithmOptions {
        &self.options
    }

    /// Evolves `initial` until `stop` is satisfied and returns the last
    /// population. The best layout is `result.fittest()`.
    ///
    /// Generations are numbered from 1; `stop` is first asked with
    /// generation 0 and the initial population.
    ///
    /// # Errors
    ///
    /// - [`GeneticError::Configuration`] if the options are invalid.
    /// - [`GeneticError::EmptyPopulation`] if `initial` is empty.
    /// - [`GeneticError::Evolution`] if `initial` has fewer than two
    ///   chromosomes, since parents must be distinct.
    /// - Any error other than an invalid child raised by the policies.
    pub fn evolve(
        &self,
        initial: Population<C>,
        stop: &dyn StoppingCondition<C>,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Population<C>> {
        self.options.validate()?;

        if initial.is_empty() {
            return Err(GeneticError::EmptyPopulation);
        }
        if initial.len() < 2 {
            return Err(GeneticError::Evolution(
                "Evolution needs at least two chromosomes".to_string(),
            ));
        }

        let started = Instant::now();
        let mut current = initial;
        let mut generation = 0;

        while !stop.is_satisfied(&current, generation) {
            let generation_started = Instant::now();
            current = self.next_generation(&current, rng)?;
            generation += 1;
            self.notify(&current, generation, generation_started.elapsed());
        }

        self.recorder.increment(Counter::Generations, generation as u64);
        let best = current.fittest().map(C::fitness);
        info!(
            generations = generation,
            ?best,
            elapsed = ?started.elapsed(),
            "Evolution finished"
        );

        Ok(current)
    }

    /// Builds the generation following `current`, with
    /// `population.maximum_size` chromosomes.
    pub fn next_generation(
        &self,
        current: &Population<C>,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Population<C>> {
        let size = self.options.get_population().maximum_size;
        let ranked = self.rank(current);

        let elite_count = self.options.elite_count(size).min(ranked.len());
        let mut next: Vec<C> = ranked.iter().take(elite_count).cloned().collect();

        let budget = (size - next.len()) * ATTEMPTS_PER_SLOT;
        let mut attempts = 0;
        while next.len() < size && attempts < budget {
            attempts += 1;

            let (i, j) = self.selection.select_pair(current, rng)?;
            let first = current
                .get(i)
                .ok_or_else_genetic(|| GeneticError::Evolution(format!("No parent at {}", i)))?;
            let second = current
                .get(j)
                .ok_or_else_genetic(|| GeneticError::Evolution(format!("No parent at {}", j)))?;

            let (child1, child2) = match self.breed(first, second, rng)? {
                Some(children) => children,
                None => continue,
            };

            for child in [child1, child2] {
                if next.len() >= size {
                    break;
                }
                if let Some(child) = self.maybe_mutate(child, rng)? {
                    next.push(child);
                }
            }
        }

        if next.len() < size {
            let missing = size - next.len();
            warn!(
                missing,
                attempts, "attempt budget exhausted, padding with the previous generation"
            );
            next.extend(ranked.iter().cycle().take(missing).cloned());
        }

        Population::new(next, size)
    }

    /// The population sorted by fitness, best first. NaN sorts last.
    ///
    /// Fitness is computed in parallel for large populations.
    fn rank(&self, population: &Population<C>) -> Vec<C> {
        if population.len() >= self.options.get_parallel_threshold() {
            population.chromosomes().par_iter().for_each(|c| {
                c.fitness();
            });
        }

        let mut ranked = population.chromosomes().to_vec();
        ranked.sort_by(|a, b| {
            let (fa, fb) = (a.fitness(), b.fitness());
            fb.partial_cmp(&fa).unwrap_or_else(|| {
                if fb.is_nan() && !fa.is_nan() {
                    std::cmp::Ordering::Less
                } else if fa.is_nan() && !fb.is_nan() {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
        });
        ranked
    }

    /// Crosses the parents over, or copies them. `None` means the children
    /// were invalid and dropped.
    fn breed(
        &self,
        first: &C,
        second: &C,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Option<(C, C)>> {
        if !rng.chance(self.options.get_crossover_rate()) {
            return Ok(Some((first.clone(), second.clone())));
        }

        self.recorder.increment(Counter::Crossovers, 1);
        match self.crossover.crossover(first, second, rng) {
            Ok(children) => Ok(Some(children)),
            Err(GeneticError::ChromosomeTooShort { length, minimum }) => {
                debug!(length, minimum, "parent too short for crossover, copying parents");
                Ok(Some((first.clone(), second.clone())))
            }
            Err(GeneticError::InvalidChromosome(reason)) => {
                debug!(%reason, "dropping invalid crossover children");
                self.recorder.increment(Counter::InvalidCandidates, 1);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Mutates the child with probability `mutation_rate`. `None` means the
    /// mutant was invalid and dropped.
    fn maybe_mutate(&self, child: C, rng: &mut RandomNumberGenerator) -> Result<Option<C>> {
        if !rng.chance(self.options.get_mutation_rate()) {
            return Ok(Some(child));
        }

        self.recorder.increment(Counter::Mutations, 1);
        match self.mutation.mutate(&child, rng) {
            Ok(mutant) => Ok(Some(mutant)),
            Err(GeneticError::InvalidChromosome(reason)) => {
                debug!(%reason, "dropping invalid mutant");
                self.recorder.increment(Counter::InvalidCandidates, 1);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn notify(&self, population: &Population<C>, generation: usize, elapsed: Duration) {
        for listener in &self.listeners {
            listener.on_population(population, generation, elapsed);
        }
    }
}
