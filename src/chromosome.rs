//! # SprinklerSystem
//!
//! The chromosome of the search: an ordered, variable-length list of
//! [`Sprinkler`] genes. A `SprinklerSystem` is immutable; crossover and
//! mutation build siblings with [`SprinklerSystem::with_genes`], which share
//! the validator, terrain and fitness pipeline of the original through a
//! [`ChromosomeContext`].
//!
//! Fitness is computed on first use and memoised for the chromosome's
//! lifetime. Concurrent first calls may both compute it; the results are
//! identical and only one is kept.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::breeding::mutation::GeneGenerator;
use crate::error::{GeneticError, Result};
use crate::evolution::{Chromosome, CountRange, Population, PopulationOptions};
use crate::fitness::{Evaluation, FitnessPipeline};
use crate::rng::RandomNumberGenerator;
use crate::sprinkler::{Sprinkler, Terrain, Validator};

/// Collaborators shared by every chromosome of a run.
#[derive(Debug)]
pub struct ChromosomeContext {
    validator: Arc<dyn Validator>,
    terrain: Arc<Terrain>,
    fitness: Arc<FitnessPipeline>,
    length: CountRange,
}

impl ChromosomeContext {
    pub fn new(
        validator: Arc<dyn Validator>,
        terrain: Arc<Terrain>,
        fitness: Arc<FitnessPipeline>,
        length: CountRange,
    ) -> Self {
        Self {
            validator,
            terrain,
            fitness,
            length,
        }
    }

    pub fn validator(&self) -> &Arc<dyn Validator> {
        &self.validator
    }

    pub fn terrain(&self) -> &Arc<Terrain> {
        &self.terrain
    }

    pub fn fitness(&self) -> &Arc<FitnessPipeline> {
        &self.fitness
    }

    /// Allowed number of genes.
    pub fn length(&self) -> CountRange {
        self.length
    }
}

#[derive(Clone)]
pub struct SprinklerSystem {
    genes: Vec<Sprinkler>,
    context: Arc<ChromosomeContext>,
    evaluation: OnceLock<Evaluation>,
}

impl SprinklerSystem {
    /// Builds a chromosome after checking its length and every gene.
    ///
    /// # Errors
    ///
    /// [`GeneticError::InvalidChromosome`] when the length is outside the
    /// context bounds or a gene is rejected by the validator.
    pub fn new(genes: Vec<Sprinkler>, context: Arc<ChromosomeContext>) -> Result<Self> {
        let length = context.length;
        if !length.contains(genes.len()) {
            return Err(GeneticError::InvalidChromosome(format!(
                "length {} outside [{}, {}]",
                genes.len(),
                length.min,
                length.max
            )));
        }

        for (i, gene) in genes.iter().enumerate() {
            context
                .validator
                .validate(gene)
                .map_err(|e| GeneticError::InvalidChromosome(format!("gene {}: {}", i, e)))?;
        }

        Ok(Self {
            genes,
            context,
            evaluation: OnceLock::new(),
        })
    }

    /// A sibling chromosome sharing this one's context.
    pub fn with_genes(&self, genes: Vec<Sprinkler>) -> Result<Self> {
        Self::new(genes, Arc::clone(&self.context))
    }

    pub fn genes(&self) -> &[Sprinkler] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn context(&self) -> &Arc<ChromosomeContext> {
        &self.context
    }

    /// The measured areas and the score, computed on first call.
    pub fn evaluation(&self) -> &Evaluation {
        self.evaluation.get_or_init(|| {
            self.context
                .fitness
                .evaluate(&self.genes, &self.context.terrain)
        })
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluation.get().is_some()
    }
}

impl Chromosome for SprinklerSystem {
    fn fitness(&self) -> f64 {
        self.evaluation().score
    }
}

impl fmt::Debug for SprinklerSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SprinklerSystem")
            .field("genes", &self.genes)
            .field("fitness", &self.evaluation.get().map(|e| e.score))
            .finish()
    }
}

impl Population<SprinklerSystem> {
    /// `initial_size` chromosomes of fresh genes, each with a length drawn
    /// uniformly from the context bounds. The capacity is `maximum_size`.
    pub fn random(
        context: &Arc<ChromosomeContext>,
        generator: &GeneGenerator,
        sizes: &PopulationOptions,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Self> {
        let bounds = context.length();
        let chromosomes = (0..sizes.initial_size)
            .map(|_| {
                let length = rng.count_between(bounds.min, bounds.max);
                let genes = (0..length).map(|_| generator.fresh(rng)).collect();
                SprinklerSystem::new(genes, Arc::clone(context))
            })
            .collect::<Result<Vec<_>>>()?;
        Population::new(chromosomes, sizes.maximum_size)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fitness::WeightedFitness;
    use crate::geometry::{ClippingOptions, Point, Polygon, PolygonClipper};
    use crate::sprinkler::CommonSenseValidator;
    use crate::telemetry::{Counter, InMemoryRecorder};

    pub(crate) fn context_with(
        length: CountRange,
        recorder: Arc<InMemoryRecorder>,
    ) -> Arc<ChromosomeContext> {
        let terrain = Arc::new(
            Terrain::new(Polygon::from(vec![
                (0.0, 0.0),
                (10.0, 0.0),
                (10.0, 10.0),
                (0.0, 10.0),
            ]))
            .unwrap(),
        );
        let options = ClippingOptions {
            workers: 2,
            ..ClippingOptions::default()
        };
        let clipper = Arc::new(PolygonClipper::new(options, recorder).unwrap());
        let pipeline = Arc::new(FitnessPipeline::new(
            clipper,
            Arc::new(WeightedFitness::default()),
        ));
        let validator = CommonSenseValidator::default()
            .and(crate::sprinkler::TerrainValidator::new(Arc::clone(&terrain)));
        Arc::new(ChromosomeContext::new(
            Arc::new(validator),
            terrain,
            pipeline,
            length,
        ))
    }

    pub(crate) fn gene(x: f64, y: f64) -> Sprinkler {
        Sprinkler::circle(Point::new(x, y), 2.0)
    }

    #[test]
    fn test_rejects_invalid_gene() {
        let context = context_with(CountRange::new(0, 5), Arc::new(InMemoryRecorder::new()));
        let outside = gene(20.0, 20.0);
        match SprinklerSystem::new(vec![gene(1.0, 1.0), outside], context) {
            Err(GeneticError::InvalidChromosome(msg)) => assert!(msg.starts_with("gene 1")),
            other => panic!("Expected InvalidChromosome, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_length_outside_bounds() {
        let context = context_with(CountRange::new(2, 3), Arc::new(InMemoryRecorder::new()));
        assert!(SprinklerSystem::new(vec![gene(1.0, 1.0)], Arc::clone(&context)).is_err());
        assert!(SprinklerSystem::new(vec![gene(1.0, 1.0); 4], Arc::clone(&context)).is_err());
        assert!(SprinklerSystem::new(vec![gene(1.0, 1.0); 3], context).is_ok());
    }

    #[test]
    fn test_empty_chromosome_scores_zero() {
        let recorder = Arc::new(InMemoryRecorder::new());
        let context = context_with(CountRange::new(0, 5), recorder.clone());
        let system = SprinklerSystem::new(Vec::new(), context).unwrap();

        assert_eq!(system.fitness(), 0.0);
        assert_eq!(recorder.get(Counter::Intersections), 0);
    }

    #[test]
    fn test_fitness_is_memoised() {
        let recorder = Arc::new(InMemoryRecorder::new());
        let context = context_with(CountRange::new(0, 5), recorder.clone());
        let system = SprinklerSystem::new(vec![gene(5.0, 5.0), gene(6.0, 5.0)], context).unwrap();

        assert!(!system.is_evaluated());
        let first = system.fitness();
        let clips = recorder.get(Counter::Intersections);
        let second = system.fitness();

        assert!(system.is_evaluated());
        assert_eq!(first, second);
        assert_eq!(recorder.get(Counter::Intersections), clips);
        assert!(first > 0.0);
    }

    #[test]
    fn test_with_genes_shares_context() {
        let context = context_with(CountRange::new(0, 5), Arc::new(InMemoryRecorder::new()));
        let system = SprinklerSystem::new(vec![gene(5.0, 5.0)], context).unwrap();
        let sibling = system.with_genes(vec![gene(2.0, 2.0), gene(8.0, 8.0)]).unwrap();

        assert!(Arc::ptr_eq(system.context(), sibling.context()));
        assert_eq!(sibling.len(), 2);
        assert!(system.with_genes(vec![gene(-1.0, 5.0)]).is_err());
    }

    #[test]
    fn test_random_population_uses_configured_sizes() {
        let recorder = Arc::new(InMemoryRecorder::new());
        let context = context_with(CountRange::new(1, 4), recorder.clone());
        let generator = GeneGenerator::new(
            Arc::clone(context.validator()),
            context.terrain(),
            crate::evolution::MutationOptions::default(),
            recorder,
        );
        let sizes = PopulationOptions {
            initial_size: 5,
            maximum_size: 8,
        };
        let mut rng = RandomNumberGenerator::from_seed(12);

        let population = Population::random(&context, &generator, &sizes, &mut rng).unwrap();

        assert_eq!(population.len(), 5);
        assert_eq!(population.capacity(), 8);
        assert!(population.iter().all(|c| (1..=4).contains(&c.len())));
    }
}
