//! # Mutation
//!
//! Two levels of change:
//!
//! - [`StructuralMutation`] works on the chromosome: it inserts fresh genes,
//!   perturbs a few existing ones or removes some, always staying inside the
//!   chromosome length bounds.
//! - [`GeneGenerator`] works on a single gene: it synthesises a fresh valid
//!   sprinkler, or nudges the fields of an existing one while keeping it
//!   valid.
//!
//! [`RandomGeneMutation`] is a simpler policy that swaps one gene for a
//! fresh one.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::chromosome::SprinklerSystem;
use crate::error::Result;
use crate::evolution::{CountRange, MutationOptions, MutationPolicy};
use crate::rng::RandomNumberGenerator;
use crate::sprinkler::{Sprinkler, Terrain, Validator};
use crate::telemetry::{Counter, Recorder};

const FRESH_GENE_LOG_INTERVAL: usize = 1000;

/// Produces valid genes, either from scratch or as a small variation of an
/// existing gene.
#[derive(Clone)]
pub struct GeneGenerator {
    validator: Arc<dyn Validator>,
    options: MutationOptions,
    x: (f64, f64),
    y: (f64, f64),
    recorder: Arc<dyn Recorder>,
}

impl GeneGenerator {
    /// Positions are sampled from the configured ranges, or from the
    /// terrain's bounding box when none are set.
    pub fn new(
        validator: Arc<dyn Validator>,
        terrain: &Terrain,
        options: MutationOptions,
        recorder: Arc<dyn Recorder>,
    ) -> Self {
        let bbox = terrain.bounding_box();
        let x = options.sampling.x.unwrap_or((bbox.min.x, bbox.max.x));
        let y = options.sampling.y.unwrap_or((bbox.min.y, bbox.max.y));
        Self {
            validator,
            options,
            x,
            y,
            recorder,
        }
    }

    pub fn options(&self) -> &MutationOptions {
        &self.options
    }

    /// Draws whole genes until the validator accepts one.
    ///
    /// There is no attempt limit; a warning is logged every
    /// thousand rejected draws.
    pub fn fresh(&self, rng: &mut RandomNumberGenerator) -> Sprinkler {
        let mut attempts = 0usize;
        loop {
            let candidate = self.sample(rng);
            if self.validator.is_valid(&candidate) {
                return candidate;
            }
            attempts += 1;
            if attempts % FRESH_GENE_LOG_INTERVAL == 0 {
                warn!(attempts, "still looking for a valid random sprinkler");
            }
        }
    }

    /// Nudges each field with its configured probability.
    ///
    /// A selected field gets up to `field_retry_limit` random deltas; the
    /// first one that keeps the gene valid is applied. When none does, the
    /// field keeps its previous value.
    pub fn perturb(&self, original: &Sprinkler, rng: &mut RandomNumberGenerator) -> Sprinkler {
        let deltas = self.options.deltas();
        let mut solution = original.to_fields();

        for field in 0..Sprinkler::FIELDS {
            if !rng.chance(self.options.field_change_probabilities[field]) {
                continue;
            }

            let mut found = false;
            for _ in 0..self.options.field_retry_limit {
                let mut attempt = solution;
                attempt[field] += rng.delta(deltas[field]);
                if self.validator.is_valid(&Sprinkler::from_fields(attempt)) {
                    solution = attempt;
                    found = true;
                    break;
                }
            }

            if !found {
                warn!(
                    field,
                    attempts = self.options.field_retry_limit,
                    ?solution,
                    "no valid value for field, keeping the previous one"
                );
                self.recorder.increment(Counter::MutationFieldExhausted, 1);
            }
        }

        Sprinkler::from_fields(solution)
    }

    fn sample(&self, rng: &mut RandomNumberGenerator) -> Sprinkler {
        let ranges = &self.options.sampling;
        Sprinkler::from_fields([
            rng.uniform(self.x.0, self.x.1),
            rng.uniform(self.y.0, self.y.1),
            rng.uniform(ranges.range.0, ranges.range.1),
            rng.uniform(ranges.angle.0, ranges.angle.1),
            rng.uniform(ranges.angle.0, ranges.angle.1),
        ])
    }
}

impl fmt::Debug for GeneGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneGenerator")
            .field("validator", &self.validator)
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

/// Inserts, changes or removes genes.
///
/// A single uniform draw `r` picks the operation: insert when
/// `r < p_insert`, change when `r < p_insert + p_change`, remove when
/// `r < p_insert + p_change + p_remove`, otherwise nothing.
#[derive(Clone)]
pub struct StructuralMutation {
    generator: Arc<GeneGenerator>,
    length: CountRange,
    recorder: Arc<dyn Recorder>,
}

impl StructuralMutation {
    /// Probabilities and counts come from the generator's options.
    pub fn new(
        generator: Arc<GeneGenerator>,
        length: CountRange,
        recorder: Arc<dyn Recorder>,
    ) -> Self {
        Self {
            generator,
            length,
            recorder,
        }
    }

    /// Appends fresh genes, never growing past the maximum length.
    fn insert(&self, genes: &mut Vec<Sprinkler>, rng: &mut RandomNumberGenerator) {
        let count = self.generator.options().insert_count;
        let room = self.length.max.saturating_sub(genes.len());
        let k = rng.count_between(count.min, count.max).min(room);
        for _ in 0..k {
            genes.push(self.generator.fresh(rng));
        }
        debug!(inserted = k, length = genes.len(), "insert mutation");
    }

    /// Perturbs `k` distinct genes.
    fn change(&self, genes: &mut [Sprinkler], rng: &mut RandomNumberGenerator) {
        let count = self.generator.options().change_count;
        let k = rng.count_between(count.min, count.max).min(genes.len());
        for index in rng.sample_unique_indices(genes.len(), k) {
            genes[index] = self.generator.perturb(&genes[index], rng);
        }
        debug!(changed = k, "change mutation");
    }

    /// Removes `k` distinct genes, never shrinking below the minimum length.
    fn remove(&self, genes: &mut Vec<Sprinkler>, rng: &mut RandomNumberGenerator) {
        let count = self.generator.options().remove_count;
        let removable = genes.len().saturating_sub(self.length.min);
        let k = rng.count_between(count.min, count.max).min(removable);

        let mut indices = rng.sample_unique_indices(genes.len(), k);
        indices.sort_unstable_by(|a, b| b.cmp(a));
        for index in indices {
            genes.remove(index);
        }
        debug!(removed = k, length = genes.len(), "remove mutation");
    }
}

impl MutationPolicy<SprinklerSystem> for StructuralMutation {
    fn mutate(
        &self,
        original: &SprinklerSystem,
        rng: &mut RandomNumberGenerator,
    ) -> Result<SprinklerSystem> {
        let options = self.generator.options();
        let insert = options.insert_probability;
        let change = insert + options.change_probability;
        let remove = change + options.remove_probability;

        let mut genes = original.genes().to_vec();
        let r = rng.unit();
        if r < insert {
            self.insert(&mut genes, rng);
            self.recorder.increment(Counter::MutationsInsert, 1);
        } else if r < change {
            self.change(&mut genes, rng);
            self.recorder.increment(Counter::MutationsChange, 1);
        } else if r < remove {
            self.remove(&mut genes, rng);
            self.recorder.increment(Counter::MutationsRemove, 1);
        } else {
            return Ok(original.clone());
        }

        original.with_genes(genes)
    }
}

/// Replaces one uniformly chosen gene with a fresh one.
#[derive(Debug, Clone)]
pub struct RandomGeneMutation {
    generator: Arc<GeneGenerator>,
}

impl RandomGeneMutation {
    pub fn new(generator: Arc<GeneGenerator>) -> Self {
        Self { generator }
    }
}

impl MutationPolicy<SprinklerSystem> for RandomGeneMutation {
    fn mutate(
        &self,
        original: &SprinklerSystem,
        rng: &mut RandomNumberGenerator,
    ) -> Result<SprinklerSystem> {
        if original.is_empty() {
            return Ok(original.clone());
        }
        let mut genes = original.genes().to_vec();
        let index = rng.index(genes.len());
        genes[index] = self.generator.fresh(rng);
        original.with_genes(genes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::tests::{context_with, gene};
    use crate::chromosome::ChromosomeContext;
    use crate::sprinkler::{CommonSenseValidator, TerrainValidator};
    use crate::telemetry::InMemoryRecorder;

    fn generator(
        context: &Arc<ChromosomeContext>,
        options: MutationOptions,
        recorder: Arc<InMemoryRecorder>,
    ) -> Arc<GeneGenerator> {
        Arc::new(GeneGenerator::new(
            Arc::clone(context.validator()),
            context.terrain(),
            options,
            recorder,
        ))
    }

    fn only(insert: f64, change: f64, remove: f64) -> MutationOptions {
        MutationOptions {
            insert_probability: insert,
            change_probability: change,
            remove_probability: remove,
            insert_count: CountRange::new(1, 3),
            change_count: CountRange::new(1, 3),
            remove_count: CountRange::new(1, 3),
            ..MutationOptions::default()
        }
    }

    #[test]
    fn test_fresh_genes_are_valid() {
        let recorder = Arc::new(InMemoryRecorder::new());
        let context = context_with(CountRange::new(0, 10), recorder.clone());
        let generator = generator(&context, MutationOptions::default(), recorder);
        let mut rng = RandomNumberGenerator::from_seed(21);

        for _ in 0..100 {
            let sprinkler = generator.fresh(&mut rng);
            assert!(context.validator().is_valid(&sprinkler));
        }
    }

    #[test]
    fn test_perturbation_stays_valid_and_small() {
        let recorder = Arc::new(InMemoryRecorder::new());
        let context = context_with(CountRange::new(0, 10), recorder.clone());
        let options = MutationOptions {
            field_change_probabilities: [1.0; 5],
            ..MutationOptions::default()
        };
        let generator = generator(&context, options.clone(), recorder);
        let mut rng = RandomNumberGenerator::from_seed(5);

        let original = Sprinkler::new(crate::geometry::Point::new(5.0, 5.0), 4.0, 1.0, 3.0);
        for _ in 0..100 {
            let perturbed = generator.perturb(&original, &mut rng);
            assert!(context.validator().is_valid(&perturbed));
            let deltas = options.deltas();
            for ((a, b), d) in original
                .to_fields()
                .iter()
                .zip(perturbed.to_fields().iter())
                .zip(deltas.iter())
            {
                assert!((a - b).abs() <= *d + 1e-12);
            }
        }
    }

    #[test]
    fn test_exhausted_field_keeps_value() {
        let recorder = Arc::new(InMemoryRecorder::new());
        // Only a range of exactly 1 is valid, so any non-zero range delta fails.
        let validator: Arc<dyn Validator> = Arc::new(CommonSenseValidator::new(1.0, 1.0));
        let context = context_with(CountRange::new(0, 10), recorder.clone());
        let options = MutationOptions {
            field_change_probabilities: [0.0, 0.0, 1.0, 0.0, 0.0],
            field_retry_limit: 5,
            ..MutationOptions::default()
        };
        let generator = GeneGenerator::new(validator, context.terrain(), options, recorder.clone());

        let original = Sprinkler::new(crate::geometry::Point::new(5.0, 5.0), 1.0, 0.0, 1.0);
        let mut rng = RandomNumberGenerator::from_seed(13);
        let perturbed = generator.perturb(&original, &mut rng);

        assert_eq!(perturbed, original);
        assert_eq!(recorder.get(Counter::MutationFieldExhausted), 1);
    }

    #[test]
    fn test_insert_respects_max_length() {
        let recorder = Arc::new(InMemoryRecorder::new());
        let bounds = CountRange::new(1, 4);
        let context = context_with(bounds, recorder.clone());
        let mutation = StructuralMutation::new(
            generator(&context, only(1.0, 0.0, 0.0), recorder.clone()),
            bounds,
            recorder.clone(),
        );
        let system =
            SprinklerSystem::new(vec![gene(2.0, 2.0), gene(3.0, 3.0), gene(4.0, 4.0)], context)
                .unwrap();
        let mut rng = RandomNumberGenerator::from_seed(31);

        for _ in 0..30 {
            let mutated = mutation.mutate(&system, &mut rng).unwrap();
            assert!(mutated.len() == 3 || mutated.len() == 4);
            assert_eq!(&mutated.genes()[..3], system.genes());
        }
        assert_eq!(recorder.get(Counter::MutationsInsert), 30);
    }

    #[test]
    fn test_remove_respects_min_length() {
        let recorder = Arc::new(InMemoryRecorder::new());
        let bounds = CountRange::new(2, 6);
        let context = context_with(bounds, recorder.clone());
        let mutation = StructuralMutation::new(
            generator(&context, only(0.0, 0.0, 1.0), recorder.clone()),
            bounds,
            recorder.clone(),
        );
        let genes: Vec<Sprinkler> = (1..=4).map(|i| gene(i as f64 * 2.0, 5.0)).collect();
        let system = SprinklerSystem::new(genes, context).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(77);

        for _ in 0..30 {
            let mutated = mutation.mutate(&system, &mut rng).unwrap();
            assert!(bounds.contains(mutated.len()));
            assert!(mutated.len() < system.len());
            // survivors keep their relative order
            let positions: Vec<f64> = mutated.genes().iter().map(|g| g.position().x).collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
        assert_eq!(recorder.get(Counter::MutationsRemove), 30);
    }

    #[test]
    fn test_change_keeps_length() {
        let recorder = Arc::new(InMemoryRecorder::new());
        let bounds = CountRange::new(1, 6);
        let context = context_with(bounds, recorder.clone());
        let mutation = StructuralMutation::new(
            generator(&context, only(0.0, 1.0, 0.0), recorder.clone()),
            bounds,
            recorder.clone(),
        );
        let system =
            SprinklerSystem::new(vec![gene(2.0, 2.0), gene(5.0, 5.0)], context).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(3);

        for _ in 0..20 {
            assert_eq!(mutation.mutate(&system, &mut rng).unwrap().len(), 2);
        }
        assert_eq!(recorder.get(Counter::MutationsChange), 20);
    }

    #[test]
    fn test_no_op_returns_original() {
        let recorder = Arc::new(InMemoryRecorder::new());
        let bounds = CountRange::new(1, 6);
        let context = context_with(bounds, recorder.clone());
        let mutation = StructuralMutation::new(
            generator(&context, only(0.0, 0.0, 0.0), recorder.clone()),
            bounds,
            recorder,
        );
        let system = SprinklerSystem::new(vec![gene(2.0, 2.0)], context).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(3);

        let mutated = mutation.mutate(&system, &mut rng).unwrap();
        assert_eq!(mutated.genes(), system.genes());
    }

    #[test]
    fn test_random_gene_mutation_replaces_one_gene() {
        let recorder = Arc::new(InMemoryRecorder::new());
        let context = context_with(CountRange::new(1, 6), recorder.clone());
        let validator = CommonSenseValidator::default()
            .and(TerrainValidator::new(Arc::clone(context.terrain())));
        let generator = Arc::new(GeneGenerator::new(
            Arc::new(validator),
            context.terrain(),
            MutationOptions::default(),
            recorder,
        ));
        let mutation = RandomGeneMutation::new(generator);
        let system =
            SprinklerSystem::new(vec![gene(2.0, 2.0), gene(5.0, 5.0), gene(8.0, 8.0)], context)
                .unwrap();
        let mut rng = RandomNumberGenerator::from_seed(12);

        let mutated = mutation.mutate(&system, &mut rng).unwrap();
        let unchanged = mutated
            .genes()
            .iter()
            .zip(system.genes())
            .filter(|(a, b)| a == b)
            .count();
        assert_eq!(mutated.len(), 3);
        assert_eq!(unchanged, 2);
    }
}
