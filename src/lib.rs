//! # sprinkler_ga
//!
//! Evolutionary search for sprinkler layouts. A layout is a variable-length
//! list of sprinklers; its fitness rewards watered terrain and penalises
//! overlap and water spilled outside the terrain. Areas come from a polygon
//! intersection kernel plus a pooled boolean clipper.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sprinkler_ga::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let recorder: Arc<dyn Recorder> = Arc::new(InMemoryRecorder::new());
//!     let terrain = Arc::new(Terrain::new(Polygon::from(vec![
//!         (0.0, 0.0),
//!         (20.0, 0.0),
//!         (20.0, 10.0),
//!         (0.0, 10.0),
//!     ]))?);
//!
//!     let options = GeneticAlgorithmOptions::builder()
//!         .generations(30)
//!         .population_size(20, 20)
//!         .chromosome_length(CountRange::new(1, 12))
//!         .build();
//!
//!     let clipper = Arc::new(PolygonClipper::new(ClippingOptions::default(), recorder.clone())?);
//!     let pipeline = Arc::new(FitnessPipeline::new(clipper, Arc::new(WeightedFitness::default())));
//!     let validator: Arc<dyn Validator> = Arc::new(
//!         CommonSenseValidator::default().and(TerrainValidator::new(terrain.clone())),
//!     );
//!     let context = Arc::new(ChromosomeContext::new(
//!         validator.clone(),
//!         terrain.clone(),
//!         pipeline,
//!         options.get_chromosome_length(),
//!     ));
//!     let generator = Arc::new(GeneGenerator::new(
//!         validator,
//!         &terrain,
//!         options.get_mutation().clone(),
//!         recorder.clone(),
//!     ));
//!
//!     let mut rng = RandomNumberGenerator::from_seed(7);
//!     let population = Population::<SprinklerSystem>::random(
//!         &context,
//!         &generator,
//!         options.get_population(),
//!         &mut rng,
//!     )?;
//!
//!     let ga = GeneticAlgorithm::new(
//!         VariableLengthCrossover::new(
//!             *options.get_crossover(),
//!             options.get_chromosome_length(),
//!             recorder.clone(),
//!         ),
//!         StructuralMutation::new(generator, options.get_chromosome_length(), recorder.clone()),
//!         TournamentSelection::new(options.get_tournament_arity())?,
//!         options.clone(),
//!         recorder.clone(),
//!     )
//!     .with_listener(Arc::new(GenerationLogger::new(recorder)));
//!
//!     let stop = FixedGenerationCount::new(options.get_generations());
//!     let last = ga.evolve(population, &stop, &mut rng)?;
//!     if let Some(best) = last.fittest() {
//!         println!("{} sprinklers, fitness {:.3}", best.len(), best.fitness());
//!     }
//!     Ok(())
//! }
//! ```

pub mod breeding;
pub mod chromosome;
pub mod error;
pub mod evolution;
pub mod fitness;
pub mod geometry;
pub mod rng;
pub mod selection;
pub mod sprinkler;
pub mod telemetry;

// Re-export commonly used types for convenience
pub use error::{GeneticError, OptionExt, Result};

/// Everything needed to wire up a run.
pub mod prelude {
    pub use crate::breeding::{
        GeneGenerator, RandomGeneMutation, StructuralMutation, VariableLengthCrossover,
    };
    pub use crate::chromosome::{ChromosomeContext, SprinklerSystem};
    pub use crate::error::{GeneticError, Result};
    pub use crate::evolution::{
        Chromosome, CountRange, FixedGenerationCount, GeneticAlgorithm, GeneticAlgorithmOptions,
        MutationOptions, Population, PopulationListener, StoppingCondition,
    };
    pub use crate::fitness::{FitnessCalculator, FitnessPipeline, WeightedFitness};
    pub use crate::geometry::{ClippingOptions, Point, Polygon, PolygonClipper};
    pub use crate::rng::RandomNumberGenerator;
    pub use crate::selection::{SelectionPolicy, TournamentSelection};
    pub use crate::sprinkler::{
        CommonSenseValidator, Sprinkler, Terrain, TerrainValidator, Validator,
    };
    pub use crate::telemetry::{
        Counter, GenerationLogger, InMemoryRecorder, NoopRecorder, Recorder,
    };
}
