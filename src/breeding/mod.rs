//! # Breeding
//!
//! Operators that derive new [`SprinklerSystem`](crate::chromosome::SprinklerSystem)
//! chromosomes from existing ones.

pub mod crossover;
pub mod mutation;

pub use crossover::{choose_cut_points, splice, VariableLengthCrossover};
pub use mutation::{GeneGenerator, RandomGeneMutation, StructuralMutation};
