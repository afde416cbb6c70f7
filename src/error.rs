//! # Error Types
//!
//! This module defines the error type shared by the geometry, fitness and
//! evolution layers of the library.
//!
//! Only conditions that a caller must act on are errors. Degraded geometry
//! results (clip timeouts, multi-contour intersections) and exhausted retry
//! budgets inside the genetic operators are recorded as telemetry counters
//! instead, so the search never aborts because of them.
//!
//! ## Examples
//!
//! Using the `Result` type:
//!
//! ```rust
//! use sprinkler_ga::error::{GeneticError, Result};
//!
//! fn check_rate(rate: f64) -> Result<()> {
//!     if !(0.0..=1.0).contains(&rate) {
//!         return Err(GeneticError::Configuration(format!("rate {} out of range", rate)));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_rate(0.5).is_ok());
//! assert!(check_rate(1.5).is_err());
//! ```
//!
//! Using the `OptionExt` trait to convert `Option` to `Result`:
//!
//! ```rust
//! use sprinkler_ga::error::{GeneticError, OptionExt};
//!
//! fn best(scores: &[u32]) -> sprinkler_ga::error::Result<u32> {
//!     scores.iter().max().cloned().ok_or_else_genetic(|| GeneticError::EmptyPopulation)
//! }
//!
//! assert_eq!(best(&[3, 9, 4]).unwrap(), 9);
//! assert!(best(&[]).is_err());
//! ```

use thiserror::Error;

/// Represents errors that can occur while building or evolving sprinkler layouts.
#[derive(Error, Debug)]
pub enum GeneticError {
    /// Error that occurs when an invalid configuration is provided.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error that occurs when an empty population is encountered.
    #[error("Empty population error: Cannot operate on an empty population")]
    EmptyPopulation,

    /// Error that occurs when an evolution process fails.
    #[error("Evolution error: {0}")]
    Evolution(String),

    /// A single gene was rejected by a validator.
    ///
    /// Gene synthesis and perturbation retry on this error, so it is never
    /// surfaced by the mutation operators.
    #[error("Invalid gene: {0}")]
    InvalidGene(String),

    /// A gene sequence could not be turned into a chromosome, either because
    /// one of its genes failed validation or because its length is outside of
    /// the configured bounds.
    #[error("Invalid chromosome: {0}")]
    InvalidChromosome(String),

    /// A parent handed to crossover is shorter than the configured minimum.
    #[error("Chromosome too short: length {length}, minimum {minimum}")]
    ChromosomeTooShort { length: usize, minimum: usize },

    /// Error that occurs when polygon input cannot be processed.
    #[error("Geometry error: {0}")]
    Geometry(String),
}

/// A specialized Result type for sprinkler layout operations.
pub type Result<T> = std::result::Result<T, GeneticError>;

/// Extension trait for Option to convert to Result with a custom error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, GeneticError>` using a closure
    /// to generate the error.
    fn ok_or_else_genetic<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> GeneticError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_else_genetic<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> GeneticError,
    {
        self.ok_or_else(err_fn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = GeneticError::ChromosomeTooShort {
            length: 1,
            minimum: 2,
        };
        assert_eq!(
            err.to_string(),
            "Chromosome too short: length 1, minimum 2"
        );

        let err = GeneticError::InvalidGene("range 0.50 below 1.00".to_string());
        assert!(err.to_string().starts_with("Invalid gene"));
    }

    #[test]
    fn test_option_ext() {
        let some: Option<i32> = Some(3);
        assert_eq!(some.ok_or_else_genetic(|| GeneticError::EmptyPopulation).unwrap(), 3);

        let none: Option<i32> = None;
        match none.ok_or_else_genetic(|| GeneticError::EmptyPopulation) {
            Err(GeneticError::EmptyPopulation) => (),
            _ => panic!("Expected EmptyPopulation error"),
        }
    }
}
