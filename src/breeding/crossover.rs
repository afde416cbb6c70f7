//! # VariableLengthCrossover
//!
//! One-point crossover for parents of different lengths. Each parent gets its
//! own cut index; the head of one parent is joined with the tail of the
//! other:
//!
//! ```text
//! A = a0 a1 | a2 a3 a4        child1 = a0 a1 b3
//! B = b0 b1 b2 | b3           child2 = b0 b1 b2 a2 a3 a4
//! ```
//!
//! Cut pairs are redrawn until both children fit the chromosome length
//! bounds. If no pair fits within the attempt budget, the parents are
//! returned unchanged.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::chromosome::SprinklerSystem;
use crate::error::{GeneticError, Result};
use crate::evolution::{CountRange, CrossoverOptions, CrossoverPolicy};
use crate::rng::RandomNumberGenerator;
use crate::telemetry::{Counter, Recorder};

/// Draws independent cut indices `ia ∈ [0, first_len)` and
/// `ib ∈ [0, second_len)` until both child lengths,
/// `ia + (second_len − ib)` and `ib + (first_len − ia)`, lie in `bounds`.
///
/// Returns `None` after `max_attempts` rejected draws, or right away when a
/// parent is empty.
pub fn choose_cut_points(
    first_len: usize,
    second_len: usize,
    bounds: CountRange,
    max_attempts: usize,
    rng: &mut RandomNumberGenerator,
) -> Option<(usize, usize)> {
    if first_len == 0 || second_len == 0 {
        return None;
    }

    for _ in 0..max_attempts {
        let ia = rng.index(first_len);
        let ib = rng.index(second_len);
        let l1 = ia + (second_len - ib);
        let l2 = ib + (first_len - ia);
        if bounds.contains(l1) && bounds.contains(l2) {
            return Some((ia, ib));
        }
        trace!(ia, ib, l1, l2, "rejected cut points");
    }
    None
}

/// Returns `(first[..ia] ++ second[ib..], second[..ib] ++ first[ia..])`.
pub fn splice<T: Clone>(first: &[T], second: &[T], ia: usize, ib: usize) -> (Vec<T>, Vec<T>) {
    let mut child1 = Vec::with_capacity(ia + second.len() - ib);
    child1.extend_from_slice(&first[..ia]);
    child1.extend_from_slice(&second[ib..]);

    let mut child2 = Vec::with_capacity(ib + first.len() - ia);
    child2.extend_from_slice(&second[..ib]);
    child2.extend_from_slice(&first[ia..]);

    (child1, child2)
}

#[derive(Clone)]
pub struct VariableLengthCrossover {
    options: CrossoverOptions,
    length: CountRange,
    recorder: Arc<dyn Recorder>,
}

impl VariableLengthCrossover {
    /// `length` bounds the children; `options` sets the parent minimum and
    /// the attempt budget.
    pub fn new(options: CrossoverOptions, length: CountRange, recorder: Arc<dyn Recorder>) -> Self {
        Self {
            options,
            length,
            recorder,
        }
    }
}

impl CrossoverPolicy<SprinklerSystem> for VariableLengthCrossover {
    fn crossover(
        &self,
        first: &SprinklerSystem,
        second: &SprinklerSystem,
        rng: &mut RandomNumberGenerator,
    ) -> Result<(SprinklerSystem, SprinklerSystem)> {
        let minimum = self.options.minimum_length;
        for parent in [first, second] {
            if parent.len() < minimum {
                return Err(GeneticError::ChromosomeTooShort {
                    length: parent.len(),
                    minimum,
                });
            }
        }

        match choose_cut_points(
            first.len(),
            second.len(),
            self.length,
            self.options.max_attempts,
            rng,
        ) {
            Some((ia, ib)) => {
                let (genes1, genes2) = splice(first.genes(), second.genes(), ia, ib);
                Ok((first.with_genes(genes1)?, second.with_genes(genes2)?))
            }
            None => {
                debug!(
                    first = first.len(),
                    second = second.len(),
                    attempts = self.options.max_attempts,
                    "no valid crossover point, keeping parents"
                );
                self.recorder.increment(Counter::CrossoverExhausted, 1);
                Ok((first.clone(), second.clone()))
            }
        }
    }
}
