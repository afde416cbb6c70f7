use std::collections::HashSet;

use tracing::debug;

use crate::error::{GeneticError, Result};
use crate::evolution::{Chromosome, Population};
use crate::rng::RandomNumberGenerator;
use crate::selection::selection_policy::SelectionPolicy;

/// Tournament rounds run for the second parent before falling back to a
/// uniform pick among the others.
const MAX_SECOND_PARENT_TOURNAMENTS: usize = 100;

/// Tournament selection of parent pairs.
///
/// Each tournament draws `arity` individuals uniformly (with replacement)
/// and keeps the fittest. The second parent comes from the same tournament
/// over the whole population, repeated while it picks the first parent.
///
/// Larger arities favour the best individuals; an arity of 1 is uniform
/// random selection.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct TournamentSelection {
    arity: usize,
}

impl TournamentSelection {
    /// Creates a new TournamentSelection with the given arity.
    ///
    /// # Errors
    ///
    /// Returns an error if `arity` is 0.
    pub fn new(arity: usize) -> Result<Self> {
        if arity < 1 {
            return Err(GeneticError::Configuration(
                "Tournament arity must be at least 1".to_string(),
            ));
        }
        Ok(Self { arity })
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Runs a single tournament and returns the index of the winner.
    ///
    /// NaN fitness never beats a number.
    ///
    /// # Errors
    ///
    /// Returns an error if all individuals are excluded.
    pub fn run_tournament(
        &self,
        fitness: &[f64],
        rng: &mut RandomNumberGenerator,
        excluded: &HashSet<usize>,
    ) -> Result<usize> {
        let eligible: Vec<usize> = (0..fitness.len())
            .filter(|i| !excluded.contains(i))
            .collect();

        if eligible.is_empty() {
            return Err(GeneticError::Evolution(
                "No eligible individuals for tournament selection".to_string(),
            ));
        }

        let mut best_idx = eligible[rng.index(eligible.len())];
        for _ in 1..self.arity {
            let idx = eligible[rng.index(eligible.len())];
            let (current, best) = (fitness[idx], fitness[best_idx]);
            if current > best || (best.is_nan() && !current.is_nan()) {
                best_idx = idx;
            }
        }

        Ok(best_idx)
    }
}

impl Default for TournamentSelection {
    fn default() -> Self {
        Self { arity: 2 }
    }
}

impl<C: Chromosome> SelectionPolicy<C> for TournamentSelection {
    fn select_pair(
        &self,
        population: &Population<C>,
        rng: &mut RandomNumberGenerator,
    ) -> Result<(usize, usize)> {
        if population.is_empty() {
            return Err(GeneticError::EmptyPopulation);
        }
        if population.len() < 2 {
            return Err(GeneticError::Evolution(
                "Selecting two parents needs at least two individuals".to_string(),
            ));
        }

        let fitness: Vec<f64> = population.iter().map(C::fitness).collect();

        let everyone = HashSet::new();
        let first = self.run_tournament(&fitness, rng, &everyone)?;

        for _ in 0..MAX_SECOND_PARENT_TOURNAMENTS {
            let second = self.run_tournament(&fitness, rng, &everyone)?;
            if second != first {
                return Ok((first, second));
            }
        }

        // the first parent dominates every tournament; any other will do
        let mut second = rng.index(fitness.len() - 1);
        if second >= first {
            second += 1;
        }
        debug!(first, second, "second parent picked uniformly");
        Ok((first, second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::tests::{scored, Scored};

    fn population(scores: &[f64]) -> Population<Scored> {
        Population::new(scored(scores), scores.len()).unwrap()
    }

    #[test]
    fn test_select_pair_is_distinct() {
        let population = population(&[0.5, 0.8, 0.3, 0.9, 0.1]);
        let selection = TournamentSelection::new(3).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(42);

        for _ in 0..200 {
            let (first, second) = selection.select_pair(&population, &mut rng).unwrap();
            assert_ne!(first, second);
            assert!(first < 5 && second < 5);
        }
    }

    #[test]
    fn test_second_parent_follows_repeated_tournament() {
        // Winner odds with arity 2 over [0.9, 0.5, 0.1] are 5/9, 3/9, 1/9.
        // Repeating the tournament while it returns index 1 leaves index 0
        // with 5/6; a tournament without index 1 would give only 3/4.
        let population = population(&[0.9, 0.5, 0.1]);
        let selection = TournamentSelection::new(2).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(17);

        let (mut after_middle, mut best_after_middle) = (0u32, 0u32);
        let mut first_counts = [0u32; 3];
        for _ in 0..60_000 {
            let (first, second) = selection.select_pair(&population, &mut rng).unwrap();
            assert_ne!(first, second);
            first_counts[first] += 1;
            if first == 1 {
                after_middle += 1;
                if second == 0 {
                    best_after_middle += 1;
                }
            }
        }

        let observed = best_after_middle as f64 / after_middle as f64;
        assert!((observed - 5.0 / 6.0).abs() < 0.02, "observed {}", observed);
        let best_first = first_counts[0] as f64 / 60_000.0;
        assert!((best_first - 5.0 / 9.0).abs() < 0.02, "observed {}", best_first);
    }

    #[test]
    fn test_dominant_first_parent_falls_back_to_uniform() {
        // with a huge arity the best wins every tournament
        let population = population(&[0.1, 0.2, 0.9]);
        let selection = TournamentSelection::new(200).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(4);

        let mut seconds = [0u32; 3];
        for _ in 0..200 {
            let (first, second) = selection.select_pair(&population, &mut rng).unwrap();
            assert_eq!(first, 2);
            seconds[second] += 1;
        }
        assert_eq!(seconds[2], 0);
        assert!(seconds[0] > 50 && seconds[1] > 50);
    }

    #[test]
    fn test_two_individuals_always_pair_up() {
        let population = population(&[0.1, 0.2]);
        let selection = TournamentSelection::new(4).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(3);

        for _ in 0..20 {
            let (first, second) = selection.select_pair(&population, &mut rng).unwrap();
            assert_eq!(first + second, 1);
        }
    }

    #[test]
    fn test_large_arity_prefers_the_best() {
        let population = population(&[0.5, 0.8, 0.3, 0.9, 0.1]);
        let selection = TournamentSelection::new(32).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(9);

        let mut best_first = 0;
        for _ in 0..100 {
            let (first, _) = selection.select_pair(&population, &mut rng).unwrap();
            if first == 3 {
                best_first += 1;
            }
        }
        // (4/5)^32 chance per pick of missing index 3
        assert!(best_first >= 95);
    }

    #[test]
    fn test_small_populations_are_rejected() {
        let selection = TournamentSelection::default();
        let mut rng = RandomNumberGenerator::from_seed(1);

        let empty: Population<Scored> = Population::new(Vec::new(), 2).unwrap();
        assert!(matches!(
            selection.select_pair(&empty, &mut rng),
            Err(GeneticError::EmptyPopulation)
        ));
        assert!(selection.select_pair(&population(&[1.0]), &mut rng).is_err());
    }

    #[test]
    fn test_run_tournament_with_excluded() {
        let fitness = vec![0.5, 0.8, 0.3, 0.9, 0.1];
        let mut rng = RandomNumberGenerator::from_seed(42);
        let selection = TournamentSelection::default();

        // Exclude all but one individual
        let excluded: HashSet<usize> = [0, 1, 2, 4].into_iter().collect();
        let winner = selection
            .run_tournament(&fitness, &mut rng, &excluded)
            .unwrap();
        assert_eq!(winner, 3);

        let everyone: HashSet<usize> = (0..fitness.len()).collect();
        assert!(selection
            .run_tournament(&fitness, &mut rng, &everyone)
            .is_err());
    }

    #[test]
    fn test_nan_never_wins_against_a_number() {
        let fitness = vec![f64::NAN, 0.1];
        let selection = TournamentSelection::new(64).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(5);
        let winner = selection
            .run_tournament(&fitness, &mut rng, &HashSet::new())
            .unwrap();
        assert_eq!(winner, 1);
    }

    #[test]
    fn test_invalid_arity() {
        assert!(TournamentSelection::new(0).is_err());
    }
}
