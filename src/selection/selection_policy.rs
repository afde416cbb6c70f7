use crate::error::Result;
use crate::evolution::{Chromosome, Population};
use crate::rng::RandomNumberGenerator;

/// Trait for parent selection in the generation loop.
///
/// A policy returns the indices of two distinct parents drawn from the
/// current population.
///
/// # Examples
///
/// ```
/// use sprinkler_ga::evolution::{Chromosome, Population};
/// use sprinkler_ga::rng::RandomNumberGenerator;
/// use sprinkler_ga::selection::{SelectionPolicy, TournamentSelection};
/// use sprinkler_ga::error::Result;
///
/// #[derive(Clone, Debug)]
/// struct Score(f64);
///
/// impl Chromosome for Score {
///     fn fitness(&self) -> f64 {
///         self.0
///     }
/// }
///
/// fn main() -> Result<()> {
///     let population = Population::new(vec![Score(0.5), Score(0.8), Score(0.3)], 3)?;
///     let mut rng = RandomNumberGenerator::from_seed(1);
///
///     let selection = TournamentSelection::new(2)?;
///     let (first, second) = selection.select_pair(&population, &mut rng)?;
///
///     assert_ne!(first, second);
///     Ok(())
/// }
/// ```
pub trait SelectionPolicy<C: Chromosome>: Send + Sync {
    /// Selects two distinct parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the population has fewer than two chromosomes.
    fn select_pair(
        &self,
        population: &Population<C>,
        rng: &mut RandomNumberGenerator,
    ) -> Result<(usize, usize)>;
}
