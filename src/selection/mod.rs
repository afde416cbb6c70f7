pub mod selection_policy;
pub mod tournament;

pub use selection_policy::SelectionPolicy;
pub use tournament::TournamentSelection;
