//! Beta-Binomial posteriors for treatment arms and Monte Carlo comparisons between them.

pub mod comparison;
pub mod error;
pub mod group;
pub mod posterior;
pub mod prior;
pub mod report;
pub mod sensitivity;
pub mod subject;

pub use comparison::{ComparisonResult, FittedGroup, PosteriorComparator, PosteriorSample, compare};
pub use error::PosteriorError;
pub use group::{Group, tally_groups};
pub use posterior::{BetaPosterior, fit_posterior};
pub use prior::{BetaPrior, PriorPreset};
