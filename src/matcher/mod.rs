pub mod runner;
pub mod split;

pub use runner::{MatcherRunner, TickReport};
pub use split::{Candidate, SplitPlan, SplitPlanner};
