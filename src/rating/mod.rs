pub mod trueskill;

pub use trueskill::{Rating, TrueSkill};
