//! Single-elimination bracket construction and result propagation.
//!
//! [`layout`] is pure and decides where every participant and match goes.
//! [`BracketEngine`] loads state through a repository, applies the layout
//! rules and writes each change as one atomic batch.

pub mod engine;
pub mod errors;
pub mod layout;

pub use engine::{BracketEngine, BracketView, GeneratedBracket, MIN_PARTICIPANTS};
pub use errors::{BracketError, BracketResult};
pub use layout::{BracketPlan, next_position, plan_bracket, round_count};
