//! Concrete search problems driven by the engine.
//!
//! - `difference`: planar cyclic difference sets, with number-theoretic shortcuts
//! - `queens`: the N-queens placement puzzle

pub mod difference;
pub mod queens;

pub use difference::{DifferenceSet, NonExistence, is_planar_difference_set, nonexistence_reason};
pub use queens::Queens;
