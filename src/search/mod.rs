//! Resumable backtracking search over integer choice sequences
//!
//! This module provides the traversal engine and its collaborators:
//! - Choices: the per-depth value/bound/stride vectors every search runs on
//! - Space: the problem contract (`step`, optional `backtrack`/`restart`) and its cursor
//! - Engine: the step/next driver, guard bounds, and prefix partitioning
//! - Progress: throughput reporting on the step loop
//! - Parallel: a coordinator that splits one tree across worker threads

pub mod choices;
pub mod config;
pub mod engine;
pub mod parallel;
pub mod progress;
pub mod result;
pub mod space;

pub use choices::ChoiceSequence;
pub use config::{ProgressConfig, SearchConfig, StopBound, UndoStrategy};
pub use engine::{Search, Solutions};
pub use parallel::{Coordinator, CoordinatorHandle, Outcome, ParallelConfig, ParallelResult, run_parallel_search};
pub use progress::Progress;
pub use result::{SearchStatistics, SearchStatus};
pub use space::{Cursor, SearchSpace};
