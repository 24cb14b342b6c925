//! treesearch - resumable backtracking search with prefix-partitioned workers
//!
//! A problem implements [`SearchSpace`]: each `step` proposes one value through the
//! [`Cursor`] and accepts it if feasible. [`Search`] owns traversal order, undo and
//! replay; [`Coordinator`] splits the same tree across worker threads.

pub mod error;
pub mod problems;
pub mod search;

pub use error::{Result, SearchError};
pub use search::{
    Coordinator, Cursor, ParallelConfig, Search, SearchConfig, SearchSpace, StopBound,
    UndoStrategy,
};
