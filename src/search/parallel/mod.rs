//! Parallel search execution: one tree split across worker threads.
//!
//! # Architecture
//!
//! The parallel search system consists of:
//! - A **coordinator** that owns the root search and hands out subtrees in canonical order
//! - Multiple **workers**, each searching one subtree at a time on a private problem
//! - A **channel system**: a bounded work queue in, an unbounded result stream out
//! - **Shared state** holding the stop flag every search polls once per step
//!
//! Partitioning happens at a fixed prefix depth on the single root, so subtrees
//! never overlap and need no locking. Only the root's order is canonical; solutions
//! arrive in whatever order workers find them.
//!
//! # Example
//!
//! ```ignore
//! use treesearch::problems::Queens;
//! use treesearch::search::{ParallelConfig, SearchConfig, UndoStrategy, run_parallel_search};
//!
//! let config = ParallelConfig::default()
//!     .with_workers(4)
//!     .with_prefix_depth(2)
//!     .with_timeout(Duration::from_secs(60));
//!
//! let result = run_parallel_search(
//!     || Queens::new(8, UndoStrategy::Backtrack),
//!     &SearchConfig::default(),
//!     &config,
//! )?;
//! ```

pub mod channel;
pub mod config;
pub mod coordinator;

pub use config::ParallelConfig;
pub use coordinator::{
    Coordinator, CoordinatorHandle, Outcome, ParallelResult, run_parallel_search,
};
