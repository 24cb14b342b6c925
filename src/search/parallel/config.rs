//! Configuration for parallel search execution.

use crate::search::config::ProgressConfig;
use std::time::Duration;

/// Configuration for parallel search execution.
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of worker threads to spawn.
    pub num_workers: usize,
    /// Depth at which the root hands out subtrees.
    pub prefix_depth: usize,
    /// Stop once this many solutions arrive (None = collect all).
    pub max_solutions: Option<usize>,
    /// Capacity of the work queue between root and workers.
    pub queue_capacity: usize,
    /// Overall timeout for the parallel search.
    pub timeout: Option<Duration>,
    /// Per-worker throughput reporting; each worker's label gets its id.
    pub progress: Option<ProgressConfig>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        let num_workers = num_cpus::get().max(1);
        Self {
            num_workers,
            prefix_depth: 3,
            max_solutions: Some(1),
            queue_capacity: num_workers,
            timeout: None,
            progress: None,
        }
    }
}

impl ParallelConfig {
    /// Set the number of workers; the work queue is resized to match.
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self.queue_capacity = self.num_workers;
        self
    }

    /// Set the partition depth.
    pub fn with_prefix_depth(mut self, depth: usize) -> Self {
        self.prefix_depth = depth;
        self
    }

    /// Set the solution quota.
    pub fn with_max_solutions(mut self, max: Option<usize>) -> Self {
        self.max_solutions = max;
        self
    }

    /// Collect every solution in the space.
    pub fn all_solutions(self) -> Self {
        self.with_max_solutions(None)
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the overall timeout for parallel search.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the overall timeout from an Option.
    pub fn with_timeout_option(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress(mut self, progress: ProgressConfig) -> Self {
        self.progress = Some(progress);
        self
    }
}
