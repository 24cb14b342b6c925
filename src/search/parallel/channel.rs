//! Work and result channels between the coordinator and its workers.

use crate::search::result::SearchStatistics;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// One subtree handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Position of the prefix in dispatch order.
    pub index: u64,
    /// Committed choices at the root of the subtree.
    pub prefix: Vec<usize>,
}

/// Message sent from workers to the coordinator.
#[derive(Debug, Clone)]
pub enum WorkerMessage<S> {
    /// Worker found a solution inside its current subtree.
    Solution {
        worker_id: usize,
        prefix_index: u64,
        solution: S,
    },
    /// Worker finished (or abandoned) a subtree.
    PrefixDone {
        worker_id: usize,
        prefix_index: u64,
        steps: u64,
    },
    /// Worker is exiting; carries its accumulated counters.
    Finished {
        worker_id: usize,
        statistics: SearchStatistics,
    },
    /// Worker could not search a prefix.
    Error {
        worker_id: usize,
        prefix_index: u64,
        message: String,
    },
}

/// State shared by the coordinator, its handle and every worker.
#[derive(Debug, Default)]
pub struct SharedState {
    /// Raised to stop dispatch and every running search.
    stop: Arc<AtomicBool>,
    /// Solutions accepted by the coordinator so far.
    solutions_found: AtomicU64,
}

impl SharedState {
    /// Check if we should stop searching.
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Signal every search to stop.
    pub fn signal_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// The raw flag, for [`Search::set_interrupt`](crate::search::Search::set_interrupt).
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Count an accepted solution; returns the new total.
    pub fn record_solution(&self) -> u64 {
        self.solutions_found.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn solutions_found(&self) -> u64 {
        self.solutions_found.load(Ordering::SeqCst)
    }
}

/// Channel endpoints for a worker.
pub struct WorkerChannels<S> {
    /// Prefixes to search; disconnects when dispatch is over.
    pub work: Receiver<WorkItem>,
    /// Send messages to coordinator.
    pub results: Sender<WorkerMessage<S>>,
    pub shared: Arc<SharedState>,
}

/// Channel endpoints for the coordinator.
///
/// Holds no result sender, so the result channel disconnects exactly when the last
/// worker exits.
pub struct CoordinatorChannels<S> {
    pub work: Sender<WorkItem>,
    pub results: Receiver<WorkerMessage<S>>,
    pub shared: Arc<SharedState>,
}

/// Create channels for `num_workers` workers sharing one bounded work queue.
pub fn create_channels<S>(
    num_workers: usize,
    capacity: usize,
) -> (CoordinatorChannels<S>, Vec<WorkerChannels<S>>) {
    let shared = Arc::new(SharedState::default());

    // Bounded so the root never runs far ahead of the workers
    let (work_tx, work_rx) = bounded(capacity.max(1));
    // Unbounded so workers never block on a busy coordinator
    let (result_tx, result_rx) = unbounded();

    let workers = (0..num_workers)
        .map(|_| WorkerChannels {
            work: work_rx.clone(),
            results: result_tx.clone(),
            shared: Arc::clone(&shared),
        })
        .collect();

    let coordinator = CoordinatorChannels {
        work: work_tx,
        results: result_rx,
        shared,
    };

    (coordinator, workers)
}
