//! Parallel search coordinator that manages worker threads.
//!
//! One root [`Search`] walks the tree to `prefix_depth` and hands each prefix to a
//! bounded work queue. Workers build a fresh problem per prefix, search exactly
//! that subtree and stream every solution back. The result channel is the only
//! thing workers share besides the stop flag.
//!
//! Termination is at-most-effort: when the quota is met, the deadline passes or
//! [`CoordinatorHandle::shutdown`] is called, the stop flag is raised and queued
//! or half-searched subtrees are dropped. Solutions already in flight are
//! discarded, and a worker that panics is logged and otherwise indistinguishable
//! from one whose subtrees held nothing.

use crate::error::{Result, SearchError};
use crate::search::config::{ProgressConfig, SearchConfig, StopBound, subtree_bound};
use crate::search::engine::Search;
use crate::search::parallel::channel::{
    CoordinatorChannels, SharedState, WorkItem, WorkerChannels, WorkerMessage, create_channels,
};
use crate::search::parallel::config::ParallelConfig;
use crate::search::result::{SearchStatistics, SearchStatus};
use crate::search::space::SearchSpace;
use crossbeam_channel::{RecvTimeoutError, select};
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often blocked loops wake up to check the deadline and stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Why a parallel search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every subtree was searched.
    Exhausted,
    /// `max_solutions` solutions arrived.
    QuotaReached,
    /// The configured timeout passed.
    TimedOut,
    /// Stopped through [`CoordinatorHandle::shutdown`].
    Shutdown,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Exhausted => write!(f, "exhausted"),
            Outcome::QuotaReached => write!(f, "quota reached"),
            Outcome::TimedOut => write!(f, "timed out"),
            Outcome::Shutdown => write!(f, "shut down"),
        }
    }
}

/// Result from parallel search execution.
#[derive(Debug)]
pub struct ParallelResult<S> {
    /// Solutions in arrival order (not canonical order).
    pub solutions: Vec<S>,
    pub outcome: Outcome,
    /// Prefixes the workers received.
    pub prefixes_dispatched: u64,
    /// Prefixes whose search ended, exhausted or interrupted.
    pub prefixes_completed: u64,
    /// Statistics aggregated from the root and all workers.
    pub total_statistics: SearchStatistics,
    /// The partitioning walk alone.
    pub root_statistics: SearchStatistics,
    /// Per-worker statistics, in the order workers exited.
    pub worker_statistics: Vec<(usize, SearchStatistics)>,
}

impl<S> ParallelResult<S> {
    /// First solution to arrive, if any.
    pub fn first_solution(&self) -> Option<&S> {
        self.solutions.first()
    }
}

/// Splits one problem's tree across a pool of worker threads.
pub struct Coordinator<P, F> {
    factory: Arc<F>,
    search_config: SearchConfig,
    config: ParallelConfig,
    _problem: PhantomData<fn() -> P>,
}

impl<P, F> Coordinator<P, F>
where
    P: SearchSpace + Send + 'static,
    F: Fn() -> P + Send + Sync + 'static,
{
    /// `factory` builds one fresh problem per root and per dispatched prefix.
    ///
    /// `search_config` seeds and bounds the root, so a start prefix confines the whole
    /// parallel search to that subtree (or, unbounded, to everything after it).
    pub fn new(factory: F, search_config: SearchConfig, config: ParallelConfig) -> Self {
        Self {
            factory: Arc::new(factory),
            search_config,
            config,
            _problem: PhantomData,
        }
    }

    /// Start dispatch in the background; `callback` sees each solution as it arrives.
    ///
    /// The root is built on the calling thread, so an illegal start prefix is
    /// reported here rather than from [`CoordinatorHandle::join`].
    pub fn search<C>(self, callback: C) -> Result<CoordinatorHandle<P::Solution>>
    where
        C: FnMut(&P::Solution) + Send + 'static,
    {
        if self.config.num_workers == 0 {
            return Err(SearchError::Config("at least one worker is required".into()));
        }
        if self.config.max_solutions == Some(0) {
            return Err(SearchError::Config(
                "max_solutions must be at least 1 (use None for all)".into(),
            ));
        }

        let (channels, worker_channels) =
            create_channels(self.config.num_workers, self.config.queue_capacity);
        let shared = Arc::clone(&channels.shared);

        let mut root = Search::new((self.factory)(), &self.search_config)?;
        root.set_interrupt(shared.stop_flag());

        let root_stop = root.stop_bound().map(<[usize]>::to_vec);
        let workers = match self.spawn_workers(worker_channels, root_stop) {
            Ok(workers) => workers,
            Err(e) => {
                shared.signal_stop();
                return Err(e);
            }
        };

        info!(
            workers = self.config.num_workers,
            depth = self.config.prefix_depth,
            start = ?self.search_config.start,
            "starting parallel search"
        );

        let config = self.config;
        let thread = thread::Builder::new()
            .name("coordinator".into())
            .spawn(move || run_coordinator(root, channels, workers, &config, callback));
        let thread = match thread {
            Ok(thread) => thread,
            Err(e) => {
                shared.signal_stop();
                return Err(e.into());
            }
        };

        Ok(CoordinatorHandle { thread, shared })
    }

    fn spawn_workers(
        &self,
        worker_channels: Vec<WorkerChannels<P::Solution>>,
        root_stop: Option<Vec<usize>>,
    ) -> Result<Vec<JoinHandle<()>>> {
        worker_channels
            .into_iter()
            .enumerate()
            .map(|(worker_id, channels)| {
                let factory = Arc::clone(&self.factory);
                let progress = self.config.progress.clone();
                let root_stop = root_stop.clone();
                thread::Builder::new()
                    .name(format!("worker-{}", worker_id))
                    .spawn(move || {
                        run_worker(worker_id, factory.as_ref(), root_stop, progress, channels)
                    })
                    .map_err(SearchError::from)
            })
            .collect()
    }
}

/// Handle to a running parallel search.
pub struct CoordinatorHandle<S> {
    thread: JoinHandle<ParallelResult<S>>,
    shared: Arc<SharedState>,
}

impl<S> CoordinatorHandle<S> {
    /// Abruptly stop dispatch and every worker. In-flight subtrees are abandoned.
    pub fn shutdown(&self) {
        if !self.shared.should_stop() {
            info!("parallel search shutdown requested");
        }
        self.shared.signal_stop();
    }

    /// True once the coordinator has collected its final result.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Solutions accepted so far.
    pub fn solutions_found(&self) -> u64 {
        self.shared.solutions_found()
    }

    /// Wait for the search to end.
    pub fn join(self) -> Result<ParallelResult<S>> {
        self.thread
            .join()
            .map_err(|_| SearchError::CoordinatorPanicked)
    }
}

/// Run parallel search to completion with the given configuration.
pub fn run_parallel_search<P, F>(
    factory: F,
    search_config: &SearchConfig,
    parallel_config: &ParallelConfig,
) -> Result<ParallelResult<P::Solution>>
where
    P: SearchSpace + Send + 'static,
    F: Fn() -> P + Send + Sync + 'static,
{
    Coordinator::new(factory, search_config.clone(), parallel_config.clone())
        .search(|_| {})?
        .join()
}

/// Everything the dispatch thread learns from worker messages.
struct Collector<S, C> {
    callback: C,
    max_solutions: Option<usize>,
    deadline: Option<Instant>,
    shared: Arc<SharedState>,
    solutions: Vec<S>,
    outcome: Option<Outcome>,
    prefixes_completed: u64,
    worker_statistics: Vec<(usize, SearchStatistics)>,
}

impl<S, C: FnMut(&S)> Collector<S, C> {
    fn handle(&mut self, msg: WorkerMessage<S>) {
        match msg {
            WorkerMessage::Solution {
                worker_id,
                prefix_index,
                solution,
            } => {
                // Late arrivals after a stop are dropped
                if self.shared.should_stop() {
                    return;
                }
                debug!(worker_id, prefix_index, "solution received");
                (self.callback)(&solution);
                self.solutions.push(solution);
                let found = self.shared.record_solution();

                if self
                    .max_solutions
                    .is_some_and(|max| found >= max as u64)
                {
                    info!(solutions = found, "solution quota reached, stopping workers");
                    self.stop(Outcome::QuotaReached);
                }
            }
            WorkerMessage::PrefixDone { .. } => {
                self.prefixes_completed += 1;
            }
            WorkerMessage::Finished {
                worker_id,
                statistics,
            } => {
                debug!(worker_id, steps = statistics.steps, "worker finished");
                self.worker_statistics.push((worker_id, statistics));
            }
            WorkerMessage::Error {
                worker_id,
                prefix_index,
                message,
            } => {
                warn!(worker_id, prefix_index, "worker error: {}", message);
                self.prefixes_completed += 1;
            }
        }
    }

    fn check_deadline(&mut self) {
        if self.deadline.is_some_and(|d| Instant::now() >= d) && !self.shared.should_stop() {
            info!("parallel search timed out, stopping workers");
            self.stop(Outcome::TimedOut);
        }
    }

    fn stop(&mut self, outcome: Outcome) {
        self.outcome.get_or_insert(outcome);
        self.shared.signal_stop();
    }
}

/// Dispatch loop: feed prefixes while draining results, then drain until workers exit.
fn run_coordinator<P, C>(
    mut root: Search<P>,
    channels: CoordinatorChannels<P::Solution>,
    workers: Vec<JoinHandle<()>>,
    config: &ParallelConfig,
    callback: C,
) -> ParallelResult<P::Solution>
where
    P: SearchSpace,
    C: FnMut(&P::Solution),
{
    let start_time = Instant::now();
    let CoordinatorChannels {
        work,
        results,
        shared,
    } = channels;

    let mut collector = Collector {
        callback,
        max_solutions: config.max_solutions,
        deadline: config.timeout.map(|t| start_time + t),
        shared: Arc::clone(&shared),
        solutions: Vec::new(),
        outcome: None,
        prefixes_completed: 0,
        worker_statistics: Vec::new(),
    };
    let mut dispatched: u64 = 0;

    // The root checks the stop flag itself and returns None once it is raised
    'dispatch: while let Some(prefix) = root.advance_to_depth(config.prefix_depth) {
        let item = WorkItem {
            index: dispatched,
            prefix,
        };
        debug!(index = item.index, prefix = ?item.prefix, "dispatching prefix");

        loop {
            collector.check_deadline();
            if shared.should_stop() {
                break 'dispatch;
            }
            select! {
                send(work, item.clone()) -> sent => {
                    if sent.is_err() {
                        break 'dispatch;
                    }
                    dispatched += 1;
                    break;
                }
                recv(results) -> msg => match msg {
                    Ok(msg) => collector.handle(msg),
                    // Every worker is gone
                    Err(_) => break 'dispatch,
                },
                default(POLL_INTERVAL) => {}
            }
        }
    }
    drop(work);
    debug!(dispatched, "dispatch complete");

    loop {
        collector.check_deadline();
        match results.recv_timeout(POLL_INTERVAL) {
            Ok(msg) => collector.handle(msg),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    for handle in workers {
        if handle.join().is_err() {
            debug!("worker thread panicked");
        }
    }

    let outcome = collector.outcome.unwrap_or(if shared.should_stop() {
        Outcome::Shutdown
    } else {
        Outcome::Exhausted
    });

    let root_statistics = root.statistics().clone();
    let mut total_statistics = SearchStatistics::new();
    total_statistics.merge(&root_statistics);
    for (_, stats) in &collector.worker_statistics {
        total_statistics.merge(stats);
    }
    // Merged counts are per search; the total reports the solutions kept
    total_statistics.solutions = collector.solutions.len() as u64;
    total_statistics.elapsed_time = start_time.elapsed();
    total_statistics.status = match outcome {
        Outcome::Exhausted => SearchStatus::Exhausted,
        Outcome::QuotaReached => SearchStatus::Solved,
        Outcome::TimedOut | Outcome::Shutdown => SearchStatus::Interrupted,
    };

    info!(
        outcome = %outcome,
        solutions = collector.solutions.len(),
        prefixes = dispatched,
        steps = total_statistics.steps,
        "parallel search complete"
    );

    ParallelResult {
        solutions: collector.solutions,
        outcome,
        prefixes_dispatched: dispatched,
        prefixes_completed: collector.prefixes_completed,
        total_statistics,
        root_statistics,
        worker_statistics: collector.worker_statistics,
    }
}

/// Configuration for one worker subtree: seeded with `prefix`, bounded by whichever
/// of the subtree's end and the root's own bound comes first.
fn worker_config(
    prefix: Vec<usize>,
    root_stop: Option<&[usize]>,
    progress: Option<ProgressConfig>,
) -> SearchConfig {
    let bound = match (subtree_bound(&prefix), root_stop) {
        (Some(subtree), Some(root)) => Some(subtree.min(root.to_vec())),
        (subtree, root) => subtree.or_else(|| root.map(<[usize]>::to_vec)),
    };
    let stop = match bound {
        Some(bound) => StopBound::Prefix(bound),
        None => StopBound::Unbounded,
    };

    SearchConfig::default()
        .with_start(prefix)
        .with_stop(stop)
        .with_progress_option(progress)
}

/// Worker loop: search each received subtree until dispatch ends or stop is raised.
fn run_worker<P, F>(
    worker_id: usize,
    factory: &F,
    root_stop: Option<Vec<usize>>,
    progress: Option<ProgressConfig>,
    channels: WorkerChannels<P::Solution>,
) where
    P: SearchSpace,
    F: Fn() -> P,
{
    let mut statistics = SearchStatistics::new();
    let progress = progress.map(|p| {
        let name = format!("{} worker {}", p.name, worker_id);
        p.with_name(name)
    });

    for item in channels.work.iter() {
        if channels.shared.should_stop() {
            break;
        }

        let config = worker_config(item.prefix, root_stop.as_deref(), progress.clone());
        let mut search = match Search::new(factory(), &config) {
            Ok(search) => search,
            Err(e) => {
                let msg = WorkerMessage::Error {
                    worker_id,
                    prefix_index: item.index,
                    message: e.to_string(),
                };
                if channels.results.send(msg).is_err() {
                    return;
                }
                continue;
            }
        };
        search.set_interrupt(channels.shared.stop_flag());

        while let Some(solution) = search.search() {
            let msg = WorkerMessage::Solution {
                worker_id,
                prefix_index: item.index,
                solution,
            };
            if channels.results.send(msg).is_err() {
                return;
            }
        }

        statistics.merge(search.statistics());
        let msg = WorkerMessage::PrefixDone {
            worker_id,
            prefix_index: item.index,
            steps: search.statistics().steps,
        };
        if channels.results.send(msg).is_err() {
            return;
        }
    }

    statistics.status = if channels.shared.should_stop() {
        SearchStatus::Interrupted
    } else {
        SearchStatus::Exhausted
    };
    // Nobody is left to collect the statistics if this fails
    channels
        .results
        .send(WorkerMessage::Finished {
            worker_id,
            statistics,
        })
        .ok();
}
