use clap::{Parser, Subcommand, ValueEnum};
use crossbeam_channel::{Sender, after, bounded, select};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use treesearch::problems::difference::{self, DifferenceSet, nonexistence_reason};
use treesearch::problems::queens::Queens;
use treesearch::search::{
    Coordinator, Outcome, ParallelConfig, ProgressConfig, Search, SearchConfig, SearchStatistics,
    SearchStatus, StopBound, UndoStrategy,
};

// --- Command Line Arguments ---

#[derive(Parser)]
#[command(name = "treesearch")]
#[command(about = "treesearch - resumable backtracking search")]
#[command(version)]
#[command(subcommand_required = true)]
#[command(arg_required_else_help = true)]
struct Args {
    /// Log engine and coordinator events to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// CLI undo strategy selection
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum CliUndo {
    /// Undo each abandoned choice incrementally
    #[default]
    Backtrack,
    /// Clear the problem and replay the surviving prefix
    Restart,
}

impl From<CliUndo> for UndoStrategy {
    fn from(cli: CliUndo) -> Self {
        match cli {
            CliUndo::Backtrack => UndoStrategy::Backtrack,
            CliUndo::Restart => UndoStrategy::Restart,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search for planar cyclic difference sets of k elements
    Difference {
        /// Smallest k to search
        #[arg(default_value_t = 2)]
        k_start: usize,
        /// Largest k to search (defaults to k_start)
        k_end: Option<usize>,

        /// Seed every search with these leading elements
        #[arg(long, num_args = 1..)]
        prefix: Vec<usize>,
        /// Continue past the prefix's subtree instead of stopping at its end
        #[arg(long = "continue")]
        continue_past: bool,

        // --- Parallel options ---
        /// Number of worker threads (0 = one per CPU); omit for a single-threaded search
        #[arg(long, short = 'j')]
        workers: Option<usize>,
        /// Partition depth for workers (defaults to a size-based heuristic)
        #[arg(long)]
        depth: Option<usize>,

        /// Stop after this many solutions per k
        #[arg(long, default_value_t = 1)]
        max_solutions: usize,
        /// Report every solution
        #[arg(long, conflicts_with = "max_solutions")]
        all: bool,

        /// Undo strategy for the difference map
        #[arg(long, value_enum, default_value = "backtrack")]
        undo: CliUndo,
        /// Timeout in seconds for each k
        #[arg(long)]
        timeout: Option<u64>,
        /// Log search throughput periodically
        #[arg(long)]
        progress: bool,
    },
    /// Place N non-attacking queens on an N x N board
    Queens {
        /// Board size
        size: usize,
        /// Undo strategy for the board
        #[arg(long, value_enum, default_value = "backtrack")]
        undo: CliUndo,
        /// Print the board as well as the coordinates
        #[arg(long)]
        board: bool,
    },
}

struct DifferenceOptions {
    k_start: usize,
    k_end: usize,
    prefix: Vec<usize>,
    continue_past: bool,
    workers: Option<usize>,
    depth: Option<usize>,
    max_solutions: Option<usize>,
    undo: UndoStrategy,
    timeout: Option<Duration>,
    progress: bool,
}

fn init_tracing(verbose: bool, progress: bool) {
    let default = if verbose { "info" } else { "warn" };
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    if progress {
        if let Ok(directive) = "progress=info".parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

// --- Difference sets ---

fn format_set(k: usize, set: &[usize]) -> String {
    let elements: Vec<String> = set.iter().map(|x| x.to_string()).collect();
    format!("({}, {}, 1): {}", difference::modulus(k), k, elements.join(", "))
}

fn run_difference(options: &DifferenceOptions) -> Result<(), Box<dyn std::error::Error>> {
    if options.k_start < 2 {
        return Err(format!("'{}' is not a valid start size (minimum 2)", options.k_start).into());
    }
    if options.k_end < options.k_start {
        return Err(format!(
            "'{}' is not a valid ending size (must be at least {})",
            options.k_end, options.k_start
        )
        .into());
    }

    info!(
        k_start = options.k_start,
        k_end = options.k_end,
        prefix = ?options.prefix,
        "searching for difference sets"
    );

    for k in options.k_start..=options.k_end {
        if let Some(reason) = nonexistence_reason(k) {
            println!("({}, {}, 1): none, {}", difference::modulus(k), k, reason);
            continue;
        }

        let stop = if options.continue_past {
            StopBound::Unbounded
        } else {
            StopBound::Subtree
        };
        let progress = options
            .progress
            .then(|| ProgressConfig::default().with_name(format!("k={}", k)));
        let config = SearchConfig::default()
            .with_start(options.prefix.clone())
            .with_stop(stop)
            .with_progress_option(progress);

        let (found, statistics, interrupted) = match options.workers {
            None => search_sequential(k, options, &config)?,
            Some(workers) => search_parallel(k, workers, options, &config)?,
        };

        if found == 0 {
            if interrupted {
                println!("({}, {}, 1): timed out", difference::modulus(k), k);
            } else {
                println!("({}, {}, 1): no solution", difference::modulus(k), k);
            }
        }
        info!("k = {} statistics:\n{}", k, statistics.format_summary());
    }

    Ok(())
}

/// Raises `flag` once `timeout` passes. Dropping it cancels the timer and joins its thread.
struct Deadline {
    flag: Arc<AtomicBool>,
    cancel: Option<Sender<()>>,
    timer: Option<JoinHandle<()>>,
}

impl Deadline {
    fn start(timeout: Duration) -> Self {
        let flag = Arc::new(AtomicBool::new(false));
        let (cancel, cancelled) = bounded::<()>(0);
        let raise = Arc::clone(&flag);
        let timer = thread::spawn(move || {
            select! {
                recv(cancelled) -> _ => {}
                recv(after(timeout)) -> _ => raise.store(true, Ordering::SeqCst),
            }
        });

        Self {
            flag,
            cancel: Some(cancel),
            timer: Some(timer),
        }
    }

    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        // Disconnecting wakes the timer
        self.cancel.take();
        if let Some(timer) = self.timer.take() {
            timer.join().ok();
        }
    }
}

fn search_sequential(
    k: usize,
    options: &DifferenceOptions,
    config: &SearchConfig,
) -> Result<(usize, SearchStatistics, bool), Box<dyn std::error::Error>> {
    let mut search = Search::new(DifferenceSet::new(k, options.undo), config)?;
    let deadline = options.timeout.map(Deadline::start);
    if let Some(deadline) = &deadline {
        search.set_interrupt(deadline.flag());
    }

    let limit = options.max_solutions.unwrap_or(usize::MAX);
    let mut found = 0;
    for set in search.solutions().take(limit) {
        println!("{}", format_set(k, &set));
        found += 1;
    }

    let statistics = search.statistics().clone();
    let interrupted = statistics.status == SearchStatus::Interrupted;
    Ok((found, statistics, interrupted))
}

fn search_parallel(
    k: usize,
    workers: usize,
    options: &DifferenceOptions,
    config: &SearchConfig,
) -> Result<(usize, SearchStatistics, bool), Box<dyn std::error::Error>> {
    let workers = if workers == 0 { num_cpus::get() } else { workers };
    let depth = options
        .depth
        .unwrap_or_else(|| difference::partition_depth(k, options.prefix.len()));

    let mut parallel_config = ParallelConfig::default()
        .with_workers(workers)
        .with_prefix_depth(depth)
        .with_max_solutions(options.max_solutions)
        .with_timeout_option(options.timeout);
    if let Some(progress) = &config.progress {
        parallel_config = parallel_config.with_progress(progress.clone());
    }

    let undo = options.undo;
    let handle = Coordinator::new(
        move || DifferenceSet::new(k, undo),
        config.clone(),
        parallel_config,
    )
    .search(move |set: &Vec<usize>| println!("{}", format_set(k, set)))?;
    let result = handle.join()?;

    info!(
        outcome = %result.outcome,
        prefixes = result.prefixes_dispatched,
        "k = {} done",
        k
    );
    let interrupted = matches!(result.outcome, Outcome::TimedOut | Outcome::Shutdown);
    Ok((result.solutions.len(), result.total_statistics, interrupted))
}

// --- N-queens ---

fn run_queens(size: usize, undo: UndoStrategy, board: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut search = Search::new(Queens::new(size, undo), &SearchConfig::default())?;

    match search.search() {
        Some(placement) => {
            println!("{:?}", placement);
            if board {
                println!("{}", search.problem());
            }
        }
        None => println!("no solution"),
    }

    info!(
        undo = %search.undo_strategy(),
        "search statistics:\n{}",
        search.statistics().format_summary()
    );
    Ok(())
}

fn main() {
    let args = Args::parse();

    match args.command {
        Commands::Difference {
            k_start,
            k_end,
            prefix,
            continue_past,
            workers,
            depth,
            max_solutions,
            all,
            undo,
            timeout,
            progress,
        } => {
            init_tracing(args.verbose, progress);

            let options = DifferenceOptions {
                k_start,
                k_end: k_end.unwrap_or(k_start),
                prefix,
                continue_past,
                workers,
                depth,
                max_solutions: if all { None } else { Some(max_solutions.max(1)) },
                undo: undo.into(),
                timeout: timeout.map(Duration::from_secs),
                progress,
            };

            if let Err(e) = run_difference(&options) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Queens { size, undo, board } => {
            init_tracing(args.verbose, false);

            if let Err(e) = run_queens(size, undo.into(), board) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
