//! Search status and statistics

use crate::search::progress::format_count;
use std::time::Duration;

/// Where a search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStatus {
    /// Still stepping (or never started)
    #[default]
    Running,
    /// Returned a solution; can be resumed for the next one
    Solved,
    /// The space (or the guarded sub-range) has no more candidates
    Exhausted,
    /// Stopped by an external interrupt flag
    Interrupted,
}

impl std::fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchStatus::Running => write!(f, "running"),
            SearchStatus::Solved => write!(f, "solved"),
            SearchStatus::Exhausted => write!(f, "exhausted"),
            SearchStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Statistics from a search operation
#[derive(Debug, Clone, Default)]
pub struct SearchStatistics {
    /// Last known status
    pub status: SearchStatus,
    /// Total time spent inside search calls
    pub elapsed_time: Duration,
    /// Number of `step()` invocations
    pub steps: u64,
    /// Number of accepted proposals
    pub accepts: u64,
    /// Number of times the cursor had to walk back after a rejection
    pub unwinds: u64,
    /// Number of incremental undo calls
    pub backtracks: u64,
    /// Number of full restarts (restart-only problems)
    pub restarts: u64,
    /// Solutions returned
    pub solutions: u64,
    /// Deepest committed level reached
    pub max_depth: usize,
}

impl SearchStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of steps that were accepted (0.0 to 1.0)
    pub fn acceptance_rate(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.accepts as f64 / self.steps as f64
        }
    }

    /// Steps per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.steps as f64 / secs
        }
    }

    /// Fold another search's counters into this one.
    ///
    /// Elapsed time takes the maximum, since merged searches run side by side.
    pub fn merge(&mut self, other: &SearchStatistics) {
        self.elapsed_time = self.elapsed_time.max(other.elapsed_time);
        self.steps += other.steps;
        self.accepts += other.accepts;
        self.unwinds += other.unwinds;
        self.backtracks += other.backtracks;
        self.restarts += other.restarts;
        self.solutions += other.solutions;
        self.max_depth = self.max_depth.max(other.max_depth);
    }

    /// Format statistics as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Status: {}\n", self.status));
        s.push_str(&format!("Time: {:.2?}\n", self.elapsed_time));
        s.push_str(&format!("Steps: {}\n", format_count(self.steps)));
        s.push_str(&format!("Throughput: {:.0} steps/sec\n", self.throughput()));
        s.push_str(&format!(
            "Acceptance rate: {:.2}%\n",
            self.acceptance_rate() * 100.0
        ));
        s.push_str(&format!("Unwinds: {}\n", format_count(self.unwinds)));

        if self.backtracks > 0 {
            s.push_str(&format!("Backtracks: {}\n", format_count(self.backtracks)));
        }
        if self.restarts > 0 {
            s.push_str(&format!("Restarts: {}\n", format_count(self.restarts)));
        }

        s.push_str(&format!("Max depth: {}\n", self.max_depth));
        s.push_str(&format!("Solutions: {}\n", self.solutions));
        s
    }
}
