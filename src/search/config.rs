//! Configuration types for the search engine

use crate::error::{Result, SearchError};
use crate::search::choices::ChoiceSequence;
use std::time::Duration;

/// How a problem undoes an abandoned choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndoStrategy {
    /// Incremental undo through `SearchSpace::backtrack`
    #[default]
    Backtrack,
    /// Clear all state and replay the surviving prefix from depth 0.
    ///
    /// Every unwind costs a full replay, which is asymptotically more expensive than
    /// incremental undo but needs no inverse operation on the problem state.
    Restart,
}

impl std::fmt::Display for UndoStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UndoStrategy::Backtrack => write!(f, "backtrack"),
            UndoStrategy::Restart => write!(f, "restart"),
        }
    }
}

impl std::str::FromStr for UndoStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "backtrack" | "incremental" | "undo" => Ok(UndoStrategy::Backtrack),
            "restart" | "replay" => Ok(UndoStrategy::Restart),
            _ => Err(format!(
                "Unknown undo strategy: '{}'. Valid options: backtrack, restart",
                s
            )),
        }
    }
}

/// Terminal bound of a search
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StopBound {
    /// Only the subtree rooted at the start prefix (start with its last element + 1)
    #[default]
    Subtree,
    /// Continue past the start prefix until the whole space is exhausted
    Unbounded,
    /// Stop once the recorded choices reach this prefix
    Prefix(Vec<usize>),
}

/// Configuration for the throughput reporter
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Label printed in front of every report
    pub name: String,
    /// Steps in the first reporting window
    pub increment: u64,
    /// Target time between reports; later windows are resized toward it
    pub report_rate: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            name: "Progress".to_string(),
            increment: 10_000,
            report_rate: Duration::from_secs(5),
        }
    }
}

impl ProgressConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_increment(mut self, increment: u64) -> Self {
        self.increment = increment.max(1);
        self
    }

    pub fn with_report_rate(mut self, rate: Duration) -> Self {
        self.report_rate = rate;
        self
    }
}

/// Main search configuration
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    /// Initial prefix; the search is seeded with these choices
    pub start: Vec<usize>,
    /// Where enumeration ends
    pub stop: StopBound,
    /// Throughput reporting (None = silent)
    pub progress: Option<ProgressConfig>,
}

impl SearchConfig {
    pub fn with_start(mut self, start: Vec<usize>) -> Self {
        self.start = start;
        self
    }

    pub fn with_stop(mut self, stop: StopBound) -> Self {
        self.stop = stop;
        self
    }

    pub fn unbounded(self) -> Self {
        self.with_stop(StopBound::Unbounded)
    }

    pub fn with_progress(mut self, progress: ProgressConfig) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_progress_option(mut self, progress: Option<ProgressConfig>) -> Self {
        self.progress = progress;
        self
    }

    /// The concrete guard prefix, or None when the search is unbounded.
    pub fn resolved_stop(&self) -> Result<Option<Vec<usize>>> {
        let stop = match &self.stop {
            StopBound::Unbounded => None,
            StopBound::Subtree => subtree_bound(&self.start),
            StopBound::Prefix(bound) => {
                if ChoiceSequence::from_prefix(&self.start).reaches(bound) {
                    return Err(SearchError::Config(format!(
                        "stop bound {:?} is not beyond start {:?}",
                        bound, self.start
                    )));
                }
                Some(bound.clone())
            }
        };
        Ok(stop)
    }
}

/// The sibling bound that confines a search to the subtree below `prefix`.
pub fn subtree_bound(prefix: &[usize]) -> Option<Vec<usize>> {
    let (&last, head) = prefix.split_last()?;
    let mut bound = head.to_vec();
    bound.push(last.saturating_add(1));
    Some(bound)
}
