//! Depth-indexed backtracking driver.
//!
//! [`Search`] alternates the problem's `step` with its own `next`, which either
//! keeps the level just accepted or walks the cursor back to the next untried
//! sibling. Traversal is a flat loop over the choice sequence, never recursion, so
//! tree depth only costs vector length.
//!
//! Undo happens one of two ways, fixed at construction:
//! - backtrack-capable problems get `backtrack(choice)` for every committed level
//!   the walk abandons;
//! - restart-only problems get a single `restart()` once the walk settles, after
//!   which `choose` replays the recorded prefix from depth 0.

use crate::error::{Result, SearchError};
use crate::search::config::{SearchConfig, UndoStrategy};
use crate::search::progress::Progress;
use crate::search::result::{SearchStatistics, SearchStatus};
use crate::search::space::{Cursor, SearchSpace};
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, trace};

pub struct Search<P: SearchSpace> {
    problem: P,
    cursor: Cursor,
    backtracking: bool,
    stop: Option<Vec<usize>>,
    exhausted: bool,
    /// The cursor sits on a node already handed out; move past it before stepping.
    parked: bool,
    /// Solution completed while replaying the start prefix.
    pending: Option<P::Solution>,
    progress: Option<Progress>,
    interrupt: Option<Arc<AtomicBool>>,
    statistics: SearchStatistics,
}

impl<P: SearchSpace> Search<P> {
    /// Seed a search with `config.start` and bound it by `config.stop`.
    ///
    /// The start prefix is replayed through the problem immediately; a prefix the
    /// problem rejects is an [`SearchError::IllegalPrefix`].
    pub fn new(problem: P, config: &SearchConfig) -> Result<Self> {
        let stop = config.resolved_stop()?;
        let backtracking = problem.can_backtrack();

        let mut search = Self {
            problem,
            cursor: Cursor::with_prefix(&config.start),
            backtracking,
            stop,
            exhausted: false,
            parked: false,
            pending: None,
            progress: config.progress.as_ref().map(Progress::new),
            interrupt: None,
            statistics: SearchStatistics::new(),
        };

        search.problem.restart();
        search.replay_start(&config.start)?;

        debug!(
            start = ?config.start,
            stop = ?search.stop,
            undo = %search.undo_strategy(),
            "search constructed"
        );
        Ok(search)
    }

    fn replay_start(&mut self, start: &[usize]) -> Result<()> {
        while self.cursor.depth < start.len() {
            let solution = self.step();
            let complete = self.cursor.depth == start.len();
            if !self.cursor.accepted() || (solution.is_some() && !complete) {
                return Err(SearchError::IllegalPrefix {
                    prefix: start.to_vec(),
                    depth: self.cursor.depth,
                });
            }
            if solution.is_some() {
                self.pending = solution;
            }
        }
        Ok(())
    }

    /// Run until the next solution, or None once the space is exhausted.
    ///
    /// Calling again after a solution resumes with the solution's next sibling.
    pub fn search(&mut self) -> Option<P::Solution> {
        let started = Instant::now();
        let result = self.run();
        self.statistics.elapsed_time += started.elapsed();
        self.complete();
        result
    }

    /// Iterate over every remaining solution in canonical order.
    pub fn solutions(&mut self) -> Solutions<'_, P> {
        Solutions { search: self }
    }

    fn run(&mut self) -> Option<P::Solution> {
        if let Some(solution) = self.pending.take() {
            return Some(self.solved(solution));
        }
        if self.parked {
            self.parked = false;
            self.resume();
        }

        while !self.is_finished() {
            if self.interrupted() {
                self.statistics.status = SearchStatus::Interrupted;
                return None;
            }
            if let Some(solution) = self.step() {
                return Some(self.solved(solution));
            }
            self.next();
        }

        self.statistics.status = SearchStatus::Exhausted;
        debug!(steps = self.statistics.steps, "search exhausted");
        None
    }

    fn solved(&mut self, solution: P::Solution) -> P::Solution {
        self.parked = true;
        self.statistics.solutions += 1;
        self.statistics.status = SearchStatus::Solved;
        debug!(
            steps = self.statistics.steps,
            prefix = ?self.cursor.committed(),
            "solution found"
        );
        solution
    }

    /// Walk the root forward until `target` levels are committed and return that prefix.
    ///
    /// Each call hands out the next prefix in canonical order, so successive calls
    /// partition the tree without gaps or overlaps. A solution found above `target`
    /// is handed out as a shorter prefix. None once no prefix remains.
    pub fn advance_to_depth(&mut self, target: usize) -> Option<Vec<usize>> {
        if self.parked {
            self.parked = false;
            self.resume();
        }
        if self.pending.take().is_some() {
            self.parked = true;
            return Some(self.cursor.committed().to_vec());
        }

        while !self.is_finished() {
            if self.interrupted() {
                self.statistics.status = SearchStatus::Interrupted;
                return None;
            }
            // Replayed levels are ancestors of prefixes already handed out.
            if self.cursor.depth >= target && !self.cursor.is_replaying() {
                self.parked = true;
                return Some(self.cursor.committed().to_vec());
            }
            if self.step().is_some() {
                self.parked = true;
                return Some(self.cursor.committed().to_vec());
            }
            self.next();
        }

        self.statistics.status = SearchStatus::Exhausted;
        None
    }

    /// True once the space is exhausted or the recorded choices reach the guard bound.
    pub fn is_finished(&self) -> bool {
        self.exhausted
            || self
                .stop
                .as_deref()
                .is_some_and(|stop| self.cursor.seq.reaches(stop))
    }

    fn step(&mut self) -> Option<P::Solution> {
        self.cursor.begin_step();
        self.statistics.steps += 1;

        let solution = self.problem.step(&mut self.cursor);

        if self.cursor.accepted() {
            self.statistics.accepts += 1;
            self.statistics.max_depth = self.statistics.max_depth.max(self.cursor.depth);
        }
        if let Some(progress) = self.progress.as_mut() {
            let committed = self.cursor.committed();
            progress.report(Some(&committed as &dyn Debug));
        }
        solution
    }

    fn next(&mut self) {
        if self.cursor.accepted() {
            return;
        }
        self.statistics.unwinds += 1;
        self.retreat(self.cursor.depth);
    }

    /// Abandon the node the cursor was parked on.
    fn resume(&mut self) {
        if !self.cursor.accepted() {
            self.next();
            return;
        }
        let depth = self.cursor.depth;
        if depth == 0 {
            self.exhausted = true;
            return;
        }
        let level = depth - 1;
        self.cursor.seq.truncate(depth);
        self.undo(level);
        self.retreat(level);
    }

    /// Move `level` to its next sibling, dropping exhausted levels on the way up.
    ///
    /// Levels below `level` are committed and their side effects are still applied.
    fn retreat(&mut self, mut level: usize) {
        loop {
            if level < self.cursor.seq.len() && self.cursor.seq.advance(level) {
                self.cursor.seq.truncate(level + 1);
                self.cursor.depth = level;
                break;
            }
            self.cursor.seq.truncate(level);
            if level == 0 {
                self.exhausted = true;
                self.cursor.depth = 0;
                trace!("choice tree exhausted");
                return;
            }
            level -= 1;
            self.undo(level);
        }

        if !self.backtracking {
            self.problem.restart();
            self.statistics.restarts += 1;
            self.cursor.depth = 0;
        }
        trace!(level, choices = ?self.cursor.choices(), "resuming");
    }

    fn undo(&mut self, level: usize) {
        if !self.backtracking {
            return;
        }
        if let Some(choice) = self.cursor.seq.get(level) {
            self.problem.backtrack(choice);
            self.statistics.backtracks += 1;
        }
    }

    fn complete(&mut self) {
        if let Some(progress) = self.progress.as_mut() {
            progress.finish();
        }
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Stop stepping as soon as `flag` is raised.
    pub fn set_interrupt(&mut self, flag: Arc<AtomicBool>) {
        self.interrupt = Some(flag);
    }

    pub fn undo_strategy(&self) -> UndoStrategy {
        if self.backtracking {
            UndoStrategy::Backtrack
        } else {
            UndoStrategy::Restart
        }
    }

    /// Number of committed levels.
    pub fn depth(&self) -> usize {
        self.cursor.depth
    }

    /// Every recorded choice, including the sibling about to be tried.
    pub fn choices(&self) -> &[usize] {
        self.cursor.choices()
    }

    pub fn committed(&self) -> &[usize] {
        self.cursor.committed()
    }

    pub fn stop_bound(&self) -> Option<&[usize]> {
        self.stop.as_deref()
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn into_problem(self) -> P {
        self.problem
    }

    pub fn statistics(&self) -> &SearchStatistics {
        &self.statistics
    }
}

/// Iterator returned by [`Search::solutions`].
pub struct Solutions<'a, P: SearchSpace> {
    search: &'a mut Search<P>,
}

impl<P: SearchSpace> Iterator for Solutions<'_, P> {
    type Item = P::Solution;

    fn next(&mut self) -> Option<Self::Item> {
        self.search.search()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::config::{ProgressConfig, StopBound};

    /// Fixed-length words over `0..base`; optionally no two equal neighbours.
    struct Words {
        len: usize,
        base: usize,
        min: usize,
        stride: usize,
        distinct_neighbours: bool,
        undo: UndoStrategy,
        word: Vec<usize>,
        restarts: usize,
    }

    impl Words {
        fn new(len: usize, base: usize, undo: UndoStrategy) -> Self {
            Self {
                len,
                base,
                min: 0,
                stride: 1,
                distinct_neighbours: false,
                undo,
                word: Vec::new(),
                restarts: 0,
            }
        }

        fn distinct(mut self) -> Self {
            self.distinct_neighbours = true;
            self
        }
    }

    impl SearchSpace for Words {
        type Solution = Vec<usize>;

        fn step(&mut self, cursor: &mut Cursor) -> Option<Vec<usize>> {
            let value = cursor.choose_with(self.base, self.min, self.stride)?;
            if self.distinct_neighbours && self.word.last() == Some(&value) {
                return None;
            }
            self.word.push(value);
            cursor.accept();
            (self.word.len() == self.len).then(|| self.word.clone())
        }

        fn can_backtrack(&self) -> bool {
            self.undo == UndoStrategy::Backtrack
        }

        fn backtrack(&mut self, choice: usize) {
            assert_eq!(self.word.pop(), Some(choice));
        }

        fn restart(&mut self) {
            self.word.clear();
            self.restarts += 1;
        }
    }

    fn all_solutions(problem: Words, config: &SearchConfig) -> Vec<Vec<usize>> {
        let mut search = Search::new(problem, config).unwrap();
        search.solutions().collect()
    }

    #[test]
    fn test_enumerates_in_lexicographic_order() {
        let found = all_solutions(Words::new(2, 3, UndoStrategy::Backtrack), &SearchConfig::default());
        let expected: Vec<Vec<usize>> = (0..3)
            .flat_map(|a| (0..3).map(move |b| vec![a, b]))
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_rejections_are_skipped() {
        let found = all_solutions(
            Words::new(2, 3, UndoStrategy::Backtrack).distinct(),
            &SearchConfig::default(),
        );
        assert_eq!(
            found,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 2],
                vec![2, 0],
                vec![2, 1]
            ]
        );
    }

    #[test]
    fn test_restart_mode_matches_backtrack_mode() {
        let config = SearchConfig::default();
        let backtracked = all_solutions(Words::new(3, 3, UndoStrategy::Backtrack).distinct(), &config);
        let restarted = all_solutions(Words::new(3, 3, UndoStrategy::Restart).distinct(), &config);
        assert_eq!(backtracked, restarted);
    }

    #[test]
    fn test_restart_mode_counts_restarts() {
        let mut search =
            Search::new(Words::new(2, 2, UndoStrategy::Restart), &SearchConfig::default()).unwrap();
        assert_eq!(search.undo_strategy(), UndoStrategy::Restart);
        assert_eq!(search.solutions().count(), 4);
        assert_eq!(search.statistics().backtracks, 0);
        assert!(search.statistics().restarts > 0);
        assert_eq!(search.statistics().restarts as usize + 1, search.problem().restarts);
    }

    #[test]
    fn test_backtracking_unwinds_all_state() {
        let mut search =
            Search::new(Words::new(3, 2, UndoStrategy::Backtrack), &SearchConfig::default()).unwrap();
        assert_eq!(search.solutions().count(), 8);
        assert!(search.is_finished());
        assert_eq!(search.statistics().status, SearchStatus::Exhausted);
        assert!(search.problem().word.is_empty());
    }

    #[test]
    fn test_stepped_choices() {
        let mut words = Words::new(1, 9, UndoStrategy::Backtrack);
        words.min = 1;
        words.stride = 3;
        let found = all_solutions(words, &SearchConfig::default());
        assert_eq!(found, vec![vec![1], vec![4], vec![7]]);
    }

    #[test]
    fn test_start_prefix_bounds_subtree() {
        let config = SearchConfig::default().with_start(vec![1]);
        let found = all_solutions(Words::new(2, 3, UndoStrategy::Backtrack), &config);
        assert_eq!(found, vec![vec![1, 0], vec![1, 1], vec![1, 2]]);
    }

    #[test]
    fn test_start_prefix_bounds_subtree_in_restart_mode() {
        let config = SearchConfig::default().with_start(vec![1, 0]);
        let found = all_solutions(Words::new(3, 2, UndoStrategy::Restart), &config);
        assert_eq!(found, vec![vec![1, 0, 0], vec![1, 0, 1]]);
    }

    #[test]
    fn test_unbounded_continues_past_start() {
        let config = SearchConfig::default().with_start(vec![1, 1]).unbounded();
        let found = all_solutions(Words::new(2, 3, UndoStrategy::Backtrack), &config);
        assert_eq!(
            found,
            vec![vec![1, 1], vec![1, 2], vec![2, 0], vec![2, 1], vec![2, 2]]
        );
    }

    #[test]
    fn test_explicit_stop_prefix() {
        let config = SearchConfig::default()
            .with_start(vec![0, 2])
            .with_stop(StopBound::Prefix(vec![1, 1]));
        let found = all_solutions(Words::new(2, 3, UndoStrategy::Backtrack), &config);
        assert_eq!(found, vec![vec![0, 2], vec![1, 0]]);
    }

    #[test]
    fn test_illegal_prefix_is_rejected() {
        let config = SearchConfig::default().with_start(vec![1, 1]);
        let result = Search::new(Words::new(3, 3, UndoStrategy::Backtrack).distinct(), &config);
        match result {
            Err(SearchError::IllegalPrefix { prefix, depth }) => {
                assert_eq!(prefix, vec![1, 1]);
                assert_eq!(depth, 1);
            }
            _ => panic!("expected an illegal prefix error"),
        }
    }

    #[test]
    fn test_prefix_outside_limits_is_rejected() {
        let config = SearchConfig::default().with_start(vec![5]);
        assert!(Search::new(Words::new(2, 3, UndoStrategy::Restart), &config).is_err());
    }

    #[test]
    fn test_prefix_off_stride_is_rejected() {
        let mut words = Words::new(1, 10, UndoStrategy::Backtrack);
        words.stride = 2;
        let config = SearchConfig::default().with_start(vec![3]).unbounded();
        match Search::new(words, &config) {
            Err(SearchError::IllegalPrefix { prefix, depth }) => {
                assert_eq!(prefix, vec![3]);
                assert_eq!(depth, 0);
            }
            _ => panic!("expected an illegal prefix error"),
        }

        let mut words = Words::new(1, 10, UndoStrategy::Backtrack);
        words.stride = 2;
        let config = SearchConfig::default().with_start(vec![4]).unbounded();
        let found = all_solutions(words, &config);
        assert_eq!(found, vec![vec![4], vec![6], vec![8]]);
    }

    #[test]
    fn test_prefix_past_a_solution_is_rejected() {
        let config = SearchConfig::default().with_start(vec![0, 1, 0]);
        assert!(Search::new(Words::new(2, 3, UndoStrategy::Backtrack), &config).is_err());
    }

    #[test]
    fn test_complete_prefix_is_returned_first() {
        let config = SearchConfig::default().with_start(vec![2, 1]);
        let mut search = Search::new(Words::new(2, 3, UndoStrategy::Backtrack), &config).unwrap();
        assert_eq!(search.search(), Some(vec![2, 1]));
        assert_eq!(search.search(), None);
        assert!(search.is_finished());
    }

    #[test]
    fn test_advance_to_depth_partitions_tree() {
        let mut root =
            Search::new(Words::new(3, 2, UndoStrategy::Backtrack), &SearchConfig::default()).unwrap();
        let mut prefixes = Vec::new();
        while let Some(prefix) = root.advance_to_depth(2) {
            prefixes.push(prefix);
        }
        assert_eq!(
            prefixes,
            vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]
        );
        assert_eq!(root.advance_to_depth(2), None);
    }

    #[test]
    fn test_advance_to_depth_in_restart_mode() {
        let mut root = Search::new(
            Words::new(3, 3, UndoStrategy::Restart).distinct(),
            &SearchConfig::default(),
        )
        .unwrap();
        let mut prefixes = Vec::new();
        while let Some(prefix) = root.advance_to_depth(2) {
            prefixes.push(prefix);
        }
        assert_eq!(prefixes.len(), 6);
        assert!(prefixes.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_advance_to_depth_zero_yields_root_once() {
        let mut root =
            Search::new(Words::new(2, 2, UndoStrategy::Backtrack), &SearchConfig::default()).unwrap();
        assert_eq!(root.advance_to_depth(0), Some(vec![]));
        assert_eq!(root.advance_to_depth(0), None);
    }

    #[test]
    fn test_advance_to_depth_hands_out_shallow_solutions() {
        let mut root =
            Search::new(Words::new(1, 2, UndoStrategy::Backtrack), &SearchConfig::default()).unwrap();
        assert_eq!(root.advance_to_depth(3), Some(vec![0]));
        assert_eq!(root.advance_to_depth(3), Some(vec![1]));
        assert_eq!(root.advance_to_depth(3), None);
    }

    #[test]
    fn test_advance_past_long_start_never_revisits_ancestors() {
        for undo in [UndoStrategy::Backtrack, UndoStrategy::Restart] {
            let config = SearchConfig::default().with_start(vec![0, 1]).unbounded();
            let mut root = Search::new(Words::new(3, 2, undo), &config).unwrap();
            let mut prefixes = Vec::new();
            while let Some(prefix) = root.advance_to_depth(1) {
                prefixes.push(prefix);
            }
            assert_eq!(prefixes, vec![vec![0, 1], vec![1]], "{undo}");
        }
    }

    #[test]
    fn test_worker_seeded_from_partition_covers_subtree() {
        let problem = || Words::new(3, 3, UndoStrategy::Backtrack).distinct();
        let single: Vec<_> = all_solutions(problem(), &SearchConfig::default());

        let mut root = Search::new(problem(), &SearchConfig::default()).unwrap();
        let mut partitioned = Vec::new();
        while let Some(prefix) = root.advance_to_depth(2) {
            let config = SearchConfig::default().with_start(prefix);
            partitioned.extend(all_solutions(problem(), &config));
        }
        assert_eq!(single, partitioned);
    }

    #[test]
    fn test_interrupt_stops_search() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut search =
            Search::new(Words::new(4, 4, UndoStrategy::Backtrack), &SearchConfig::default()).unwrap();
        search.set_interrupt(Arc::clone(&flag));

        assert_eq!(search.search(), None);
        assert_eq!(search.statistics().status, SearchStatus::Interrupted);
        assert!(!search.is_finished());

        flag.store(false, Ordering::SeqCst);
        assert_eq!(search.search(), Some(vec![0, 0, 0, 0]));
    }

    #[test]
    fn test_statistics_track_steps() {
        let config = SearchConfig::default().with_progress(ProgressConfig::default().with_increment(2));
        let mut search = Search::new(Words::new(2, 2, UndoStrategy::Backtrack), &config).unwrap();
        assert_eq!(search.search(), Some(vec![0, 0]));

        let stats = search.statistics();
        assert_eq!(stats.steps, 2);
        assert_eq!(stats.accepts, 2);
        assert_eq!(stats.solutions, 1);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.status, SearchStatus::Solved);
    }

    #[test]
    fn test_empty_level_exhausts_immediately() {
        let mut search =
            Search::new(Words::new(2, 0, UndoStrategy::Backtrack), &SearchConfig::default()).unwrap();
        assert_eq!(search.search(), None);
        assert_eq!(search.statistics().steps, 1);
        assert!(search.choices().is_empty());
    }
}
