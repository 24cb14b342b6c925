//! The contract between a concrete problem and the traversal engine.
//!
//! A problem proposes one value per [`SearchSpace::step`] through a [`Cursor`],
//! checks it against its own state, and calls [`Cursor::accept`] to descend. The
//! engine owns ordering, undo and replay.

use crate::search::choices::ChoiceSequence;
use std::fmt::Debug;

/// A problem searched one choice at a time.
pub trait SearchSpace {
    /// What a successful search returns.
    type Solution: Clone + Debug + Send + 'static;

    /// Propose the value for the cursor's current depth.
    ///
    /// Returns `Some` once the problem is fully solved. Infeasibility is signalled by
    /// returning without calling `accept`, and must leave no side effects behind.
    fn step(&mut self, cursor: &mut Cursor) -> Option<Self::Solution>;

    /// Whether [`SearchSpace::backtrack`] undoes state incrementally.
    ///
    /// Queried once when a search is constructed; the answer fixes the undo strategy
    /// for that search's lifetime. Restart-only problems must implement `restart`.
    fn can_backtrack(&self) -> bool {
        false
    }

    /// Undo the side effects of accepting `choice` at the deepest committed level.
    fn backtrack(&mut self, _choice: usize) {}

    /// Clear all derived state; the engine then replays the surviving prefix from depth 0.
    fn restart(&mut self) {}
}

/// Write cursor handed to [`SearchSpace::step`].
///
/// Each step may call `choose` once and `accept` at most once after it. Anything else
/// is a protocol violation and panics.
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    pub(crate) seq: ChoiceSequence,
    pub(crate) depth: usize,
    proposed: bool,
    pending: Option<usize>,
    accepted: bool,
}

impl Cursor {
    pub(crate) fn with_prefix(prefix: &[usize]) -> Self {
        Self {
            seq: ChoiceSequence::from_prefix(prefix),
            ..Self::default()
        }
    }

    /// Candidate in `0..limit` for the current depth.
    pub fn choose(&mut self, limit: usize) -> Option<usize> {
        self.choose_with(limit, 0, 1)
    }

    /// Candidate in `min..limit`, enumerated with stride `step`.
    ///
    /// On the first visit to a depth this opens the level at `min`; on replay it
    /// returns the recorded value. `None` means no legal value exists here.
    pub fn choose_with(&mut self, limit: usize, min: usize, step: usize) -> Option<usize> {
        assert!(!self.accepted, "choose() called after accept() in the same step");
        assert!(!self.proposed, "choose() called twice in one step");
        self.proposed = true;

        let depth = self.depth;
        let value = if depth < self.seq.len() {
            self.seq.record_bounds(depth, limit, step);
            let recorded = self.seq.get(depth)?;
            if recorded < min || recorded >= limit {
                return None;
            }
            // Off the `min + n * step` grid
            if step > 1 && (recorded - min) % step != 0 {
                return None;
            }
            recorded
        } else {
            if min >= limit {
                return None;
            }
            self.seq.push(min, limit, step);
            min
        };

        self.pending = Some(value);
        Some(value)
    }

    /// Commit the value returned by the last `choose`, descending one level.
    pub fn accept(&mut self) {
        assert!(!self.accepted, "accept() called twice in one step");
        assert!(
            self.pending.take().is_some(),
            "accept() called without a pending choose()"
        );
        self.accepted = true;
        self.depth += 1;
    }

    /// Number of committed levels.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The committed prefix.
    pub fn committed(&self) -> &[usize] {
        &self.seq.as_slice()[..self.depth]
    }

    /// Every recorded choice, including levels still waiting to be replayed.
    pub fn choices(&self) -> &[usize] {
        self.seq.as_slice()
    }

    /// True while the cursor is re-walking levels recorded by an earlier pass.
    pub fn is_replaying(&self) -> bool {
        self.depth < self.seq.len()
    }

    pub(crate) fn begin_step(&mut self) {
        self.proposed = false;
        self.pending = None;
        self.accepted = false;
    }

    pub(crate) fn accepted(&self) -> bool {
        self.accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_visit_opens_level_at_min() {
        let mut cursor = Cursor::default();
        cursor.begin_step();

        assert_eq!(cursor.choose_with(10, 3, 2), Some(3));
        assert_eq!(cursor.seq.limit(0), Some(10));
        assert_eq!(cursor.seq.step(0), Some(2));
        assert_eq!(cursor.depth(), 0);
    }

    #[test]
    fn test_empty_range_is_infeasible() {
        let mut cursor = Cursor::default();
        cursor.begin_step();

        assert_eq!(cursor.choose_with(4, 4, 1), None);
        assert!(cursor.choices().is_empty());
    }

    #[test]
    fn test_accept_descends() {
        let mut cursor = Cursor::default();
        cursor.begin_step();
        cursor.choose(3);
        cursor.accept();

        assert_eq!(cursor.depth(), 1);
        assert_eq!(cursor.committed(), &[0]);
        assert!(cursor.accepted());
    }

    #[test]
    fn test_replay_returns_recorded_value() {
        let mut cursor = Cursor::with_prefix(&[2, 5]);
        assert!(cursor.is_replaying());

        cursor.begin_step();
        assert_eq!(cursor.choose(4), Some(2));
        cursor.accept();

        cursor.begin_step();
        assert_eq!(cursor.choose_with(9, 3, 1), Some(5));
        cursor.accept();
        assert!(!cursor.is_replaying());
    }

    #[test]
    fn test_replayed_value_outside_bounds_is_infeasible() {
        let mut cursor = Cursor::with_prefix(&[7]);
        cursor.begin_step();
        assert_eq!(cursor.choose(4), None);
    }

    #[test]
    fn test_replayed_value_off_stride_is_infeasible() {
        let mut cursor = Cursor::with_prefix(&[3]);
        cursor.begin_step();
        assert_eq!(cursor.choose_with(10, 0, 2), None);

        let mut cursor = Cursor::with_prefix(&[5]);
        cursor.begin_step();
        assert_eq!(cursor.choose_with(10, 1, 2), Some(5));
    }

    #[test]
    #[should_panic(expected = "accept() called twice in one step")]
    fn test_double_accept_panics() {
        let mut cursor = Cursor::default();
        cursor.begin_step();
        cursor.choose(3);
        cursor.accept();
        cursor.accept();
    }

    #[test]
    #[should_panic(expected = "accept() called without a pending choose()")]
    fn test_accept_without_choose_panics() {
        let mut cursor = Cursor::default();
        cursor.begin_step();
        cursor.accept();
    }

    #[test]
    #[should_panic(expected = "choose() called twice in one step")]
    fn test_second_choose_panics() {
        let mut cursor = Cursor::default();
        cursor.begin_step();
        cursor.choose(3);
        cursor.choose(3);
    }

    #[test]
    #[should_panic(expected = "accept() called without a pending choose()")]
    fn test_accept_after_rejected_choose_panics() {
        let mut cursor = Cursor::default();
        cursor.begin_step();
        assert_eq!(cursor.choose_with(2, 2, 1), None);
        cursor.accept();
    }
}
