//! Choice sequence: one integer per tree level plus that level's bound and stride.
//!
//! The three vectors always have the same length. A level that was seeded from a
//! start prefix carries an open bound until the problem first proposes at it, at
//! which point [`ChoiceSequence::record_bounds`] pins the real limit and step.

/// Bound used for seeded levels whose limit is not known yet.
const OPEN_LIMIT: usize = usize::MAX;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceSequence {
    choices: Vec<usize>,
    limits: Vec<usize>,
    steps: Vec<usize>,
}

impl ChoiceSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the sequence with a fixed prefix; bounds are filled in on replay.
    pub fn from_prefix(prefix: &[usize]) -> Self {
        Self {
            choices: prefix.to_vec(),
            limits: vec![OPEN_LIMIT; prefix.len()],
            steps: vec![1; prefix.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.choices
    }

    pub fn get(&self, level: usize) -> Option<usize> {
        self.choices.get(level).copied()
    }

    pub fn limit(&self, level: usize) -> Option<usize> {
        self.limits.get(level).copied()
    }

    pub fn step(&self, level: usize) -> Option<usize> {
        self.steps.get(level).copied()
    }

    /// Copy of the first `len` choices.
    pub fn prefix(&self, len: usize) -> Vec<usize> {
        self.choices[..len.min(self.choices.len())].to_vec()
    }

    /// Open a brand-new level at the end of the sequence.
    pub fn push(&mut self, value: usize, limit: usize, step: usize) {
        self.choices.push(value);
        self.limits.push(limit);
        self.steps.push(step.max(1));
    }

    /// Refresh the bound and stride of an already recorded level.
    pub fn record_bounds(&mut self, level: usize, limit: usize, step: usize) {
        self.limits[level] = limit;
        self.steps[level] = step.max(1);
    }

    /// Move `level` to its next sibling. Returns false once the value leaves its bound.
    pub fn advance(&mut self, level: usize) -> bool {
        let next = self.choices[level].saturating_add(self.steps[level]);
        self.choices[level] = next;
        next < self.limits[level]
    }

    /// Drop every level at or beyond `len`.
    pub fn truncate(&mut self, len: usize) {
        self.choices.truncate(len);
        self.limits.truncate(len);
        self.steps.truncate(len);
    }

    /// True when the recorded choices compare greater than or equal to `bound`.
    ///
    /// The comparison is lexicographic at the first differing level. When one side is a
    /// prefix of the other, the bound counts as reached only if the sequence is at
    /// least as long as the bound.
    pub fn reaches(&self, bound: &[usize]) -> bool {
        for (&choice, &guard) in self.choices.iter().zip(bound) {
            if choice != guard {
                return choice > guard;
            }
        }
        self.choices.len() >= bound.len()
    }
}
