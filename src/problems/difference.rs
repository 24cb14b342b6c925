//! Planar cyclic difference sets.
//!
//! A (v, k, 1) difference set is k residues mod v = k(k-1)+1 whose pairwise
//! differences hit every nonzero residue exactly once. Any such set can be shifted
//! and scaled to start `0, 1`, so the search fixes those two and places the rest in
//! increasing order.
//!
//! Differences are stored folded: `d` and `v - d` always occur together, so one flag
//! per `min(d, v - d)` is enough.

use crate::search::config::UndoStrategy;
use crate::search::space::{Cursor, SearchSpace};
use std::fmt;

/// v for a planar set of `k` elements.
pub fn modulus(k: usize) -> usize {
    k * k.saturating_sub(1) + 1
}

#[derive(Debug, Clone)]
pub struct DifferenceSet {
    k: usize,
    v: usize,
    undo: UndoStrategy,
    elements: Vec<usize>,
    /// `differences[d]` is set once `d` (or `v - d`) is taken. Entry 0 is always set.
    differences: Vec<bool>,
}

impl DifferenceSet {
    pub fn new(k: usize, undo: UndoStrategy) -> Self {
        let v = modulus(k);
        let mut differences = vec![false; v / 2 + 1];
        differences[0] = true;
        Self {
            k,
            v,
            undo,
            elements: Vec::with_capacity(k),
            differences,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn v(&self) -> usize {
        self.v
    }

    pub fn elements(&self) -> &[usize] {
        &self.elements
    }

    pub fn differences(&self) -> &[bool] {
        &self.differences
    }

    fn fold(&self, a: usize, b: usize) -> usize {
        let d = (a + self.v - b) % self.v;
        d.min(self.v - d)
    }

    /// Add `value` if none of its differences with the current elements is taken.
    ///
    /// On conflict the state is left exactly as it was.
    pub fn push(&mut self, value: usize) -> bool {
        for i in 0..self.elements.len() {
            let d = self.fold(value, self.elements[i]);
            if self.differences[d] {
                for &marked in &self.elements[..i] {
                    let d = self.fold(value, marked);
                    self.differences[d] = false;
                }
                return false;
            }
            self.differences[d] = true;
        }
        self.elements.push(value);
        true
    }

    /// Remove the last element and release its differences.
    pub fn pop(&mut self) -> Option<usize> {
        let value = self.elements.pop()?;
        for i in 0..self.elements.len() {
            let d = self.fold(value, self.elements[i]);
            self.differences[d] = false;
        }
        Some(value)
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.differences.fill(false);
        self.differences[0] = true;
    }
}

impl SearchSpace for DifferenceSet {
    type Solution = Vec<usize>;

    fn step(&mut self, cursor: &mut Cursor) -> Option<Vec<usize>> {
        let i = self.elements.len();
        let candidate = match i {
            0 => cursor.choose(1),
            1 => cursor.choose_with(2, 1, 1),
            // Leave room above for the k - i - 1 elements still to come
            _ => {
                let limit = self.v.saturating_sub(self.k.saturating_sub(i + 1));
                cursor.choose_with(limit, self.elements[i - 1] + 1, 1)
            }
        }?;

        if !self.push(candidate) {
            return None;
        }
        cursor.accept();
        (self.elements.len() == self.k).then(|| self.elements.clone())
    }

    fn can_backtrack(&self) -> bool {
        self.undo == UndoStrategy::Backtrack
    }

    fn backtrack(&mut self, choice: usize) {
        let popped = self.pop();
        debug_assert_eq!(popped, Some(choice));
    }

    fn restart(&mut self) {
        self.clear();
    }
}

/// Why no planar difference set of a given size can exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonExistence {
    /// Order n ≡ 1, 2 (mod 4) and n is not a sum of two squares: no projective
    /// plane of order n exists at all.
    BruckRyserChowla,
    /// Every known cyclic projective plane has prime-power order; the conjecture
    /// is verified far beyond the sizes this search can reach.
    NotPrimePower,
}

impl fmt::Display for NonExistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonExistence::BruckRyserChowla => write!(f, "excluded by the Bruck-Ryser-Chowla theorem"),
            NonExistence::NotPrimePower => write!(f, "order is not a prime power"),
        }
    }
}

/// Number-theoretic reason a k-element set cannot exist, if there is one.
pub fn nonexistence_reason(k: usize) -> Option<NonExistence> {
    if k <= 2 {
        return None;
    }
    let n = k - 1;
    if matches!(n % 4, 1 | 2) && !is_sum_of_two_squares(n) {
        return Some(NonExistence::BruckRyserChowla);
    }
    if !is_prime_power(n) {
        return Some(NonExistence::NotPrimePower);
    }
    None
}

/// True for p^e with p prime and e >= 1.
pub fn is_prime_power(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    let mut p = 2;
    while p * p <= n && n % p != 0 {
        p += 1;
    }
    if p * p > n {
        return true;
    }
    let mut m = n;
    while m % p == 0 {
        m /= p;
    }
    m == 1
}

pub fn is_sum_of_two_squares(n: usize) -> bool {
    let mut a = 0;
    while a * a <= n {
        if is_square(n - a * a) {
            return true;
        }
        a += 1;
    }
    false
}

fn is_square(n: usize) -> bool {
    let root = (n as f64).sqrt() as usize;
    (root.saturating_sub(1)..=root + 1).any(|r| r * r == n)
}

/// Check that `set` is a planar difference set mod `v`.
pub fn is_planar_difference_set(set: &[usize], v: usize) -> bool {
    let k = set.len();
    if k == 0 || modulus(k) != v || set.iter().any(|&x| x >= v) {
        return false;
    }
    let mut seen = vec![false; v];
    seen[0] = true;
    for (i, &a) in set.iter().enumerate() {
        for (j, &b) in set.iter().enumerate() {
            if i == j {
                continue;
            }
            let d = (a + v - b) % v;
            if seen[d] {
                return false;
            }
            seen[d] = true;
        }
    }
    true
}

/// Partition depth for a coordinated search seeded with `prefix_len` choices.
///
/// Two levels below the prefix, deeper for large k so each subtree stays small,
/// never past the last element.
pub fn partition_depth(k: usize, prefix_len: usize) -> usize {
    (prefix_len + 2).max(k.saturating_sub(4) / 2).min(k)
}
