//! N-queens: one queen per row, each step picks the column for the next row.

use crate::search::config::UndoStrategy;
use crate::search::space::{Cursor, SearchSpace};
use std::fmt;

#[derive(Debug, Clone)]
pub struct Queens {
    size: usize,
    undo: UndoStrategy,
    /// Placed queens as (row, column), one per row in order.
    placed: Vec<(usize, usize)>,
    columns: Vec<bool>,
    /// Indexed by row + column.
    rising: Vec<bool>,
    /// Indexed by row + size - column.
    falling: Vec<bool>,
}

impl Queens {
    pub fn new(size: usize, undo: UndoStrategy) -> Self {
        Self {
            size,
            undo,
            placed: Vec::with_capacity(size),
            columns: vec![false; size],
            rising: vec![false; 2 * size],
            falling: vec![false; 2 * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn placed(&self) -> &[(usize, usize)] {
        &self.placed
    }

    fn mark(&mut self, row: usize, col: usize, value: bool) {
        self.columns[col] = value;
        self.rising[row + col] = value;
        self.falling[row + self.size - col] = value;
    }

    fn is_free(&self, row: usize, col: usize) -> bool {
        !self.columns[col] && !self.rising[row + col] && !self.falling[row + self.size - col]
    }
}

impl SearchSpace for Queens {
    type Solution = Vec<(usize, usize)>;

    fn step(&mut self, cursor: &mut Cursor) -> Option<Self::Solution> {
        let row = self.placed.len();
        let col = cursor.choose(self.size)?;
        if !self.is_free(row, col) {
            return None;
        }

        self.mark(row, col, true);
        self.placed.push((row, col));
        cursor.accept();
        (self.placed.len() == self.size).then(|| self.placed.clone())
    }

    fn can_backtrack(&self) -> bool {
        self.undo == UndoStrategy::Backtrack
    }

    fn backtrack(&mut self, _choice: usize) {
        if let Some((row, col)) = self.placed.pop() {
            self.mark(row, col, false);
        }
    }

    fn restart(&mut self) {
        self.placed.clear();
        self.columns.fill(false);
        self.rising.fill(false);
        self.falling.fill(false);
    }
}

impl fmt::Display for Queens {
    /// The board so far, `X` for a queen and `.` for an empty square.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &(_, col)) in self.placed.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let row: Vec<&str> = (0..self.size)
                .map(|c| if c == col { "X" } else { "." })
                .collect();
            write!(f, "{}", row.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::config::SearchConfig;
    use crate::search::engine::Search;

    fn first_placement(size: usize, undo: UndoStrategy) -> Option<Vec<(usize, usize)>> {
        Search::new(Queens::new(size, undo), &SearchConfig::default())
            .unwrap()
            .search()
    }

    fn known() -> Vec<(usize, Option<Vec<(usize, usize)>>)> {
        let cols = |cs: &[usize]| -> Option<Vec<(usize, usize)>> {
            Some(cs.iter().copied().enumerate().collect())
        };
        vec![
            (1, cols(&[0])),
            (2, None),
            (3, None),
            (4, cols(&[1, 3, 0, 2])),
            (5, cols(&[0, 2, 4, 1, 3])),
            (6, cols(&[1, 3, 5, 0, 2, 4])),
            (7, cols(&[0, 2, 4, 6, 1, 3, 5])),
            (8, cols(&[0, 4, 7, 5, 2, 6, 1, 3])),
            (10, cols(&[0, 2, 5, 7, 9, 4, 8, 1, 3, 6])),
        ]
    }

    #[test]
    fn test_known_placements_backtrack() {
        for (size, expected) in known() {
            assert_eq!(
                first_placement(size, UndoStrategy::Backtrack),
                expected,
                "size = {}",
                size
            );
        }
    }

    #[test]
    fn test_known_placements_restart() {
        for (size, expected) in known() {
            assert_eq!(
                first_placement(size, UndoStrategy::Restart),
                expected,
                "size = {}",
                size
            );
        }
    }

    #[test]
    fn test_large_boards_backtrack() {
        let cols: &[usize] = &[0, 2, 4, 1, 7, 14, 11, 15, 12, 16, 5, 17, 6, 3, 10, 8, 13, 9];
        let expected: Vec<(usize, usize)> = cols.iter().copied().enumerate().collect();
        assert_eq!(first_placement(18, UndoStrategy::Backtrack), Some(expected));

        let cols: &[usize] = &[
            0, 2, 4, 1, 3, 12, 14, 11, 17, 19, 16, 8, 15, 18, 7, 9, 6, 13, 5, 10,
        ];
        let expected: Vec<(usize, usize)> = cols.iter().copied().enumerate().collect();
        assert_eq!(first_placement(20, UndoStrategy::Backtrack), Some(expected));
    }

    #[test]
    fn test_solution_counts() {
        let counts = [1, 0, 0, 2, 10, 4, 40, 92];
        for (i, &count) in counts.iter().enumerate() {
            let size = i + 1;
            let mut search = Search::new(
                Queens::new(size, UndoStrategy::Backtrack),
                &SearchConfig::default(),
            )
            .unwrap();
            assert_eq!(search.solutions().count(), count, "size = {}", size);
        }
    }

    #[test]
    fn test_backtrack_clears_every_mark() {
        let mut search = Search::new(
            Queens::new(6, UndoStrategy::Backtrack),
            &SearchConfig::default(),
        )
        .unwrap();
        while search.search().is_some() {}

        let queens = search.problem();
        assert!(queens.placed().is_empty());
        assert!(!queens.columns.iter().any(|&m| m));
        assert!(!queens.rising.iter().any(|&m| m));
        assert!(!queens.falling.iter().any(|&m| m));
    }

    #[test]
    fn test_board_display() {
        let mut search = Search::new(
            Queens::new(4, UndoStrategy::Backtrack),
            &SearchConfig::default(),
        )
        .unwrap();
        search.search().unwrap();

        assert_eq!(
            search.problem().to_string(),
            ". X . .\n. . . X\nX . . .\n. . X ."
        );
    }
}
