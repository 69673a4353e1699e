//! Board representation and basic operations

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    identifiers::{ActionKey, Coord},
};

/// A player's mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    /// Get the opposing mark
    pub fn opponent(self) -> Symbol {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }

    /// Convert mark to cell
    pub fn to_cell(self) -> Cell {
        match self {
            Symbol::X => Cell::X,
            Symbol::O => Cell::O,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_cell().to_char())
    }
}

/// A square on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    X,
    O,
}

impl Cell {
    pub fn to_char(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::X => 'x',
            Cell::O => 'o',
        }
    }

    pub fn from_char(c: char) -> Option<Cell> {
        match c {
            '.' | '_' => Some(Cell::Empty),
            'X' | 'x' => Some(Cell::X),
            'O' | 'o' => Some(Cell::O),
            _ => None,
        }
    }

    /// The mark occupying this cell, if any
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Cell::Empty => None,
            Cell::X => Some(Symbol::X),
            Cell::O => Some(Symbol::O),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

/// Square N×N grid stored as rows (`rows[y][x]`).
///
/// Construction rejects boards smaller than 2×2 and ragged rows, so every
/// `Board` has a valid last index for the symmetry transforms. Deserialized
/// boards go through the same checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBoard")]
pub struct Board {
    rows: Vec<Vec<Cell>>,
}

/// Unchecked wire form of a [`Board`]
#[derive(Deserialize)]
struct RawBoard {
    rows: Vec<Vec<Cell>>,
}

impl TryFrom<RawBoard> for Board {
    type Error = Error;

    fn try_from(raw: RawBoard) -> Result<Self> {
        Board::from_rows(raw.rows)
    }
}

impl Board {
    /// Smallest supported side length
    pub const MIN_SIZE: usize = 2;

    /// Create an empty `size`×`size` board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGridSize`] if `size < 2`.
    pub fn empty(size: usize) -> Result<Self> {
        if size < Self::MIN_SIZE {
            return Err(Error::InvalidGridSize { size });
        }
        Ok(Board {
            rows: vec![vec![Cell::Empty; size]; size],
        })
    }

    /// Create a board from rows of cells.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGridSize`] for fewer than 2 rows, or
    /// [`Error::RaggedBoard`] if any row length differs from the row count.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self> {
        let size = rows.len();
        if size < Self::MIN_SIZE {
            return Err(Error::InvalidGridSize { size });
        }
        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != size) {
            return Err(Error::RaggedBoard {
                row,
                expected: size,
                got: cells.len(),
            });
        }
        Ok(Board { rows })
    }

    /// Parse a board from rows separated by `/` or whitespace.
    ///
    /// ```
    /// use qtoe::tictactoe::{Board, Cell};
    ///
    /// let board = Board::parse("x.o/.x./..o").unwrap();
    /// assert_eq!(board.size(), 3);
    /// assert_eq!(board.rows()[0][2], Cell::O);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error for unknown characters or a non-square layout.
    pub fn parse(s: &str) -> Result<Self> {
        let rows = s
            .split(|c: char| c == '/' || c.is_whitespace())
            .filter(|row| !row.is_empty())
            .enumerate()
            .map(|(y, row)| {
                row.chars()
                    .map(|c| {
                        Cell::from_char(c).ok_or_else(|| Error::InvalidCellCharacter {
                            character: c,
                            row: y,
                            context: s.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_rows(rows)
    }

    /// Side length
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Index of the last row/column
    pub fn last_index(&self) -> usize {
        self.rows.len() - 1
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.rows.iter().flatten().copied()
    }

    /// Get the cell at a coordinate, `None` when out of bounds
    pub fn get(&self, coord: Coord) -> Option<Cell> {
        self.rows.get(coord.y).and_then(|row| row.get(coord.x)).copied()
    }

    /// Place a mark.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ActionOutOfBounds`] or [`Error::SquareTaken`].
    pub fn place(&mut self, coord: Coord, symbol: Symbol) -> Result<()> {
        let size = self.size();
        let coord = coord.within(size)?;
        let cell = &mut self.rows[coord.y][coord.x];
        if !cell.is_empty() {
            return Err(Error::SquareTaken {
                action: coord.to_string(),
            });
        }
        *cell = symbol.to_cell();
        Ok(())
    }

    /// Check whether every square is occupied
    pub fn is_full(&self) -> bool {
        self.cells().all(|cell| !cell.is_empty())
    }

    /// Count occupied squares
    pub fn occupied_count(&self) -> usize {
        self.cells().filter(|cell| !cell.is_empty()).count()
    }

    /// Enumerate legal actions.
    ///
    /// Columns are scanned from the last to the first and, within a column,
    /// rows from the bottom up. With `gravity` only the lowest empty square
    /// of each column is playable.
    pub fn legal_actions(&self, gravity: bool) -> Vec<ActionKey> {
        let mut options = Vec::new();
        for x in (0..self.size()).rev() {
            for y in (0..self.size()).rev() {
                if self.rows[y][x].is_empty() {
                    options.push(Coord::new(x, y).key());
                    if gravity {
                        break;
                    }
                }
            }
        }
        options
    }

    /// Build a board of the same size by mapping each destination square to a
    /// source square. Used by the symmetry transforms.
    pub(crate) fn remap(&self, source_of: impl Fn(usize, usize) -> (usize, usize)) -> Board {
        let size = self.size();
        let rows = (0..size)
            .map(|y| {
                (0..size)
                    .map(|x| {
                        let (sx, sy) = source_of(x, y);
                        self.rows[sy][sx]
                    })
                    .collect()
            })
            .collect();
        Board { rows }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.rows.iter().enumerate() {
            if y > 0 {
                write!(f, "/")?;
            }
            for cell in row {
                write!(f, "{}", cell.to_char())?;
            }
        }
        Ok(())
    }
}
