//! Connect-N line analysis

use super::{Board, Symbol};
use crate::identifiers::Coord;

/// Step directions checked from every occupied square: right, down and the
/// two downward diagonals. Upward directions are covered by starting from
/// the other end of the line.
const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (-1, 1)];

/// Utility for analyzing winning lines on an N×N board
pub struct LineAnalyzer;

impl LineAnalyzer {
    /// Find the mark holding `streak` equal squares in a row, if any
    pub fn winner(board: &Board, streak: usize) -> Option<Symbol> {
        if streak == 0 {
            return None;
        }
        let size = board.size();
        for y in 0..size {
            for x in 0..size {
                let Some(symbol) = board.rows()[y][x].symbol() else {
                    continue;
                };
                if DIRECTIONS
                    .iter()
                    .any(|&dir| Self::run_from(board, Coord::new(x, y), dir, streak, symbol))
                {
                    return Some(symbol);
                }
            }
        }
        None
    }

    /// Check whether a symbol has won
    pub fn has_won(board: &Board, streak: usize, symbol: Symbol) -> bool {
        Self::winner(board, streak) == Some(symbol)
    }

    fn run_from(
        board: &Board,
        start: Coord,
        (dx, dy): (isize, isize),
        streak: usize,
        symbol: Symbol,
    ) -> bool {
        (0..streak as isize).all(|step| {
            let x = start.x as isize + dx * step;
            let y = start.y as isize + dy * step;
            x >= 0
                && y >= 0
                && board.get(Coord::new(x as usize, y as usize)) == Some(symbol.to_cell())
        })
    }
}
