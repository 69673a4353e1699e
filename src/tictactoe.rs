//! Tic-tac-toe on an N×N grid with a connect-N win rule

pub mod board;
pub mod game;
pub mod lines;
pub mod symmetry;

pub use board::{Board, Cell, Symbol};
pub use game::{Game, GameOutcome, GameSpec, TurnResult, evaluate};
pub use lines::LineAnalyzer;
pub use symmetry::{KnownStates, Mutation, Transform, canonicalize, hash_board, locate};
