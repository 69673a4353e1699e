//! Q-learning agents for generalized tic-tac-toe
//!
//! This crate provides:
//! - N×N boards with a connect-N win rule and optional gravity
//! - Board canonicalization under the eight symmetries of the square
//! - An epsilon-greedy Q-learning agent over a shareable value table
//! - Local (per-table JSON file) and distributed (shared store) persistence
//! - A self-play training pipeline and the `qtoe` CLI

pub mod adapters;
pub mod app;
pub mod cli;
pub mod error;
pub mod identifiers;
pub mod persist;
pub mod pipeline;
pub mod player;
pub mod ports;
pub mod q_learning;
pub mod tictactoe;

pub use error::{Error, ErrorKind, Result};
pub use identifiers::{ActionKey, Coord, StateKey};
pub use player::{Controller, Player};
pub use q_learning::{Outcome, PolicyConfig, QAgent, Rewards, SharedTable, ValueTable};
pub use tictactoe::{Board, Game, GameOutcome, GameSpec, Symbol};
