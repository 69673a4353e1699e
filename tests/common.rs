//! Common test utilities for the qtoe test suite.

#![allow(dead_code)]

use qtoe::{
    ActionKey, Board, PolicyConfig, QAgent, SharedTable, Symbol,
    tictactoe::{GameSpec, symmetry::hash_board},
};

/// Parse a list of action keys
pub fn keys(raw: &[&str]) -> Vec<ActionKey> {
    raw.iter().map(|s| ActionKey::from(*s)).collect()
}

/// Agent bound to a 3×3 game as X
pub fn started_agent(config: PolicyConfig, table: SharedTable, seed: u64) -> QAgent {
    started_agent_on(GameSpec::default(), config, table, seed)
}

pub fn started_agent_on(
    spec: GameSpec,
    config: PolicyConfig,
    table: SharedTable,
    seed: u64,
) -> QAgent {
    let mut agent = QAgent::new(config, table)
        .expect("valid policy")
        .with_seed(seed);
    agent.start(&spec, Symbol::X);
    agent
}

/// Single-step update rule, no decay
pub fn single_step() -> PolicyConfig {
    PolicyConfig::default().without_discount().without_decay()
}

/// Key of `board` from X's point of view
pub fn x_key(board: &str) -> qtoe::StateKey {
    hash_board(&Board::parse(board).expect("valid board"), Symbol::X)
}
