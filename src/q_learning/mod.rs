//! Tabular Q-learning over canonicalized board states
//!
//! ## Update rules
//!
//! With a discount factor `γ` (the default):
//!
//! ```text
//! Q(s,a) <- (1 - γ)·Q(s,a) + α·(r + γ·max Q(s',·))
//! ```
//!
//! Without one, the single-step rule bootstraps from the value of the move
//! just chosen:
//!
//! ```text
//! Q(s,a) <- Q(s,a) + α·(r + Q(s',a') - Q(s,a))
//! ```
//!
//! Every stored value is truncated to three decimals.
//!
//! ## Usage Example
//!
//! ```
//! use qtoe::q_learning::{Outcome, PolicyConfig, QAgent, SharedTable};
//! use qtoe::tictactoe::{Board, GameSpec, Symbol};
//!
//! let table = SharedTable::default();
//! let mut agent = QAgent::new(PolicyConfig::default(), table.clone())?.with_seed(7);
//! agent.start(&GameSpec::default(), Symbol::X);
//!
//! let board = Board::empty(3)?;
//! let action = agent.choose(&board, &board.legal_actions(false))?;
//! agent.evaluate_last(Outcome::Win, None);
//! assert!(table.lock().entry_count() >= 1);
//! # let _ = action;
//! # Ok::<(), qtoe::Error>(())
//! ```

pub mod agent;
pub mod config;
pub mod value_table;

pub use agent::{AgentPhase, QAgent, ValueUpdate, truncate_to_thousandths};
pub use config::{ALPHA_EPSILON, Outcome, PolicyConfig, Rewards, SHARED_TRAINING_ALPHA};
pub use value_table::{ActionValues, SharedTable, ValueTable};
