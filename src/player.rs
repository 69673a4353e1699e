//! Players: a mark, a score card, and whoever picks the moves.

use std::fmt;

use log::warn;
use rand::{Rng, seq::IndexedRandom};

use crate::{
    ErrorKind, Result,
    identifiers::ActionKey,
    q_learning::{Outcome, QAgent},
    tictactoe::{Board, GameSpec, Symbol},
};

/// Who picks a player's moves
#[derive(Debug)]
pub enum Controller {
    /// Moves arrive through [`crate::tictactoe::Game::select_square`]
    Human,
    /// Uniformly random legal moves
    Random,
    /// Learning agent
    Smart(Box<QAgent>),
}

impl Controller {
    pub fn label(&self) -> &'static str {
        match self {
            Controller::Human => "human",
            Controller::Random => "random",
            Controller::Smart(_) => "smart",
        }
    }
}

#[derive(Debug)]
pub struct Player {
    id: String,
    symbol: Option<Symbol>,
    controller: Controller,
    wins: u64,
    total: u64,
}

impl Player {
    pub fn new(id: impl Into<String>, controller: Controller) -> Self {
        Self {
            id: id.into(),
            symbol: None,
            controller,
            wins: 0,
            total: 0,
        }
    }

    /// Human player `p{n}`
    pub fn human(n: usize) -> Self {
        Self::new(format!("p{n}"), Controller::Human)
    }

    /// Random player `p{n}`
    pub fn random(n: usize) -> Self {
        Self::new(format!("p{n}"), Controller::Random)
    }

    /// Learning player `smart{n}`
    pub fn smart(n: usize, agent: QAgent) -> Self {
        Self::new(format!("smart{n}"), Controller::Smart(Box::new(agent)))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn symbol(&self) -> Option<Symbol> {
        self.symbol
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn agent(&self) -> Option<&QAgent> {
        match &self.controller {
            Controller::Smart(agent) => Some(agent),
            _ => None,
        }
    }

    pub fn agent_mut(&mut self) -> Option<&mut QAgent> {
        match &mut self.controller {
            Controller::Smart(agent) => Some(agent),
            _ => None,
        }
    }

    pub fn wins(&self) -> u64 {
        self.wins
    }

    /// Games finished
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_human(&self) -> bool {
        matches!(self.controller, Controller::Human)
    }

    /// Hand a human seat to the random mover or take it back. Smart
    /// players are left alone.
    pub fn toggle_computer(&mut self) {
        self.controller = match std::mem::replace(&mut self.controller, Controller::Human) {
            Controller::Human => Controller::Random,
            Controller::Random => Controller::Human,
            smart @ Controller::Smart(_) => smart,
        };
    }

    /// Take a mark for the next game
    pub fn start(&mut self, game: &GameSpec, symbol: Symbol) {
        self.symbol = Some(symbol);
        if let Controller::Smart(agent) = &mut self.controller {
            agent.start(game, symbol);
        }
    }

    /// Pick a move, `None` when the player has nothing to offer unattended.
    ///
    /// State errors from the agent are logged and swallowed; anything else
    /// propagates.
    pub fn play<R: Rng + ?Sized>(
        &mut self,
        board: &Board,
        options: &[ActionKey],
        rng: &mut R,
    ) -> Result<Option<ActionKey>> {
        match &mut self.controller {
            Controller::Human => Ok(None),
            Controller::Random => Ok(options.choose(rng).cloned()),
            Controller::Smart(agent) => match agent.choose(board, options) {
                Ok(action) => Ok(Some(action)),
                Err(err) if err.kind() == ErrorKind::State => {
                    warn!("{}: ignoring agent error: {err}", self.id);
                    Ok(None)
                }
                Err(err) => Err(err),
            },
        }
    }

    /// Score the finished game and pass the terminal reward to the agent.
    pub fn on_game_over(&mut self, outcome: Outcome) {
        self.total += 1;
        if outcome == Outcome::Win {
            self.wins += 1;
        }
        if let Controller::Smart(agent) = &mut self.controller {
            agent.evaluate_last(outcome, None);
        }
    }

    pub fn stop(&mut self) {
        if let Controller::Smart(agent) = &mut self.controller {
            agent.stop();
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol {
            Some(symbol) => write!(f, "{} ({}, {})", self.id, self.controller.label(), symbol),
            None => write!(f, "{} ({})", self.id, self.controller.label()),
        }
    }
}
