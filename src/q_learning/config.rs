//! Policy configuration: learning parameters and outcome rewards.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Result of a ply from the agent's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The game goes on after the agent's move
    Alive,
    Win,
    Lose,
    /// Draw
    Cat,
}

impl Outcome {
    pub const ALL: [Outcome; 4] = [Outcome::Alive, Outcome::Win, Outcome::Lose, Outcome::Cat];

    /// Whether the outcome ends the game
    pub fn is_terminal(self) -> bool {
        self != Outcome::Alive
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Alive => "alive",
            Outcome::Win => "win",
            Outcome::Lose => "lose",
            Outcome::Cat => "cat",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Outcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Outcome::ALL
            .into_iter()
            .find(|outcome| outcome.label() == s)
            .ok_or_else(|| Error::UnknownOutcome {
                label: s.to_string(),
            })
    }
}

/// Reward per outcome.
///
/// Losing is penalized far harder than anything else is rewarded, so the
/// policy learns to avoid losses before it learns to win.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rewards {
    pub alive: f64,
    pub win: f64,
    pub lose: f64,
    pub cat: f64,
}

impl Rewards {
    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Alive => self.alive,
            Outcome::Win => self.win,
            Outcome::Lose => self.lose,
            Outcome::Cat => self.cat,
        }
    }

    /// Build from `(label, reward)` pairs; every label must be known and
    /// every outcome covered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOutcome`] for an unrecognized label or
    /// [`Error::InvalidConfiguration`] if an outcome has no reward.
    pub fn from_labels<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Result<Self> {
        let mut values: [Option<f64>; 4] = [None; 4];
        for (label, reward) in pairs {
            let outcome: Outcome = label.parse()?;
            values[outcome as usize] = Some(reward);
        }
        let take = |outcome: Outcome| {
            values[outcome as usize].ok_or_else(|| Error::InvalidConfiguration {
                message: format!("no reward configured for outcome '{outcome}'"),
            })
        };
        Ok(Rewards {
            alive: take(Outcome::Alive)?,
            win: take(Outcome::Win)?,
            lose: take(Outcome::Lose)?,
            cat: take(Outcome::Cat)?,
        })
    }
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            alive: 1.0,
            win: 10.0,
            lose: -1000.0,
            cat: 1.0,
        }
    }
}

/// Learning-rate applied when several clients train one shared table.
pub const SHARED_TRAINING_ALPHA: f64 = 0.3;

/// Learning rate below which training is reported as complete.
pub const ALPHA_EPSILON: f64 = 1e-6;

/// Parameters of the epsilon-greedy Q-learning policy.
///
/// # Examples
///
/// ```
/// use qtoe::q_learning::PolicyConfig;
///
/// let config = PolicyConfig::default()
///     .with_discover(0.1)
///     .with_alpha(0.5)
///     .without_discount();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Probability of exploring at random even when values discriminate
    pub discover: f64,
    /// Step size
    pub alpha: f64,
    /// Weight of the best successor value; `None` selects the single-step rule
    pub discount: Option<f64>,
    /// Multiplicative decay applied to `alpha` after every update
    pub decay: Option<f64>,
    pub rewards: Rewards,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            discover: 0.0,
            alpha: 1.0,
            discount: Some(0.2),
            decay: Some(0.99996),
            rewards: Rewards::default(),
        }
    }
}

impl PolicyConfig {
    pub fn with_discover(mut self, discover: f64) -> Self {
        self.discover = discover;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = Some(discount);
        self
    }

    /// Use the single-step update rule
    pub fn without_discount(mut self) -> Self {
        self.discount = None;
        self
    }

    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = Some(decay);
        self
    }

    pub fn without_decay(mut self) -> Self {
        self.decay = None;
        self
    }

    pub fn with_rewards(mut self, rewards: Rewards) -> Self {
        self.rewards = rewards;
        self
    }

    /// Check every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] naming the first bad parameter.
    pub fn validate(&self) -> Result<()> {
        fn check(name: &str, value: f64, ok: bool, range: &str) -> Result<()> {
            if ok && value.is_finite() {
                Ok(())
            } else {
                Err(Error::InvalidConfiguration {
                    message: format!("{name} = {value} is outside {range}"),
                })
            }
        }

        check("discover", self.discover, (0.0..=1.0).contains(&self.discover), "[0, 1]")?;
        check("alpha", self.alpha, self.alpha > 0.0 && self.alpha <= 1.0, "(0, 1]")?;
        if let Some(discount) = self.discount {
            check("discount", discount, (0.0..=1.0).contains(&discount), "[0, 1]")?;
        }
        if let Some(decay) = self.decay {
            check("decay", decay, decay > 0.0 && decay <= 1.0, "(0, 1]")?;
        }
        for outcome in Outcome::ALL {
            let reward = self.rewards.get(outcome);
            if !reward.is_finite() {
                return Err(Error::InvalidConfiguration {
                    message: format!("reward for '{outcome}' must be finite, got {reward}"),
                });
            }
        }
        Ok(())
    }
}
