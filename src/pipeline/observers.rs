//! Observer implementations for training sessions

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    ports::{Observer, observer::GameSummary},
};

/// Progress bar observer - Shows training progress
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
    wins: BTreeMap<String, usize>,
    cats: usize,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self {
            progress_bar: None,
            wins: BTreeMap::new(),
            cats: 0,
        }
    }

    fn message(&self) -> String {
        let mut parts: Vec<String> = self
            .wins
            .iter()
            .map(|(id, wins)| format!("{id}:{wins}"))
            .collect();
        parts.push(format!("cat:{}", self.cats));
        parts.join(" ")
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ProgressObserver {
    fn on_training_start(&mut self, total_games: usize) -> Result<()> {
        let pb = ProgressBar::new(total_games as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} games ({msg})")
                .map_err(|e| crate::Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_game_end(&mut self, summary: &GameSummary) -> Result<()> {
        match &summary.winner {
            Some(id) => *self.wins.entry(id.clone()).or_default() += 1,
            None => self.cats += 1,
        }
        if let Some(pb) = &self.progress_bar {
            pb.set_position(summary.game_num as u64 + 1);
            pb.set_message(self.message());
        }
        Ok(())
    }

    fn on_training_end(&mut self) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(self.message());
        }
        Ok(())
    }
}

/// Summary of training metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_games: usize,
    pub wins: BTreeMap<String, usize>,
    pub cats: usize,
    pub total_moves: usize,
}

impl MetricsSummary {
    pub fn cat_rate(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            self.cats as f64 / self.total_games as f64
        }
    }

    pub fn win_rate(&self, player: &str) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            self.wins.get(player).copied().unwrap_or(0) as f64 / self.total_games as f64
        }
    }

    pub fn avg_game_length(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            self.total_moves as f64 / self.total_games as f64
        }
    }
}

/// Read side of a [`MetricsObserver`] that stays with the caller after the
/// observer is handed to a session.
#[derive(Debug, Clone, Default)]
pub struct MetricsHandle(Arc<Mutex<MetricsSummary>>);

impl MetricsHandle {
    pub fn summary(&self) -> MetricsSummary {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Metrics observer - Tracks training metrics
#[derive(Debug, Default)]
pub struct MetricsObserver {
    metrics: MetricsHandle,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MetricsHandle {
        self.metrics.clone()
    }
}

impl Observer for MetricsObserver {
    fn on_game_end(&mut self, summary: &GameSummary) -> Result<()> {
        let mut metrics = self.metrics.0.lock().unwrap_or_else(PoisonError::into_inner);
        metrics.total_games += 1;
        metrics.total_moves += summary.moves;
        match &summary.winner {
            Some(id) => *metrics.wins.entry(id.clone()).or_default() += 1,
            None => metrics.cats += 1,
        }
        Ok(())
    }
}
