//! Train command - self-play training of Q-learning agents

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};

use crate::{
    app::{App, AppConfig, PersistenceConfig, PlayerConfig, PlayerKind},
    cli::output::{format_number, print_kv, print_section},
    pipeline::{MetricsObserver, ProgressObserver, TrainingResult},
    q_learning::{PolicyConfig, Rewards},
    tictactoe::GameSpec,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PersistMode {
    None,
    Local,
    Distributed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OpponentKind {
    Smart,
    Random,
}

#[derive(Parser, Debug)]
#[command(about = "Train Q-learning agents by self-play", allow_negative_numbers = true)]
pub struct TrainArgs {
    /// JSON config file; other flags override its game and player settings
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Number of training games
    #[arg(long, short = 'g', default_value_t = 1000)]
    pub games: usize,

    /// Board side length
    #[arg(long)]
    pub grid: Option<usize>,

    /// Marks in a row needed to win
    #[arg(long)]
    pub streak: Option<usize>,

    /// Pieces drop to the lowest empty square of their column
    #[arg(long, default_value_t = false)]
    pub gravity: bool,

    /// Who the first learning agent plays against
    #[arg(long, short = 'o', value_enum, default_value = "smart")]
    pub opponent: OpponentKind,

    /// Where learned values are kept
    #[arg(long, value_enum)]
    pub mode: Option<PersistMode>,

    /// Table directory for local persistence
    #[arg(long, default_value = "tables")]
    pub dir: PathBuf,

    /// Shared store file for distributed persistence
    #[arg(long, default_value = "q_store.json")]
    pub store: PathBuf,

    /// Exploration probability
    #[arg(long)]
    pub discover: Option<f64>,

    /// Reward schedule (alive=1,win=10,lose=-1000,cat=1)
    #[arg(long)]
    pub reward: Option<String>,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Hide the progress bar
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,

    /// Write the training result as JSON
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

/// Parse `label=value` pairs separated by commas
pub(crate) fn parse_reward_schedule(raw: &str) -> Result<Rewards> {
    let pairs = raw
        .split(',')
        .map(|pair| {
            let (label, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("Invalid reward '{pair}' (expected label=value)"))?;
            let value: f64 = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid reward value in '{pair}'"))?;
            Ok((label.trim(), value))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Rewards::from_labels(pairs)?)
}

fn build_config(args: &TrainArgs) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };

    if args.grid.is_some() || args.streak.is_some() || args.gravity {
        let grid = args.grid.unwrap_or(config.game.grid);
        let streak = args.streak.unwrap_or(grid.min(config.game.streak));
        config.game =
            GameSpec::new(grid, streak)?.with_gravity(args.gravity || config.game.gravity);
    }

    if args.config.is_none() || args.discover.is_some() || args.reward.is_some() {
        let mut policy = PolicyConfig::default();
        if let Some(discover) = args.discover {
            policy = policy.with_discover(discover);
        }
        if let Some(reward) = &args.reward {
            policy = policy.with_rewards(parse_reward_schedule(reward)?);
        }
        let opponent = match args.opponent {
            OpponentKind::Smart => PlayerConfig::smart(policy.clone()),
            OpponentKind::Random => PlayerConfig::new(PlayerKind::Random),
        };
        config.players = [PlayerConfig::smart(policy), opponent];
    }

    match args.mode {
        Some(PersistMode::None) => config.persistence = PersistenceConfig::None,
        Some(PersistMode::Local) => config.persistence = PersistenceConfig::local(&args.dir),
        Some(PersistMode::Distributed) => {
            config.persistence = PersistenceConfig::distributed(&args.store)
        }
        None => {}
    }

    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    config.validate()?;
    Ok(config)
}

fn print_result(result: &TrainingResult, config: &AppConfig) {
    print_section("Training complete");
    print_kv(
        "Game",
        &format!(
            "{}x{}, {} in a row{}",
            config.game.grid,
            config.game.grid,
            config.game.streak,
            if config.game.gravity { ", gravity" } else { "" }
        ),
    );
    print_kv("Games played", &format_number(result.total_games));
    for (id, wins) in &result.wins_per_player {
        print_kv(&format!("Wins ({id})"), &format_number(*wins));
    }
    print_kv("Cats", &format_number(result.cats));
    if result.stopped_early {
        print_kv("Stopped early", "every agent finished training");
    }
}

pub fn execute(args: TrainArgs) -> Result<()> {
    let config = build_config(&args)?;
    log::info!(
        "training {} games on {} with {:?} persistence",
        args.games,
        config.game.table_name(),
        config.persistence
    );

    let mut session = App::new(config.clone())
        .into_session()
        .context("Failed to set up training session")?;
    let metrics = MetricsObserver::new();
    let handle = metrics.handle();
    session = session.with_observer(Box::new(metrics));
    if !args.no_progress {
        session = session.with_observer(Box::new(ProgressObserver::new()));
    }

    let result = session.run(args.games).context("Training failed")?;
    print_result(&result, &config);
    print_kv(
        "Avg game length",
        &format!("{:.2} moves", handle.summary().avg_game_length()),
    );

    if let Some(path) = &args.summary {
        result
            .save(path)
            .with_context(|| format!("Failed to write summary {}", path.display()))?;
        println!("\nSummary written to {}", path.display());
    }
    Ok(())
}
