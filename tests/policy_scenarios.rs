//! Behavioural scenarios for the Q-learning policy

mod common;

use std::collections::HashMap;

use common::{keys, single_step, started_agent, x_key};
use qtoe::{
    ActionKey, Board, Error, ErrorKind, GameSpec, Outcome, PolicyConfig, SharedTable, Symbol,
    ValueTable,
    q_learning::{AgentPhase, Rewards, truncate_to_thousandths},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Count how often each option is picked over `trials` independent
/// decisions on the same position.
fn pick_counts(
    config: PolicyConfig,
    table: SharedTable,
    board: &Board,
    options: &[ActionKey],
    trials: usize,
) -> HashMap<ActionKey, usize> {
    let spec = GameSpec::default();
    let mut agent = started_agent(config, table, 2024);
    let mut counts = HashMap::new();
    for _ in 0..trials {
        let choice = agent.choose(board, options).unwrap();
        *counts.entry(choice).or_insert(0) += 1;
        // Rebind so the next decision does not reward this one
        agent.stop();
        agent.start(&spec, Symbol::X);
    }
    counts
}

fn chi_squared_uniform(counts: &HashMap<ActionKey, usize>, options: &[ActionKey], n: usize) -> f64 {
    let expected = n as f64 / options.len() as f64;
    options
        .iter()
        .map(|option| {
            let observed = counts.get(option).copied().unwrap_or(0) as f64;
            (observed - expected).powi(2) / expected
        })
        .sum()
}

#[test]
fn test_tied_empty_table_is_not_deterministic() {
    let board = Board::empty(3).unwrap();
    let options = keys(&["0|0", "1|1", "2|2"]);
    let counts = pick_counts(
        single_step().with_discover(0.0),
        SharedTable::default(),
        &board,
        &options,
        300,
    );
    assert!(counts.len() > 1, "tied values must be broken at random: {counts:?}");
    assert!(counts.keys().all(|k| options.contains(k)));
}

#[test]
fn test_full_exploration_is_uniform() {
    const N: usize = 10_000;
    let board = Board::empty(3).unwrap();
    let options = keys(&["0|0", "1|1", "2|2"]);
    let critical = ChiSquared::new((options.len() - 1) as f64)
        .unwrap()
        .inverse_cdf(0.999);

    // Tied values
    let counts = pick_counts(
        single_step().with_discover(1.0),
        SharedTable::default(),
        &board,
        &options,
        N,
    );
    let statistic = chi_squared_uniform(&counts, &options, N);
    assert!(statistic < critical, "chi2 = {statistic}, critical = {critical}");

    // Discriminating values are ignored when exploring every time
    let mut values = ValueTable::new();
    let key = x_key(".../.../...");
    values.set(&key, &ActionKey::from("0|0"), 50.0);
    values.set(&key, &ActionKey::from("1|1"), -5.0);
    values.set(&key, &ActionKey::from("2|2"), 0.0);
    let counts = pick_counts(
        single_step().with_discover(1.0),
        SharedTable::new(values),
        &board,
        &options,
        N,
    );
    let statistic = chi_squared_uniform(&counts, &options, N);
    assert!(statistic < critical, "chi2 = {statistic}, critical = {critical}");
}

#[test]
fn test_prepopulated_best_action_is_chosen() {
    let mut values = ValueTable::new();
    let key = x_key(".../.../...");
    values.set(&key, &ActionKey::from("0|0"), 5.0);
    values.set(&key, &ActionKey::from("1|1"), 0.0);
    values.set(&key, &ActionKey::from("2|2"), 0.0);

    let board = Board::empty(3).unwrap();
    let options = keys(&["0|0", "1|1", "2|2"]);
    let counts = pick_counts(
        single_step().with_discover(0.0),
        SharedTable::new(values),
        &board,
        &options,
        200,
    );
    assert_eq!(counts.get(&ActionKey::from("0|0")), Some(&200));
}

#[test]
fn test_single_step_win_update() {
    let table = SharedTable::default();
    let config = single_step().with_alpha(1.0).with_rewards(Rewards {
        win: 10.0,
        ..Rewards::default()
    });
    let mut agent = started_agent(config, table.clone(), 1);

    let board = Board::empty(3).unwrap();
    let choice = agent.choose(&board, &keys(&["2|1"])).unwrap();
    let update = agent.evaluate_last(Outcome::Win, None).unwrap();

    assert_eq!(update.previous, 0.0);
    assert_eq!(update.value, 10.0);
    assert_eq!(table.lock().get(x_key(".../.../...").as_str(), choice.as_str()), Some(10.0));
    assert_eq!(agent.phase(), AgentPhase::AwaitingTurn);
}

#[test]
fn test_updates_match_formula_truncated() {
    let mut rng = StdRng::seed_from_u64(77);
    for _ in 0..200 {
        let alpha = rng.random_range(0.01..=1.0);
        let discount = rng.random_range(0.0..=1.0);
        let prior = rng.random_range(-50.0..50.0_f64);
        let next_best = rng.random_range(-50.0..50.0_f64);
        let rewards = Rewards {
            alive: rng.random_range(-5.0..5.0),
            win: rng.random_range(0.0..20.0),
            lose: rng.random_range(-2000.0..0.0),
            cat: rng.random_range(-5.0..5.0),
        };
        let config = PolicyConfig::default()
            .with_alpha(alpha)
            .with_discount(discount)
            .without_decay()
            .with_rewards(rewards);

        let mut values = ValueTable::new();
        let start = x_key(".../.../...");
        values.set(&start, &ActionKey::from("1|1"), prior);
        let next = Board::parse("o../.x./...").unwrap();
        values.set(&x_key("o../.x./..."), &ActionKey::from("2|2"), next_best);
        values.set(&x_key("o../.x./..."), &ActionKey::from("2|0"), next_best - 1.0);

        let mut agent = started_agent(config, SharedTable::new(values), 3);
        agent.choose(&Board::empty(3).unwrap(), &keys(&["1|1"])).unwrap();
        let update = agent.evaluate_last(Outcome::Alive, Some(&next)).unwrap();

        let raw = (1.0 - discount) * prior + alpha * (rewards.alive + discount * next_best);
        assert!(update.value.is_finite());
        assert_eq!(update.value, truncate_to_thousandths(raw));
        assert!((update.value - raw).abs() < 1e-3);
    }
}

#[test]
fn test_empty_options_is_configuration_error() {
    let mut agent = started_agent(PolicyConfig::default(), SharedTable::default(), 1);
    let err = agent.choose(&Board::empty(3).unwrap(), &[]).unwrap_err();
    assert!(matches!(err, Error::EmptyOptions));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_unknown_outcome_label_rejected() {
    assert!(matches!(
        "tie".parse::<Outcome>(),
        Err(Error::UnknownOutcome { .. })
    ));
    let bad = r#"{"rewards": {"alive": 1, "win": 10, "lost": -1000, "cat": 1}}"#;
    assert!(serde_json::from_str::<PolicyConfig>(bad).is_err());
}

#[test]
fn test_evaluate_before_choose_is_noop() {
    let table = SharedTable::default();
    let mut agent = started_agent(PolicyConfig::default(), table.clone(), 1);
    for outcome in Outcome::ALL {
        assert!(agent.evaluate_last(outcome, None).is_none());
    }
    assert!(table.lock().is_empty());
}

#[test]
fn test_cooperating_agents_see_each_others_updates() {
    let table = SharedTable::default();
    let mut first = started_agent(single_step(), table.clone(), 1);
    let mut second = started_agent(single_step(), table.clone(), 2);

    first.choose(&Board::empty(3).unwrap(), &keys(&["1|1"])).unwrap();
    first.evaluate_last(Outcome::Win, None).unwrap();

    // The second agent exploits what the first learned
    let choice = second
        .choose(&Board::empty(3).unwrap(), &keys(&["0|0", "1|1", "2|2"]))
        .unwrap();
    assert_eq!(choice, "1|1");
}

#[test]
fn test_returned_action_is_in_real_coordinates() {
    let table = SharedTable::default();
    let mut agent = started_agent(single_step().with_discover(0.5), table, 9);
    let mut rng = StdRng::seed_from_u64(9);

    let mut board = Board::empty(3).unwrap();
    for _ in 0..4 {
        let options = board.legal_actions(false);
        let choice = agent.choose(&board, &options).unwrap();
        assert!(options.contains(&choice));
        board.place(choice.coord().unwrap(), Symbol::X).unwrap();

        let replies = board.legal_actions(false);
        let reply = &replies[rng.random_range(0..replies.len())];
        board.place(reply.coord().unwrap(), Symbol::O).unwrap();
    }
}
