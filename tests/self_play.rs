//! Whole games between computer players

mod common;

use qtoe::{
    Game, GameOutcome, GameSpec, Player, PolicyConfig, QAgent, SharedTable, ValueTable,
    persist::CancelToken,
    pipeline::{MetricsObserver, TrainingSession},
};

fn smart_pair(table: &SharedTable, config: PolicyConfig, seed: u64) -> [Player; 2] {
    let agent = |n: u64| {
        QAgent::new(config.clone(), table.clone())
            .unwrap()
            .with_seed(seed + n)
    };
    [Player::smart(1, agent(1)), Player::smart(2, agent(2))]
}

/// Every stored entry is a legal move on its own canonical board
fn assert_well_formed(table: &ValueTable, size: usize) {
    assert!(!table.is_empty());
    for (state, actions) in table.iter() {
        let cells: Vec<char> = state.as_str().chars().collect();
        assert_eq!(cells.len(), size * size, "bad key {state}");
        assert!(cells.iter().all(|c| matches!(c, 'a' | 'b' | '0')), "bad key {state}");

        for (action, value) in actions {
            assert!(value.is_finite(), "{state} / {action} = {value}");
            let coord = action.coord().unwrap();
            assert!(coord.x < size && coord.y < size);
            assert_eq!(
                cells[coord.y * size + coord.x],
                '0',
                "{action} is occupied in {state}"
            );
        }
    }
}

#[test]
fn test_self_play_keeps_table_well_formed() {
    let table = SharedTable::default();
    let spec = GameSpec::default();
    let config = PolicyConfig::default().with_discover(0.1);
    let mut game = Game::new(spec, smart_pair(&table, config, 100))
        .unwrap()
        .with_seed(5)
        .unwrap();

    for _ in 0..300 {
        let outcome = game.play_episode().unwrap();
        assert!(game.is_over());
        if let GameOutcome::Winner(symbol) = outcome {
            assert!(game.players().iter().any(|p| p.symbol() == Some(symbol)));
        } else {
            assert!(game.board().is_full());
        }
    }
    assert_eq!(game.total_games(), 300);
    assert_well_formed(&table.snapshot(), 3);
}

#[test]
fn test_single_step_self_play_on_gravity_board() {
    let table = SharedTable::default();
    let spec = GameSpec::new(4, 3).unwrap().with_gravity(true);
    let config = common::single_step().with_discover(0.2);
    let mut game = Game::new(spec, smart_pair(&table, config, 7))
        .unwrap()
        .with_seed(8)
        .unwrap();

    for _ in 0..100 {
        game.play_episode().unwrap();
        // Gravity fills columns from the bottom row up
        let rows = game.board().rows();
        for y in 0..rows.len() - 1 {
            for x in 0..rows.len() {
                if !rows[y][x].is_empty() {
                    assert!(!rows[y + 1][x].is_empty(), "floating mark at {x}|{y}");
                }
            }
        }
    }
    assert_well_formed(&table.snapshot(), 4);
}

#[test]
fn test_session_tallies_every_game() {
    let table = SharedTable::default();
    let game = Game::new(
        GameSpec::default(),
        [
            Player::smart(
                1,
                QAgent::new(PolicyConfig::default(), table.clone())
                    .unwrap()
                    .with_seed(1),
            ),
            Player::random(2),
        ],
    )
    .unwrap()
    .with_seed(3)
    .unwrap();

    let metrics = MetricsObserver::new();
    let handle = metrics.handle();
    let mut session =
        TrainingSession::new(game, CancelToken::new()).with_observer(Box::new(metrics));
    let result = session.run(200).unwrap();

    assert_eq!(result.total_games, 200);
    assert!(!result.stopped_early);
    let wins: usize = result.wins_per_player.values().sum();
    assert_eq!(wins + result.cats, 200);

    let summary = handle.summary();
    assert_eq!(summary.total_games, 200);
    assert_eq!(summary.cats, result.cats);
    assert!(summary.avg_game_length() >= 5.0 && summary.avg_game_length() <= 9.0);
}

#[test]
fn test_training_stops_once_alpha_decays() {
    let table = SharedTable::default();
    let config = PolicyConfig::default().with_decay(0.5);
    let game = Game::new(GameSpec::default(), smart_pair(&table, config, 40))
        .unwrap()
        .with_seed(41)
        .unwrap();

    let mut session = TrainingSession::new(game, CancelToken::new());
    let result = session.run(1_000).unwrap();
    assert!(result.stopped_early);
    assert!(result.total_games < 1_000);
    assert!(session
        .game()
        .players()
        .iter()
        .filter_map(|p| p.agent())
        .all(|agent| agent.is_training_complete()));
}
