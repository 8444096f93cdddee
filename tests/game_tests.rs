//! Game instance and registry tests through the public API

use std::time::Duration;

use towers_core::core::scoring::{apply_multiplier, line_clear_score};
use towers_core::types::{BOARD_HEIGHT, MAX_MANA};
use towers_core::{
    Direction, GameConfig, GameId, GameInstance, GameMode, GamePhase, GameRegistry,
    GameSnapshot, InMemoryPhysics, PlayerId, PlayerPhase,
};

fn fresh_game(mode: GameMode) -> GameInstance {
    GameInstance::new(
        GameId(1),
        mode,
        GameConfig::default(),
        Box::new(InMemoryPhysics::new()),
        0xC0FFEE,
    )
}

fn started_game(mode: GameMode, players: usize) -> (GameInstance, Vec<PlayerId>) {
    let mut game = fresh_game(mode);
    let ids: Vec<PlayerId> = (0..players)
        .map(|i| game.add_player(format!("player{i}"), None).unwrap())
        .collect();
    for &id in &ids {
        assert!(game.set_ready(id, true));
    }
    assert!(game.start());
    (game, ids)
}

#[test]
fn test_lifecycle_emits_traces_under_a_subscriber() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter("towers_core=debug")
        .with_test_writer()
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (mut game, ids) = started_game(GameMode::Survival, 2);
    game.drop_block(ids[0], true);
    game.update(0.05);
    game.end();
    assert_eq!(game.phase(), GamePhase::GameOver);
}

#[test]
fn test_lifecycle_ready_running_paused_over() {
    let mut game = fresh_game(GameMode::Survival);
    assert_eq!(game.phase(), GamePhase::Ready);

    let a = game.add_player("a", None).unwrap();
    let b = game.add_player("b", None).unwrap();
    assert!(!game.start(), "start without readiness must refuse");

    game.set_ready(a, true);
    game.set_ready(b, true);
    assert!(game.start());
    assert_eq!(game.phase(), GamePhase::Running);
    assert!(game.player(a).unwrap().is_playing());

    assert!(game.pause());
    assert_eq!(game.phase(), GamePhase::Paused);
    assert!(!game.pause(), "pause is not reentrant");
    assert!(game.resume());

    game.end();
    assert_eq!(game.phase(), GamePhase::GameOver);
    assert!(!game.resume(), "terminal states accept no transitions");
    assert!(!game.start());
}

#[test]
fn test_combo_scoring_progression() {
    // 1, 2, 3, 4 lines on consecutive placements: base points per the
    // table, plus 50 per combo step already accumulated.
    let mut combo = 0;
    let expected = [100, 300 + 50, 500 + 100, 800 + 150];
    for (lines, want) in (1..=4).zip(expected) {
        let result = line_clear_score(lines, combo);
        assert_eq!(result.total, want, "{lines} lines at combo {combo}");
        combo += 1;
    }
    // A placement without a clear resets the chain.
    assert_eq!(line_clear_score(0, combo).total, 0);
    assert_eq!(line_clear_score(1, 0).total, 100);
}

#[test]
fn test_multiplier_truncates_fractional_scores() {
    assert_eq!(apply_multiplier(100, 1.5), 150);
    assert_eq!(apply_multiplier(125, 1.5), 187);
    assert_eq!(apply_multiplier(0, 3.0), 0);
}

#[test]
fn test_hard_drop_lands_on_the_floor() {
    let (mut game, ids) = started_game(GameMode::Survival, 2);
    assert!(game.drop_block(ids[0], true));

    let board = game.board(ids[0]).unwrap();
    assert_eq!(board.block_count(), 1);
    let bottom = board
        .blocks()
        .flat_map(|b| b.cells())
        .map(|(_, y)| y)
        .max()
        .unwrap();
    assert_eq!(bottom, BOARD_HEIGHT as i32 - 1);

    // Score is twice the distance travelled, and the next block is dealt.
    let player = game.player(ids[0]).unwrap();
    assert!(player.score >= 2);
    assert_eq!(player.score % 2, 0);
    assert!(player.current_block.is_some());
}

#[test]
fn test_moves_only_apply_to_playing_players() {
    let mut game = fresh_game(GameMode::Survival);
    let a = game.add_player("a", None).unwrap();
    // Not started yet: every action refuses.
    assert!(!game.move_block(a, Direction::Left));
    assert!(!game.rotate_block(a, true));
    assert!(!game.drop_block(a, true));
    assert!(!game.move_block(PlayerId(99), Direction::Left));
}

#[test]
fn test_casting_needs_mana_and_inventory() {
    let (mut game, ids) = started_game(GameMode::Survival, 2);
    let caster = ids[0];
    let spell = game.player(caster).unwrap().spells[0].clone();

    assert!(!game.cast_spell(caster, spell.id, ids[1]), "no mana yet");

    assert!(game.award_mana(caster, MAX_MANA));
    // A spell id from the other catalog is not in this caster's inventory.
    let foreign = towers_core::types::SpellId(spell.id.0.wrapping_add(4));
    assert!(!game.cast_spell(caster, foreign, ids[1]));

    assert!(game.cast_spell(caster, spell.id, ids[1]));
    assert_eq!(game.active_spells().len(), 1);
    assert_eq!(
        game.player(caster).unwrap().mana,
        MAX_MANA - spell.mana_cost
    );
}

#[test]
fn test_spells_expire_after_their_duration() {
    let (mut game, ids) = started_game(GameMode::Survival, 2);
    game.award_mana(ids[0], MAX_MANA);
    let spell = game.player(ids[0]).unwrap().spells[0].clone();
    assert!(game.cast_spell(ids[0], spell.id, ids[1]));

    game.update(0.1);
    assert_eq!(game.active_spells().len(), 1);
    game.update(spell.duration as f32 + 1.0);
    assert!(game.active_spells().is_empty());
}

#[test]
fn test_physics_fault_budget_is_fatal_for_the_instance() {
    let mut physics = InMemoryPhysics::new();
    physics.fail_next_calls(towers_core::types::MAX_PHYSICS_FAULTS);
    let mut game = GameInstance::new(
        GameId(3),
        GameMode::Survival,
        GameConfig::default(),
        Box::new(physics),
        1,
    );
    let a = game.add_player("a", None).unwrap();
    let b = game.add_player("b", None).unwrap();
    game.set_ready(a, true);
    game.set_ready(b, true);
    assert!(game.start());

    game.update(0.05);
    assert!(game.is_faulted());
    assert_eq!(game.phase(), GamePhase::GameOver);
    // A torn-down instance ignores further driving.
    game.update(0.05);
    assert!(!game.drop_block(a, true));
}

#[test]
fn test_race_victory_row() {
    let mut config = GameConfig::default();
    config.race_victory_row = BOARD_HEIGHT - 1;
    let mut game = GameInstance::new(
        GameId(5),
        GameMode::Race,
        config,
        Box::new(InMemoryPhysics::new()),
        2,
    );
    let a = game.add_player("a", None).unwrap();
    let b = game.add_player("b", None).unwrap();
    game.set_ready(a, true);
    game.set_ready(b, true);
    assert!(game.start());

    // With the victory row at the floor, the first landed block wins.
    assert!(game.drop_block(a, true));
    game.update(0.01);
    assert_eq!(game.phase(), GamePhase::Victory);
    assert_eq!(game.player(a).unwrap().phase, PlayerPhase::Victorious);
}

#[test]
fn test_puzzle_target_lines_config() {
    let mut config = GameConfig::default();
    config.puzzle_target_lines = Some(0);
    let mut game = GameInstance::new(
        GameId(6),
        GameMode::Puzzle,
        config,
        Box::new(InMemoryPhysics::new()),
        2,
    );
    let a = game.add_player("a", None).unwrap();
    game.set_ready(a, true);
    assert!(game.start());

    // Target of zero lines is met immediately on the first tick; the game
    // closes and the most efficient (here, only) player wins.
    game.update(0.01);
    assert_eq!(game.phase(), GamePhase::GameOver);
    assert_eq!(game.player(a).unwrap().phase, PlayerPhase::Victorious);
}

#[test]
fn test_registry_hosts_independent_games() {
    let mut registry = GameRegistry::new();
    let first = registry.create_game(
        GameMode::Survival,
        GameConfig::default(),
        Box::new(InMemoryPhysics::new()),
        1,
    );
    let second = registry.create_game(
        GameMode::Race,
        GameConfig::default(),
        Box::new(InMemoryPhysics::new()),
        2,
    );
    assert_ne!(first, second);

    registry.get(first).unwrap().lock().add_player("a", None).unwrap();
    assert_eq!(registry.get(first).unwrap().lock().player_count(), 1);
    assert_eq!(registry.get(second).unwrap().lock().player_count(), 0);

    let summaries = registry.summaries();
    assert_eq!(summaries.len(), 2);
    assert!(registry.remove(second).is_ok());
    assert!(registry.remove(second).is_err());
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_registry_tick_drives_running_games() {
    let mut registry = GameRegistry::new();
    let id = registry.create_game(
        GameMode::Survival,
        GameConfig::default(),
        Box::new(InMemoryPhysics::new()),
        8,
    );
    {
        let handle = registry.get(id).unwrap();
        let mut game = handle.lock();
        let a = game.add_player("a", None).unwrap();
        let b = game.add_player("b", None).unwrap();
        game.set_ready(a, true);
        game.set_ready(b, true);
        assert!(game.start());
    }
    std::thread::sleep(Duration::from_millis(5));
    registry.tick_all();
    assert!(registry.get(id).unwrap().lock().current_time() > 0.0);
}

#[test]
fn test_registry_cleanup_reclaims_finished_games() {
    let mut registry = GameRegistry::new();
    let id = registry.create_game(
        GameMode::Survival,
        GameConfig::default(),
        Box::new(InMemoryPhysics::new()),
        8,
    );
    {
        let handle = registry.get(id).unwrap();
        let mut game = handle.lock();
        let a = game.add_player("a", None).unwrap();
        game.set_ready(a, true);
        assert!(game.start());
        game.end();
    }
    std::thread::sleep(Duration::from_millis(2));
    assert_eq!(registry.cleanup(Duration::from_millis(1)), 1);
    assert!(registry.get(id).is_none());
}

#[test]
fn test_snapshot_round_trip_and_restore() {
    let (mut game, ids) = started_game(GameMode::Survival, 2);
    game.drop_block(ids[0], true);
    game.move_block(ids[1], Direction::Right);
    game.update(0.25);

    let json = game.snapshot().to_json().unwrap();
    let decoded = GameSnapshot::from_json(&json).unwrap();
    assert_eq!(decoded.instance_id, game.id());
    assert_eq!(decoded.players.len(), 2);

    let mut restored =
        GameInstance::restore(decoded, Box::new(InMemoryPhysics::new()), 77).unwrap();
    assert_eq!(restored.phase(), GamePhase::Running);
    assert_eq!(
        restored.player(ids[0]).unwrap().blocks_placed,
        game.player(ids[0]).unwrap().blocks_placed
    );
    assert_eq!(
        restored.board(ids[0]).unwrap().occupied_cells(),
        game.board(ids[0]).unwrap().occupied_cells()
    );
    // The restored instance keeps playing.
    assert!(restored.drop_block(ids[1], true));
}

#[test]
fn test_gravity_advances_the_falling_block() {
    let (mut game, ids) = started_game(GameMode::Survival, 2);
    let y0 = game
        .player(ids[0])
        .unwrap()
        .current_block
        .as_ref()
        .unwrap()
        .position
        .y;
    for _ in 0..20 {
        game.update(0.5);
    }
    let y1 = game
        .player(ids[0])
        .unwrap()
        .current_block
        .as_ref()
        .unwrap()
        .position
        .y;
    assert!(y1 > y0, "gravity should pull the block down over ticks");
}
