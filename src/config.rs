//! Instance configuration
//!
//! Defaults mirror the engine constants in `types`; the two toggles cover
//! behavior the rules leave open (cooldown enforcement and the puzzle
//! completion trigger).

use serde::{Deserialize, Serialize};

use crate::types::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub board_width: usize,
    pub board_height: usize,
    pub base_fall_speed: f32,
    pub speed_increase_factor: f32,
    pub max_fall_speed: f32,
    pub max_players: usize,
    /// Row index at or above which a RACE tower wins instantly.
    pub race_victory_row: usize,
    /// When true, `cast_spell` refuses a spell still on cooldown for the
    /// caster. Off by default: every spell carries a cooldown value but
    /// enforcement is opt-in.
    pub enforce_spell_cooldowns: bool,
    /// PUZZLE completion trigger: a playing player reaching this many
    /// cleared lines ends the game. `None` means puzzle games only end on
    /// an explicit `end` call.
    pub puzzle_target_lines: Option<u32>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_width: BOARD_WIDTH,
            board_height: BOARD_HEIGHT,
            base_fall_speed: INITIAL_FALL_SPEED,
            speed_increase_factor: SPEED_INCREASE_FACTOR,
            max_fall_speed: MAX_FALL_SPEED,
            max_players: MAX_PLAYERS,
            race_victory_row: RACE_VICTORY_ROW,
            enforce_spell_cooldowns: false,
            puzzle_target_lines: None,
        }
    }
}

impl GameConfig {
    /// Fall speed for a given level, clamped to the configured ceiling.
    pub fn fall_speed(&self, level: u32) -> f32 {
        let speed = self.base_fall_speed * level as f32 * self.speed_increase_factor;
        speed.min(self.max_fall_speed)
    }
}
