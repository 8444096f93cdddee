//! Scoring - line-clear table, combo bonus, drop points, level curve

use crate::types::*;

/// Score for a single line-clearing placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreResult {
    pub base: u32,
    pub combo_bonus: u32,
    pub total: u32,
}

/// Calculate the score for clearing `lines` with the given combo count.
///
/// 1 line = 100, 2 = 300, 3 = 500, 4+ = 800, plus `combo * 50`.
pub fn line_clear_score(lines: usize, combo: u32) -> ScoreResult {
    let base = match lines {
        0 => 0,
        1 => POINTS_SINGLE_LINE,
        2 => POINTS_DOUBLE_LINE,
        3 => POINTS_TRIPLE_LINE,
        _ => POINTS_TETRIS,
    };
    let combo_bonus = if base > 0 {
        combo * POINTS_COMBO_MULTIPLIER
    } else {
        0
    };
    ScoreResult {
        base,
        combo_bonus,
        total: base + combo_bonus,
    }
}

/// Scale a score by an active multiplier effect, truncating toward zero.
pub fn apply_multiplier(score: u32, strength: f32) -> u32 {
    (score as f32 * strength) as u32
}

/// Drop points: hard drops pay per cell fallen, soft drops per call.
pub fn drop_score(cells: u32, hard: bool) -> u32 {
    if hard {
        cells * POINTS_HARD_DROP
    } else {
        POINTS_SOFT_DROP
    }
}

/// Level from total cleared lines: one level per ten lines, starting at 1.
pub fn level_for_lines(total_lines: u32) -> u32 {
    total_lines / LINES_PER_LEVEL + 1
}
