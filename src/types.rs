//! Core types shared across the engine
//!
//! Constants and plain enums/newtypes with no behavior beyond conversions.

use serde::{Deserialize, Serialize};

/// Board dimensions (cells)
pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 20;

/// Fall speed (cells per second) and level scaling
pub const INITIAL_FALL_SPEED: f32 = 1.0;
pub const SPEED_INCREASE_FACTOR: f32 = 0.05;
pub const MAX_FALL_SPEED: f32 = 20.0;

/// Scoring table
pub const POINTS_SINGLE_LINE: u32 = 100;
pub const POINTS_DOUBLE_LINE: u32 = 300;
pub const POINTS_TRIPLE_LINE: u32 = 500;
pub const POINTS_TETRIS: u32 = 800;
pub const POINTS_SOFT_DROP: u32 = 1;
pub const POINTS_HARD_DROP: u32 = 2;
pub const POINTS_COMBO_MULTIPLIER: u32 = 50;

/// Default physical properties for new blocks
pub const BLOCK_DENSITY: f32 = 1.0;
pub const BLOCK_FRICTION: f32 = 0.3;
pub const BLOCK_RESTITUTION: f32 = 0.2;

/// Lobby and queue limits
pub const MAX_PLAYERS: usize = 4;
pub const NEXT_QUEUE_LEN: usize = 3;

/// Mana economy
pub const MAX_MANA: u32 = 100;
pub const MANA_PER_LINE: u32 = 15;

/// Highest-row threshold for an instant RACE win (row index, top = 0)
pub const RACE_VICTORY_ROW: usize = 5;

/// Draw weight for the special kind relative to 1.0 for standard kinds
pub const SPECIAL_BLOCK_WEIGHT: f64 = 0.3;

/// Consecutive adapter failures tolerated before an instance is torn down
pub const MAX_PHYSICS_FAULTS: u32 = 3;

/// Level curve: one level per this many cleared lines
pub const LINES_PER_LEVEL: u32 = 10;

/// Opaque id newtypes, assigned by monotonic counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpellId(pub u8);

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "game-{}", self.0)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player-{}", self.0)
    }
}

/// Block kinds: the seven standard tetrominoes plus the procedural special
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
    Special,
}

impl BlockKind {
    /// The seven standard kinds, in catalog order
    pub const STANDARD: [BlockKind; 7] = [
        BlockKind::I,
        BlockKind::J,
        BlockKind::L,
        BlockKind::O,
        BlockKind::S,
        BlockKind::T,
        BlockKind::Z,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::I => "i",
            BlockKind::J => "j",
            BlockKind::L => "l",
            BlockKind::O => "o",
            BlockKind::S => "s",
            BlockKind::T => "t",
            BlockKind::Z => "z",
            BlockKind::Special => "special",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i" => Some(BlockKind::I),
            "j" => Some(BlockKind::J),
            "l" => Some(BlockKind::L),
            "o" => Some(BlockKind::O),
            "s" => Some(BlockKind::S),
            "t" => Some(BlockKind::T),
            "z" => Some(BlockKind::Z),
            "special" => Some(BlockKind::Special),
            _ => None,
        }
    }
}

/// Rotation states, quarter turns clockwise from spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn cw(self) -> Self {
        match self {
            Rotation::R0 => Rotation::R90,
            Rotation::R90 => Rotation::R180,
            Rotation::R180 => Rotation::R270,
            Rotation::R270 => Rotation::R0,
        }
    }

    pub fn ccw(self) -> Self {
        match self {
            Rotation::R0 => Rotation::R270,
            Rotation::R90 => Rotation::R0,
            Rotation::R180 => Rotation::R90,
            Rotation::R270 => Rotation::R180,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::R0
    }
}

/// Movement directions for player actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Down,
    Up,
}

/// Game modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    Race,
    Puzzle,
    Survival,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Race => "race",
            GameMode::Puzzle => "puzzle",
            GameMode::Survival => "survival",
        }
    }
}

/// Instance lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    Initializing,
    Ready,
    Running,
    Paused,
    GameOver,
    Victory,
}

impl GamePhase {
    /// Terminal states accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, GamePhase::GameOver | GamePhase::Victory)
    }
}

/// Participant lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerPhase {
    Waiting,
    Ready,
    Playing,
    Eliminated,
    Victorious,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_cycle() {
        let mut r = Rotation::R0;
        for _ in 0..4 {
            r = r.cw();
        }
        assert_eq!(r, Rotation::R0);

        assert_eq!(Rotation::R0.ccw(), Rotation::R270);
        assert_eq!(Rotation::R90.degrees(), 90);
    }

    #[test]
    fn test_block_kind_roundtrip() {
        for kind in BlockKind::STANDARD {
            assert_eq!(BlockKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(BlockKind::parse("SPECIAL"), Some(BlockKind::Special));
        assert_eq!(BlockKind::parse("q"), None);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(GamePhase::GameOver.is_terminal());
        assert!(GamePhase::Victory.is_terminal());
        assert!(!GamePhase::Running.is_terminal());
        assert!(!GamePhase::Paused.is_terminal());
    }
}
