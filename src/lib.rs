//! Tetris Towers simulation engine.
//!
//! Server-side core for a realtime multiplayer falling-block game: block
//! geometry with wall-kick rotation, per-player boards, a light/dark spell
//! system, pluggable opponents, a physics adapter port for cosmetic body
//! simulation, and a registry that hosts many concurrent game instances.
//!
//! The crate is transport-agnostic. A network layer drives it through
//! [`registry::GameRegistry`] and the instance action API, and persists
//! games through [`game::snapshot::GameSnapshot`].

pub mod ai;
pub mod config;
pub mod core;
pub mod error;
pub mod game;
pub mod physics;
pub mod player;
pub mod registry;
pub mod spell;
pub mod types;

pub use ai::{Opponent, OpponentAction, OpponentKind, OpponentView};
pub use config::GameConfig;
pub use error::{GameError, PhysicsError};
pub use game::snapshot::GameSnapshot;
pub use game::GameInstance;
pub use physics::{BodyId, BodyState, InMemoryPhysics, PhysicsPort};
pub use player::Player;
pub use registry::{GameRegistry, GameSummary, SharedGame};
pub use types::{
    BlockId, BlockKind, Direction, GameId, GameMode, GamePhase, PlayerId, PlayerPhase, Rotation,
    SpellId,
};
