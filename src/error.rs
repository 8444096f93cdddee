//! Error taxonomy
//!
//! Validation failures (bad move, not enough mana, unknown target) are
//! reported through `bool`/`Option` returns on the action API and never
//! raised. This module covers the two classes that are raised: construction
//! errors and adapter faults.

use thiserror::Error;

use crate::types::GameId;

/// Errors surfaced as `Result` from construction and lifecycle entry points.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("maximum number of players reached ({max})")]
    MaxPlayers { max: usize },

    #[error("instance is in a terminal state")]
    Terminal,

    #[error("unknown game {0}")]
    UnknownGame(GameId),

    #[error("physics adapter fault budget exhausted after {faults} failures")]
    PhysicsFaulted { faults: u32 },

    #[error("snapshot decode failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Faults reported by a physics adapter call.
#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("physics body {0} not found")]
    UnknownBody(i32),

    #[error("physics backend unavailable: {0}")]
    Backend(String),
}
