//! Core gameplay - geometry, blocks, board, scoring
//!
//! Pure rules with no dependencies on the physics boundary or lifecycle
//! management.

pub mod block;
pub mod board;
pub mod geometry;
pub mod scoring;

pub use block::{Block, BlockFactory};
pub use board::GameBoard;
pub use geometry::{try_rotate, BlockShape, Position, KICK_OFFSETS};
