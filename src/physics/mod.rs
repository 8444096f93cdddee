//! Physics boundary - the port to an external rigid-body stepper
//!
//! The engine calls out through [`PhysicsPort`] and never integrates
//! bodies itself. Body state flowing back is informative only: the board
//! grid stays authoritative for placement, line clears, and game over.
//! Implementations are injected, one production adapter and one
//! deterministic in-memory fake for tests.

pub mod fake;

use serde::{Deserialize, Serialize};

use crate::core::block::Block;
use crate::core::geometry::Position;
use crate::error::PhysicsError;

pub use fake::InMemoryPhysics;

/// Handle to a body inside the physics backend.
pub type BodyId = i32;

/// Continuous state of one body.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyState {
    pub position: Position,
    pub angle: f32,
    pub velocity: Position,
    pub angular_velocity: f32,
    pub is_static: bool,
    pub is_active: bool,
}

impl BodyState {
    pub fn of_block(block: &Block) -> Self {
        Self {
            position: block.position,
            angle: block.angle,
            velocity: block.velocity,
            angular_velocity: block.angular_velocity,
            is_static: block.is_static,
            is_active: block.is_active,
        }
    }
}

/// Call boundary to the rigid-body service.
pub trait PhysicsPort: Send {
    /// Register a block as a body, returning the backend's handle.
    fn create(&mut self, block: &Block) -> Result<BodyId, PhysicsError>;

    /// Remove a body; `Ok(false)` if the backend no longer knows it.
    fn remove(&mut self, body: BodyId) -> Result<bool, PhysicsError>;

    /// Push the authoritative state for a body.
    fn update(&mut self, body: BodyId, state: &BodyState) -> Result<(), PhysicsError>;

    /// Apply a force at a world point.
    fn apply_force(
        &mut self,
        body: BodyId,
        force_x: f32,
        force_y: f32,
        point_x: f32,
        point_y: f32,
    ) -> Result<(), PhysicsError>;

    /// Advance the simulation.
    fn step(&mut self, dt: f32) -> Result<(), PhysicsError>;

    /// Read a body's continuous state.
    fn query(&self, body: BodyId) -> Result<BodyState, PhysicsError>;
}
