//! Deterministic in-memory physics fake
//!
//! Trivial integration (position += velocity, angle += angular velocity),
//! no collisions. Supports scripted call failures so adapter fault
//! handling can be exercised in tests.

use std::collections::HashMap;

use crate::core::block::Block;
use crate::error::PhysicsError;
use crate::physics::{BodyId, BodyState, PhysicsPort};

#[derive(Debug, Default)]
pub struct InMemoryPhysics {
    bodies: HashMap<BodyId, BodyState>,
    next_id: BodyId,
    steps: u64,
    /// When nonzero, the next N calls fail with a backend error.
    fail_next_calls: u32,
}

impl InMemoryPhysics {
    pub fn new() -> Self {
        Self {
            bodies: HashMap::new(),
            next_id: 1,
            steps: 0,
            fail_next_calls: 0,
        }
    }

    /// Script the next `n` calls to fail (fault-budget testing).
    pub fn fail_next_calls(&mut self, n: u32) {
        self.fail_next_calls = n;
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn check_fault(&mut self) -> Result<(), PhysicsError> {
        if self.fail_next_calls > 0 {
            self.fail_next_calls -= 1;
            return Err(PhysicsError::Backend("scripted failure".to_string()));
        }
        Ok(())
    }
}

impl PhysicsPort for InMemoryPhysics {
    fn create(&mut self, block: &Block) -> Result<BodyId, PhysicsError> {
        self.check_fault()?;
        let id = self.next_id;
        self.next_id += 1;
        self.bodies.insert(id, BodyState::of_block(block));
        Ok(id)
    }

    fn remove(&mut self, body: BodyId) -> Result<bool, PhysicsError> {
        self.check_fault()?;
        Ok(self.bodies.remove(&body).is_some())
    }

    fn update(&mut self, body: BodyId, state: &BodyState) -> Result<(), PhysicsError> {
        self.check_fault()?;
        match self.bodies.get_mut(&body) {
            Some(slot) => {
                *slot = *state;
                Ok(())
            }
            None => Err(PhysicsError::UnknownBody(body)),
        }
    }

    fn apply_force(
        &mut self,
        body: BodyId,
        force_x: f32,
        force_y: f32,
        _point_x: f32,
        _point_y: f32,
    ) -> Result<(), PhysicsError> {
        self.check_fault()?;
        match self.bodies.get_mut(&body) {
            Some(state) => {
                // Unit mass, impulse semantics.
                state.velocity.x += force_x;
                state.velocity.y += force_y;
                Ok(())
            }
            None => Err(PhysicsError::UnknownBody(body)),
        }
    }

    fn step(&mut self, dt: f32) -> Result<(), PhysicsError> {
        self.check_fault()?;
        self.steps += 1;
        for state in self.bodies.values_mut() {
            if state.is_static || !state.is_active {
                continue;
            }
            state.position.x += state.velocity.x * dt;
            state.position.y += state.velocity.y * dt;
            state.angle += state.angular_velocity * dt;
        }
        Ok(())
    }

    fn query(&self, body: BodyId) -> Result<BodyState, PhysicsError> {
        self.bodies
            .get(&body)
            .copied()
            .ok_or(PhysicsError::UnknownBody(body))
    }
}
