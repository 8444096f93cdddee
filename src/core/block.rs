//! Blocks and the per-instance block factory
//!
//! A block is born falling, becomes placed when the board records it, and
//! only leaves through a line clear. Ownership never changes after creation.
//! Physical properties start at the engine defaults and are mutated by
//! spell effects over the block's lifetime.

use arrayvec::ArrayVec;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::geometry::{BlockShape, Position};
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Spawn-orientation grid; the current grid is derived from it.
    base: BlockShape,
    shape: BlockShape,
    pub position: Position,
    pub rotation: Rotation,
    pub angle: f32,
    pub velocity: Position,
    pub angular_velocity: f32,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_active: bool,
    pub is_static: bool,
    pub is_placed: bool,
    pub owner: PlayerId,
}

impl Block {
    pub fn new(id: BlockId, base: BlockShape, owner: PlayerId) -> Self {
        let kind = base.kind;
        Self {
            id,
            kind,
            shape: base.clone(),
            base,
            position: Position::default(),
            rotation: Rotation::R0,
            angle: 0.0,
            velocity: Position::default(),
            angular_velocity: 0.0,
            density: BLOCK_DENSITY,
            friction: BLOCK_FRICTION,
            restitution: BLOCK_RESTITUTION,
            is_active: true,
            is_static: false,
            is_placed: false,
            owner,
        }
    }

    /// Grid for the current rotation.
    pub fn shape(&self) -> &BlockShape {
        &self.shape
    }

    /// Spawn-orientation grid.
    pub fn base_shape(&self) -> &BlockShape {
        &self.base
    }

    /// Set an absolute rotation and re-derive the grid from the base shape.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
        self.shape = self.base.rotated(rotation);
    }

    /// Board cells occupied at the current position and rotation.
    ///
    /// The continuous position truncates to its cell, matching the board's
    /// discrete view of a falling block.
    pub fn cells(&self) -> Vec<(i32, i32)> {
        let bx = self.position.x as i32;
        let by = self.position.y as i32;
        self.shape
            .occupied_offsets()
            .map(|(dx, dy)| (bx + dx as i32, by + dy as i32))
            .collect()
    }

    pub fn move_by(&mut self, direction: Direction, distance: f32) {
        match direction {
            Direction::Left => self.position.x -= distance,
            Direction::Right => self.position.x += distance,
            Direction::Down => self.position.y += distance,
            Direction::Up => self.position.y -= distance,
        }
    }
}

/// Creates blocks with fresh ids, unique for the lifetime of one instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockFactory {
    next_id: u32,
}

impl BlockFactory {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Resume from a snapshot without reusing ids.
    pub fn resume(next_id: u32) -> Self {
        Self { next_id }
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    fn fresh_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create a block of the given kind, or a weighted random draw
    /// (standard kinds at weight 1.0, special at [`SPECIAL_BLOCK_WEIGHT`]).
    pub fn create(
        &mut self,
        kind: Option<BlockKind>,
        owner: PlayerId,
        rng: &mut impl Rng,
    ) -> Block {
        let kind = kind.unwrap_or_else(|| Self::draw_kind(rng));
        let base = match kind {
            BlockKind::Special => BlockShape::special(rng),
            standard => BlockShape::of(standard),
        };
        Block::new(self.fresh_id(), base, owner)
    }

    /// Fill a lookahead queue of upcoming blocks.
    pub fn create_queue(
        &mut self,
        count: usize,
        owner: PlayerId,
        rng: &mut impl Rng,
    ) -> ArrayVec<Block, NEXT_QUEUE_LEN> {
        (0..count.min(NEXT_QUEUE_LEN))
            .map(|_| self.create(None, owner, rng))
            .collect()
    }

    fn draw_kind(rng: &mut impl Rng) -> BlockKind {
        let total = BlockKind::STANDARD.len() as f64 + SPECIAL_BLOCK_WEIGHT;
        let roll = rng.gen_range(0.0..total);
        BlockKind::STANDARD
            .get(roll as usize)
            .copied()
            .unwrap_or(BlockKind::Special)
    }
}

impl Default for BlockFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_factory_ids_monotonic() {
        let mut factory = BlockFactory::new();
        let mut rng = rng();
        let a = factory.create(Some(BlockKind::T), PlayerId(1), &mut rng);
        let b = factory.create(Some(BlockKind::I), PlayerId(1), &mut rng);
        let c = factory.create(None, PlayerId(2), &mut rng);
        assert_eq!(a.id, BlockId(1));
        assert_eq!(b.id, BlockId(2));
        assert_eq!(c.id, BlockId(3));
    }

    #[test]
    fn test_new_block_defaults() {
        let mut factory = BlockFactory::new();
        let block = factory.create(Some(BlockKind::O), PlayerId(1), &mut rng());
        assert!(block.is_active);
        assert!(!block.is_static);
        assert!(!block.is_placed);
        assert_eq!(block.density, BLOCK_DENSITY);
        assert_eq!(block.friction, BLOCK_FRICTION);
        assert_eq!(block.owner, PlayerId(1));
    }

    #[test]
    fn test_cells_follow_position() {
        let mut factory = BlockFactory::new();
        let mut block = factory.create(Some(BlockKind::O), PlayerId(1), &mut rng());
        block.position = Position::new(3.0, 5.0);
        let mut cells = block.cells();
        cells.sort();
        assert_eq!(cells, vec![(3, 5), (3, 6), (4, 5), (4, 6)]);

        // Fractional position truncates to the same cells.
        block.position = Position::new(3.9, 5.7);
        let mut cells = block.cells();
        cells.sort();
        assert_eq!(cells, vec![(3, 5), (3, 6), (4, 5), (4, 6)]);
    }

    #[test]
    fn test_set_rotation_derives_from_base() {
        let mut factory = BlockFactory::new();
        let mut block = factory.create(Some(BlockKind::T), PlayerId(1), &mut rng());
        let spawn = block.shape().clone();

        block.set_rotation(Rotation::R90);
        assert_ne!(block.shape(), &spawn);

        // Absolute rotation back to R0 restores the spawn grid exactly.
        block.set_rotation(Rotation::R0);
        assert_eq!(block.shape(), &spawn);
    }

    #[test]
    fn test_move_by() {
        let mut factory = BlockFactory::new();
        let mut block = factory.create(Some(BlockKind::I), PlayerId(1), &mut rng());
        block.position = Position::new(4.0, 2.0);
        block.move_by(Direction::Left, 1.0);
        block.move_by(Direction::Down, 2.0);
        assert_eq!(block.position, Position::new(3.0, 4.0));
    }

    #[test]
    fn test_queue_len() {
        let mut factory = BlockFactory::new();
        let queue = factory.create_queue(NEXT_QUEUE_LEN, PlayerId(1), &mut rng());
        assert_eq!(queue.len(), NEXT_QUEUE_LEN);
    }

    #[test]
    fn test_draw_kind_distribution_hits_every_kind() {
        let mut rng = rng();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..2000 {
            seen.insert(BlockFactory::draw_kind(&mut rng));
        }
        assert_eq!(seen.len(), 8, "all kinds incl. special should appear");
    }
}
