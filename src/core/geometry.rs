//! Geometry - tetromino shapes, rotation transform, wall kicks
//!
//! Shapes are boolean occupancy grids (row-major), rotated by quarter-turn
//! index transforms. The wall-kick candidate list and its order are part of
//! the engine's observable contract: replays and tests depend on the first
//! accepted offset being deterministic.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{BlockKind, Rotation};

/// 2D position in board space. x grows rightward, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::ops::Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Occupancy grid for one block kind at one orientation.
///
/// Immutable once built; `rotated` returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockShape {
    pub kind: BlockKind,
    /// Row-major occupancy, `width * height` entries.
    cells: Vec<bool>,
    width: usize,
    height: usize,
}

impl BlockShape {
    /// Build the spawn-orientation shape for a standard kind.
    ///
    /// `Special` kinds are procedural; use [`BlockShape::special`].
    pub fn of(kind: BlockKind) -> Self {
        let (grid, width): (&[u8], usize) = match kind {
            BlockKind::I => (&[0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0], 4),
            BlockKind::J => (&[1, 0, 0, 1, 1, 1, 0, 0, 0], 3),
            BlockKind::L => (&[0, 0, 1, 1, 1, 1, 0, 0, 0], 3),
            BlockKind::O => (&[1, 1, 1, 1], 2),
            BlockKind::S => (&[0, 1, 1, 1, 1, 0, 0, 0, 0], 3),
            BlockKind::T => (&[0, 1, 0, 1, 1, 1, 0, 0, 0], 3),
            BlockKind::Z => (&[1, 1, 0, 0, 1, 1, 0, 0, 0], 3),
            // Deterministic fallback for the procedural kind: center cell only.
            BlockKind::Special => (&[0, 0, 0, 0, 1, 0, 0, 0, 0], 3),
        };
        Self {
            kind,
            cells: grid.iter().map(|&c| c != 0).collect(),
            width,
            height: grid.len() / width,
        }
    }

    /// Random 3x3 special shape with at least one occupied cell.
    pub fn special(rng: &mut impl Rng) -> Self {
        let mut cells: Vec<bool> = (0..9).map(|_| rng.gen_bool(0.5)).collect();
        if !cells.iter().any(|&c| c) {
            cells[4] = true;
        }
        Self {
            kind: BlockKind::Special,
            cells,
            width: 3,
            height: 3,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Occupancy at (x, y) within the shape grid; out of range reads false.
    pub fn cell(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.cells[y * self.width + x]
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Iterate occupied (x, y) offsets within the shape grid.
    pub fn occupied_offsets(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.cell(x, y))
    }

    /// Rotate by the given quarter-turn delta, producing a new shape.
    ///
    /// `R0` and any rotation of an O block are identities. Width and height
    /// swap for quarter turns.
    pub fn rotated(&self, turn: Rotation) -> Self {
        if turn == Rotation::R0 || self.kind == BlockKind::O {
            return self.clone();
        }

        let (w, h) = (self.width, self.height);
        let (new_w, new_h) = match turn {
            Rotation::R180 => (w, h),
            _ => (h, w),
        };
        let mut cells = vec![false; new_w * new_h];

        for y in 0..h {
            for x in 0..w {
                if !self.cells[y * w + x] {
                    continue;
                }
                let (nx, ny) = match turn {
                    Rotation::R90 => (h - 1 - y, x),
                    Rotation::R180 => (w - 1 - x, h - 1 - y),
                    Rotation::R270 => (y, w - 1 - x),
                    Rotation::R0 => unreachable!(),
                };
                cells[ny * new_w + nx] = true;
            }
        }

        Self {
            kind: self.kind,
            cells,
            width: new_w,
            height: new_h,
        }
    }
}

/// Wall-kick candidates, tried in order against the already-rotated shape.
///
/// Basic cardinals, extended cardinals, then diagonals. y is positive down.
pub const KICK_OFFSETS: [(i32, i32); 12] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (2, 0),
    (-2, 0),
    (0, 2),
    (0, -2),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
];

/// Attempt a rotation with wall kicks.
///
/// `base` is the spawn-orientation grid; the candidate grid is derived from
/// it by the absolute target rotation. `can_place` judges a candidate
/// (shape, x, y) against the board. The unkicked position is tried first,
/// then each entry of [`KICK_OFFSETS`]. Returns the accepted shape,
/// rotation, and position, or `None` if every candidate fails (the caller's
/// state is untouched either way).
pub fn try_rotate(
    base: &BlockShape,
    rotation: Rotation,
    x: i32,
    y: i32,
    clockwise: bool,
    can_place: impl Fn(&BlockShape, i32, i32) -> bool,
) -> Option<(BlockShape, Rotation, (i32, i32))> {
    let new_rotation = if clockwise { rotation.cw() } else { rotation.ccw() };
    let new_shape = base.rotated(new_rotation);

    if can_place(&new_shape, x, y) {
        return Some((new_shape, new_rotation, (x, y)));
    }

    for &(dx, dy) in KICK_OFFSETS.iter() {
        let (kx, ky) = (x + dx, y + dy);
        if can_place(&new_shape, kx, ky) {
            return Some((new_shape, new_rotation, (kx, ky)));
        }
    }

    None
}
