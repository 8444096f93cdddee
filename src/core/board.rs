//! Game board - occupancy grid plus the map of placed blocks
//!
//! The grid is flat row-major storage of optional block ids; (x, y) with x
//! left-to-right and y top-to-bottom. The grid is authoritative for
//! placement, line clears, and game over; physics body positions are never
//! read back into it.
//!
//! After a line clear shifts rows down, grid cells and recorded block
//! positions can drift apart; `remove_block` therefore only clears cells
//! still owned by the removed id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::block::Block;
use crate::core::geometry::BlockShape;
use crate::types::BlockId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameBoard {
    width: usize,
    height: usize,
    /// Row-major grid of cell owners (`None` for empty).
    cells: Vec<Option<BlockId>>,
    /// All placed blocks by id.
    blocks: HashMap<BlockId, Block>,
}

impl GameBoard {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
            blocks: HashMap::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.is_valid_position(x, y) {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn is_valid_position(&self, x: i32, y: i32) -> bool {
        x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height
    }

    /// Cell owner at (x, y); `None` for empty or out of bounds.
    pub fn cell(&self, x: i32, y: i32) -> Option<BlockId> {
        self.index(x, y).and_then(|idx| self.cells[idx])
    }

    /// In bounds and unoccupied. Out-of-bounds cells are not empty.
    pub fn is_cell_empty(&self, x: i32, y: i32) -> bool {
        match self.index(x, y) {
            Some(idx) => self.cells[idx].is_none(),
            None => false,
        }
    }

    /// Whether a shape fits at (x, y): every occupied cell in bounds and empty.
    pub fn can_place_shape(&self, shape: &BlockShape, x: i32, y: i32) -> bool {
        shape
            .occupied_offsets()
            .all(|(dx, dy)| self.is_cell_empty(x + dx as i32, y + dy as i32))
    }

    /// Whether a block fits at its current position and rotation.
    pub fn can_place_block(&self, block: &Block) -> bool {
        block.cells().iter().all(|&(x, y)| self.is_cell_empty(x, y))
    }

    /// Place a block, claiming all its cells and recording it.
    ///
    /// Atomic: on any conflict nothing changes and `false` is returned.
    pub fn place_block(&mut self, mut block: Block) -> bool {
        if !self.can_place_block(&block) {
            return false;
        }

        let id = block.id;
        for (x, y) in block.cells() {
            if let Some(idx) = self.index(x, y) {
                self.cells[idx] = Some(id);
            }
        }
        block.is_placed = true;
        self.blocks.insert(id, block);
        true
    }

    /// Remove a placed block, clearing only cells still owned by it.
    pub fn remove_block(&mut self, id: BlockId) -> Option<Block> {
        let block = self.blocks.remove(&id)?;
        for (x, y) in block.cells() {
            if let Some(idx) = self.index(x, y) {
                if self.cells[idx] == Some(id) {
                    self.cells[idx] = None;
                }
            }
        }
        Some(block)
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(&id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.blocks.values_mut()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn is_row_full(&self, y: usize) -> bool {
        let start = y * self.width;
        self.cells[start..start + self.width]
            .iter()
            .all(|cell| cell.is_some())
    }

    /// Fully occupied row indices, ascending.
    pub fn check_lines(&self) -> Vec<usize> {
        (0..self.height).filter(|&y| self.is_row_full(y)).collect()
    }

    /// Clear the given rows and shift everything above them down.
    ///
    /// Rows are processed in descending order so earlier shifts cannot
    /// corrupt later indices. Every block occupying a cleared row is removed
    /// wholesale (including its cells on other rows). Returns the number of
    /// rows cleared; an empty list is a no-op returning 0.
    pub fn clear_lines(&mut self, rows: &[usize]) -> usize {
        if rows.is_empty() {
            return 0;
        }

        let mut ordered: Vec<usize> = rows.iter().copied().filter(|&y| y < self.height).collect();
        ordered.sort_unstable_by(|a, b| b.cmp(a));

        for &row in &ordered {
            // Remove every block with a cell on this row.
            for x in 0..self.width as i32 {
                if let Some(id) = self.cell(x, row as i32) {
                    self.remove_block(id);
                }
            }

            // Shift rows above down by one.
            for y in (1..=row).rev() {
                let src = (y - 1) * self.width;
                let dst = y * self.width;
                self.cells.copy_within(src..src + self.width, dst);
            }

            // Top row becomes empty.
            for cell in &mut self.cells[..self.width] {
                *cell = None;
            }
        }

        ordered.len()
    }

    /// Topmost occupied row index, or `height` for an empty board.
    pub fn get_highest_block_position(&self) -> usize {
        for y in 0..self.height {
            if self.cells[y * self.width..(y + 1) * self.width]
                .iter()
                .any(|cell| cell.is_some())
            {
                return y;
            }
        }
        self.height
    }

    /// The tower has reached the top row.
    pub fn is_game_over(&self) -> bool {
        self.cells[..self.width].iter().any(|cell| cell.is_some())
    }

    /// Total occupied cell count (test and scoring aid).
    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }
}
