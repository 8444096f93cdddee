//! Player - per-participant mutable state

use std::collections::HashMap;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::ai::OpponentKind;
use crate::core::block::Block;
use crate::core::scoring::level_for_lines;
use crate::spell::Spell;
use crate::types::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub phase: PlayerPhase,
    pub score: u32,
    pub level: u32,
    pub lines_cleared: u32,
    pub combo_count: u32,
    pub mana: u32,
    pub max_mana: u32,
    /// Spell inventory (catalog templates, shared semantics).
    pub spells: Vec<Spell>,
    pub current_block: Option<Block>,
    /// Fixed lookahead of upcoming blocks.
    pub next_blocks: ArrayVec<Block, NEXT_QUEUE_LEN>,
    pub blocks_placed: u32,
    /// Present for machine-controlled participants.
    pub ai: Option<OpponentKind>,
    /// Last cast time per spell, game-time seconds. Consulted only when
    /// cooldown enforcement is switched on.
    pub last_cast: HashMap<SpellId, f64>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            phase: PlayerPhase::Waiting,
            score: 0,
            level: 1,
            lines_cleared: 0,
            combo_count: 0,
            mana: 0,
            max_mana: MAX_MANA,
            spells: Vec::new(),
            current_block: None,
            next_blocks: ArrayVec::new(),
            blocks_placed: 0,
            ai: None,
            last_cast: HashMap::new(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlayerPhase::Playing
    }

    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    /// Record cleared lines and advance the level curve.
    pub fn add_lines(&mut self, lines: u32) {
        self.lines_cleared += lines;
        let level = level_for_lines(self.lines_cleared);
        if level > self.level {
            self.level = level;
        }
    }

    pub fn add_mana(&mut self, amount: u32) {
        self.mana = (self.mana + amount).min(self.max_mana);
    }

    /// Spend mana if the pool covers it.
    pub fn use_mana(&mut self, amount: u32) -> bool {
        if self.mana >= amount {
            self.mana -= amount;
            true
        } else {
            false
        }
    }

    pub fn spell(&self, id: SpellId) -> Option<&Spell> {
        self.spells.iter().find(|s| s.id == id)
    }

    /// Whether `spell` is off cooldown at `now` (always true for a spell
    /// never cast).
    pub fn spell_ready(&self, id: SpellId, cooldown: f64, now: f64) -> bool {
        match self.last_cast.get(&id) {
            Some(&cast_at) => now >= cast_at + cooldown,
            None => true,
        }
    }
}
