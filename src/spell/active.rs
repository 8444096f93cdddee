//! Active spells - time-boxed instances of catalog templates

use serde::{Deserialize, Serialize};

use crate::spell::catalog::Spell;
use crate::types::PlayerId;

/// A live (or expiring) effect bound to a caster and a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSpell {
    pub spell: Spell,
    pub caster: PlayerId,
    pub target: PlayerId,
    /// Game-time seconds.
    pub start_time: f64,
    pub end_time: f64,
    pub is_active: bool,
    /// Wind direction, fixed the first time the effect applies.
    pub wind_sign: Option<f32>,
}

impl ActiveSpell {
    pub fn cast(spell: Spell, caster: PlayerId, target: PlayerId, now: f64) -> Self {
        let end_time = now + spell.duration;
        Self {
            spell,
            caster,
            target,
            start_time: now,
            end_time,
            is_active: true,
            wind_sign: None,
        }
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now >= self.end_time
    }

    pub fn remaining(&self, now: f64) -> f64 {
        (self.end_time - now).max(0.0)
    }

    /// True when the spell names this player as caster or target.
    pub fn references(&self, player: PlayerId) -> bool {
        self.caster == player || self.target == player
    }
}
