//! Spell catalog - immutable templates for the light and dark sets
//!
//! Templates are created once and shared; casting produces an
//! `ActiveSpell` instance, never a mutation of the template.

use serde::{Deserialize, Serialize};

use crate::types::SpellId;

/// Helpful (self-targeted) vs harmful (opponent-targeted) families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellFamily {
    Light,
    Dark,
}

/// What a live effect does each tick (or, for the one-shots, once).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellEffect {
    /// Scale the falling block's density and friction up.
    Strengthen,
    /// Scale the falling block's density down.
    Lighten,
    /// Scale line-clear scores; consulted only at score time.
    Multiply,
    /// One-shot at cast: fill the nearest bounded gap with static blocks.
    Bridge,
    /// Scale placed blocks' friction down and kick their angular velocity.
    Destabilize,
    /// Horizontal force on all non-static placed blocks, sign fixed at cast.
    Wind,
    /// Scale placed blocks' friction down.
    Slippery,
    /// Scale the falling block's density up, making it unwieldy.
    Grow,
}

/// Who a cast may name as its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Caster,
    Opponent,
    All,
}

/// Immutable spell template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    pub id: SpellId,
    pub name: String,
    pub family: SpellFamily,
    pub effect: SpellEffect,
    /// Seconds of effect; 0 for instant one-shots.
    pub duration: f64,
    pub strength: f32,
    pub target: TargetKind,
    pub cooldown: f64,
    pub mana_cost: u32,
}

fn spell(
    id: u8,
    name: &str,
    family: SpellFamily,
    effect: SpellEffect,
    duration: f64,
    strength: f32,
    target: TargetKind,
    cooldown: f64,
    mana_cost: u32,
) -> Spell {
    Spell {
        id: SpellId(id),
        name: name.to_string(),
        family,
        effect,
        duration,
        strength,
        target,
        cooldown,
        mana_cost,
    }
}

/// The four helpful spells.
pub fn light_spells() -> Vec<Spell> {
    use SpellEffect::*;
    use SpellFamily::Light;
    use TargetKind::Caster;
    vec![
        spell(1, "Strengthen", Light, Strengthen, 15.0, 2.0, Caster, 30.0, 30),
        spell(2, "Lighten", Light, Lighten, 10.0, 0.5, Caster, 25.0, 25),
        spell(3, "Multiply", Light, Multiply, 5.0, 2.0, Caster, 60.0, 50),
        spell(4, "Bridge", Light, Bridge, 0.0, 1.0, Caster, 45.0, 40),
    ]
}

/// The four harmful spells.
pub fn dark_spells() -> Vec<Spell> {
    use SpellEffect::*;
    use SpellFamily::Dark;
    use TargetKind::Opponent;
    vec![
        spell(5, "Destabilize", Dark, Destabilize, 10.0, 0.5, Opponent, 35.0, 35),
        spell(6, "Wind Gust", Dark, Wind, 5.0, 3.0, Opponent, 40.0, 40),
        spell(7, "Slippery", Dark, Slippery, 12.0, 0.8, Opponent, 30.0, 30),
        spell(8, "Grow", Dark, Grow, 8.0, 1.5, Opponent, 50.0, 45),
    ]
}

pub fn all_spells() -> Vec<Spell> {
    let mut spells = light_spells();
    spells.extend(dark_spells());
    spells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_sizes() {
        assert_eq!(light_spells().len(), 4);
        assert_eq!(dark_spells().len(), 4);
        assert_eq!(all_spells().len(), 8);
    }

    #[test]
    fn test_catalog_ids_unique() {
        let spells = all_spells();
        let mut ids: Vec<_> = spells.iter().map(|s| s.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), spells.len());
    }

    #[test]
    fn test_light_spells_self_targeted() {
        for spell in light_spells() {
            assert_eq!(spell.family, SpellFamily::Light);
            assert_eq!(spell.target, TargetKind::Caster, "{}", spell.name);
        }
    }

    #[test]
    fn test_dark_spells_opponent_targeted() {
        for spell in dark_spells() {
            assert_eq!(spell.family, SpellFamily::Dark);
            assert_eq!(spell.target, TargetKind::Opponent, "{}", spell.name);
        }
    }

    #[test]
    fn test_bridge_is_instant() {
        let bridge = light_spells()
            .into_iter()
            .find(|s| s.effect == SpellEffect::Bridge)
            .unwrap();
        assert_eq!(bridge.duration, 0.0);
    }
}
