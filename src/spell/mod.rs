//! Spell system - immutable catalog templates and live effect instances
//!
//! Effect application lives in the game instance, since every effect
//! touches players, boards, and the physics boundary together.

pub mod active;
pub mod catalog;

pub use active::ActiveSpell;
pub use catalog::{all_spells, dark_spells, light_spells, Spell, SpellEffect, SpellFamily, TargetKind};
