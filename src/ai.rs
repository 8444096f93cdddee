//! Opponent interface and the stochastic placeholder
//!
//! Real opponents (heuristic search, neural nets, RL agents) live in an
//! external service; the game instance only depends on the [`Opponent`]
//! trait, so any implementation of the contract can be swapped in. The
//! built-in [`StochasticOpponent`] is a stand-in that emits noise, not
//! decisions.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::board::GameBoard;
use crate::player::Player;
use crate::spell::TargetKind;
use crate::types::{Direction, PlayerId, SpellId};

/// Which opponent implementation a player slot is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpponentKind {
    Heuristic,
    NeuralNet,
    ReinforcementLearning,
}

/// One action per tick, applied through the normal action API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpponentAction {
    Wait,
    Move(Direction),
    Rotate { clockwise: bool },
    Drop { hard: bool },
    Cast { spell: SpellId, target: PlayerId },
}

/// What an opponent sees when deciding.
pub struct OpponentView<'a> {
    pub player: &'a Player,
    pub board: &'a GameBoard,
    /// Playing opponents eligible as harmful-spell targets.
    pub opponents: &'a [PlayerId],
}

/// Contract for pluggable opponents.
pub trait Opponent: Send {
    fn get_action(&mut self, view: &OpponentView<'_>, rng: &mut dyn rand::RngCore)
        -> OpponentAction;

    /// Learning feedback; ignored by non-learning implementations.
    fn update(&mut self, view: &OpponentView<'_>, action: &OpponentAction, reward: f32);

    /// Serialize internal state (model weights, tables) for persistence.
    fn save(&self) -> String;

    fn load(&mut self, data: &str) -> bool;
}

/// Build the opponent driving a given kind.
///
/// Every kind currently maps to the stochastic stand-in; the real
/// implementations arrive through the external opponent service.
pub fn opponent_for(_kind: OpponentKind) -> Box<dyn Opponent> {
    Box::new(StochasticOpponent::default())
}

/// Placeholder that rolls dice instead of thinking: roughly 10% of ticks
/// it moves, 5% it rotates, 1% it casts at a random eligible target.
#[derive(Debug, Default)]
pub struct StochasticOpponent;

impl Opponent for StochasticOpponent {
    fn get_action(
        &mut self,
        view: &OpponentView<'_>,
        rng: &mut dyn rand::RngCore,
    ) -> OpponentAction {
        if view.player.current_block.is_none() {
            return OpponentAction::Wait;
        }

        if rng.gen_bool(0.10) {
            let direction = if rng.gen_bool(0.5) {
                Direction::Left
            } else {
                Direction::Right
            };
            return OpponentAction::Move(direction);
        }

        if rng.gen_bool(0.05) {
            return OpponentAction::Rotate {
                clockwise: rng.gen_bool(0.5),
            };
        }

        if rng.gen_bool(0.01) && !view.player.spells.is_empty() {
            let idx = rng.gen_range(0..view.player.spells.len());
            let spell = &view.player.spells[idx];
            let target = match spell.target {
                TargetKind::Caster => view.player.id,
                _ => {
                    if view.opponents.is_empty() {
                        view.player.id
                    } else {
                        view.opponents[rng.gen_range(0..view.opponents.len())]
                    }
                }
            };
            return OpponentAction::Cast {
                spell: spell.id,
                target,
            };
        }

        OpponentAction::Wait
    }

    fn update(&mut self, _view: &OpponentView<'_>, _action: &OpponentAction, _reward: f32) {}

    fn save(&self) -> String {
        String::new()
    }

    fn load(&mut self, _data: &str) -> bool {
        true
    }
}
