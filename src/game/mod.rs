//! Game instance: lifecycle state machine, per-tick simulation, and the
//! action API players drive between ticks.
//!
//! An instance owns every per-game entity outright (players, boards, the
//! active spell list, the physics port, the block factory and its RNG) and
//! exposes only `&mut self` methods, so callers serialize access however
//! they like; [`crate::registry::GameRegistry`] wraps each instance in a
//! mutex. Time inside the instance is simulation time: `update(dt)`
//! advances it, nothing here reads a wall clock.

pub mod snapshot;

use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::ai::{opponent_for, Opponent, OpponentAction, OpponentKind, OpponentView};
use crate::config::GameConfig;
use crate::core::scoring::{apply_multiplier, drop_score, line_clear_score};
use crate::core::{try_rotate, Block, BlockFactory, GameBoard};
use crate::error::{GameError, PhysicsError};
use crate::physics::{BodyId, BodyState, PhysicsPort};
use crate::player::Player;
use crate::spell::{dark_spells, light_spells, ActiveSpell, SpellEffect};
use crate::types::{
    BlockId, BlockKind, Direction, GameId, GameMode, GamePhase, PlayerId, PlayerPhase, SpellId,
    MANA_PER_LINE, MAX_PHYSICS_FAULTS,
};

/// Run a physics call, retrying transient failures. Exhausting the
/// attempts is fatal for the instance; the caller tears it down.
fn with_retry<T>(
    physics: &mut dyn PhysicsPort,
    op: impl Fn(&mut dyn PhysicsPort) -> Result<T, PhysicsError>,
) -> Result<T, GameError> {
    for attempt in 1..=MAX_PHYSICS_FAULTS {
        match op(physics) {
            Ok(value) => return Ok(value),
            Err(err) => warn!(attempt, error = %err, "physics call failed"),
        }
    }
    Err(GameError::PhysicsFaulted {
        faults: MAX_PHYSICS_FAULTS,
    })
}

/// A single running game and everything it owns.
pub struct GameInstance {
    id: GameId,
    mode: GameMode,
    phase: GamePhase,
    config: GameConfig,
    /// Simulation time in seconds, accumulated from `update(dt)`.
    current_time: f64,
    start_time: f64,
    players: BTreeMap<PlayerId, Player>,
    boards: BTreeMap<PlayerId, GameBoard>,
    active_spells: Vec<ActiveSpell>,
    factory: BlockFactory,
    next_player_id: u32,
    physics: Box<dyn PhysicsPort>,
    /// Physics body per placed block. Falling blocks are pure simulation
    /// state and get a body only once they land.
    bodies: HashMap<BlockId, BodyId>,
    faulted: bool,
    rng: StdRng,
    /// Brains for AI-driven slots; not part of snapshots.
    opponents: HashMap<PlayerId, Box<dyn Opponent>>,
}

impl GameInstance {
    pub fn new(
        id: GameId,
        mode: GameMode,
        config: GameConfig,
        physics: Box<dyn PhysicsPort>,
        seed: u64,
    ) -> Self {
        let mut instance = GameInstance {
            id,
            mode,
            phase: GamePhase::Initializing,
            config,
            current_time: 0.0,
            start_time: 0.0,
            players: BTreeMap::new(),
            boards: BTreeMap::new(),
            active_spells: Vec::new(),
            factory: BlockFactory::new(),
            next_player_id: 1,
            physics,
            bodies: HashMap::new(),
            faulted: false,
            rng: StdRng::seed_from_u64(seed),
            opponents: HashMap::new(),
        };
        instance.initialize();
        instance
    }

    /// Reset to a fresh, joinable state. Drops every player, board, spell,
    /// and physics registration.
    pub fn initialize(&mut self) {
        self.players.clear();
        self.boards.clear();
        self.active_spells.clear();
        self.bodies.clear();
        self.opponents.clear();
        self.factory = BlockFactory::new();
        self.next_player_id = 1;
        self.current_time = 0.0;
        self.start_time = 0.0;
        self.faulted = false;
        self.phase = GamePhase::Ready;
        info!(game = %self.id, mode = self.mode.as_str(), "game initialized");
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Seconds of simulation time since `start`.
    pub fn elapsed(&self) -> f64 {
        (self.current_time - self.start_time).max(0.0)
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn board(&self, id: PlayerId) -> Option<&GameBoard> {
        self.boards.get(&id)
    }

    pub fn active_spells(&self) -> &[ActiveSpell] {
        &self.active_spells
    }

    /// Server-side mana grant (match rewards, pickups). Clamped to the
    /// player's cap.
    pub fn award_mana(&mut self, id: PlayerId, amount: u32) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.add_mana(amount);
                true
            }
            None => false,
        }
    }

    /// A player's own slice of the world: their state plus their board.
    pub fn player_view(&self, id: PlayerId) -> Option<(&Player, &GameBoard)> {
        Some((self.players.get(&id)?, self.boards.get(&id)?))
    }

    // ---- lifecycle ------------------------------------------------------

    /// Add a player. The spell inventory is a coin flip between the light
    /// and dark catalogs; an `ai` kind wires the slot to an opponent brain.
    pub fn add_player(
        &mut self,
        name: impl Into<String>,
        ai: Option<OpponentKind>,
    ) -> Result<PlayerId, GameError> {
        if self.phase.is_terminal() {
            return Err(GameError::Terminal);
        }
        if self.players.len() >= self.config.max_players {
            return Err(GameError::MaxPlayers {
                max: self.config.max_players,
            });
        }

        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;

        let mut player = Player::new(id, name);
        player.spells = if self.rng.gen_bool(0.5) {
            light_spells()
        } else {
            dark_spells()
        };
        player.ai = ai;
        player.next_blocks = self
            .factory
            .create_queue(crate::types::NEXT_QUEUE_LEN, id, &mut self.rng);

        if let Some(kind) = ai {
            self.opponents.insert(id, opponent_for(kind));
        }
        self.boards.insert(
            id,
            GameBoard::new(self.config.board_width, self.config.board_height),
        );
        info!(game = %self.id, player = %id, name = %player.name, ai = ai.is_some(), "player joined");
        self.players.insert(id, player);
        Ok(id)
    }

    /// Remove a player and everything tied to them: board, physics bodies,
    /// opponent brain, and any active spell they cast or suffer.
    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        if self.players.remove(&id).is_none() {
            return false;
        }
        self.opponents.remove(&id);
        if let Some(board) = self.boards.remove(&id) {
            let mut fault = false;
            for block in board.blocks() {
                if let Some(body) = self.bodies.remove(&block.id) {
                    if with_retry(self.physics.as_mut(), |p| p.remove(body)).is_err() {
                        fault = true;
                        break;
                    }
                }
            }
            if fault {
                self.abort_for_fault();
            }
        }
        self.active_spells.retain(|s| !s.references(id));
        info!(game = %self.id, player = %id, "player removed");
        true
    }

    pub fn set_ready(&mut self, id: PlayerId, ready: bool) -> bool {
        match self.players.get_mut(&id) {
            Some(player) if !player.is_playing() => {
                player.phase = if ready {
                    PlayerPhase::Ready
                } else {
                    PlayerPhase::Waiting
                };
                true
            }
            _ => false,
        }
    }

    /// Start the match. Requires at least one player and every player
    /// ready; each gets their first block.
    pub fn start(&mut self) -> bool {
        if self.phase != GamePhase::Ready || self.players.is_empty() {
            return false;
        }
        if !self
            .players
            .values()
            .all(|p| p.phase == PlayerPhase::Ready)
        {
            return false;
        }
        self.phase = GamePhase::Running;
        self.start_time = self.current_time;
        let ids: Vec<PlayerId> = self.players.keys().copied().collect();
        for id in ids {
            if let Some(player) = self.players.get_mut(&id) {
                player.phase = PlayerPhase::Playing;
            }
            self.give_next_block(id);
        }
        info!(game = %self.id, players = self.players.len(), "game started");
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.phase == GamePhase::Running {
            self.phase = GamePhase::Paused;
            true
        } else {
            false
        }
    }

    pub fn resume(&mut self) -> bool {
        if self.phase == GamePhase::Paused {
            self.phase = GamePhase::Running;
            true
        } else {
            false
        }
    }

    /// End the match and crown a winner by mode: RACE picks the tower
    /// nearest the top, SURVIVAL the last player standing, PUZZLE the
    /// fewest blocks placed.
    pub fn end(&mut self) {
        if !matches!(self.phase, GamePhase::Running | GamePhase::Paused) {
            return;
        }
        let winner = match self.mode {
            // Row indices grow downward, so the tallest tower has the
            // smallest highest-occupied row.
            GameMode::Race => self
                .boards
                .iter()
                .min_by_key(|(_, board)| board.get_highest_block_position())
                .map(|(id, _)| *id),
            GameMode::Survival => {
                let mut playing = self.players.values().filter(|p| p.is_playing());
                match (playing.next(), playing.next()) {
                    (Some(last), None) => Some(last.id),
                    _ => None,
                }
            }
            GameMode::Puzzle => self
                .players
                .values()
                .filter(|p| p.is_playing())
                .min_by_key(|p| p.blocks_placed)
                .map(|p| p.id),
        };
        if let Some(id) = winner {
            if let Some(player) = self.players.get_mut(&id) {
                player.phase = PlayerPhase::Victorious;
            }
        }
        self.phase = GamePhase::GameOver;
        info!(game = %self.id, winner = ?winner, "game over");
    }

    // ---- simulation -----------------------------------------------------

    /// Advance the simulation by `dt` seconds: physics step, spell expiry
    /// and effects, gravity per playing player, eliminations, AI actions,
    /// then the victory checks.
    pub fn update(&mut self, dt: f32) {
        if self.phase != GamePhase::Running {
            return;
        }
        self.current_time += dt as f64;

        if with_retry(self.physics.as_mut(), |p| p.step(dt)).is_err() {
            self.abort_for_fault();
            return;
        }

        self.update_active_spells();
        if self.faulted {
            return;
        }

        let ids: Vec<PlayerId> = self.players.keys().copied().collect();
        for id in ids {
            if self.phase != GamePhase::Running {
                break;
            }
            if !self.players.get(&id).map_or(false, Player::is_playing) {
                continue;
            }
            self.advance_falling(id, dt);
            if self.faulted {
                return;
            }

            if self.boards.get(&id).map_or(false, GameBoard::is_game_over) {
                if let Some(player) = self.players.get_mut(&id) {
                    player.phase = PlayerPhase::Eliminated;
                    info!(game = %self.id, player = %id, "player eliminated");
                }
                if !self.players.values().any(Player::is_playing) {
                    self.end();
                    continue;
                }
            }

            if self.players.get(&id).map_or(false, |p| p.ai.is_some()) {
                self.drive_opponent(id);
            }
        }

        if self.phase == GamePhase::Running {
            self.check_victory();
        }
    }

    /// Apply gravity to the player's falling block; landing finalizes the
    /// placement.
    fn advance_falling(&mut self, id: PlayerId, dt: f32) {
        let level = self.players.get(&id).map_or(1, |p| p.level);
        let fall = self.config.fall_speed(level) * dt;

        let landed = {
            let (Some(player), Some(board)) = (self.players.get_mut(&id), self.boards.get(&id))
            else {
                return;
            };
            let Some(block) = player.current_block.as_mut() else {
                return;
            };
            let before = block.position;
            block.position.y += fall;
            if board.can_place_block(block) {
                false
            } else {
                block.position = before;
                true
            }
        };

        if landed {
            if let Some(block) = self.players.get_mut(&id).and_then(|p| p.current_block.take()) {
                self.finalize_placement(id, block);
            }
        }
    }

    /// Lock a landed block onto its owner's board and run the placement
    /// bookkeeping: physics registration, line clears, mana, scoring with
    /// combo and any Multiply in effect, then the next block.
    fn finalize_placement(&mut self, id: PlayerId, block: Block) -> bool {
        let block_id = block.id;
        let Some(board) = self.boards.get_mut(&id) else {
            return false;
        };
        if !board.can_place_block(&block) {
            // A freshly dealt block can land on a stack that covers its
            // spawn footprint without tripping the top-row check. Hand the
            // block back instead of losing it.
            if let Some(player) = self.players.get_mut(&id) {
                player.current_block = Some(block);
            }
            return false;
        }
        if !board.place_block(block) {
            return false;
        }
        if let Some(player) = self.players.get_mut(&id) {
            player.blocks_placed += 1;
        }

        let placed = match self.boards.get(&id).and_then(|b| b.block(block_id)) {
            Some(block) => block.clone(),
            None => return false,
        };
        match with_retry(self.physics.as_mut(), |p| p.create(&placed)) {
            Ok(body) => {
                self.bodies.insert(block_id, body);
            }
            Err(_) => {
                self.abort_for_fault();
                return true;
            }
        }

        let now = self.current_time;
        let multipliers: Vec<f32> = self
            .active_spells
            .iter()
            .filter(|s| {
                s.target == id && s.spell.effect == SpellEffect::Multiply && !s.is_expired(now)
            })
            .map(|s| s.spell.strength)
            .collect();

        let lines = self
            .boards
            .get(&id)
            .map(GameBoard::check_lines)
            .unwrap_or_default();
        if lines.is_empty() {
            if let Some(player) = self.players.get_mut(&id) {
                player.combo_count = 0;
            }
        } else {
            // Drop the physics bodies of every block the clear removes.
            let mut removed_ids = Vec::new();
            if let Some(board) = self.boards.get(&id) {
                for &row in &lines {
                    for x in 0..board.width() as i32 {
                        if let Some(occupant) = board.cell(x, row as i32) {
                            if !removed_ids.contains(&occupant) {
                                removed_ids.push(occupant);
                            }
                        }
                    }
                }
            }
            let cleared = self
                .boards
                .get_mut(&id)
                .map(|b| b.clear_lines(&lines))
                .unwrap_or(0);
            let mut fault = false;
            for removed in removed_ids {
                if let Some(body) = self.bodies.remove(&removed) {
                    if with_retry(self.physics.as_mut(), |p| p.remove(body)).is_err() {
                        fault = true;
                        break;
                    }
                }
            }
            if fault {
                self.abort_for_fault();
                return true;
            }

            if let Some(player) = self.players.get_mut(&id) {
                let mut score = line_clear_score(cleared, player.combo_count).total;
                for strength in multipliers {
                    score = apply_multiplier(score, strength);
                }
                player.add_score(score);
                player.add_lines(cleared as u32);
                player.add_mana(cleared as u32 * MANA_PER_LINE);
                player.combo_count += 1;
                debug!(
                    game = %self.id,
                    player = %id,
                    cleared,
                    score,
                    combo = player.combo_count,
                    "lines cleared"
                );
            }
        }

        self.give_next_block(id);
        true
    }

    /// Hand the player the head of their lookahead queue, spawned
    /// top-center, and refill the queue.
    fn give_next_block(&mut self, id: PlayerId) {
        let width = self
            .boards
            .get(&id)
            .map_or(self.config.board_width, GameBoard::width) as i32;
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if player.next_blocks.is_empty() {
            return;
        }
        let mut block = player.next_blocks.remove(0);
        block.position.x = (width / 2 - block.shape().width() as i32 / 2) as f32;
        block.position.y = 0.0;
        player.current_block = Some(block);

        let refill = self.factory.create(None, id, &mut self.rng);
        if let Some(player) = self.players.get_mut(&id) {
            let _ = player.next_blocks.try_push(refill);
        }
    }

    // ---- actions --------------------------------------------------------

    /// Shift the falling block one cell; reverted wholesale if any cell
    /// would land out of bounds or on an occupied cell.
    pub fn move_block(&mut self, id: PlayerId, direction: Direction) -> bool {
        if self.phase != GamePhase::Running {
            return false;
        }
        let (Some(player), Some(board)) = (self.players.get_mut(&id), self.boards.get(&id)) else {
            return false;
        };
        if !player.is_playing() {
            return false;
        }
        let Some(block) = player.current_block.as_mut() else {
            return false;
        };
        let before = block.position;
        block.move_by(direction, 1.0);
        if board.can_place_block(block) {
            true
        } else {
            block.position = before;
            false
        }
    }

    /// Rotate the falling block a quarter turn, trying the in-place
    /// position first and then the wall-kick offsets. All-or-nothing.
    pub fn rotate_block(&mut self, id: PlayerId, clockwise: bool) -> bool {
        if self.phase != GamePhase::Running {
            return false;
        }
        let (Some(player), Some(board)) = (self.players.get_mut(&id), self.boards.get(&id)) else {
            return false;
        };
        if !player.is_playing() {
            return false;
        }
        let Some(block) = player.current_block.as_mut() else {
            return false;
        };
        let (bx, by) = (block.position.x as i32, block.position.y as i32);
        match try_rotate(
            block.base_shape(),
            block.rotation,
            bx,
            by,
            clockwise,
            |shape, x, y| board.can_place_shape(shape, x, y),
        ) {
            Some((_, rotation, (ax, ay))) => {
                block.set_rotation(rotation);
                block.position.x += (ax - bx) as f32;
                block.position.y += (ay - by) as f32;
                true
            }
            None => false,
        }
    }

    /// Drop the falling block. A hard drop slides it to the lowest legal
    /// row and locks it, scoring per cell travelled; a soft drop moves one
    /// cell (locking if blocked) and scores a point.
    pub fn drop_block(&mut self, id: PlayerId, hard: bool) -> bool {
        if self.phase != GamePhase::Running {
            return false;
        }
        {
            let Some(player) = self.players.get(&id) else {
                return false;
            };
            if !player.is_playing() || player.current_block.is_none() {
                return false;
            }
        }

        if hard {
            let distance = {
                let (Some(player), Some(board)) =
                    (self.players.get_mut(&id), self.boards.get(&id))
                else {
                    return false;
                };
                let Some(block) = player.current_block.as_mut() else {
                    return false;
                };
                let mut distance = 0u32;
                loop {
                    let before = block.position;
                    block.position.y += 1.0;
                    if board.can_place_block(block) {
                        distance += 1;
                    } else {
                        block.position = before;
                        break;
                    }
                }
                distance
            };
            if distance > 0 {
                if let Some(player) = self.players.get_mut(&id) {
                    player.add_score(drop_score(distance, true));
                }
            }
            let Some(block) = self.players.get_mut(&id).and_then(|p| p.current_block.take())
            else {
                return false;
            };
            self.finalize_placement(id, block)
        } else {
            let landed = {
                let (Some(player), Some(board)) =
                    (self.players.get_mut(&id), self.boards.get(&id))
                else {
                    return false;
                };
                let Some(block) = player.current_block.as_mut() else {
                    return false;
                };
                let before = block.position;
                block.position.y += 1.0;
                if board.can_place_block(block) {
                    false
                } else {
                    block.position = before;
                    true
                }
            };
            if landed {
                let Some(block) =
                    self.players.get_mut(&id).and_then(|p| p.current_block.take())
                else {
                    return false;
                };
                self.finalize_placement(id, block)
            } else {
                if let Some(player) = self.players.get_mut(&id) {
                    player.add_score(drop_score(1, false));
                }
                true
            }
        }
    }

    /// Cast a spell from the caster's inventory at a target. Checks mana
    /// (and the cooldown when enforced); Bridge resolves immediately,
    /// everything else joins the active list and applies per tick.
    pub fn cast_spell(&mut self, caster: PlayerId, spell: SpellId, target: PlayerId) -> bool {
        if self.phase != GamePhase::Running {
            return false;
        }
        if !self.players.get(&caster).map_or(false, Player::is_playing)
            || !self.players.get(&target).map_or(false, Player::is_playing)
        {
            return false;
        }
        let now = self.current_time;
        let Some(spell) = self
            .players
            .get(&caster)
            .and_then(|p| p.spell(spell))
            .cloned()
        else {
            return false;
        };
        if self.config.enforce_spell_cooldowns {
            let ready = self
                .players
                .get(&caster)
                .map_or(false, |p| p.spell_ready(spell.id, spell.cooldown, now));
            if !ready {
                return false;
            }
        }

        {
            let Some(player) = self.players.get_mut(&caster) else {
                return false;
            };
            if !player.use_mana(spell.mana_cost) {
                return false;
            }
            player.last_cast.insert(spell.id, now);
        }

        debug!(
            game = %self.id,
            caster = %caster,
            target = %target,
            spell = %spell.name,
            "spell cast"
        );
        let active = ActiveSpell::cast(spell.clone(), caster, target, now);
        if spell.effect == SpellEffect::Bridge {
            self.apply_bridge(target);
        }
        self.active_spells.push(active);
        true
    }

    /// Fill the horizontal gap the target's falling block sits over with
    /// static filler blocks. One-shot; resolves at cast time.
    fn apply_bridge(&mut self, target: PlayerId) {
        let Some((x, y)) = self
            .players
            .get(&target)
            .and_then(|p| p.current_block.as_ref())
            .map(|b| (b.position.x as i32, b.position.y as i32))
        else {
            return;
        };
        let Some(board) = self.boards.get(&target) else {
            return;
        };

        // The gap is bounded by the nearest occupied cell on each side.
        let mut gap_start = None;
        for i in (1..=x).rev() {
            if !board.is_cell_empty(i, y) {
                gap_start = Some(i + 1);
                break;
            }
        }
        let mut gap_end = None;
        for i in x..board.width() as i32 {
            if !board.is_cell_empty(i, y) {
                gap_end = Some(i - 1);
                break;
            }
        }
        let (Some(start), Some(end)) = (gap_start, gap_end) else {
            return;
        };
        if start > end {
            return;
        }

        let mut fault = false;
        for i in start..=end {
            let mut filler = self
                .factory
                .create(Some(BlockKind::Special), target, &mut self.rng);
            filler.position.x = i as f32;
            filler.position.y = y as f32;
            filler.is_static = true;
            let block_id = filler.id;
            let placed = self
                .boards
                .get_mut(&target)
                .map_or(false, |b| b.place_block(filler));
            if !placed {
                continue;
            }
            let snapshot = match self.boards.get(&target).and_then(|b| b.block(block_id)) {
                Some(block) => block.clone(),
                None => continue,
            };
            match with_retry(self.physics.as_mut(), |p| p.create(&snapshot)) {
                Ok(body) => {
                    self.bodies.insert(block_id, body);
                }
                Err(_) => {
                    fault = true;
                    break;
                }
            }
        }
        if fault {
            self.abort_for_fault();
        }
        debug!(game = %self.id, target = %target, row = y, start, end, "bridge filled");
    }

    // ---- spells ---------------------------------------------------------

    /// Drop expired spells, then apply every live one for this tick.
    fn update_active_spells(&mut self) {
        let now = self.current_time;
        let mut spells = std::mem::take(&mut self.active_spells);
        let before = spells.len();
        spells.retain(|s| !s.is_expired(now));
        if spells.len() != before {
            debug!(game = %self.id, expired = before - spells.len(), "spells expired");
        }
        for active in spells.iter_mut() {
            if self.faulted {
                break;
            }
            self.apply_effect(active);
        }
        self.active_spells = spells;
    }

    fn apply_effect(&mut self, active: &mut ActiveSpell) {
        let target = active.target;
        let strength = active.spell.strength;
        if !self.players.contains_key(&target) {
            return;
        }
        match active.spell.effect {
            SpellEffect::Strengthen => self.scale_falling(target, strength, true),
            SpellEffect::Lighten | SpellEffect::Grow => self.scale_falling(target, strength, false),
            // Applied at score / cast time respectively.
            SpellEffect::Multiply | SpellEffect::Bridge => {}
            SpellEffect::Destabilize => self.shake_board(target, strength, true),
            SpellEffect::Slippery => self.shake_board(target, strength, false),
            SpellEffect::Wind => {
                let sign = *active.wind_sign.get_or_insert_with(|| {
                    if self.rng.gen_bool(0.5) {
                        1.0
                    } else {
                        -1.0
                    }
                });
                self.blow_board(target, strength * sign);
            }
        }
    }

    /// Scale the target's falling block density (and friction for
    /// Strengthen). Compounds across ticks while the spell lives.
    fn scale_falling(&mut self, target: PlayerId, strength: f32, friction_too: bool) {
        let Some(block) = self
            .players
            .get_mut(&target)
            .and_then(|p| p.current_block.as_mut())
        else {
            return;
        };
        block.density *= strength;
        if friction_too {
            block.friction *= strength;
        }
    }

    /// Scale friction across the target's placed blocks; Destabilize also
    /// kicks each block's spin.
    fn shake_board(&mut self, target: PlayerId, strength: f32, kick_spin: bool) {
        let Some(board) = self.boards.get_mut(&target) else {
            return;
        };
        let mut fault = false;
        for block in board.blocks_mut() {
            block.friction *= strength;
            if kick_spin {
                block.angular_velocity += self.rng.gen_range(-2.0..2.0);
            }
            if let Some(&body) = self.bodies.get(&block.id) {
                let state = BodyState::of_block(block);
                if with_retry(self.physics.as_mut(), |p| p.update(body, &state)).is_err() {
                    fault = true;
                    break;
                }
            }
        }
        if fault {
            self.abort_for_fault();
        }
    }

    /// Push a lateral force on every non-static placed block.
    fn blow_board(&mut self, target: PlayerId, force: f32) {
        let Some(board) = self.boards.get(&target) else {
            return;
        };
        let mut fault = false;
        for block in board.blocks() {
            if block.is_static {
                continue;
            }
            if let Some(&body) = self.bodies.get(&block.id) {
                let (px, py) = (block.position.x, block.position.y);
                if with_retry(self.physics.as_mut(), |p| {
                    p.apply_force(body, force, 0.0, px, py)
                })
                .is_err()
                {
                    fault = true;
                    break;
                }
            }
        }
        if fault {
            self.abort_for_fault();
        }
    }

    // ---- endings --------------------------------------------------------

    fn check_victory(&mut self) {
        match self.mode {
            GameMode::Race => {
                let winner = self.players.values().find(|p| {
                    p.is_playing()
                        && self
                            .boards
                            .get(&p.id)
                            .map_or(false, |b| {
                                b.block_count() > 0
                                    && b.get_highest_block_position() <= self.config.race_victory_row
                            })
                });
                if let Some(id) = winner.map(|p| p.id) {
                    self.declare_victory(id);
                }
            }
            GameMode::Survival => {
                let mut playing = self.players.values().filter(|p| p.is_playing());
                match (playing.next(), playing.next()) {
                    // Last one standing wins, however the field thinned
                    // out (eliminations or disconnects).
                    (Some(last), None) => {
                        let id = last.id;
                        self.declare_victory(id);
                    }
                    (None, _) => self.end(),
                    _ => {}
                }
            }
            GameMode::Puzzle => {
                let Some(target_lines) = self.config.puzzle_target_lines else {
                    return;
                };
                // Reaching the target closes the puzzle; the efficiency
                // ranking in `end` picks the winner.
                if self
                    .players
                    .values()
                    .any(|p| p.is_playing() && p.lines_cleared >= target_lines)
                {
                    self.end();
                }
            }
        }
    }

    fn declare_victory(&mut self, id: PlayerId) {
        if let Some(player) = self.players.get_mut(&id) {
            player.phase = PlayerPhase::Victorious;
        }
        self.phase = GamePhase::Victory;
        info!(game = %self.id, winner = %id, "victory");
    }

    /// Physics retries exhausted; tear this instance down.
    fn abort_for_fault(&mut self) {
        self.faulted = true;
        if !self.phase.is_terminal() {
            self.phase = GamePhase::GameOver;
        }
        warn!(game = %self.id, "physics port faulted, instance torn down");
    }

    // ---- AI -------------------------------------------------------------

    /// Let an AI slot's brain pick one action and route it through the
    /// normal action API.
    fn drive_opponent(&mut self, id: PlayerId) {
        let Some(mut brain) = self.opponents.remove(&id) else {
            return;
        };
        let action = {
            let (Some(player), Some(board)) = (self.players.get(&id), self.boards.get(&id)) else {
                self.opponents.insert(id, brain);
                return;
            };
            let others: Vec<PlayerId> = self
                .players
                .values()
                .filter(|p| p.id != id && p.is_playing())
                .map(|p| p.id)
                .collect();
            let view = OpponentView {
                player,
                board,
                opponents: &others,
            };
            brain.get_action(&view, &mut self.rng)
        };
        self.opponents.insert(id, brain);

        match action {
            OpponentAction::Wait => {}
            OpponentAction::Move(direction) => {
                self.move_block(id, direction);
            }
            OpponentAction::Rotate { clockwise } => {
                self.rotate_block(id, clockwise);
            }
            OpponentAction::Drop { hard } => {
                self.drop_block(id, hard);
            }
            OpponentAction::Cast { spell, target } => {
                self.cast_spell(id, spell, target);
            }
        }
    }
}

impl std::fmt::Debug for GameInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameInstance")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("phase", &self.phase)
            .field("players", &self.players.len())
            .field("time", &self.current_time)
            .finish()
    }
}
