//! Registry of live game instances
//!
//! The registry is the concurrency boundary: each instance sits behind its
//! own `Arc<Mutex<..>>`, so ticking or acting on one game never blocks
//! another. The registry also owns the wall clock; instances themselves
//! only ever see the `dt` handed to them by [`GameRegistry::tick_all`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::error::GameError;
use crate::game::GameInstance;
use crate::physics::PhysicsPort;
use crate::types::{GameId, GameMode, GamePhase};

/// Shared handle to one instance.
pub type SharedGame = Arc<Mutex<GameInstance>>;

struct Entry {
    game: SharedGame,
    /// Last time `tick_all` visited this entry, running or not.
    last_tick: Instant,
    /// Last time the instance actually advanced. Terminal and paused games
    /// stop refreshing this, which is what cleanup ages against.
    last_active: Instant,
}

/// Flat description of one registered game, for listings.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    pub id: GameId,
    pub mode: GameMode,
    pub phase: GamePhase,
    pub players: usize,
}

/// Owns every live instance and drives their clocks.
pub struct GameRegistry {
    games: HashMap<GameId, Entry>,
    next_id: u64,
}

impl GameRegistry {
    pub fn new() -> Self {
        GameRegistry {
            games: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Create a fresh instance with a unique id and register it.
    pub fn create_game(
        &mut self,
        mode: GameMode,
        config: GameConfig,
        physics: Box<dyn PhysicsPort>,
        seed: u64,
    ) -> GameId {
        let id = GameId(self.next_id);
        self.next_id += 1;
        let game = GameInstance::new(id, mode, config, physics, seed);
        let now = Instant::now();
        self.games.insert(
            id,
            Entry {
                game: Arc::new(Mutex::new(game)),
                last_tick: now,
                last_active: now,
            },
        );
        info!(game = %id, mode = mode.as_str(), "game registered");
        id
    }

    /// Shared handle for acting on a game from transports or tests.
    pub fn get(&self, id: GameId) -> Option<SharedGame> {
        self.games.get(&id).map(|entry| Arc::clone(&entry.game))
    }

    pub fn remove(&mut self, id: GameId) -> Result<(), GameError> {
        match self.games.remove(&id) {
            Some(_) => {
                info!(game = %id, "game removed");
                Ok(())
            }
            None => Err(GameError::UnknownGame(id)),
        }
    }

    pub fn summaries(&self) -> Vec<GameSummary> {
        let mut list: Vec<GameSummary> = self
            .games
            .values()
            .map(|entry| {
                let game = entry.game.lock();
                GameSummary {
                    id: game.id(),
                    mode: game.mode(),
                    phase: game.phase(),
                    players: game.player_count(),
                }
            })
            .collect();
        list.sort_by_key(|s| s.id);
        list
    }

    /// Advance every running game by the wall-clock time elapsed since its
    /// previous visit.
    pub fn tick_all(&mut self) {
        let now = Instant::now();
        for entry in self.games.values_mut() {
            let dt = now.duration_since(entry.last_tick).as_secs_f32();
            entry.last_tick = now;
            let mut game = entry.game.lock();
            if game.phase() == GamePhase::Running {
                game.update(dt);
                entry.last_active = now;
            }
        }
    }

    /// Drop terminal games that have sat idle longer than `max_age`.
    /// Returns how many were reclaimed.
    pub fn cleanup(&mut self, max_age: Duration) -> usize {
        let now = Instant::now();
        let stale: Vec<GameId> = self
            .games
            .iter()
            .filter(|(_, entry)| {
                let game = entry.game.lock();
                game.phase().is_terminal()
                    && now.duration_since(entry.last_active) >= max_age
            })
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            self.games.remove(id);
            debug!(game = %id, "stale game reclaimed");
        }
        stale.len()
    }
}

impl Default for GameRegistry {
    fn default() -> Self {
        GameRegistry::new()
    }
}
