use std::collections::HashMap;

use tokio::sync::{Mutex, MutexGuard};

use crate::dao::models::{GameId, PlayerId};

/// In-memory ledger of one-sided rematch requests, keyed by game.
///
/// At most one entry exists per game: the player who clicked first. The entry
/// is cleared when the opponent answers, when the request is refused, or when
/// the game is cancelled. Nothing here is persisted.
#[derive(Default)]
pub struct RematchLedger {
    pending: Mutex<HashMap<GameId, PlayerId>>,
}

impl RematchLedger {
    /// Construct an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the ledger lock.
    ///
    /// The accept handshake holds this guard across the duplicate-round check,
    /// the map mutation and the round creation, making the whole step one
    /// critical section.
    pub async fn lock(&self) -> MutexGuard<'_, HashMap<GameId, PlayerId>> {
        self.pending.lock().await
    }

    /// Drop any pending entry for `game_id`.
    pub async fn clear(&self, game_id: GameId) {
        self.pending.lock().await.remove(&game_id);
    }

    /// Player currently waiting on a rematch for `game_id`, if any.
    pub async fn pending_for(&self, game_id: GameId) -> Option<PlayerId> {
        self.pending.lock().await.get(&game_id).copied()
    }
}
