use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::dao::{
    models::{
        GameEntity, GameId, GamePatch, NewGame, NewPlayer, NewRequest, NewRound, PlayEntity,
        PlayPatch, PlayerEntity, PlayerId, PlayerPatch, RequestEntity, RequestId, RequestPatch,
        RoundEntity, RoundId, RoundPatch,
    },
    storage::{StorageResult, UpdateOutcome},
    store::DataStore,
};

/// In-process reference backend keeping every table in memory.
///
/// Tables are `IndexMap`s so scans observe insertion order, which the round
/// fallback in the forfeit path relies on. Ids are handed out sequentially
/// per table.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Tables>,
}

#[derive(Default)]
struct Tables {
    players: RwLock<IndexMap<PlayerId, PlayerEntity>>,
    games: RwLock<IndexMap<GameId, GameEntity>>,
    rounds: RwLock<IndexMap<RoundId, RoundEntity>>,
    plays: RwLock<IndexMap<(RoundId, PlayerId), PlayEntity>>,
    requests: RwLock<IndexMap<RequestId, RequestEntity>>,
    next_player_id: AtomicI64,
    next_game_id: AtomicI64,
    next_round_id: AtomicI64,
    next_request_id: AtomicI64,
}

impl MemoryStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_id(counter: &AtomicI64) -> i64 {
    counter.fetch_add(1, Ordering::Relaxed) + 1
}

impl DataStore for MemoryStore {
    fn insert_player(&self, player: NewPlayer) -> BoxFuture<'static, StorageResult<PlayerEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let entity = PlayerEntity {
                id: next_id(&inner.next_player_id),
                nickname: player.nickname,
                email: player.email,
                password: player.password,
                current_streak: 0,
                max_streak: 0,
                registration_date: player.registration_date,
            };
            inner.players.write().await.insert(entity.id, entity.clone());
            Ok(entity)
        })
    }

    fn find_player(&self, id: PlayerId) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.players.read().await.get(&id).cloned()) })
    }

    fn find_player_by_nickname(
        &self,
        nickname: String,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .players
                .read()
                .await
                .values()
                .find(|player| player.nickname == nickname)
                .cloned())
        })
    }

    fn update_player(
        &self,
        id: PlayerId,
        patch: PlayerPatch,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut players = inner.players.write().await;
            let Some(player) = players.get_mut(&id) else {
                return Ok(UpdateOutcome::NotFound);
            };
            let mut changed = false;
            if let Some(value) = patch.current_streak
                && player.current_streak != value
            {
                player.current_streak = value;
                changed = true;
            }
            if let Some(value) = patch.max_streak
                && player.max_streak != value
            {
                player.max_streak = value;
                changed = true;
            }
            Ok(outcome(changed))
        })
    }

    fn insert_game(&self, game: NewGame) -> BoxFuture<'static, StorageResult<GameEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let entity = GameEntity {
                id: next_id(&inner.next_game_id),
                creator: game.creator,
                owner: game.owner,
                state: game.state,
                created_at: game.created_at,
            };
            inner.games.write().await.insert(entity.id, entity.clone());
            Ok(entity)
        })
    }

    fn find_game(&self, id: GameId) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.games.read().await.get(&id).cloned()) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.games.read().await.values().cloned().collect()) })
    }

    fn update_game(
        &self,
        id: GameId,
        patch: GamePatch,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut games = inner.games.write().await;
            let Some(game) = games.get_mut(&id) else {
                return Ok(UpdateOutcome::NotFound);
            };
            let mut changed = false;
            if let Some(owner) = patch.owner
                && game.owner != owner
            {
                game.owner = owner;
                changed = true;
            }
            if let Some(state) = patch.state
                && game.state != state
            {
                game.state = state;
                changed = true;
            }
            Ok(outcome(changed))
        })
    }

    fn delete_game(&self, id: GameId) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.games.write().await.shift_remove(&id).is_some()) })
    }

    fn insert_round(&self, round: NewRound) -> BoxFuture<'static, StorageResult<RoundEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let entity = RoundEntity {
                id: next_id(&inner.next_round_id),
                game_id: round.game_id,
                state: round.state,
                board: round.board,
                start_time: round.start_time,
                end_time: None,
                duration_secs: round.duration_secs,
            };
            inner.rounds.write().await.insert(entity.id, entity.clone());
            Ok(entity)
        })
    }

    fn find_round(&self, id: RoundId) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.rounds.read().await.get(&id).cloned()) })
    }

    fn list_rounds_by_game(
        &self,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .rounds
                .read()
                .await
                .values()
                .filter(|round| round.game_id == game_id)
                .cloned()
                .collect())
        })
    }

    fn update_round(
        &self,
        id: RoundId,
        patch: RoundPatch,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut rounds = inner.rounds.write().await;
            let Some(round) = rounds.get_mut(&id) else {
                return Ok(UpdateOutcome::NotFound);
            };
            let mut changed = false;
            if let Some(state) = patch.state
                && round.state != state
            {
                round.state = state;
                changed = true;
            }
            if let Some(board) = patch.board
                && round.board != board
            {
                round.board = board;
                changed = true;
            }
            if let Some(end_time) = patch.end_time
                && round.end_time != Some(end_time)
            {
                round.end_time = Some(end_time);
                changed = true;
            }
            Ok(outcome(changed))
        })
    }

    fn insert_play(&self, play: PlayEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner
                .plays
                .write()
                .await
                .insert((play.round_id, play.player_id), play);
            Ok(())
        })
    }

    fn list_plays_by_round(
        &self,
        round_id: RoundId,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .plays
                .read()
                .await
                .values()
                .filter(|play| play.round_id == round_id)
                .cloned()
                .collect())
        })
    }

    fn update_play(
        &self,
        round_id: RoundId,
        player_id: PlayerId,
        patch: PlayPatch,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut plays = inner.plays.write().await;
            let Some(play) = plays.get_mut(&(round_id, player_id)) else {
                return Ok(UpdateOutcome::NotFound);
            };
            let mut changed = false;
            if let Some(result) = patch.result
                && play.result != Some(result)
            {
                play.result = Some(result);
                changed = true;
            }
            Ok(outcome(changed))
        })
    }

    fn insert_request(
        &self,
        request: NewRequest,
    ) -> BoxFuture<'static, StorageResult<RequestEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let entity = RequestEntity {
                id: next_id(&inner.next_request_id),
                game_id: request.game_id,
                player_id: request.player_id,
                state: request.state,
                created_at: request.created_at,
            };
            inner
                .requests
                .write()
                .await
                .insert(entity.id, entity.clone());
            Ok(entity)
        })
    }

    fn find_request(
        &self,
        id: RequestId,
    ) -> BoxFuture<'static, StorageResult<Option<RequestEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.requests.read().await.get(&id).cloned()) })
    }

    fn list_requests(&self) -> BoxFuture<'static, StorageResult<Vec<RequestEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.requests.read().await.values().cloned().collect()) })
    }

    fn update_request(
        &self,
        id: RequestId,
        patch: RequestPatch,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut requests = inner.requests.write().await;
            let Some(request) = requests.get_mut(&id) else {
                return Ok(UpdateOutcome::NotFound);
            };
            let mut changed = false;
            if let Some(state) = patch.state
                && request.state != state
            {
                request.state = state;
                changed = true;
            }
            Ok(outcome(changed))
        })
    }

    fn delete_request(&self, id: RequestId) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.requests.write().await.shift_remove(&id).is_some()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

fn outcome(changed: bool) -> UpdateOutcome {
    if changed {
        UpdateOutcome::Updated
    } else {
        UpdateOutcome::NotModified
    }
}
