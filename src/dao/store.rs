use futures::future::BoxFuture;

use crate::dao::{
    models::{
        GameEntity, GameId, GamePatch, NewGame, NewPlayer, NewRequest, NewRound, PlayEntity,
        PlayPatch, PlayerEntity, PlayerId, PlayerPatch, RequestEntity, RequestId, RequestPatch,
        RoundEntity, RoundId, RoundPatch,
    },
    storage::{StorageResult, UpdateOutcome},
};

/// Abstraction over the persistence layer for every entity the game core
/// records.
///
/// `find_*` resolves to `None` when the row is absent; `update_*` applies a
/// field-change set and reports whether anything was written; `delete_*`
/// resolves to `false` when there was nothing to delete. Callers treat every
/// method as fallible and propagate failures without retry.
pub trait DataStore: Send + Sync {
    fn insert_player(&self, player: NewPlayer) -> BoxFuture<'static, StorageResult<PlayerEntity>>;
    fn find_player(&self, id: PlayerId) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    fn find_player_by_nickname(
        &self,
        nickname: String,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    fn update_player(
        &self,
        id: PlayerId,
        patch: PlayerPatch,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>>;

    fn insert_game(&self, game: NewGame) -> BoxFuture<'static, StorageResult<GameEntity>>;
    fn find_game(&self, id: GameId) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    fn update_game(
        &self,
        id: GameId,
        patch: GamePatch,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>>;
    fn delete_game(&self, id: GameId) -> BoxFuture<'static, StorageResult<bool>>;

    fn insert_round(&self, round: NewRound) -> BoxFuture<'static, StorageResult<RoundEntity>>;
    fn find_round(&self, id: RoundId) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// Rounds belonging to `game_id`, in creation order.
    fn list_rounds_by_game(
        &self,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>>;
    fn update_round(
        &self,
        id: RoundId,
        patch: RoundPatch,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>>;

    fn insert_play(&self, play: PlayEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Play rows for `round_id`, in seat order.
    fn list_plays_by_round(
        &self,
        round_id: RoundId,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayEntity>>>;
    fn update_play(
        &self,
        round_id: RoundId,
        player_id: PlayerId,
        patch: PlayPatch,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>>;

    fn insert_request(
        &self,
        request: NewRequest,
    ) -> BoxFuture<'static, StorageResult<RequestEntity>>;
    fn find_request(
        &self,
        id: RequestId,
    ) -> BoxFuture<'static, StorageResult<Option<RequestEntity>>>;
    fn list_requests(&self) -> BoxFuture<'static, StorageResult<Vec<RequestEntity>>>;
    fn update_request(
        &self,
        id: RequestId,
        patch: RequestPatch,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>>;
    fn delete_request(&self, id: RequestId) -> BoxFuture<'static, StorageResult<bool>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
