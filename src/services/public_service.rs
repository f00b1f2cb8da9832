use std::str::FromStr;

use crate::{
    dao::models::{GameEntity, GameState, PlayerId, RequestState, RoundEntity, RoundId},
    dao::store::DataStore,
    dto::records::{GameRecord, RequestRecord, RoundPlayerRecord, RoundRecord},
    error::ServiceError,
    state::SharedState,
};

/// Status filter accepted by the game listing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatusFilter {
    /// Every game regardless of state.
    All,
    /// Only games in the given state.
    State(GameState),
}

impl FromStr for GameStatusFilter {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(GameStatusFilter::All),
            "new" => Ok(GameStatusFilter::State(GameState::New)),
            "active" => Ok(GameStatusFilter::State(GameState::Active)),
            "waiting" => Ok(GameStatusFilter::State(GameState::Waiting)),
            "finished" => Ok(GameStatusFilter::State(GameState::Finished)),
            other => Err(ServiceError::InvalidInput(format!(
                "unknown status filter `{other}`"
            ))),
        }
    }
}

impl GameStatusFilter {
    fn matches(self, state: GameState) -> bool {
        match self {
            GameStatusFilter::All => true,
            GameStatusFilter::State(wanted) => state == wanted,
        }
    }
}

/// Attach creator and owner nicknames to a game row.
pub async fn hydrate_game(
    state: &SharedState,
    game: &GameEntity,
) -> Result<GameRecord, ServiceError> {
    let creator = nickname_of(state, game.creator).await?;
    let owner = if game.owner == game.creator {
        creator.clone()
    } else {
        nickname_of(state, game.owner).await?
    };
    Ok(GameRecord::new(game, creator, owner))
}

/// Attach both seats, with nicknames and results, to a round row.
pub async fn hydrate_round(
    state: &SharedState,
    round: &RoundEntity,
) -> Result<RoundRecord, ServiceError> {
    let plays = state.store().list_plays_by_round(round.id).await?;
    let mut players = Vec::with_capacity(plays.len());
    for play in &plays {
        let nickname = nickname_of(state, play.player_id).await?;
        players.push(RoundPlayerRecord::new(play, nickname));
    }
    Ok(RoundRecord::new(round, players))
}

/// List games matching a textual status filter, hydrated with nicknames.
pub async fn games_get_public_info(
    state: &SharedState,
    status: &str,
) -> Result<Vec<GameRecord>, ServiceError> {
    let filter: GameStatusFilter = status.parse()?;
    let games = state.store().list_games().await?;

    let mut records = Vec::new();
    for game in games.iter().filter(|game| filter.matches(game.state)) {
        records.push(hydrate_game(state, game).await?);
    }
    Ok(records)
}

/// Fully-hydrated view of a single round.
pub async fn round_get_public_info(
    state: &SharedState,
    round_id: RoundId,
) -> Result<RoundRecord, ServiceError> {
    let round = state
        .store()
        .find_round(round_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("round `{round_id}` does not exist")))?;
    hydrate_round(state, &round).await
}

/// Pending participation requests for every game owned by `owner_id`.
pub async fn requests_get_public_info(
    state: &SharedState,
    owner_id: PlayerId,
) -> Result<Vec<RequestRecord>, ServiceError> {
    let store = state.store();
    let games = store.list_games().await?;
    let requests = store.list_requests().await?;

    let mut records = Vec::new();
    for request in requests {
        if request.state != RequestState::Pending {
            continue;
        }
        let owned = games
            .iter()
            .any(|game| game.id == request.game_id && game.owner == owner_id);
        if !owned {
            continue;
        }
        let nickname = nickname_of(state, request.player_id).await?;
        records.push(RequestRecord::new(&request, nickname));
    }
    Ok(records)
}

/// Nickname of a player that other rows reference. A missing row here means
/// the referencing data is corrupt, not that the caller asked for something
/// absent.
async fn nickname_of(state: &SharedState, player_id: PlayerId) -> Result<String, ServiceError> {
    state
        .store()
        .find_player(player_id)
        .await?
        .map(|player| player.nickname)
        .ok_or_else(|| ServiceError::Internal(format!("player `{player_id}` is referenced but missing")))
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::{
        dao::models::NewGame,
        state::testing::{seed_player, state},
    };

    async fn seed_game(
        state: &crate::state::SharedState,
        creator: PlayerId,
        game_state: GameState,
    ) -> GameEntity {
        state
            .store()
            .insert_game(NewGame {
                creator,
                owner: creator,
                state: game_state,
                created_at: SystemTime::now(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn listing_filters_by_state() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        seed_game(&state, ada.id, GameState::New).await;
        let active = seed_game(&state, ada.id, GameState::Active).await;
        seed_game(&state, ada.id, GameState::Waiting).await;

        let records = games_get_public_info(&state, "active").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id_game, active.id);
        assert_eq!(records[0].creator_nickname, "ada");

        let all = games_get_public_info(&state, "all").await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn unknown_filter_is_invalid_input() {
        let state = state();
        let err = games_get_public_info(&state, "paused").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn hydration_resolves_distinct_creator_and_owner() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let mut game = seed_game(&state, ada.id, GameState::Waiting).await;
        game.owner = bob.id;

        let record = hydrate_game(&state, &game).await.unwrap();
        assert_eq!(record.creator_nickname, "ada");
        assert_eq!(record.owner_nickname, "bob");
    }
}
