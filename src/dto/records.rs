use serde::Serialize;

use crate::{
    dao::models::{
        GameEntity, GameId, GameState, PlayEntity, PlayResult, PlayerEntity, PlayerId,
        RequestEntity, RequestId, RequestState, RoundEntity, RoundId, RoundState,
    },
    dto::format_system_time,
    state::board::Board,
};

/// Game row hydrated with participant nicknames, as it travels to clients.
#[derive(Debug, Clone, Serialize)]
pub struct GameRecord {
    pub id_game: GameId,
    pub id_creator: PlayerId,
    pub creator_nickname: String,
    pub id_owner: PlayerId,
    pub owner_nickname: String,
    pub state: GameState,
    pub created_at: String,
}

impl GameRecord {
    /// Combine a game row with the nicknames of its creator and owner.
    pub fn new(game: &GameEntity, creator_nickname: String, owner_nickname: String) -> Self {
        Self {
            id_game: game.id,
            id_creator: game.creator,
            creator_nickname,
            id_owner: game.owner,
            owner_nickname,
            state: game.state,
            created_at: format_system_time(game.created_at),
        }
    }
}

/// One participant's seat inside a hydrated round record.
#[derive(Debug, Clone, Serialize)]
pub struct RoundPlayerRecord {
    pub id_player: PlayerId,
    pub nickname: String,
    pub player_number: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PlayResult>,
}

impl RoundPlayerRecord {
    /// Combine a play row with its player's nickname.
    pub fn new(play: &PlayEntity, nickname: String) -> Self {
        Self {
            id_player: play.player_id,
            nickname,
            player_number: play.player_number,
            result: play.result,
        }
    }
}

/// Round row hydrated with both participants, as it travels to clients.
#[derive(Debug, Clone, Serialize)]
pub struct RoundRecord {
    pub id_round: RoundId,
    pub id_game: GameId,
    pub state: RoundState,
    pub board: Board,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub duration_secs: u64,
    pub players: Vec<RoundPlayerRecord>,
}

impl RoundRecord {
    /// Combine a round row with its hydrated seats.
    pub fn new(round: &RoundEntity, players: Vec<RoundPlayerRecord>) -> Self {
        Self {
            id_round: round.id,
            id_game: round.game_id,
            state: round.state,
            board: round.board.clone(),
            start_time: format_system_time(round.start_time),
            end_time: round.end_time.map(format_system_time),
            duration_secs: round.duration_secs,
            players,
        }
    }
}

/// Public view of a player. Credentials never appear here.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerRecord {
    pub id_player: PlayerId,
    pub nickname: String,
    pub current_streak: u32,
    pub max_streak: u32,
    pub registration_date: String,
}

impl From<&PlayerEntity> for PlayerRecord {
    fn from(player: &PlayerEntity) -> Self {
        Self {
            id_player: player.id,
            nickname: player.nickname.clone(),
            current_streak: player.current_streak,
            max_streak: player.max_streak,
            registration_date: format_system_time(player.registration_date),
        }
    }
}

/// Participation request hydrated with the sender's nickname.
#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub id_request: RequestId,
    pub id_game: GameId,
    pub id_player: PlayerId,
    pub player_nickname: String,
    pub state: RequestState,
    pub created_at: String,
}

impl RequestRecord {
    /// Combine a request row with its sender's nickname.
    pub fn new(request: &RequestEntity, player_nickname: String) -> Self {
        Self {
            id_request: request.id,
            id_game: request.game_id,
            id_player: request.player_id,
            player_nickname,
            state: request.state,
            created_at: format_system_time(request.created_at),
        }
    }
}
