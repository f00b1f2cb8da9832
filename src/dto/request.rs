use serde::Deserialize;

use crate::dao::models::{GameId, PlayerId, RequestId, RoundId};

/// Requests accepted from client connections, tagged by their `action` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
pub enum ClientRequest {
    #[serde(rename = "player_signup")]
    PlayerSignup {
        nickname: String,
        email: String,
        password: String,
    },
    #[serde(rename = "player_signin")]
    PlayerSignin { nickname: String, password: String },
    #[serde(rename = "player_get_public_info")]
    PlayerGetPublicInfo { id_player: PlayerId },
    #[serde(rename = "games_get_public_info")]
    GamesGetPublicInfo { status: String },
    #[serde(rename = "game_start")]
    GameStart { id_creator: PlayerId },
    #[serde(rename = "game_end")]
    GameEnd { id_game: GameId, id_owner: PlayerId },
    #[serde(rename = "game_cancel")]
    GameCancel { id_game: GameId, id_owner: PlayerId },
    #[serde(rename = "game_refuse_rematch")]
    GameRefuseRematch { id_game: GameId },
    #[serde(rename = "game_accept_rematch")]
    GameAcceptRematch { id_game: GameId, id_player: PlayerId },
    #[serde(rename = "round_get_public_info")]
    RoundGetPublicInfo { id_round: RoundId },
    #[serde(rename = "round_make_move")]
    RoundMakeMove {
        id_round: RoundId,
        id_player: PlayerId,
        row: usize,
        col: usize,
    },
    #[serde(rename = "round_end")]
    RoundEnd { id_round: RoundId },
    #[serde(rename = "participation_request_send")]
    RequestSend { id_game: GameId, id_player: PlayerId },
    #[serde(rename = "participation_request_accept")]
    RequestAccept {
        id_request: RequestId,
        id_owner: PlayerId,
    },
    #[serde(rename = "participation_request_cancel")]
    RequestCancel {
        id_request: RequestId,
        id_player: PlayerId,
    },
    #[serde(rename = "requests_get_public_info")]
    RequestsGetPublicInfo { id_owner: PlayerId },
    #[serde(other)]
    Unknown,
}

impl ClientRequest {
    /// Action name echoed back in the direct response.
    pub fn action(&self) -> Option<&'static str> {
        match self {
            ClientRequest::PlayerSignup { .. } => Some("player_signup"),
            ClientRequest::PlayerSignin { .. } => Some("player_signin"),
            ClientRequest::PlayerGetPublicInfo { .. } => Some("player_get_public_info"),
            ClientRequest::GamesGetPublicInfo { .. } => Some("games_get_public_info"),
            ClientRequest::GameStart { .. } => Some("game_start"),
            ClientRequest::GameEnd { .. } => Some("game_end"),
            ClientRequest::GameCancel { .. } => Some("game_cancel"),
            ClientRequest::GameRefuseRematch { .. } => Some("game_refuse_rematch"),
            ClientRequest::GameAcceptRematch { .. } => Some("game_accept_rematch"),
            ClientRequest::RoundGetPublicInfo { .. } => Some("round_get_public_info"),
            ClientRequest::RoundMakeMove { .. } => Some("round_make_move"),
            ClientRequest::RoundEnd { .. } => Some("round_end"),
            ClientRequest::RequestSend { .. } => Some("participation_request_send"),
            ClientRequest::RequestAccept { .. } => Some("participation_request_accept"),
            ClientRequest::RequestCancel { .. } => Some("participation_request_cancel"),
            ClientRequest::RequestsGetPublicInfo { .. } => Some("requests_get_public_info"),
            ClientRequest::Unknown => None,
        }
    }
}
