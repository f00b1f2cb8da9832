use serde::Serialize;

use crate::dao::models::{GameId, RequestId};

/// Envelope wrapping every pushed notification.
#[derive(Debug, Serialize)]
pub struct ServerEvent<'a, T: Serialize> {
    /// Event name, e.g. `game_started`.
    pub event: &'a str,
    /// Event-specific payload.
    pub payload: &'a T,
}

impl<'a, T: Serialize> ServerEvent<'a, T> {
    /// Serialize the event to a wire frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Payload announcing that a game was removed.
#[derive(Debug, Serialize)]
pub struct GameCancelledEvent {
    pub id_game: GameId,
}

/// Payload announcing that a participation request was withdrawn.
#[derive(Debug, Serialize)]
pub struct RequestCancelledEvent {
    pub id_request: RequestId,
}
