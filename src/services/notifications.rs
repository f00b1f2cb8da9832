use serde::Serialize;
use tracing::warn;

use crate::{
    dao::models::{GameId, PlayerId, RequestId},
    dto::{
        events::{GameCancelledEvent, RequestCancelledEvent, ServerEvent},
        records::{GameRecord, RequestRecord, RoundRecord},
    },
    error::ServiceError,
    state::{SharedState, sessions::ConnectionId},
};

const EVENT_GAME_STARTED: &str = "game_started";
const EVENT_GAME_RECORD: &str = "game_record";
const EVENT_GAME_ENDED: &str = "game_ended";
const EVENT_GAME_CANCELLED: &str = "game_cancelled";
const EVENT_GAME_WAITING: &str = "game_waiting";
const EVENT_ROUND_STARTED: &str = "round_started";
const EVENT_ROUND_FINISHED: &str = "round_finished";
const EVENT_REQUEST_RECEIVED: &str = "request_received";
const EVENT_REQUEST_CANCELLED: &str = "request_cancelled";

/// Announce a freshly created game to everyone except its creator.
pub fn broadcast_game_started(
    state: &SharedState,
    game: &GameRecord,
    exclude: Option<ConnectionId>,
) -> Result<(), ServiceError> {
    let frame = build_frame(EVENT_GAME_STARTED, game)?;
    broadcast(state, EVENT_GAME_STARTED, &frame, exclude);
    Ok(())
}

/// Push the hydrated game record to its owner.
pub fn unicast_game_record(
    state: &SharedState,
    player_id: PlayerId,
    game: &GameRecord,
) -> Result<(), ServiceError> {
    let frame = build_frame(EVENT_GAME_RECORD, game)?;
    unicast(state, EVENT_GAME_RECORD, player_id, &frame);
    Ok(())
}

/// Announce that a game reached its final state.
pub fn broadcast_game_ended(
    state: &SharedState,
    game: &GameRecord,
    exclude: Option<ConnectionId>,
) -> Result<(), ServiceError> {
    let frame = build_frame(EVENT_GAME_ENDED, game)?;
    broadcast(state, EVENT_GAME_ENDED, &frame, exclude);
    Ok(())
}

/// Announce that a game is being removed. Called before the row is deleted;
/// a construction failure here aborts the cancellation.
pub fn broadcast_game_cancelled(
    state: &SharedState,
    id_game: GameId,
    exclude: Option<ConnectionId>,
) -> Result<(), ServiceError> {
    let frame = build_frame(EVENT_GAME_CANCELLED, &GameCancelledEvent { id_game })?;
    broadcast(state, EVENT_GAME_CANCELLED, &frame, exclude);
    Ok(())
}

/// Tell a game's owner that the game went back to waiting.
pub fn unicast_game_waiting(
    state: &SharedState,
    player_id: PlayerId,
    game: &GameRecord,
) -> Result<(), ServiceError> {
    let frame = build_frame(EVENT_GAME_WAITING, game)?;
    unicast(state, EVENT_GAME_WAITING, player_id, &frame);
    Ok(())
}

/// Push a freshly started round to each participant.
///
/// The round already exists and is the source of truth, so every failure here
/// (including payload construction) is logged and swallowed.
pub fn unicast_round_started(state: &SharedState, participants: &[PlayerId], round: &RoundRecord) {
    let frame = match build_frame(EVENT_ROUND_STARTED, round) {
        Ok(frame) => frame,
        Err(_) => return,
    };
    for &player_id in participants {
        unicast(state, EVENT_ROUND_STARTED, player_id, &frame);
    }
}

/// Push a concluded round, results included, to each participant.
pub fn unicast_round_finished(
    state: &SharedState,
    participants: &[PlayerId],
    round: &RoundRecord,
) -> Result<(), ServiceError> {
    let frame = build_frame(EVENT_ROUND_FINISHED, round)?;
    for &player_id in participants {
        unicast(state, EVENT_ROUND_FINISHED, player_id, &frame);
    }
    Ok(())
}

/// Tell a game's creator that someone wants to join.
pub fn unicast_request_received(
    state: &SharedState,
    player_id: PlayerId,
    request: &RequestRecord,
) -> Result<(), ServiceError> {
    let frame = build_frame(EVENT_REQUEST_RECEIVED, request)?;
    unicast(state, EVENT_REQUEST_RECEIVED, player_id, &frame);
    Ok(())
}

/// Tell a game's creator that a join request was withdrawn. Called before the
/// row is deleted; a construction failure aborts the cancellation.
pub fn unicast_request_cancelled(
    state: &SharedState,
    player_id: PlayerId,
    id_request: RequestId,
) -> Result<(), ServiceError> {
    let frame = build_frame(
        EVENT_REQUEST_CANCELLED,
        &RequestCancelledEvent { id_request },
    )?;
    unicast(state, EVENT_REQUEST_CANCELLED, player_id, &frame);
    Ok(())
}

/// Serialize an event envelope. A failure here means the payload itself is
/// broken, which aborts the triggering operation.
fn build_frame<T: Serialize>(event: &str, payload: &T) -> Result<String, ServiceError> {
    ServerEvent { event, payload }.to_frame().map_err(|err| {
        warn!(event, error = %err, "failed to serialize event payload");
        ServiceError::Internal(format!("failed to serialize `{event}` event"))
    })
}

/// Deliver a frame to every session except `exclude`, logging the recipients
/// whose writer was already gone. Delivery failures are never escalated.
fn broadcast(state: &SharedState, event: &str, frame: &str, exclude: Option<ConnectionId>) {
    for outcome in state.sessions().deliver_to_all(frame, exclude) {
        if !outcome.delivered {
            warn!(
                event,
                player_id = outcome.player_id,
                "dropped notification: connection writer closed"
            );
        }
    }
}

/// Deliver a frame to one player's session, if connected.
fn unicast(state: &SharedState, event: &str, player_id: PlayerId, frame: &str) {
    match state.sessions().deliver_to_player(player_id, frame) {
        Some(outcome) if !outcome.delivered => {
            warn!(
                event,
                player_id, "dropped notification: connection writer closed"
            );
        }
        Some(_) => {}
        None => {
            // Not signed in: undeliverable notifications are dropped, not queued.
        }
    }
}
