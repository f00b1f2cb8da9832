use tracing::info;

use crate::{
    dao::models::{GameId, GamePatch, GameState, PlayerId, RoundState},
    dao::store::DataStore,
    dto::records::RoundRecord,
    error::ServiceError,
    services::{notifications, public_service, round_service},
    state::SharedState,
};

/// Result of one rematch handshake step.
#[derive(Debug)]
pub enum RematchOutcome {
    /// The caller's request is recorded; the opponent has not answered yet.
    Waiting,
    /// Both players agreed; a fresh round is running.
    Started(RoundRecord),
    /// A round is already active, so there is nothing to negotiate.
    InProgress,
}

/// Drive the rematch handshake for `requester` on `game_id`.
///
/// The first caller is parked as pending; the same caller clicking again
/// changes nothing; a different caller completes the handshake and starts the
/// round, first requester in seat 1.
///
/// The ledger lock is held across the duplicate-round guard, the pending-map
/// mutation and the round creation, so two near-simultaneous accepts cannot
/// both pass the guard.
pub async fn accept_rematch(
    state: &SharedState,
    game_id: GameId,
    requester: PlayerId,
) -> Result<RematchOutcome, ServiceError> {
    let store = state.store();
    let mut pending = state.rematch().lock().await;

    store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` does not exist")))?;

    let rounds = store.list_rounds_by_game(game_id).await?;
    if rounds.iter().any(|round| round.state == RoundState::Active) {
        return Ok(RematchOutcome::InProgress);
    }

    match pending.get(&game_id).copied() {
        None => {
            pending.insert(game_id, requester);
            info!(game_id, requester, "rematch requested, waiting for opponent");
            Ok(RematchOutcome::Waiting)
        }
        Some(first) if first == requester => Ok(RematchOutcome::Waiting),
        Some(first) => {
            pending.remove(&game_id);

            let round = round_service::start_round(state, game_id, first, requester).await?;
            let outcome = store
                .update_game(game_id, GamePatch::new().state(GameState::Active))
                .await?;
            if !outcome.found() {
                return Err(ServiceError::Internal(format!(
                    "game `{game_id}` vanished while starting a rematch"
                )));
            }

            let record = public_service::hydrate_round(state, &round).await?;
            // The round exists and is the source of truth; delivery problems
            // are logged, never surfaced.
            notifications::unicast_round_started(state, &[first, requester], &record);

            info!(
                game_id,
                round_id = round.id,
                player_one = first,
                player_two = requester,
                "rematch accepted"
            );
            Ok(RematchOutcome::Started(record))
        }
    }
}
