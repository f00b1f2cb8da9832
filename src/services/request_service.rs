use std::time::SystemTime;

use tracing::info;

use crate::{
    dao::models::{
        GameId, GamePatch, GameState, NewRequest, PlayerId, RequestId, RequestPatch, RequestState,
    },
    dao::store::DataStore,
    dto::records::{RequestRecord, RoundRecord},
    error::ServiceError,
    services::{notifications, public_service, round_service},
    state::SharedState,
};

/// File a request to join a game that has not started yet.
pub async fn send(
    state: &SharedState,
    game_id: GameId,
    player_id: PlayerId,
) -> Result<RequestRecord, ServiceError> {
    let store = state.store();
    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` does not exist")))?;

    if game.state != GameState::New {
        return Err(ServiceError::InvalidState(
            "game is not open for participation".into(),
        ));
    }

    let player = store
        .find_player(player_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("player `{player_id}` does not exist")))?;

    if player.id == game.creator {
        return Err(ServiceError::InvalidInput(
            "the creator already participates in the game".into(),
        ));
    }

    let duplicate = store.list_requests().await?.into_iter().any(|request| {
        request.game_id == game_id
            && request.player_id == player_id
            && request.state == RequestState::Pending
    });
    if duplicate {
        return Err(ServiceError::InvalidState(
            "a pending request for this game already exists".into(),
        ));
    }

    let request = store
        .insert_request(NewRequest {
            game_id,
            player_id,
            state: RequestState::Pending,
            created_at: SystemTime::now(),
        })
        .await?;

    let record = RequestRecord::new(&request, player.nickname);
    notifications::unicast_request_received(state, game.creator, &record)?;

    info!(request_id = request.id, game_id, player_id, "participation requested");
    Ok(record)
}

/// Accept a pending request: the game's first round starts with the owner in
/// seat 1 and the requester in seat 2.
pub async fn accept(
    state: &SharedState,
    request_id: RequestId,
    owner_id: PlayerId,
) -> Result<RoundRecord, ServiceError> {
    let store = state.store();
    let request = store
        .find_request(request_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("request `{request_id}` does not exist")))?;

    let game = store.find_game(request.game_id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("game `{}` no longer exists", request.game_id))
    })?;

    if owner_id != game.owner {
        return Err(ServiceError::Forbidden(
            "only the game owner can accept requests".into(),
        ));
    }
    if request.state != RequestState::Pending {
        return Err(ServiceError::InvalidState(
            "request was already decided".into(),
        ));
    }

    let outcome = store
        .update_request(request_id, RequestPatch::state(RequestState::Accepted))
        .await?;
    if !outcome.found() {
        return Err(ServiceError::Internal(format!(
            "request `{request_id}` vanished while accepting"
        )));
    }

    let round = round_service::start_round(state, game.id, game.owner, request.player_id).await?;
    let outcome = store
        .update_game(game.id, GamePatch::new().state(GameState::Active))
        .await?;
    if !outcome.found() {
        return Err(ServiceError::Internal(format!(
            "game `{}` vanished while starting its first round",
            game.id
        )));
    }

    let record = public_service::hydrate_round(state, &round).await?;
    notifications::unicast_round_started(state, &[game.owner, request.player_id], &record);

    info!(
        request_id,
        game_id = game.id,
        round_id = round.id,
        "participation accepted"
    );
    Ok(record)
}

/// Withdraw a pending request. The game creator hears about it before the row
/// disappears; if that notification cannot be built the row stays.
pub async fn cancel(
    state: &SharedState,
    request_id: RequestId,
    player_id: PlayerId,
) -> Result<(), ServiceError> {
    let store = state.store();
    let request = store
        .find_request(request_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("request `{request_id}` does not exist")))?;

    if player_id != request.player_id {
        return Err(ServiceError::Forbidden(
            "only the sender can cancel a request".into(),
        ));
    }

    if let Some(game) = store.find_game(request.game_id).await? {
        notifications::unicast_request_cancelled(state, game.creator, request_id)?;
    }

    if !store.delete_request(request_id).await? {
        return Err(ServiceError::NotFound(format!(
            "request `{request_id}` does not exist"
        )));
    }

    info!(request_id, player_id, "participation request cancelled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::{
        dao::models::{NewGame, RoundState},
        state::testing::{connect, next_frame, seed_player, state},
    };

    async fn seed_new_game(state: &SharedState, creator: PlayerId) -> GameId {
        state
            .store()
            .insert_game(NewGame {
                creator,
                owner: creator,
                state: GameState::New,
                created_at: SystemTime::now(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn send_then_accept_starts_the_first_round() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let game_id = seed_new_game(&state, ada.id).await;
        let mut ada_rx = connect(&state, &ada);

        let request = send(&state, game_id, bob.id).await.unwrap();
        assert_eq!(request.player_nickname, "bob");
        let frame = next_frame(&mut ada_rx);
        assert_eq!(frame["event"], "request_received");

        let round = accept(&state, request.id_request, ada.id).await.unwrap();
        assert_eq!(round.state, RoundState::Active);
        let seat = |number| {
            round
                .players
                .iter()
                .find(|p| p.player_number == number)
                .unwrap()
                .id_player
        };
        assert_eq!(seat(1), ada.id);
        assert_eq!(seat(2), bob.id);

        let game = state.store().find_game(game_id).await.unwrap().unwrap();
        assert_eq!(game.state, GameState::Active);

        let frame = next_frame(&mut ada_rx);
        assert_eq!(frame["event"], "round_started");
    }

    #[tokio::test]
    async fn duplicate_pending_requests_are_rejected() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let game_id = seed_new_game(&state, ada.id).await;

        send(&state, game_id, bob.id).await.unwrap();
        let err = send(&state, game_id, bob.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn requests_only_target_new_games() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let game_id = seed_new_game(&state, ada.id).await;
        state
            .store()
            .update_game(game_id, GamePatch::new().state(GameState::Waiting))
            .await
            .unwrap();

        let err = send(&state, game_id, bob.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn the_creator_cannot_request_their_own_game() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let game_id = seed_new_game(&state, ada.id).await;

        let err = send(&state, game_id, ada.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn only_the_owner_accepts_and_only_the_sender_cancels() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let eve = seed_player(&state, "eve").await;
        let game_id = seed_new_game(&state, ada.id).await;

        let request = send(&state, game_id, bob.id).await.unwrap();

        let err = accept(&state, request.id_request, eve.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = cancel(&state, request.id_request, eve.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn cancelling_notifies_the_creator_then_deletes() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let game_id = seed_new_game(&state, ada.id).await;
        let request = send(&state, game_id, bob.id).await.unwrap();
        let mut ada_rx = connect(&state, &ada);

        cancel(&state, request.id_request, bob.id).await.unwrap();
        assert!(
            state
                .store()
                .find_request(request.id_request)
                .await
                .unwrap()
                .is_none()
        );

        let frame = next_frame(&mut ada_rx);
        assert_eq!(frame["event"], "request_cancelled");
        assert_eq!(frame["payload"]["id_request"], request.id_request);
    }

    #[tokio::test]
    async fn accepted_requests_cannot_be_decided_twice() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let game_id = seed_new_game(&state, ada.id).await;

        let request = send(&state, game_id, bob.id).await.unwrap();
        accept(&state, request.id_request, ada.id).await.unwrap();

        let err = accept(&state, request.id_request, ada.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }
}
