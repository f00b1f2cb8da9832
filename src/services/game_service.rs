use std::time::SystemTime;

use tracing::{info, warn};

use crate::{
    dao::models::{
        GameId, GamePatch, GameState, NewGame, PlayPatch, PlayResult, PlayerId, RoundEntity,
        RoundPatch, RoundState,
    },
    dao::store::DataStore,
    dto::records::GameRecord,
    error::ServiceError,
    services::{notifications, public_service},
    state::SharedState,
};

/// Result of a forfeit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForfeitOutcome {
    /// The game was already finished; the call changed nothing.
    AlreadyFinished,
    /// The leaver lost and the opponent now owns the game.
    Forfeited {
        /// The player awarded the win.
        winner: PlayerId,
    },
}

/// Create a game owned by its creator and announce it.
///
/// Everyone else learns a game started; the creator gets the hydrated record.
pub async fn start(state: &SharedState, creator: PlayerId) -> Result<GameRecord, ServiceError> {
    let store = state.store();
    let creator_row = store
        .find_player(creator)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("player `{creator}` does not exist")))?;

    let game = store
        .insert_game(NewGame {
            creator,
            owner: creator,
            state: GameState::New,
            created_at: SystemTime::now(),
        })
        .await?;

    let record = GameRecord::new(&game, creator_row.nickname.clone(), creator_row.nickname);
    let exclude = state
        .sessions()
        .find_by_player(creator)
        .map(|session| session.connection_id);
    notifications::broadcast_game_started(state, &record, exclude)?;
    notifications::unicast_game_record(state, game.owner, &record)?;

    info!(game_id = game.id, creator, "game started");
    Ok(record)
}

/// Move a game to its final state. Only the owner may do this.
pub async fn end(
    state: &SharedState,
    game_id: GameId,
    requester: PlayerId,
) -> Result<GameRecord, ServiceError> {
    let store = state.store();
    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` does not exist")))?;

    if requester != game.owner {
        return Err(ServiceError::Forbidden(
            "only the owner can end a game".into(),
        ));
    }

    // A finished game must not retain an active round.
    for round in store.list_rounds_by_game(game_id).await? {
        if round.state == RoundState::Active {
            store
                .update_round(
                    round.id,
                    RoundPatch::new()
                        .state(RoundState::Finished)
                        .end_time(SystemTime::now()),
                )
                .await?;
        }
    }

    let outcome = store
        .update_game(game_id, GamePatch::new().state(GameState::Finished))
        .await?;
    if !outcome.found() {
        return Err(ServiceError::NotFound(format!(
            "game `{game_id}` does not exist"
        )));
    }

    let updated = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::Internal(format!("game `{game_id}` vanished while ending")))?;
    let record = public_service::hydrate_game(state, &updated).await?;
    let exclude = state
        .sessions()
        .find_by_player(requester)
        .map(|session| session.connection_id);
    notifications::broadcast_game_ended(state, &record, exclude)?;

    info!(game_id, requester, "game ended");
    Ok(record)
}

/// Remove a game outright. Participants are notified first; if the
/// notification cannot even be built the row is left in place.
pub async fn cancel(
    state: &SharedState,
    game_id: GameId,
    requester: PlayerId,
) -> Result<(), ServiceError> {
    let store = state.store();
    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` does not exist")))?;

    if requester != game.creator {
        return Err(ServiceError::Forbidden(
            "only the creator can cancel a game".into(),
        ));
    }

    let exclude = state
        .sessions()
        .find_by_player(requester)
        .map(|session| session.connection_id);
    notifications::broadcast_game_cancelled(state, game_id, exclude)?;

    if !store.delete_game(game_id).await? {
        return Err(ServiceError::NotFound(format!(
            "game `{game_id}` does not exist"
        )));
    }
    state.rematch().clear(game_id).await;

    info!(game_id, requester, "game cancelled");
    Ok(())
}

/// End a game because `leaver` walked away, awarding the win to the opponent.
///
/// Idempotent: a game that already reached its final state reports success
/// without side effects. Each persistence step short-circuits on failure and
/// nothing is rolled back; a partially applied forfeit can be completed by
/// calling again.
pub async fn forfeit(
    state: &SharedState,
    game_id: GameId,
    leaver: PlayerId,
) -> Result<ForfeitOutcome, ServiceError> {
    let store = state.store();
    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` does not exist")))?;

    if game.state == GameState::Finished {
        return Ok(ForfeitOutcome::AlreadyFinished);
    }

    let rounds = store.list_rounds_by_game(game_id).await?;
    let round = relevant_round(&rounds).cloned().ok_or_else(|| {
        ServiceError::NotFound(format!("game `{game_id}` has no round to forfeit"))
    })?;

    let plays = store.list_plays_by_round(round.id).await?;
    if plays.len() != 2 {
        return Err(ServiceError::Internal(format!(
            "round `{}` has {} play rows instead of 2",
            round.id,
            plays.len()
        )));
    }

    let loser = plays
        .iter()
        .find(|play| play.player_id == leaver)
        .ok_or_else(|| {
            ServiceError::Forbidden("leaver is not a participant of this round".into())
        })?;
    let winner = plays
        .iter()
        .find(|play| play.player_id != leaver)
        .ok_or_else(|| ServiceError::Forbidden("round has no opponent to award".into()))?;

    for (player_id, result) in [
        (winner.player_id, PlayResult::Win),
        (loser.player_id, PlayResult::Lose),
    ] {
        let outcome = store
            .update_play(round.id, player_id, PlayPatch::result(result))
            .await?;
        if !outcome.found() {
            return Err(ServiceError::Internal(format!(
                "play row for player `{player_id}` in round `{}` is missing",
                round.id
            )));
        }
    }

    if round.state == RoundState::Active {
        store
            .update_round(
                round.id,
                RoundPatch::new()
                    .state(RoundState::Finished)
                    .end_time(SystemTime::now()),
            )
            .await?;
    }

    let outcome = store
        .update_game(
            game_id,
            GamePatch::new()
                .owner(winner.player_id)
                .state(GameState::Waiting),
        )
        .await?;
    if !outcome.found() {
        return Err(ServiceError::Internal(format!(
            "game `{game_id}` vanished while forfeiting"
        )));
    }

    info!(
        game_id,
        leaver,
        winner = winner.player_id,
        "game forfeited"
    );
    Ok(ForfeitOutcome::Forfeited {
        winner: winner.player_id,
    })
}

/// Drop any pending rematch request and park the game back in waiting.
pub async fn refuse_rematch(
    state: &SharedState,
    game_id: GameId,
) -> Result<GameRecord, ServiceError> {
    state.rematch().clear(game_id).await;

    let store = state.store();
    let outcome = store
        .update_game(game_id, GamePatch::new().state(GameState::Waiting))
        .await?;
    if !outcome.found() {
        return Err(ServiceError::NotFound(format!(
            "game `{game_id}` does not exist"
        )));
    }

    let updated = store.find_game(game_id).await?.ok_or_else(|| {
        ServiceError::Internal(format!("game `{game_id}` vanished while refusing rematch"))
    })?;
    let record = public_service::hydrate_game(state, &updated).await?;
    notifications::unicast_game_waiting(state, updated.owner, &record)?;

    info!(game_id, "rematch refused");
    Ok(record)
}

/// Forfeit every non-finished game the leaver participates in. Runs after a
/// disconnect; failures are logged and never stop the sweep.
pub async fn forfeit_disconnected(state: &SharedState, leaver: PlayerId) {
    let store = state.store();
    let games = match store.list_games().await {
        Ok(games) => games,
        Err(err) => {
            warn!(leaver, error = %err, "cannot scan games after disconnect");
            return;
        }
    };

    for game in games
        .into_iter()
        .filter(|game| game.state != GameState::Finished)
    {
        let rounds = match store.list_rounds_by_game(game.id).await {
            Ok(rounds) => rounds,
            Err(err) => {
                warn!(game_id = game.id, error = %err, "cannot scan rounds after disconnect");
                continue;
            }
        };
        let Some(round) = relevant_round(&rounds) else {
            continue;
        };
        let plays = match store.list_plays_by_round(round.id).await {
            Ok(plays) => plays,
            Err(err) => {
                warn!(round_id = round.id, error = %err, "cannot scan plays after disconnect");
                continue;
            }
        };
        if !plays.iter().any(|play| play.player_id == leaver) {
            continue;
        }

        match forfeit(state, game.id, leaver).await {
            Ok(ForfeitOutcome::Forfeited { winner }) => {
                if let Ok(Some(updated)) = store.find_game(game.id).await
                    && let Ok(record) = public_service::hydrate_game(state, &updated).await
                {
                    let _ = notifications::unicast_game_waiting(state, winner, &record);
                }
            }
            Ok(ForfeitOutcome::AlreadyFinished) => {}
            Err(err) => {
                warn!(game_id = game.id, leaver, error = %err, "forfeit after disconnect failed");
            }
        }
    }
}

/// Round a forfeit applies to: the active round if one exists, otherwise the
/// most recently created one.
fn relevant_round(rounds: &[RoundEntity]) -> Option<&RoundEntity> {
    rounds
        .iter()
        .find(|round| round.state == RoundState::Active)
        .or_else(|| rounds.last())
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::{
        dao::models::{NewRound, PlayEntity},
        state::{
            board::Board,
            testing::{connect, next_frame, seed_player, state},
        },
    };

    async fn seed_game(
        state: &SharedState,
        creator: PlayerId,
        game_state: GameState,
    ) -> GameId {
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
            .id
    }

    async fn seed_round(
        state: &SharedState,
        game_id: GameId,
        round_state: RoundState,
        board: &str,
        player_one: PlayerId,
        player_two: PlayerId,
    ) -> i64 {
        let round = state
            .store()
            .insert_round(NewRound {
                game_id,
                state: round_state,
                board: Board::from_cells(board),
                start_time: SystemTime::now(),
                duration_secs: 300,
            })
            .await
            .unwrap();
        for (player_id, player_number) in [(player_one, 1), (player_two, 2)] {
            state
                .store()
                .insert_play(PlayEntity {
                    player_id,
                    round_id: round.id,
                    player_number,
                    result: None,
                })
                .await
                .unwrap();
        }
        round.id
    }

    #[tokio::test]
    async fn forfeit_awards_the_opponent_and_parks_the_game() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let game_id = seed_game(&state, ada.id, GameState::New).await;
        let round_id = seed_round(
            &state,
            game_id,
            RoundState::Active,
            "XO@@@@@@@",
            ada.id,
            bob.id,
        )
        .await;

        let outcome = forfeit(&state, game_id, ada.id).await.unwrap();
        assert_eq!(outcome, ForfeitOutcome::Forfeited { winner: bob.id });

        let plays = state.store().list_plays_by_round(round_id).await.unwrap();
        let by_player = |id| plays.iter().find(|p| p.player_id == id).unwrap().result;
        assert_eq!(by_player(ada.id), Some(PlayResult::Lose));
        assert_eq!(by_player(bob.id), Some(PlayResult::Win));

        let round = state.store().find_round(round_id).await.unwrap().unwrap();
        assert_eq!(round.state, RoundState::Finished);
        assert_eq!(round.board.as_str(), "XO@@@@@@@");

        let game = state.store().find_game(game_id).await.unwrap().unwrap();
        assert_eq!(game.owner, bob.id);
        assert_eq!(game.state, GameState::Waiting);
    }

    #[tokio::test]
    async fn forfeit_on_a_finished_game_is_a_no_op() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let game_id = seed_game(&state, ada.id, GameState::Finished).await;
        let round_id = seed_round(
            &state,
            game_id,
            RoundState::Finished,
            "XO@@@@@@@",
            ada.id,
            bob.id,
        )
        .await;

        let outcome = forfeit(&state, game_id, ada.id).await.unwrap();
        assert_eq!(outcome, ForfeitOutcome::AlreadyFinished);

        let plays = state.store().list_plays_by_round(round_id).await.unwrap();
        assert!(plays.iter().all(|play| play.result.is_none()));
    }

    #[tokio::test]
    async fn forfeiting_twice_equals_forfeiting_once() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let game_id = seed_game(&state, ada.id, GameState::Active).await;
        seed_round(
            &state,
            game_id,
            RoundState::Active,
            "@@@@@@@@@",
            ada.id,
            bob.id,
        )
        .await;

        let first = forfeit(&state, game_id, ada.id).await.unwrap();
        assert_eq!(first, ForfeitOutcome::Forfeited { winner: bob.id });
        let game_after_first = state.store().find_game(game_id).await.unwrap().unwrap();

        // The game is WAITING, not FINISHED, so the second call walks the
        // same path and lands on the same result instead of short-circuiting.
        let second = forfeit(&state, game_id, ada.id).await.unwrap();
        assert_eq!(second, ForfeitOutcome::Forfeited { winner: bob.id });
        let game_after_second = state.store().find_game(game_id).await.unwrap().unwrap();
        assert_eq!(game_after_first, game_after_second);
    }

    #[tokio::test]
    async fn forfeit_falls_back_to_the_latest_round() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let game_id = seed_game(&state, ada.id, GameState::Waiting).await;
        seed_round(
            &state,
            game_id,
            RoundState::Finished,
            "XXXOO@@@@",
            ada.id,
            bob.id,
        )
        .await;
        let latest = seed_round(
            &state,
            game_id,
            RoundState::Finished,
            "OOOX@X@X@",
            bob.id,
            ada.id,
        )
        .await;

        forfeit(&state, game_id, ada.id).await.unwrap();
        let plays = state.store().list_plays_by_round(latest).await.unwrap();
        let by_player = |id| plays.iter().find(|p| p.player_id == id).unwrap().result;
        assert_eq!(by_player(bob.id), Some(PlayResult::Win));
        assert_eq!(by_player(ada.id), Some(PlayResult::Lose));
    }

    #[tokio::test]
    async fn forfeit_without_any_round_is_not_found() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let game_id = seed_game(&state, ada.id, GameState::New).await;

        let err = forfeit(&state, game_id, ada.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn forfeit_by_a_non_participant_is_forbidden() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let eve = seed_player(&state, "eve").await;
        let game_id = seed_game(&state, ada.id, GameState::Active).await;
        seed_round(
            &state,
            game_id,
            RoundState::Active,
            "@@@@@@@@@",
            ada.id,
            bob.id,
        )
        .await;

        let err = forfeit(&state, game_id, eve.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn start_announces_to_others_and_records_to_the_creator() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let mut ada_rx = connect(&state, &ada);
        let mut bob_rx = connect(&state, &bob);

        let record = start(&state, ada.id).await.unwrap();
        assert_eq!(record.state, GameState::New);
        assert_eq!(record.owner_nickname, "ada");

        let bob_frame = next_frame(&mut bob_rx);
        assert_eq!(bob_frame["event"], "game_started");
        assert_eq!(bob_frame["payload"]["id_game"], record.id_game);

        // The creator is excluded from the broadcast and only gets the
        // hydrated record.
        let ada_frame = next_frame(&mut ada_rx);
        assert_eq!(ada_frame["event"], "game_record");
        assert!(ada_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn only_the_owner_may_end_a_game() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let game_id = seed_game(&state, ada.id, GameState::Waiting).await;

        let err = end(&state, game_id, bob.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let record = end(&state, game_id, ada.id).await.unwrap();
        assert_eq!(record.state, GameState::Finished);
    }

    #[tokio::test]
    async fn ending_a_game_closes_its_active_round() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let game_id = seed_game(&state, ada.id, GameState::Active).await;
        let round_id = seed_round(
            &state,
            game_id,
            RoundState::Active,
            "@@@@@@@@@",
            ada.id,
            bob.id,
        )
        .await;

        end(&state, game_id, ada.id).await.unwrap();
        let round = state.store().find_round(round_id).await.unwrap().unwrap();
        assert_eq!(round.state, RoundState::Finished);
    }

    #[tokio::test]
    async fn cancel_notifies_then_deletes() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let game_id = seed_game(&state, ada.id, GameState::New).await;
        let mut bob_rx = connect(&state, &bob);

        let err = cancel(&state, game_id, bob.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        cancel(&state, game_id, ada.id).await.unwrap();
        assert!(state.store().find_game(game_id).await.unwrap().is_none());

        let frame = next_frame(&mut bob_rx);
        assert_eq!(frame["event"], "game_cancelled");
        assert_eq!(frame["payload"]["id_game"], game_id);
    }

    #[tokio::test]
    async fn refuse_rematch_clears_the_pending_entry() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let game_id = seed_game(&state, ada.id, GameState::Waiting).await;
        state.rematch().lock().await.insert(game_id, ada.id);
        let mut ada_rx = connect(&state, &ada);

        let record = refuse_rematch(&state, game_id).await.unwrap();
        assert_eq!(record.state, GameState::Waiting);
        assert!(state.rematch().pending_for(game_id).await.is_none());

        let frame = next_frame(&mut ada_rx);
        assert_eq!(frame["event"], "game_waiting");
    }

    #[tokio::test]
    async fn disconnect_sweep_forfeits_only_the_leavers_games() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let bob = seed_player(&state, "bob").await;
        let eve = seed_player(&state, "eve").await;

        let joined = seed_game(&state, ada.id, GameState::Active).await;
        seed_round(
            &state,
            joined,
            RoundState::Active,
            "@@@@@@@@@",
            ada.id,
            bob.id,
        )
        .await;

        let unrelated = seed_game(&state, eve.id, GameState::Active).await;
        seed_round(
            &state,
            unrelated,
            RoundState::Active,
            "@@@@@@@@@",
            eve.id,
            bob.id,
        )
        .await;

        forfeit_disconnected(&state, ada.id).await;

        let forfeited = state.store().find_game(joined).await.unwrap().unwrap();
        assert_eq!(forfeited.state, GameState::Waiting);
        assert_eq!(forfeited.owner, bob.id);

        let untouched = state.store().find_game(unrelated).await.unwrap().unwrap();
        assert_eq!(untouched.state, GameState::Active);
    }
}
