use std::time::SystemTime;

use tracing::info;

use crate::{
    dao::models::{
        GameId, GamePatch, GameState, NewRound, PlayEntity, PlayPatch, PlayResult, PlayerId,
        PlayerPatch, RoundEntity, RoundId, RoundPatch, RoundState,
    },
    dao::store::DataStore,
    dto::records::RoundRecord,
    error::ServiceError,
    services::{notifications, public_service},
    state::{
        SharedState,
        board::{self, Board},
    },
};

/// Outcome of a successfully applied move.
#[derive(Debug)]
pub enum MoveOutcome {
    /// The move stands and the round continues.
    Continue,
    /// The move concluded the round.
    Finished(RoundRecord),
}

/// Insert an active round for `game_id` with its two play rows.
///
/// Used when a participation request is accepted and when a rematch handshake
/// completes; clients never start rounds directly.
pub async fn start_round(
    state: &SharedState,
    game_id: GameId,
    player_one: PlayerId,
    player_two: PlayerId,
) -> Result<RoundEntity, ServiceError> {
    let store = state.store();
    let round = store
        .insert_round(NewRound {
            game_id,
            state: RoundState::Active,
            board: Board::empty(),
            start_time: SystemTime::now(),
            duration_secs: state.config().round_duration_secs(),
        })
        .await?;

    for (player_id, player_number) in [(player_one, 1), (player_two, 2)] {
        store
            .insert_play(PlayEntity {
                player_id,
                round_id: round.id,
                player_number,
                result: None,
            })
            .await?;
    }

    info!(
        round_id = round.id,
        game_id, player_one, player_two, "round started"
    );
    Ok(round)
}

/// Apply one move for `player_id` on `round_id`.
///
/// The round must be active, the caller must hold one of its seats, it must
/// be their turn and the target cell must be free. A move that completes a
/// line or fills the board concludes the round on the spot.
pub async fn make_move(
    state: &SharedState,
    round_id: RoundId,
    player_id: PlayerId,
    row: usize,
    col: usize,
) -> Result<MoveOutcome, ServiceError> {
    let store = state.store();
    let mut round = store
        .find_round(round_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("round `{round_id}` does not exist")))?;

    if round.state != RoundState::Active {
        return Err(ServiceError::InvalidState(
            "round is not accepting moves".into(),
        ));
    }

    let plays = store.list_plays_by_round(round_id).await?;
    let play = plays
        .iter()
        .find(|play| play.player_id == player_id)
        .ok_or_else(|| {
            ServiceError::Forbidden("caller is not a participant of this round".into())
        })?;

    if play.player_number != round.board.current_turn() {
        return Err(ServiceError::Forbidden("it is not your turn".into()));
    }

    let symbol = board::symbol_for_player(play.player_number).ok_or_else(|| {
        ServiceError::Internal(format!(
            "play row holds invalid seat number {}",
            play.player_number
        ))
    })?;

    if !round.board.apply_move(row, col, symbol) {
        return Err(ServiceError::InvalidInput(format!(
            "cell ({row}, {col}) is occupied or out of range"
        )));
    }

    let outcome = store
        .update_round(round_id, RoundPatch::new().board(round.board.clone()))
        .await?;
    if !outcome.found() {
        return Err(ServiceError::NotFound(format!(
            "round `{round_id}` does not exist"
        )));
    }

    if let Some(winner_symbol) = round.board.find_winner() {
        let winner_number = board::player_for_symbol(winner_symbol).ok_or_else(|| {
            ServiceError::Internal(format!("winning symbol `{winner_symbol}` maps to no seat"))
        })?;
        let results: Vec<_> = plays
            .iter()
            .map(|play| {
                let result = if play.player_number == winner_number {
                    PlayResult::Win
                } else {
                    PlayResult::Lose
                };
                (play.player_id, result)
            })
            .collect();
        let record = conclude_round(state, &round, &results).await?;
        return Ok(MoveOutcome::Finished(record));
    }

    if round.board.is_full() {
        let results: Vec<_> = plays
            .iter()
            .map(|play| (play.player_id, PlayResult::Draw))
            .collect();
        let record = conclude_round(state, &round, &results).await?;
        return Ok(MoveOutcome::Finished(record));
    }

    Ok(MoveOutcome::Continue)
}

/// Explicitly terminate an active round as a draw.
pub async fn end_round(
    state: &SharedState,
    round_id: RoundId,
) -> Result<RoundRecord, ServiceError> {
    let store = state.store();
    let round = store
        .find_round(round_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("round `{round_id}` does not exist")))?;

    if round.state != RoundState::Active {
        return Err(ServiceError::InvalidState(
            "only an active round can be ended".into(),
        ));
    }

    let plays = store.list_plays_by_round(round_id).await?;
    let results: Vec<_> = plays
        .iter()
        .map(|play| (play.player_id, PlayResult::Draw))
        .collect();
    conclude_round(state, &round, &results).await
}

/// Record the results of a concluded round and move the game back to waiting.
///
/// Sub-steps run in a fixed order — plays, round, streaks, game, notification
/// — and the first failure aborts the rest without compensation.
async fn conclude_round(
    state: &SharedState,
    round: &RoundEntity,
    results: &[(PlayerId, PlayResult)],
) -> Result<RoundRecord, ServiceError> {
    let store = state.store();

    let plays = store.list_plays_by_round(round.id).await?;
    if plays.len() != 2 {
        return Err(ServiceError::Internal(format!(
            "round `{}` has {} play rows instead of 2",
            round.id,
            plays.len()
        )));
    }

    for &(player_id, result) in results {
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

    apply_streaks(state, results).await?;

    let outcome = store
        .update_game(round.game_id, GamePatch::new().state(GameState::Waiting))
        .await?;
    if !outcome.found() {
        return Err(ServiceError::Internal(format!(
            "game `{}` is referenced but missing",
            round.game_id
        )));
    }

    let updated = store.find_round(round.id).await?.ok_or_else(|| {
        ServiceError::Internal(format!("round `{}` vanished while concluding", round.id))
    })?;
    let record = public_service::hydrate_round(state, &updated).await?;

    let participants: Vec<_> = plays.iter().map(|play| play.player_id).collect();
    notifications::unicast_round_finished(state, &participants, &record)?;

    info!(round_id = round.id, game_id = round.game_id, "round concluded");
    Ok(record)
}

/// Fold round results into the players' win-streak counters: a win extends
/// the streak, a loss resets it, a draw leaves it alone.
async fn apply_streaks(
    state: &SharedState,
    results: &[(PlayerId, PlayResult)],
) -> Result<(), ServiceError> {
    let store = state.store();
    for &(player_id, result) in results {
        match result {
            PlayResult::Win => {
                let player = store.find_player(player_id).await?.ok_or_else(|| {
                    ServiceError::Internal(format!(
                        "player `{player_id}` is referenced but missing"
                    ))
                })?;
                let streak = player.current_streak + 1;
                store
                    .update_player(
                        player_id,
                        PlayerPatch::new()
                            .current_streak(streak)
                            .max_streak(player.max_streak.max(streak)),
                    )
                    .await?;
            }
            PlayResult::Lose => {
                store
                    .update_player(player_id, PlayerPatch::new().current_streak(0))
                    .await?;
            }
            PlayResult::Draw => {}
        }
    }
    Ok(())
}
