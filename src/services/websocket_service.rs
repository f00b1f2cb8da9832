use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        request::ClientRequest,
        response::{ApiResponse, Records},
    },
    error::ServiceError,
    services::{
        game_service, player_service, public_service, rematch_service, request_service,
        round_service,
    },
    state::{SharedState, sessions::ConnectionId},
};

/// Handle the full lifecycle of one client connection.
///
/// Every text frame is decoded as an action request and answered with a
/// direct response on the same connection; pushes from other operations are
/// interleaved by the writer task. When the connection goes away the session
/// is dropped and the player's open games are forfeited.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we
    // await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4();
    info!(%connection_id, "client connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let response = match serde_json::from_str::<ClientRequest>(&text) {
                    Ok(request) => dispatch(&state, connection_id, &outbound_tx, request).await,
                    Err(err) => {
                        warn!(%connection_id, error = %err, "undecodable request frame");
                        ApiResponse::failure(
                            None,
                            &ServiceError::InvalidInput(format!("undecodable request: {err}")),
                        )
                    }
                };
                if outbound_tx
                    .send(Message::Text(response.to_frame().into()))
                    .is_err()
                {
                    break;
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%connection_id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    let leaver = state
        .sessions()
        .find_by_connection(connection_id)
        .map(|session| session.player_id);
    state.sessions().unregister(connection_id);
    if let Some(player_id) = leaver {
        info!(%connection_id, player_id, "client disconnected");
        // A player who re-registered on another connection has not left.
        if state.sessions().find_by_player(player_id).is_none() {
            game_service::forfeit_disconnected(&state, player_id).await;
        }
    }

    finalize(writer_task, outbound_tx).await;
}

/// Decode an action into a service call and shape the direct response.
async fn dispatch(
    state: &SharedState,
    connection_id: ConnectionId,
    tx: &mpsc::UnboundedSender<Message>,
    request: ClientRequest,
) -> ApiResponse {
    let action = request.action();
    match route(state, connection_id, tx, request).await {
        Ok(response) => response,
        Err(err) => {
            info!(action, error = %err, "request failed");
            ApiResponse::failure(action, &err)
        }
    }
}

async fn route(
    state: &SharedState,
    connection_id: ConnectionId,
    tx: &mpsc::UnboundedSender<Message>,
    request: ClientRequest,
) -> Result<ApiResponse, ServiceError> {
    let action = request.action();
    match request {
        ClientRequest::PlayerSignup {
            nickname,
            email,
            password,
        } => {
            let record = player_service::signup(state, nickname, email, password).await?;
            Ok(ApiResponse::success(action, "account created")
                .with_id(record.id_player)
                .with_records(Records::Players(vec![record])))
        }
        ClientRequest::PlayerSignin { nickname, password } => {
            let record =
                player_service::signin(state, connection_id, tx.clone(), nickname, password)
                    .await?;
            Ok(ApiResponse::success(action, "signed in")
                .with_id(record.id_player)
                .with_records(Records::Players(vec![record])))
        }
        ClientRequest::PlayerGetPublicInfo { id_player } => {
            let record = player_service::public_profile(state, id_player).await?;
            Ok(ApiResponse::success(action, "player profile")
                .with_id(id_player)
                .with_records(Records::Players(vec![record])))
        }
        ClientRequest::GamesGetPublicInfo { status } => {
            let records = public_service::games_get_public_info(state, &status).await?;
            Ok(
                ApiResponse::success(action, format!("{} games", records.len()))
                    .with_records(Records::Games(records)),
            )
        }
        ClientRequest::GameStart { id_creator } => {
            let record = game_service::start(state, id_creator).await?;
            Ok(ApiResponse::success(action, "game created")
                .with_id(record.id_game)
                .with_records(Records::Games(vec![record])))
        }
        ClientRequest::GameEnd { id_game, id_owner } => {
            let record = game_service::end(state, id_game, id_owner).await?;
            Ok(ApiResponse::success(action, "game ended")
                .with_id(id_game)
                .with_records(Records::Games(vec![record])))
        }
        ClientRequest::GameCancel { id_game, id_owner } => {
            game_service::cancel(state, id_game, id_owner).await?;
            Ok(ApiResponse::success(action, "game cancelled").with_id(id_game))
        }
        ClientRequest::GameRefuseRematch { id_game } => {
            let record = game_service::refuse_rematch(state, id_game).await?;
            Ok(ApiResponse::success(action, "rematch refused")
                .with_id(id_game)
                .with_records(Records::Games(vec![record])))
        }
        ClientRequest::GameAcceptRematch { id_game, id_player } => {
            match rematch_service::accept_rematch(state, id_game, id_player).await? {
                rematch_service::RematchOutcome::Waiting => {
                    Ok(ApiResponse::success(action, "waiting for opponent")
                        .with_id(id_game)
                        .with_waiting(true))
                }
                rematch_service::RematchOutcome::Started(record) => {
                    Ok(ApiResponse::success(action, "rematch accepted, round started")
                        .with_id(record.id_round)
                        .with_waiting(false)
                        .with_records(Records::Rounds(vec![record])))
                }
                rematch_service::RematchOutcome::InProgress => {
                    Ok(ApiResponse::success(action, "a round is already in progress")
                        .with_id(id_game)
                        .with_waiting(false))
                }
            }
        }
        ClientRequest::RoundGetPublicInfo { id_round } => {
            let record = public_service::round_get_public_info(state, id_round).await?;
            Ok(ApiResponse::success(action, "round record")
                .with_id(id_round)
                .with_records(Records::Rounds(vec![record])))
        }
        ClientRequest::RoundMakeMove {
            id_round,
            id_player,
            row,
            col,
        } => match round_service::make_move(state, id_round, id_player, row, col).await? {
            round_service::MoveOutcome::Continue => {
                Ok(ApiResponse::success(action, "move accepted").with_id(id_round))
            }
            round_service::MoveOutcome::Finished(record) => {
                Ok(ApiResponse::success(action, "move accepted, round finished")
                    .with_id(id_round)
                    .with_records(Records::Rounds(vec![record])))
            }
        },
        ClientRequest::RoundEnd { id_round } => {
            let record = round_service::end_round(state, id_round).await?;
            Ok(ApiResponse::success(action, "round ended")
                .with_id(id_round)
                .with_records(Records::Rounds(vec![record])))
        }
        ClientRequest::RequestSend { id_game, id_player } => {
            let record = request_service::send(state, id_game, id_player).await?;
            Ok(ApiResponse::success(action, "participation requested")
                .with_id(record.id_request)
                .with_records(Records::Requests(vec![record])))
        }
        ClientRequest::RequestAccept {
            id_request,
            id_owner,
        } => {
            let record = request_service::accept(state, id_request, id_owner).await?;
            Ok(ApiResponse::success(action, "participation accepted, round started")
                .with_id(id_request)
                .with_records(Records::Rounds(vec![record])))
        }
        ClientRequest::RequestCancel {
            id_request,
            id_player,
        } => {
            request_service::cancel(state, id_request, id_player).await?;
            Ok(ApiResponse::success(action, "participation request cancelled").with_id(id_request))
        }
        ClientRequest::RequestsGetPublicInfo { id_owner } => {
            let records = public_service::requests_get_public_info(state, id_owner).await?;
            Ok(
                ApiResponse::success(action, format!("{} requests", records.len()))
                    .with_records(Records::Requests(records)),
            )
        }
        ClientRequest::Unknown => Err(ServiceError::InvalidInput("unknown action".into())),
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
