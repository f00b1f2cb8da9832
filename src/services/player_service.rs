use std::time::SystemTime;

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    dao::models::{NewPlayer, PlayerId},
    dao::store::DataStore,
    dto::{records::PlayerRecord, validation::SignupInput},
    error::ServiceError,
    state::{SharedState, sessions::ConnectionId},
};

/// Create a player account from validated signup fields.
pub async fn signup(
    state: &SharedState,
    nickname: String,
    email: String,
    password: String,
) -> Result<PlayerRecord, ServiceError> {
    let input = SignupInput {
        nickname,
        email,
        password,
    };
    input
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let store = state.store();
    if store
        .find_player_by_nickname(input.nickname.clone())
        .await?
        .is_some()
    {
        return Err(ServiceError::InvalidState(format!(
            "nickname `{}` is already taken",
            input.nickname
        )));
    }

    let player = store
        .insert_player(NewPlayer {
            nickname: input.nickname,
            email: input.email,
            password: input.password,
            registration_date: SystemTime::now(),
        })
        .await?;

    info!(player_id = player.id, "player signed up");
    Ok(PlayerRecord::from(&player))
}

/// Check credentials and bind the connection to the player.
///
/// A full session table does not fail the sign-in; the player just won't
/// receive pushes on this connection.
pub async fn signin(
    state: &SharedState,
    connection_id: ConnectionId,
    tx: mpsc::UnboundedSender<Message>,
    nickname: String,
    password: String,
) -> Result<PlayerRecord, ServiceError> {
    let store = state.store();
    let player = store
        .find_player_by_nickname(nickname.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no player named `{nickname}`")))?;

    if player.password != password {
        return Err(ServiceError::Forbidden("invalid credentials".into()));
    }

    if !state
        .sessions()
        .register(connection_id, player.id, player.nickname.clone(), tx)
    {
        warn!(
            player_id = player.id,
            "session table full; sign-in proceeds without push notifications"
        );
    }

    info!(player_id = player.id, "player signed in");
    Ok(PlayerRecord::from(&player))
}

/// Public view of a player's profile.
pub async fn public_profile(
    state: &SharedState,
    player_id: PlayerId,
) -> Result<PlayerRecord, ServiceError> {
    let player = state
        .store()
        .find_player(player_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("player `{player_id}` does not exist")))?;
    Ok(PlayerRecord::from(&player))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::testing::{seed_player, state};

    #[tokio::test]
    async fn signup_rejects_invalid_fields() {
        let state = state();
        let err = signup(&state, "".into(), "ada@example.com".into(), "pw".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = signup(&state, "ada".into(), "not-an-email".into(), "pw".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn signup_rejects_a_taken_nickname() {
        let state = state();
        seed_player(&state, "ada").await;
        let err = signup(
            &state,
            "ada".into(),
            "other@example.com".into(),
            "pw".into(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn signin_registers_the_session() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let (tx, _rx) = mpsc::unbounded_channel();

        let record = signin(
            &state,
            Uuid::new_v4(),
            tx,
            "ada".into(),
            "hunter2!".into(),
        )
        .await
        .unwrap();
        assert_eq!(record.id_player, ada.id);
        assert_eq!(
            state.sessions().find_by_player(ada.id).unwrap().nickname,
            "ada"
        );
    }

    #[tokio::test]
    async fn signin_rejects_bad_credentials() {
        let state = state();
        seed_player(&state, "ada").await;
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = signin(&state, Uuid::new_v4(), tx, "ada".into(), "wrong".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert!(state.sessions().is_empty());

        let (tx, _rx) = mpsc::unbounded_channel();
        let err = signin(&state, Uuid::new_v4(), tx, "ghost".into(), "pw".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn profiles_never_leak_credentials() {
        let state = state();
        let ada = seed_player(&state, "ada").await;
        let record = public_profile(&state, ada.id).await.unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("password").is_none());
        assert!(value.get("email").is_none());
        assert_eq!(value["nickname"], "ada");
    }
}
