use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::dao::models::PlayerId;

/// Identifier of one live socket connection.
pub type ConnectionId = Uuid;

/// Live association between an open connection and a signed-in player.
#[derive(Clone)]
pub struct Session {
    /// The connection the player signed in on.
    pub connection_id: ConnectionId,
    /// The signed-in player.
    pub player_id: PlayerId,
    /// Nickname captured at sign-in.
    pub nickname: String,
    /// Handle used to push frames to the connection's writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Per-recipient result of a best-effort delivery.
#[derive(Debug)]
pub struct DeliveryOutcome {
    /// The addressed player.
    pub player_id: PlayerId,
    /// Whether the frame was handed to the connection's writer.
    pub delivered: bool,
}

/// Registry of signed-in sessions keyed by connection, with a secondary
/// index by player id.
///
/// Lookups never mutate state; the registry only changes on sign-in and
/// disconnect. Deliveries push onto each session's unbounded writer channel
/// and therefore never block.
pub struct SessionRegistry {
    capacity: Option<usize>,
    by_connection: DashMap<ConnectionId, Session>,
    by_player: DashMap<PlayerId, ConnectionId>,
}

impl SessionRegistry {
    /// Construct a registry. `capacity` bounds the number of simultaneous
    /// sessions; `None` leaves it unbounded.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            by_connection: DashMap::new(),
            by_player: DashMap::new(),
        }
    }

    /// Record a signed-in session. When the table is at capacity the call is
    /// a no-op and returns `false`.
    pub fn register(
        &self,
        connection_id: ConnectionId,
        player_id: PlayerId,
        nickname: String,
        tx: mpsc::UnboundedSender<Message>,
    ) -> bool {
        if let Some(capacity) = self.capacity
            && self.by_connection.len() >= capacity
            && !self.by_connection.contains_key(&connection_id)
        {
            warn!(
                capacity,
                player_id, "cannot register session: table is full"
            );
            return false;
        }

        self.by_connection.insert(
            connection_id,
            Session {
                connection_id,
                player_id,
                nickname,
                tx,
            },
        );
        self.by_player.insert(player_id, connection_id);
        true
    }

    /// Drop the session for `connection_id`, if one exists. Safe to call for
    /// connections that never signed in or already left.
    pub fn unregister(&self, connection_id: ConnectionId) {
        if let Some((_, session)) = self.by_connection.remove(&connection_id) {
            self.by_player
                .remove_if(&session.player_id, |_, conn| *conn == connection_id);
        }
    }

    /// Session bound to the given connection.
    pub fn find_by_connection(&self, connection_id: ConnectionId) -> Option<Session> {
        self.by_connection
            .get(&connection_id)
            .map(|entry| entry.value().clone())
    }

    /// Session of the given player, if they are connected.
    pub fn find_by_player(&self, player_id: PlayerId) -> Option<Session> {
        let connection_id = *self.by_player.get(&player_id)?;
        self.find_by_connection(connection_id)
    }

    /// First session signed in under the given nickname.
    pub fn find_by_nickname(&self, nickname: &str) -> Option<Session> {
        self.by_connection
            .iter()
            .find(|entry| entry.value().nickname == nickname)
            .map(|entry| entry.value().clone())
    }

    /// Push `payload` to every session except the excluded connection.
    ///
    /// The send is best-effort: a closed writer on one connection does not
    /// stop delivery to the others. The caller receives one outcome per
    /// addressed session.
    pub fn deliver_to_all(
        &self,
        payload: &str,
        exclude: Option<ConnectionId>,
    ) -> Vec<DeliveryOutcome> {
        self.by_connection
            .iter()
            .filter(|entry| Some(*entry.key()) != exclude)
            .map(|entry| {
                let session = entry.value();
                DeliveryOutcome {
                    player_id: session.player_id,
                    delivered: session.tx.send(Message::Text(payload.to_owned().into())).is_ok(),
                }
            })
            .collect()
    }

    /// Push `payload` to the given player's session. A no-op when the player
    /// is not connected.
    pub fn deliver_to_player(&self, player_id: PlayerId, payload: &str) -> Option<DeliveryOutcome> {
        let session = self.find_by_player(player_id)?;
        Some(DeliveryOutcome {
            player_id,
            delivered: session.tx.send(Message::Text(payload.to_owned().into())).is_ok(),
        })
    }

    /// Number of signed-in sessions.
    pub fn len(&self) -> usize {
        self.by_connection.len()
    }

    /// Whether nobody is signed in.
    pub fn is_empty(&self) -> bool {
        self.by_connection.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (
        mpsc::UnboundedSender<Message>,
        mpsc::UnboundedReceiver<Message>,
    ) {
        mpsc::unbounded_channel()
    }

    fn text_of(message: Message) -> String {
        match message {
            Message::Text(text) => text.to_string(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[test]
    fn register_and_lookup_by_every_key() {
        let registry = SessionRegistry::new(None);
        let (tx, _rx) = channel();
        let conn = Uuid::new_v4();
        assert!(registry.register(conn, 10, "ada".into(), tx));

        assert_eq!(registry.find_by_connection(conn).unwrap().player_id, 10);
        assert_eq!(registry.find_by_player(10).unwrap().connection_id, conn);
        assert_eq!(registry.find_by_nickname("ada").unwrap().player_id, 10);
        assert!(registry.find_by_nickname("bob").is_none());
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = SessionRegistry::new(None);
        let (tx, _rx) = channel();
        let conn = Uuid::new_v4();
        registry.register(conn, 10, "ada".into(), tx);

        registry.unregister(conn);
        registry.unregister(conn);
        assert!(registry.find_by_player(10).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn register_at_capacity_is_a_no_op() {
        let registry = SessionRegistry::new(Some(1));
        let (tx_a, _rx_a) = channel();
        let (tx_b, _rx_b) = channel();
        assert!(registry.register(Uuid::new_v4(), 10, "ada".into(), tx_a));
        assert!(!registry.register(Uuid::new_v4(), 20, "bob".into(), tx_b));
        assert_eq!(registry.len(), 1);
        assert!(registry.find_by_player(20).is_none());
    }

    #[test]
    fn broadcast_skips_the_excluded_connection() {
        let registry = SessionRegistry::new(None);
        let (tx_a, mut rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        let conn_a = Uuid::new_v4();
        registry.register(conn_a, 10, "ada".into(), tx_a);
        registry.register(Uuid::new_v4(), 20, "bob".into(), tx_b);

        let outcomes = registry.deliver_to_all("ping", Some(conn_a));
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].delivered);
        assert_eq!(text_of(rx_b.try_recv().unwrap()), "ping");
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn broadcast_survives_a_closed_recipient() {
        let registry = SessionRegistry::new(None);
        let (tx_a, rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        registry.register(Uuid::new_v4(), 10, "ada".into(), tx_a);
        registry.register(Uuid::new_v4(), 20, "bob".into(), tx_b);
        drop(rx_a);

        let outcomes = registry.deliver_to_all("ping", None);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes.iter().filter(|o| o.delivered).count(), 1);
        assert_eq!(text_of(rx_b.try_recv().unwrap()), "ping");
    }

    #[test]
    fn unicast_to_a_disconnected_player_is_a_no_op() {
        let registry = SessionRegistry::new(None);
        assert!(registry.deliver_to_player(10, "ping").is_none());
    }
}
