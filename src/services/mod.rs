//! Service layer orchestrating persisted state, the session registry and
//! outbound notifications.

/// Game lifecycle: start, end, cancel, forfeit, rematch refusal.
pub mod game_service;
/// Outbound event construction and best-effort delivery.
pub mod notifications;
/// Signup, sign-in and public profiles.
pub mod player_service;
/// Read-only hydrated views of games, rounds and requests.
pub mod public_service;
/// The in-memory rematch handshake.
pub mod rematch_service;
/// Participation requests: send, accept, cancel.
pub mod request_service;
/// Round play: moves, win/draw detection, conclusion.
pub mod round_service;
/// WebSocket connection and message handling.
pub mod websocket_service;
