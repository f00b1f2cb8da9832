use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::state::board::Board;

/// Identifier of a registered player.
pub type PlayerId = i64;
/// Identifier of a game.
pub type GameId = i64;
/// Identifier of a round within a game.
pub type RoundId = i64;
/// Identifier of a participation request.
pub type RequestId = i64;

/// Lifecycle state of a game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    /// Created, waiting for a second participant.
    New,
    /// A round is being played.
    Active,
    /// Between rounds; rematch negotiation may happen here.
    Waiting,
    /// Concluded; no further rounds can start.
    Finished,
}

/// Lifecycle state of a round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    /// Created but not yet started.
    Pending,
    /// Moves are being accepted.
    Active,
    /// Concluded; results are recorded on the play rows.
    Finished,
}

/// Recorded outcome of one participant for one round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayResult {
    Win,
    Lose,
    Draw,
}

/// Registered player, including credentials and streak counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Primary key of the player.
    pub id: PlayerId,
    /// Unique display name.
    pub nickname: String,
    /// Contact address supplied at signup.
    pub email: String,
    /// Signin credential. Never leaves the store/service layers.
    pub password: String,
    /// Consecutive wins since the last loss.
    pub current_streak: u32,
    /// Best value `current_streak` ever reached.
    pub max_streak: u32,
    /// When the player signed up.
    pub registration_date: SystemTime,
}

/// Fields required to insert a new player row.
#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub nickname: String,
    pub email: String,
    pub password: String,
    pub registration_date: SystemTime,
}

/// Game row persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: GameId,
    /// Player who created the game. Never reassigned.
    pub creator: PlayerId,
    /// Player currently entitled to control the game.
    pub owner: PlayerId,
    /// Lifecycle state.
    pub state: GameState,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Fields required to insert a new game row.
#[derive(Debug, Clone)]
pub struct NewGame {
    pub creator: PlayerId,
    pub owner: PlayerId,
    pub state: GameState,
    pub created_at: SystemTime,
}

/// Field-change set for a game row.
#[derive(Debug, Clone, Default)]
pub struct GamePatch {
    pub owner: Option<PlayerId>,
    pub state: Option<GameState>,
}

impl GamePatch {
    /// Start an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reassign the owner.
    pub fn owner(mut self, owner: PlayerId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Move the game to a new state.
    pub fn state(mut self, state: GameState) -> Self {
        self.state = Some(state);
        self
    }
}

/// Round row persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Primary key of the round.
    pub id: RoundId,
    /// Game this round belongs to.
    pub game_id: GameId,
    /// Lifecycle state.
    pub state: RoundState,
    /// 3x3 grid of cell symbols.
    pub board: Board,
    /// When the round started accepting moves.
    pub start_time: SystemTime,
    /// When the round concluded, if it has.
    pub end_time: Option<SystemTime>,
    /// Allotted play time in seconds.
    pub duration_secs: u64,
}

/// Fields required to insert a new round row.
#[derive(Debug, Clone)]
pub struct NewRound {
    pub game_id: GameId,
    pub state: RoundState,
    pub board: Board,
    pub start_time: SystemTime,
    pub duration_secs: u64,
}

/// Field-change set for a round row.
#[derive(Debug, Clone, Default)]
pub struct RoundPatch {
    pub state: Option<RoundState>,
    pub board: Option<Board>,
    pub end_time: Option<SystemTime>,
}

impl RoundPatch {
    /// Start an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the round to a new state.
    pub fn state(mut self, state: RoundState) -> Self {
        self.state = Some(state);
        self
    }

    /// Replace the board contents.
    pub fn board(mut self, board: Board) -> Self {
        self.board = Some(board);
        self
    }

    /// Record when the round concluded.
    pub fn end_time(mut self, end_time: SystemTime) -> Self {
        self.end_time = Some(end_time);
        self
    }
}

/// One participant's seat and outcome in one round.
///
/// Exactly two of these exist per started round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayEntity {
    /// The participating player.
    pub player_id: PlayerId,
    /// The round being played.
    pub round_id: RoundId,
    /// Seat number, 1 or 2.
    pub player_number: u8,
    /// Outcome, unset while the round is open.
    pub result: Option<PlayResult>,
}

/// Field-change set for a play row.
#[derive(Debug, Clone, Default)]
pub struct PlayPatch {
    pub result: Option<PlayResult>,
}

impl PlayPatch {
    /// Record the outcome for this seat.
    pub fn result(result: PlayResult) -> Self {
        Self {
            result: Some(result),
        }
    }
}

/// State of a participation request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    /// Awaiting a decision by the game owner.
    Pending,
    /// Accepted; the game has started.
    Accepted,
}

/// Participation request row persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestEntity {
    /// Primary key of the request.
    pub id: RequestId,
    /// Game the sender wants to join.
    pub game_id: GameId,
    /// Player asking to join.
    pub player_id: PlayerId,
    /// Decision state.
    pub state: RequestState,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Fields required to insert a new participation request row.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub state: RequestState,
    pub created_at: SystemTime,
}

/// Field-change set for a participation request row.
#[derive(Debug, Clone, Default)]
pub struct RequestPatch {
    pub state: Option<RequestState>,
}

impl RequestPatch {
    /// Move the request to a new decision state.
    pub fn state(state: RequestState) -> Self {
        Self {
            state: Some(state),
        }
    }
}

/// Field-change set for a player row.
#[derive(Debug, Clone, Default)]
pub struct PlayerPatch {
    pub current_streak: Option<u32>,
    pub max_streak: Option<u32>,
}

impl PlayerPatch {
    /// Start an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the running streak counter.
    pub fn current_streak(mut self, value: u32) -> Self {
        self.current_streak = Some(value);
        self
    }

    /// Replace the best-streak counter.
    pub fn max_streak(mut self, value: u32) -> Self {
        self.max_streak = Some(value);
        self
    }
}
