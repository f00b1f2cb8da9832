use serde::Serialize;

use crate::{
    dto::records::{GameRecord, PlayerRecord, RequestRecord, RoundRecord},
    error::ServiceError,
};

/// Overall outcome of a direct protocol response.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Typed result array carried by list-style responses.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Records {
    Games(Vec<GameRecord>),
    Rounds(Vec<RoundRecord>),
    Players(Vec<PlayerRecord>),
    Requests(Vec<RequestRecord>),
}

impl Records {
    fn len(&self) -> usize {
        match self {
            Records::Games(items) => items.len(),
            Records::Rounds(items) => items.len(),
            Records::Players(items) => items.len(),
            Records::Requests(items) => items.len(),
        }
    }
}

/// Direct response returned to the caller of a protocol action.
///
/// Every caller-facing outcome goes through this shape; there is no silent
/// failure at the protocol boundary.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Records>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting: Option<bool>,
}

impl ApiResponse {
    /// Successful outcome with a human-readable message.
    pub fn success(action: Option<&'static str>, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            action,
            id: None,
            message: message.into(),
            error: None,
            records: None,
            count: None,
            waiting: None,
        }
    }

    /// Failed outcome carrying the error's kind tag and message.
    pub fn failure(action: Option<&'static str>, error: &ServiceError) -> Self {
        Self {
            status: ResponseStatus::Error,
            action,
            id: None,
            message: error.to_string(),
            error: Some(error.kind()),
            records: None,
            count: None,
            waiting: None,
        }
    }

    /// Attach the id of the entity the action worked on.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Attach a typed result array; the count field follows automatically.
    pub fn with_records(mut self, records: Records) -> Self {
        self.count = Some(records.len());
        self.records = Some(records);
        self
    }

    /// Attach the rematch-handshake waiting flag.
    pub fn with_waiting(mut self, waiting: bool) -> Self {
        self.waiting = Some(waiting);
        self
    }

    /// Serialize the response to a wire frame.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"status":"error","message":"internal error: response serialization failed"}"#.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_frame_omits_unset_fields() {
        let frame = ApiResponse::success(Some("game_start"), "game created")
            .with_id(3)
            .to_frame();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["action"], "game_start");
        assert_eq!(value["id"], 3);
        assert!(value.get("records").is_none());
        assert!(value.get("waiting").is_none());
    }

    #[test]
    fn failure_frame_carries_the_error_kind() {
        let error = ServiceError::Forbidden("only the owner can end a game".into());
        let frame = ApiResponse::failure(Some("game_end"), &error).to_frame();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "forbidden");
        assert_eq!(value["message"], "forbidden: only the owner can end a game");
    }

    #[test]
    fn record_lists_report_their_count() {
        let response =
            ApiResponse::success(Some("games_get_public_info"), "2 games").with_records(
                Records::Players(vec![]),
            );
        assert_eq!(response.count, Some(0));
    }
}
