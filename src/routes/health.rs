use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::{dao::store::DataStore, state::SharedState};

/// Health report for liveness probes.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    storage: &'static str,
    sessions: usize,
}

/// Report process and storage health.
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let storage = match state.store().health_check().await {
        Ok(()) => "ok",
        Err(_) => "unavailable",
    };
    Json(HealthResponse {
        status: "ok",
        storage,
        sessions: state.sessions().len(),
    })
}

/// Configure the health endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/health", get(health))
}
