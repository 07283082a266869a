use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    verification: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub verification: &'static str,
}

/// `verification_enabled` is reported so operators can spot a deployment
/// that accidentally runs in open mode.
pub fn router(verification_enabled: bool) -> Router {
    let verification = if verification_enabled { "token" } else { "open" };
    Router::new().route("/health", get(health)).with_state(HealthState { verification })
}

pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ready",
        service: "slashkit-server",
        verification: state.verification,
    })
}
