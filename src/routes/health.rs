use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::health::HealthResponse,
    services::health_service,
    state::{SharedGameState, SharedPlayerState},
};

#[utoipa::path(
    get,
    path = "/healthcheck",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
/// Return the game service's health, pinging the session store.
pub async fn game_healthcheck(State(state): State<SharedGameState>) -> Json<HealthResponse> {
    Json(health_service::game_health(&state).await)
}

#[utoipa::path(
    get,
    path = "/healthcheck",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
/// Return the player service's health, pinging the durable store.
pub async fn player_healthcheck(State(state): State<SharedPlayerState>) -> Json<HealthResponse> {
    Json(health_service::player_health(&state).await)
}

pub fn game_router() -> Router<SharedGameState> {
    Router::<SharedGameState>::new().route("/healthcheck", get(game_healthcheck))
}

pub fn player_router() -> Router<SharedPlayerState> {
    Router::<SharedPlayerState>::new().route("/healthcheck", get(player_healthcheck))
}
