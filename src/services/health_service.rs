use tracing::warn;

use crate::dto::health::HealthResponse;
use crate::state::{SharedGameState, SharedPlayerState};

/// Health of the game service: degraded when the cache does not answer.
pub async fn game_health(state: &SharedGameState) -> HealthResponse {
    match state.session().health_check().await {
        Ok(()) => HealthResponse::ok(),
        Err(err) => {
            warn!(error = %err, "session store health check failed");
            HealthResponse::degraded()
        }
    }
}

/// Health of the player service: degraded when the durable store does not
/// answer.
pub async fn player_health(state: &SharedPlayerState) -> HealthResponse {
    match state.profiles().health_check().await {
        Ok(()) => HealthResponse::ok(),
        Err(err) => {
            warn!(error = %err, "profile store health check failed");
            HealthResponse::degraded()
        }
    }
}
