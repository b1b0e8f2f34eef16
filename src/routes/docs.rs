use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    services::documentation::{GameApiDoc, PlayerApiDoc},
    state::{SharedGameState, SharedPlayerState},
};

/// Serve the game service's Swagger UI backed by its OpenAPI document.
pub fn game_router(state: SharedGameState) -> Router<SharedGameState> {
    let ui: Router<SharedGameState> = SwaggerUi::new("/docs")
        .url("/api-doc/openapi.json", GameApiDoc::openapi())
        .into();

    ui.with_state(state)
}

/// Serve the player service's Swagger UI backed by its OpenAPI document.
pub fn player_router(state: SharedPlayerState) -> Router<SharedPlayerState> {
    let ui: Router<SharedPlayerState> = SwaggerUi::new("/docs")
        .url("/api-doc/openapi.json", PlayerApiDoc::openapi())
        .into();

    ui.with_state(state)
}
