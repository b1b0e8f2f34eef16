use axum::Router;

use crate::state::{SharedGameState, SharedPlayerState};

pub mod docs;
pub mod game;
pub mod health;
pub mod player;

/// Compose the game service's route tree, wiring in shared state and docs.
pub fn game_router(state: SharedGameState) -> Router<()> {
    let api_router = game::router().merge(health::game_router());
    let docs_router = docs::game_router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

/// Compose the player service's route tree, wiring in shared state and docs.
pub fn player_router(state: SharedPlayerState) -> Router<()> {
    let api_router = player::router().merge(health::player_router());
    let docs_router = docs::player_router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
