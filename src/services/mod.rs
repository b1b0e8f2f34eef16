pub mod documentation;
pub mod enrichment;
pub mod game_service;
pub mod health_service;
pub mod player_service;
pub mod syncer;
pub mod team_service;
pub mod updater;
