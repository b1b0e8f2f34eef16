use std::sync::Arc;

use crate::clients::{IdentityApi, PlayerApi};
use crate::dao::profile_store::{ProfileStore, TeamStore};
use crate::dao::session_store::SessionStore;

pub type SharedGameState = Arc<GameAppState>;
pub type SharedPlayerState = Arc<PlayerAppState>;

/// Shared state of the game service: the hot session store and the Player
/// service client. Background tasks receive their own handles at wiring
/// time; handlers only ever reach these two.
pub struct GameAppState {
    session: Arc<dyn SessionStore>,
    players: Arc<dyn PlayerApi>,
}

impl GameAppState {
    pub fn new(session: Arc<dyn SessionStore>, players: Arc<dyn PlayerApi>) -> SharedGameState {
        Arc::new(Self { session, players })
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    pub fn players(&self) -> &Arc<dyn PlayerApi> {
        &self.players
    }
}

/// Shared state of the player service: durable stores, the identity client
/// and the configured team set.
pub struct PlayerAppState {
    profiles: Arc<dyn ProfileStore>,
    teams: Arc<dyn TeamStore>,
    identity: Arc<dyn IdentityApi>,
    default_teams: Vec<String>,
}

impl PlayerAppState {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        teams: Arc<dyn TeamStore>,
        identity: Arc<dyn IdentityApi>,
        default_teams: Vec<String>,
    ) -> SharedPlayerState {
        Arc::new(Self {
            profiles,
            teams,
            identity,
            default_teams,
        })
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        &self.profiles
    }

    pub fn teams(&self) -> &Arc<dyn TeamStore> {
        &self.teams
    }

    pub fn identity(&self) -> &Arc<dyn IdentityApi> {
        &self.identity
    }

    pub fn default_teams(&self) -> &[String] {
        &self.default_teams
    }
}
