//! Durable player-profile and team persistence.
//!
//! Both stores sit behind narrow traits so the HTTP surface can be exercised
//! against in-memory implementations; production wiring uses MongoDB.

mod memory;
pub mod mongodb;

use std::collections::HashMap;

use ::mongodb::bson::DateTime;
use futures::future::BoxFuture;

use crate::dao::models::{PlayerProfile, TeamDoc};
use crate::dao::storage::StorageResult;

pub use self::memory::{InMemoryProfileStore, InMemoryTeamStore};
pub use self::mongodb::{MongoProfileStore, MongoTeamStore};

/// Persistence for player profiles. Update operations report `false` when no
/// profile matched the uuid, which the service layer maps to `NotFound`.
pub trait ProfileStore: Send + Sync {
    /// Insert a new profile. Returns `false` when the uuid already exists.
    fn create(&self, profile: PlayerProfile) -> BoxFuture<'static, StorageResult<bool>>;

    fn get(&self, uuid: &str) -> BoxFuture<'static, StorageResult<Option<PlayerProfile>>>;

    fn set_username(&self, uuid: &str, username: &str)
    -> BoxFuture<'static, StorageResult<bool>>;

    fn set_playtime(&self, uuid: &str, ticks: f64) -> BoxFuture<'static, StorageResult<bool>>;

    fn set_delta_playtime(&self, uuid: &str, ticks: f64)
    -> BoxFuture<'static, StorageResult<bool>>;

    fn set_ban_status(
        &self,
        uuid: &str,
        banned: bool,
        expires_at: Option<DateTime>,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    fn set_last_login(&self, uuid: &str, at: DateTime) -> BoxFuture<'static, StorageResult<bool>>;

    /// Uuids of profiles whose username has not been enriched yet.
    fn uuids_missing_username(&self) -> BoxFuture<'static, StorageResult<Vec<String>>>;

    /// `{team → Σ total_playtime_ticks}` over all profiles with a team.
    fn aggregate_team_playtime(&self) -> BoxFuture<'static, StorageResult<HashMap<String, f64>>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Persistence for team aggregate documents.
pub trait TeamStore: Send + Sync {
    /// Upsert the default team documents so assignment always has a target.
    fn ensure_teams(&self, teams: Vec<String>) -> BoxFuture<'static, StorageResult<()>>;

    fn all_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamDoc>>>;

    /// Current player count; an unknown team reads as zero.
    fn player_count(&self, team: &str) -> BoxFuture<'static, StorageResult<i64>>;

    /// Atomically increment the player count and return the new value.
    fn increment_player_count(&self, team: &str) -> BoxFuture<'static, StorageResult<i64>>;

    fn set_total_playtime(&self, team: &str, total: f64)
    -> BoxFuture<'static, StorageResult<()>>;
}
