use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use mongodb::bson::DateTime;

use super::{ProfileStore, TeamStore};
use crate::dao::models::{PlayerProfile, TeamDoc};
use crate::dao::storage::StorageResult;

/// Profile store kept in process memory, for tests.
#[derive(Clone, Default)]
pub struct InMemoryProfileStore {
    profiles: Arc<DashMap<String, PlayerProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutate(&self, uuid: &str, apply: impl FnOnce(&mut PlayerProfile)) -> bool {
        match self.profiles.get_mut(uuid) {
            Some(mut profile) => {
                apply(&mut profile);
                true
            }
            None => false,
        }
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn create(&self, profile: PlayerProfile) -> BoxFuture<'static, StorageResult<bool>> {
        let created = if self.profiles.contains_key(&profile.uuid) {
            false
        } else {
            self.profiles.insert(profile.uuid.clone(), profile);
            true
        };
        Box::pin(async move { Ok(created) })
    }

    fn get(&self, uuid: &str) -> BoxFuture<'static, StorageResult<Option<PlayerProfile>>> {
        let profile = self.profiles.get(uuid).map(|profile| profile.clone());
        Box::pin(async move { Ok(profile) })
    }

    fn set_username(
        &self,
        uuid: &str,
        username: &str,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let username = username.to_owned();
        let matched = self.mutate(uuid, |profile| profile.username = username);
        Box::pin(async move { Ok(matched) })
    }

    fn set_playtime(&self, uuid: &str, ticks: f64) -> BoxFuture<'static, StorageResult<bool>> {
        let matched = self.mutate(uuid, |profile| profile.total_playtime_ticks = ticks);
        Box::pin(async move { Ok(matched) })
    }

    fn set_delta_playtime(
        &self,
        uuid: &str,
        ticks: f64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let matched = self.mutate(uuid, |profile| profile.delta_playtime_ticks = ticks);
        Box::pin(async move { Ok(matched) })
    }

    fn set_ban_status(
        &self,
        uuid: &str,
        banned: bool,
        expires_at: Option<DateTime>,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let matched = self.mutate(uuid, |profile| {
            profile.banned = banned;
            profile.ban_expires_at = expires_at;
        });
        Box::pin(async move { Ok(matched) })
    }

    fn set_last_login(&self, uuid: &str, at: DateTime) -> BoxFuture<'static, StorageResult<bool>> {
        let matched = self.mutate(uuid, |profile| profile.last_login_at = at);
        Box::pin(async move { Ok(matched) })
    }

    fn uuids_missing_username(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let uuids: Vec<String> = self
            .profiles
            .iter()
            .filter(|entry| entry.username.is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        Box::pin(async move { Ok(uuids) })
    }

    fn aggregate_team_playtime(&self) -> BoxFuture<'static, StorageResult<HashMap<String, f64>>> {
        let mut totals: HashMap<String, f64> = HashMap::new();
        for entry in self.profiles.iter() {
            if let Some(team) = &entry.team {
                *totals.entry(team.clone()).or_insert(0.0) += entry.total_playtime_ticks;
            }
        }
        Box::pin(async move { Ok(totals) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Team store kept in process memory, for tests.
#[derive(Clone, Default)]
pub struct InMemoryTeamStore {
    teams: Arc<DashMap<String, TeamDoc>>,
}

impl InMemoryTeamStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn blank_team(name: &str) -> TeamDoc {
        let now = DateTime::now();
        TeamDoc {
            name: name.to_owned(),
            player_count: 0,
            total_playtime: 0.0,
            created_at: now,
            last_updated: now,
        }
    }
}

impl TeamStore for InMemoryTeamStore {
    fn ensure_teams(&self, teams: Vec<String>) -> BoxFuture<'static, StorageResult<()>> {
        for team in teams {
            self.teams
                .entry(team.clone())
                .or_insert_with(|| Self::blank_team(&team));
        }
        Box::pin(async { Ok(()) })
    }

    fn all_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamDoc>>> {
        let teams: Vec<TeamDoc> = self.teams.iter().map(|entry| entry.clone()).collect();
        Box::pin(async move { Ok(teams) })
    }

    fn player_count(&self, team: &str) -> BoxFuture<'static, StorageResult<i64>> {
        let count = self
            .teams
            .get(team)
            .map(|doc| doc.player_count)
            .unwrap_or(0);
        Box::pin(async move { Ok(count) })
    }

    fn increment_player_count(&self, team: &str) -> BoxFuture<'static, StorageResult<i64>> {
        let mut entry = self
            .teams
            .entry(team.to_owned())
            .or_insert_with(|| Self::blank_team(team));
        entry.player_count += 1;
        entry.last_updated = DateTime::now();
        let count = entry.player_count;
        drop(entry);
        Box::pin(async move { Ok(count) })
    }

    fn set_total_playtime(&self, team: &str, total: f64) -> BoxFuture<'static, StorageResult<()>> {
        let mut entry = self
            .teams
            .entry(team.to_owned())
            .or_insert_with(|| Self::blank_team(team));
        entry.total_playtime = total;
        entry.last_updated = DateTime::now();
        drop(entry);
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(uuid: &str, team: &str, total: f64) -> PlayerProfile {
        let mut profile = PlayerProfile::new(
            uuid.to_owned(),
            team.to_owned(),
            format!("{team}-member"),
            DateTime::now(),
        );
        profile.total_playtime_ticks = total;
        profile
    }

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let store = InMemoryProfileStore::new();
        let uuid = "00000000-0000-0000-0000-000000000001";
        assert!(store
            .create(profile(uuid, "AQUA_CREEPERS", 0.0))
            .await
            .unwrap());
        assert!(!store
            .create(profile(uuid, "AQUA_CREEPERS", 0.0))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn updates_report_missing_profiles() {
        let store = InMemoryProfileStore::new();
        assert!(!store.set_playtime("missing", 10.0).await.unwrap());
    }

    #[tokio::test]
    async fn aggregation_sums_totals_per_team() {
        let store = InMemoryProfileStore::new();
        for (i, (team, total)) in [
            ("AQUA_CREEPERS", 10.0),
            ("AQUA_CREEPERS", 15.0),
            ("PURPLE_AXOLOTLS", 7.5),
        ]
        .iter()
        .enumerate()
        {
            store
                .create(profile(&format!("uuid-{i}"), team, *total))
                .await
                .unwrap();
        }

        let totals = store.aggregate_team_playtime().await.unwrap();
        assert_eq!(totals["AQUA_CREEPERS"], 25.0);
        assert_eq!(totals["PURPLE_AXOLOTLS"], 7.5);
    }

    #[tokio::test]
    async fn increment_player_count_is_sequential() {
        let store = InMemoryTeamStore::new();
        assert_eq!(store.increment_player_count("AQUA_CREEPERS").await.unwrap(), 1);
        assert_eq!(store.increment_player_count("AQUA_CREEPERS").await.unwrap(), 2);
        assert_eq!(store.player_count("AQUA_CREEPERS").await.unwrap(), 2);
        assert_eq!(store.player_count("PURPLE_AXOLOTLS").await.unwrap(), 0);
    }
}
