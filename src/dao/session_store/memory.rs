use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use futures::future::BoxFuture;

use super::{BanInfo, SessionResult, SessionStore};

/// Value with an optional expiry deadline, mirroring a cache TTL.
#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    deadline: Option<Instant>,
}

impl<T: Clone> Expiring<T> {
    fn forever(value: T) -> Self {
        Self {
            value,
            deadline: None,
        }
    }

    fn until(value: T, ttl: Duration) -> Self {
        Self {
            value,
            deadline: Some(Instant::now() + ttl),
        }
    }

    fn live(&self) -> Option<T> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => None,
            _ => Some(self.value.clone()),
        }
    }
}

#[derive(Default)]
struct Inner {
    online: DashMap<String, Expiring<i64>>,
    totals: DashMap<String, f64>,
    deltas: DashMap<String, f64>,
    teams: DashMap<String, String>,
    team_totals: DashMap<String, f64>,
    bans: DashMap<String, Expiring<i64>>,
    ban_reasons: DashMap<String, Expiring<String>>,
}

/// Session store kept entirely in process memory.
///
/// Behaves like the Redis-backed store for everything the service layer
/// observes, including online/ban TTLs and consume-at-most-once deltas, so
/// the full HTTP surface can be exercised without a cache cluster.
#[derive(Clone)]
pub struct InMemorySessionStore {
    inner: Arc<Inner>,
    online_ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(online_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            online_ttl,
        }
    }

    fn fold(&self, uuid: &str) -> Option<f64> {
        let delta = self.inner.deltas.remove(uuid).map(|(_, delta)| delta)?;
        if delta <= 0.0 {
            return None;
        }

        *self.inner.totals.entry(uuid.to_owned()).or_insert(0.0) += delta;
        if let Some(team) = self.inner.teams.get(uuid).map(|team| team.clone()) {
            *self.inner.team_totals.entry(team).or_insert(0.0) += delta;
        }
        Some(delta)
    }

    fn banned_until(&self, uuid: &str) -> Option<i64> {
        let expires_at = self.inner.bans.get(uuid).and_then(|entry| entry.live())?;
        if expires_at > 0 && now_unix_secs() >= expires_at {
            self.inner.bans.remove(uuid);
            self.inner.ban_reasons.remove(uuid);
            return None;
        }
        Some(expires_at)
    }
}

fn now_unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}

impl SessionStore for InMemorySessionStore {
    fn set_online(&self, uuid: &str, session_start: i64) -> BoxFuture<'static, SessionResult<()>> {
        self.inner.online.insert(
            uuid.to_owned(),
            Expiring::until(session_start, self.online_ttl),
        );
        Box::pin(async { Ok(()) })
    }

    fn online_since(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<i64>>> {
        let since = self.inner.online.get(uuid).and_then(|entry| entry.live());
        Box::pin(async move { Ok(since) })
    }

    fn refresh_online(&self, uuid: &str) -> BoxFuture<'static, SessionResult<bool>> {
        let refreshed = match self.inner.online.get_mut(uuid) {
            Some(mut entry) if entry.live().is_some() => {
                entry.deadline = Some(Instant::now() + self.online_ttl);
                true
            }
            _ => false,
        };
        Box::pin(async move { Ok(refreshed) })
    }

    fn is_online(&self, uuid: &str) -> BoxFuture<'static, SessionResult<bool>> {
        let online = self
            .inner
            .online
            .get(uuid)
            .and_then(|entry| entry.live())
            .is_some();
        Box::pin(async move { Ok(online) })
    }

    fn online_players(&self) -> BoxFuture<'static, SessionResult<Vec<String>>> {
        let players: Vec<String> = self
            .inner
            .online
            .iter()
            .filter(|entry| entry.live().is_some())
            .map(|entry| entry.key().clone())
            .collect();
        Box::pin(async move { Ok(players) })
    }

    fn online_sessions(&self) -> BoxFuture<'static, SessionResult<HashMap<String, i64>>> {
        let sessions: HashMap<String, i64> = self
            .inner
            .online
            .iter()
            .filter_map(|entry| entry.live().map(|since| (entry.key().clone(), since)))
            .collect();
        Box::pin(async move { Ok(sessions) })
    }

    fn set_player_total(&self, uuid: &str, total: f64) -> BoxFuture<'static, SessionResult<()>> {
        self.inner.totals.insert(uuid.to_owned(), total);
        Box::pin(async { Ok(()) })
    }

    fn get_player_total(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<f64>>> {
        let total = self.inner.totals.get(uuid).map(|total| *total);
        Box::pin(async move { Ok(total) })
    }

    fn all_player_totals(&self) -> BoxFuture<'static, SessionResult<HashMap<String, f64>>> {
        let totals: HashMap<String, f64> = self
            .inner
            .totals
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        Box::pin(async move { Ok(totals) })
    }

    fn set_player_delta(&self, uuid: &str, delta: f64) -> BoxFuture<'static, SessionResult<()>> {
        self.inner.deltas.insert(uuid.to_owned(), delta);
        Box::pin(async { Ok(()) })
    }

    fn get_player_delta(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<f64>>> {
        let delta = self.inner.deltas.get(uuid).map(|delta| *delta);
        Box::pin(async move { Ok(delta) })
    }

    fn fold_pending_delta(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<f64>>> {
        let folded = self.fold(uuid);
        Box::pin(async move { Ok(folded) })
    }

    fn set_player_team(&self, uuid: &str, team: &str) -> BoxFuture<'static, SessionResult<()>> {
        self.inner.teams.insert(uuid.to_owned(), team.to_owned());
        Box::pin(async { Ok(()) })
    }

    fn get_player_team(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<String>>> {
        let team = self.inner.teams.get(uuid).map(|team| team.clone());
        Box::pin(async move { Ok(team) })
    }

    fn clear_session(&self, uuid: &str) -> BoxFuture<'static, SessionResult<()>> {
        self.inner.online.remove(uuid);
        self.inner.totals.remove(uuid);
        self.inner.deltas.remove(uuid);
        self.inner.teams.remove(uuid);
        Box::pin(async { Ok(()) })
    }

    fn set_team_total(&self, team: &str, total: f64) -> BoxFuture<'static, SessionResult<()>> {
        self.inner.team_totals.insert(team.to_owned(), total);
        Box::pin(async { Ok(()) })
    }

    fn get_team_total(&self, team: &str) -> BoxFuture<'static, SessionResult<Option<f64>>> {
        let total = self.inner.team_totals.get(team).map(|total| *total);
        Box::pin(async move { Ok(total) })
    }

    fn ban(
        &self,
        uuid: &str,
        expires_at: Option<i64>,
        reason: Option<String>,
    ) -> BoxFuture<'static, SessionResult<()>> {
        match expires_at {
            None => {
                self.inner.bans.insert(uuid.to_owned(), Expiring::forever(0));
                if let Some(reason) = reason {
                    self.inner
                        .ban_reasons
                        .insert(uuid.to_owned(), Expiring::forever(reason));
                }
            }
            Some(expires_at) => {
                let remaining =
                    Duration::from_secs((expires_at - now_unix_secs()).max(1) as u64);
                self.inner
                    .bans
                    .insert(uuid.to_owned(), Expiring::until(expires_at, remaining));
                if let Some(reason) = reason {
                    self.inner
                        .ban_reasons
                        .insert(uuid.to_owned(), Expiring::until(reason, remaining));
                }
            }
        }
        Box::pin(async { Ok(()) })
    }

    fn unban(&self, uuid: &str) -> BoxFuture<'static, SessionResult<()>> {
        self.inner.bans.remove(uuid);
        self.inner.ban_reasons.remove(uuid);
        Box::pin(async { Ok(()) })
    }

    fn is_banned(&self, uuid: &str) -> BoxFuture<'static, SessionResult<bool>> {
        let banned = self.banned_until(uuid).is_some();
        Box::pin(async move { Ok(banned) })
    }

    fn ban_info(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<BanInfo>>> {
        let info = self
            .inner
            .bans
            .get(uuid)
            .and_then(|entry| entry.live())
            .map(|expires_at| BanInfo {
                uuid: uuid.to_owned(),
                reason: self
                    .inner
                    .ban_reasons
                    .get(uuid)
                    .and_then(|entry| entry.live()),
                expires_at: (expires_at > 0).then_some(expires_at),
                is_permanent: expires_at == 0,
            });
        Box::pin(async move { Ok(info) })
    }

    fn all_bans(&self) -> BoxFuture<'static, SessionResult<Vec<BanInfo>>> {
        let uuids: Vec<String> = self
            .inner
            .bans
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let mut bans = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            if self.banned_until(&uuid).is_none() {
                continue;
            }
            if let Some(expires_at) = self.inner.bans.get(&uuid).and_then(|entry| entry.live()) {
                bans.push(BanInfo {
                    uuid: uuid.clone(),
                    reason: self
                        .inner
                        .ban_reasons
                        .get(&uuid)
                        .and_then(|entry| entry.live()),
                    expires_at: (expires_at > 0).then_some(expires_at),
                    is_permanent: expires_at == 0,
                });
            }
        }
        Box::pin(async move { Ok(bans) })
    }

    fn health_check(&self) -> BoxFuture<'static, SessionResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "00000000-0000-0000-0000-000000000001";

    fn store() -> InMemorySessionStore {
        InMemorySessionStore::new(Duration::from_secs(15))
    }

    #[tokio::test]
    async fn delta_is_consumed_at_most_once() {
        let store = store();
        store.set_player_total(UUID, 10.0).await.unwrap();
        store.set_player_delta(UUID, 1.0).await.unwrap();
        store.set_player_team(UUID, "AQUA_CREEPERS").await.unwrap();

        assert_eq!(store.fold_pending_delta(UUID).await.unwrap(), Some(1.0));
        assert_eq!(store.get_player_total(UUID).await.unwrap(), Some(11.0));
        assert_eq!(
            store.get_team_total("AQUA_CREEPERS").await.unwrap(),
            Some(1.0)
        );

        // Nothing left to fold until a fresh delta arrives.
        assert_eq!(store.fold_pending_delta(UUID).await.unwrap(), None);
        assert_eq!(store.get_player_total(UUID).await.unwrap(), Some(11.0));
    }

    #[tokio::test]
    async fn non_positive_delta_is_dropped_without_increment() {
        let store = store();
        store.set_player_total(UUID, 5.0).await.unwrap();
        store.set_player_delta(UUID, -2.0).await.unwrap();

        assert_eq!(store.fold_pending_delta(UUID).await.unwrap(), None);
        assert_eq!(store.get_player_total(UUID).await.unwrap(), Some(5.0));
        assert_eq!(store.get_player_delta(UUID).await.unwrap(), None);
    }

    #[tokio::test]
    async fn fold_without_team_still_advances_player_total() {
        let store = store();
        store.set_player_delta(UUID, 3.0).await.unwrap();

        assert_eq!(store.fold_pending_delta(UUID).await.unwrap(), Some(3.0));
        assert_eq!(store.get_player_total(UUID).await.unwrap(), Some(3.0));
    }

    #[tokio::test]
    async fn refresh_of_absent_online_key_reports_false() {
        let store = store();
        assert!(!store.refresh_online(UUID).await.unwrap());

        store.set_online(UUID, 1_700_000_000).await.unwrap();
        assert!(store.refresh_online(UUID).await.unwrap());
    }

    #[tokio::test]
    async fn clear_session_removes_every_session_key() {
        let store = store();
        store.set_online(UUID, 1_700_000_000).await.unwrap();
        store.set_player_total(UUID, 4.0).await.unwrap();
        store.set_player_delta(UUID, 1.0).await.unwrap();
        store.set_player_team(UUID, "PURPLE_AXOLOTLS").await.unwrap();

        store.clear_session(UUID).await.unwrap();

        assert!(!store.is_online(UUID).await.unwrap());
        assert_eq!(store.get_player_total(UUID).await.unwrap(), None);
        assert_eq!(store.get_player_delta(UUID).await.unwrap(), None);
        assert_eq!(store.get_player_team(UUID).await.unwrap(), None);
    }

    #[tokio::test]
    async fn permanent_ban_never_expires() {
        let store = store();
        store.ban(UUID, None, Some("cheating".into())).await.unwrap();

        let entry = store.inner.bans.get(UUID).unwrap();
        assert!(entry.deadline.is_none());
        drop(entry);

        assert!(store.is_banned(UUID).await.unwrap());
        let info = store.ban_info(UUID).await.unwrap().unwrap();
        assert!(info.is_permanent);
        assert_eq!(info.expires_at, None);
        assert_eq!(info.reason.as_deref(), Some("cheating"));
    }

    #[tokio::test]
    async fn expired_temporary_ban_reads_as_not_banned() {
        let store = store();
        // Expiration in the past: lazily cleaned up on the next read.
        store
            .ban(UUID, Some(now_unix_secs() - 5), Some("spam".into()))
            .await
            .unwrap();

        assert!(!store.is_banned(UUID).await.unwrap());
        assert!(store.inner.bans.get(UUID).is_none());
    }

    #[tokio::test]
    async fn unban_removes_record_and_reason() {
        let store = store();
        store
            .ban(UUID, Some(now_unix_secs() + 60), Some("spam".into()))
            .await
            .unwrap();
        assert!(store.is_banned(UUID).await.unwrap());

        store.unban(UUID).await.unwrap();
        assert!(!store.is_banned(UUID).await.unwrap());
        assert_eq!(store.ban_info(UUID).await.unwrap(), None);
    }
}
