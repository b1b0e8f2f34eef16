use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::future::BoxFuture;
use redis::AsyncCommands;
use redis::cluster_async::ClusterConnection;
use tracing::{debug, warn};

use super::{BanInfo, SessionError, SessionResult, SessionStore, keys};

/// Player totals are cache entries, not the system of record; let idle ones
/// age out well after the syncer has persisted them.
const PLAYER_TOTAL_TTL: Duration = Duration::from_secs(6 * 3600);
/// Unconsumed deltas survive long enough for any stalled updater to recover.
const DELTA_TTL: Duration = Duration::from_secs(24 * 3600);
/// Refreshed on every increment so recently-active teams stay hot.
const TEAM_TOTAL_TTL: Duration = Duration::from_secs(6 * 3600);

/// Session store over a Redis cluster connection.
///
/// Keyed commands route through the cluster connection; the scan paths walk
/// every master's keyspace with its own cursor, since SCAN has no
/// cross-shard cursor on a cluster.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ClusterConnection,
    online_ttl: Duration,
    password: Option<String>,
}

impl RedisSessionStore {
    pub fn new(conn: ClusterConnection, online_ttl: Duration, password: Option<String>) -> Self {
        Self {
            conn,
            online_ttl,
            password,
        }
    }

    /// Addresses of the current master shard owners.
    async fn master_nodes(&self) -> SessionResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let raw: String = redis::cmd("CLUSTER")
            .arg("NODES")
            .query_async(&mut conn)
            .await
            .map_err(|source| SessionError::command("listing cluster nodes", source))?;
        Ok(parse_master_addrs(&raw))
    }

    /// Collect all keys matching `pattern` across every shard owner, one
    /// SCAN cursor per master. An unreachable master is logged and skipped;
    /// its keys surface again on the next pass.
    async fn scan_keys(&self, pattern: &str, context: &'static str) -> SessionResult<Vec<String>> {
        let mut keys = Vec::new();
        for addr in self.master_nodes().await? {
            let url = match &self.password {
                Some(password) => format!("redis://:{password}@{addr}"),
                None => format!("redis://{addr}"),
            };
            let client = match redis::Client::open(url) {
                Ok(client) => client,
                Err(err) => {
                    warn!(%addr, error = %err, "skipping shard owner with invalid address");
                    continue;
                }
            };
            let mut node_conn = match client.get_multiplexed_async_connection().await {
                Ok(node_conn) => node_conn,
                Err(err) => {
                    warn!(%addr, error = %err, "skipping unreachable shard owner");
                    continue;
                }
            };

            let mut iter = node_conn
                .scan_match::<_, String>(pattern)
                .await
                .map_err(|source| SessionError::command(context, source))?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    async fn set_online(&self, uuid: String, session_start: i64) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(
            keys::online(&uuid),
            session_start,
            self.online_ttl.as_secs().max(1),
        )
        .await
        .map_err(|source| SessionError::command("marking player online", source))
    }

    async fn online_since(&self, uuid: String) -> SessionResult<Option<i64>> {
        let mut conn = self.conn.clone();
        conn.get(keys::online(&uuid))
            .await
            .map_err(|source| SessionError::command("reading session start", source))
    }

    async fn refresh_online(&self, uuid: String) -> SessionResult<bool> {
        let mut conn = self.conn.clone();
        conn.expire(keys::online(&uuid), self.online_ttl.as_secs().max(1) as i64)
            .await
            .map_err(|source| SessionError::command("refreshing online ttl", source))
    }

    async fn is_online(&self, uuid: String) -> SessionResult<bool> {
        let mut conn = self.conn.clone();
        conn.exists(keys::online(&uuid))
            .await
            .map_err(|source| SessionError::command("checking online status", source))
    }

    async fn online_players(&self) -> SessionResult<Vec<String>> {
        let keys = self
            .scan_keys(keys::online_pattern(), "scanning online players")
            .await?;
        Ok(keys
            .iter()
            .filter_map(|key| keys::tag_from_key(key))
            .map(str::to_owned)
            .collect())
    }

    async fn online_sessions(&self) -> SessionResult<HashMap<String, i64>> {
        let keys = self
            .scan_keys(keys::online_pattern(), "scanning online sessions")
            .await?;

        let mut conn = self.conn.clone();
        let mut sessions = HashMap::with_capacity(keys.len());
        for key in keys {
            let Some(uuid) = keys::tag_from_key(&key).map(str::to_owned) else {
                warn!(%key, "skipping malformed online key");
                continue;
            };
            match conn.get::<_, Option<i64>>(&key).await {
                Ok(Some(session_start)) => {
                    sessions.insert(uuid, session_start);
                }
                // Key expired between scan and read.
                Ok(None) => {}
                Err(err) => warn!(%key, error = %err, "failed to read session start; skipping"),
            }
        }
        Ok(sessions)
    }

    async fn set_player_total(&self, uuid: String, total: f64) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(keys::playtime(&uuid), total, PLAYER_TOTAL_TTL.as_secs())
            .await
            .map_err(|source| SessionError::command("setting player total", source))
    }

    async fn get_player_total(&self, uuid: String) -> SessionResult<Option<f64>> {
        let mut conn = self.conn.clone();
        conn.get(keys::playtime(&uuid))
            .await
            .map_err(|source| SessionError::command("reading player total", source))
    }

    async fn all_player_totals(&self) -> SessionResult<HashMap<String, f64>> {
        let keys = self
            .scan_keys(keys::playtime_pattern(), "scanning player totals")
            .await?;

        let mut conn = self.conn.clone();
        let mut totals = HashMap::with_capacity(keys.len());
        for key in keys {
            let Some(uuid) = keys::tag_from_key(&key).map(str::to_owned) else {
                warn!(%key, "skipping malformed playtime key");
                continue;
            };
            match conn.get::<_, Option<f64>>(&key).await {
                Ok(Some(total)) => {
                    totals.insert(uuid, total);
                }
                // Key expired between scan and read.
                Ok(None) => {}
                Err(err) => warn!(%key, error = %err, "failed to read player total; skipping"),
            }
        }
        Ok(totals)
    }

    async fn set_player_delta(&self, uuid: String, delta: f64) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(keys::delta(&uuid), delta, DELTA_TTL.as_secs())
            .await
            .map_err(|source| SessionError::command("setting player delta", source))
    }

    async fn get_player_delta(&self, uuid: String) -> SessionResult<Option<f64>> {
        let mut conn = self.conn.clone();
        conn.get(keys::delta(&uuid))
            .await
            .map_err(|source| SessionError::command("reading player delta", source))
    }

    async fn fold_pending_delta(&self, uuid: String) -> SessionResult<Option<f64>> {
        let delta_key = keys::delta(&uuid);
        let total_key = keys::playtime(&uuid);
        let mut conn = self.conn.clone();

        let delta: Option<f64> = conn
            .get(&delta_key)
            .await
            .map_err(|source| SessionError::command("reading pending delta", source))?;
        let Some(delta) = delta else {
            return Ok(None);
        };

        if delta <= 0.0 {
            // Consume the bogus delta so it is not reprocessed every tick.
            conn.del::<_, ()>(&delta_key)
                .await
                .map_err(|source| SessionError::command("clearing non-positive delta", source))?;
            debug!(%uuid, delta, "consumed non-positive delta without increment");
            return Ok(None);
        }

        let team: Option<String> = conn
            .get(keys::player_team(&uuid))
            .await
            .map_err(|source| SessionError::command("reading player team", source))?;

        // Single slot ({uuid}): the increment and the delta delete land
        // together, so the delta is consumed at most once per tick even when
        // two instances briefly overlap during a membership change.
        redis::pipe()
            .cmd("INCRBYFLOAT")
            .arg(&total_key)
            .arg(delta)
            .ignore()
            .cmd("DEL")
            .arg(&delta_key)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|source| SessionError::command("folding delta into player total", source))?;

        match team {
            Some(team) => self.increment_team_total(team, delta).await?,
            None => {
                debug!(%uuid, "no team mapping; player total incremented without team total");
            }
        }

        Ok(Some(delta))
    }

    async fn increment_team_total(&self, team: String, amount: f64) -> SessionResult<()> {
        let key = keys::team_total(&team);
        let mut conn = self.conn.clone();
        let total: f64 = conn
            .incr(&key, amount)
            .await
            .map_err(|source| SessionError::command("incrementing team total", source))?;

        // TTL refresh keeps active teams alive; its failure does not undo the
        // increment, so log and move on.
        if let Err(err) = conn
            .expire::<_, bool>(&key, TEAM_TOTAL_TTL.as_secs() as i64)
            .await
        {
            warn!(%team, error = %err, "failed to refresh team total ttl");
        }

        debug!(%team, amount, total, "team total incremented");
        Ok(())
    }

    async fn set_player_team(&self, uuid: String, team: String) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        conn.set(keys::player_team(&uuid), team)
            .await
            .map_err(|source| SessionError::command("setting player team", source))
    }

    async fn get_player_team(&self, uuid: String) -> SessionResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(keys::player_team(&uuid))
            .await
            .map_err(|source| SessionError::command("reading player team", source))
    }

    async fn clear_session(&self, uuid: String) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .cmd("DEL")
            .arg(keys::online(&uuid))
            .ignore()
            .cmd("DEL")
            .arg(keys::playtime(&uuid))
            .ignore()
            .cmd("DEL")
            .arg(keys::delta(&uuid))
            .ignore()
            .cmd("DEL")
            .arg(keys::player_team(&uuid))
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|source| SessionError::command("clearing session keys", source))
    }

    async fn set_team_total(&self, team: String, total: f64) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        conn.set(keys::team_total(&team), total)
            .await
            .map_err(|source| SessionError::command("overwriting team total", source))
    }

    async fn get_team_total(&self, team: String) -> SessionResult<Option<f64>> {
        let mut conn = self.conn.clone();
        conn.get(keys::team_total(&team))
            .await
            .map_err(|source| SessionError::command("reading team total", source))
    }

    async fn ban(
        &self,
        uuid: String,
        expires_at: Option<i64>,
        reason: Option<String>,
    ) -> SessionResult<()> {
        let ban_key = keys::banned(&uuid);
        let mut conn = self.conn.clone();

        match expires_at {
            None => {
                conn.set::<_, _, ()>(&ban_key, 0i64)
                    .await
                    .map_err(|source| SessionError::command("writing permanent ban", source))?;
                if let Some(reason) = reason {
                    conn.set::<_, _, ()>(keys::ban_reason(&uuid), reason)
                        .await
                        .map_err(|source| SessionError::command("writing ban reason", source))?;
                }
            }
            Some(expires_at) => {
                let remaining = (expires_at - now_unix_secs()).max(1) as u64;
                conn.set_ex::<_, _, ()>(&ban_key, expires_at, remaining)
                    .await
                    .map_err(|source| SessionError::command("writing temporary ban", source))?;
                if let Some(reason) = reason {
                    conn.set_ex::<_, _, ()>(keys::ban_reason(&uuid), reason, remaining)
                        .await
                        .map_err(|source| SessionError::command("writing ban reason", source))?;
                }
            }
        }
        Ok(())
    }

    async fn unban(&self, uuid: String) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        conn.del(&[keys::banned(&uuid), keys::ban_reason(&uuid)])
            .await
            .map_err(|source| SessionError::command("deleting ban keys", source))
    }

    async fn is_banned(&self, uuid: String) -> SessionResult<bool> {
        let ban_key = keys::banned(&uuid);
        let mut conn = self.conn.clone();

        let raw: Option<String> = conn
            .get(&ban_key)
            .await
            .map_err(|source| SessionError::command("reading ban record", source))?;
        let Some(raw) = raw else {
            return Ok(false);
        };

        let expires_at: i64 = match raw.parse() {
            Ok(expires_at) => expires_at,
            Err(_) => {
                warn!(%uuid, value = %raw, "ban record holds a malformed timestamp; treating as not banned");
                return Ok(false);
            }
        };

        if expires_at > 0 && now_unix_secs() >= expires_at {
            // Expired: clean up lazily so the read path stays fast.
            let store = self.clone();
            tokio::spawn(async move {
                if let Err(err) = store.unban(uuid.clone()).await {
                    warn!(%uuid, error = %err, "failed to clean up expired ban");
                }
            });
            return Ok(false);
        }

        Ok(true)
    }

    async fn ban_info(&self, uuid: String) -> SessionResult<Option<BanInfo>> {
        let mut conn = self.conn.clone();
        let (ban, reason): (Option<String>, Option<String>) = redis::pipe()
            .cmd("GET")
            .arg(keys::banned(&uuid))
            .cmd("GET")
            .arg(keys::ban_reason(&uuid))
            .query_async(&mut conn)
            .await
            .map_err(|source| SessionError::command("reading ban info", source))?;

        let Some(raw) = ban else {
            return Ok(None);
        };
        let expires_at: i64 = raw.parse().map_err(|_| SessionError::MalformedValue {
            key: keys::banned(&uuid),
            value: raw,
        })?;

        Ok(Some(BanInfo {
            uuid,
            reason,
            expires_at: (expires_at > 0).then_some(expires_at),
            is_permanent: expires_at == 0,
        }))
    }

    async fn all_bans(&self) -> SessionResult<Vec<BanInfo>> {
        let keys = self
            .scan_keys(keys::banned_pattern(), "scanning bans")
            .await?;

        let mut bans = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(uuid) = keys::tag_from_key(&key).map(str::to_owned) else {
                warn!(%key, "skipping malformed ban key");
                continue;
            };
            // Routes through is_banned first so expired records are cleaned
            // up instead of reported.
            if !self.is_banned(uuid.clone()).await? {
                continue;
            }
            if let Some(info) = self.ban_info(uuid).await? {
                bans.push(info);
            }
        }
        Ok(bans)
    }

    async fn health_check(&self) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|source| SessionError::command("pinging the cache", source))
    }
}

fn now_unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}

/// Extract the reachable master addresses from a `CLUSTER NODES` payload.
/// Each line reads `<id> <host:port@busport[,hostname]> <flags> ...`.
fn parse_master_addrs(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _id = fields.next()?;
            let addr = fields.next()?;
            let flags = fields.next()?;
            if !flags.split(',').any(|flag| flag == "master") {
                return None;
            }
            if flags.split(',').any(|flag| flag.starts_with("fail")) {
                return None;
            }
            let host_port = addr.split('@').next()?;
            (!host_port.is_empty()).then(|| host_port.to_owned())
        })
        .collect()
}

impl SessionStore for RedisSessionStore {
    fn set_online(&self, uuid: &str, session_start: i64) -> BoxFuture<'static, SessionResult<()>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.set_online(uuid, session_start).await })
    }

    fn online_since(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<i64>>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.online_since(uuid).await })
    }

    fn refresh_online(&self, uuid: &str) -> BoxFuture<'static, SessionResult<bool>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.refresh_online(uuid).await })
    }

    fn is_online(&self, uuid: &str) -> BoxFuture<'static, SessionResult<bool>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.is_online(uuid).await })
    }

    fn online_players(&self) -> BoxFuture<'static, SessionResult<Vec<String>>> {
        let store = self.clone();
        Box::pin(async move { store.online_players().await })
    }

    fn online_sessions(&self) -> BoxFuture<'static, SessionResult<HashMap<String, i64>>> {
        let store = self.clone();
        Box::pin(async move { store.online_sessions().await })
    }

    fn set_player_total(&self, uuid: &str, total: f64) -> BoxFuture<'static, SessionResult<()>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.set_player_total(uuid, total).await })
    }

    fn get_player_total(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<f64>>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.get_player_total(uuid).await })
    }

    fn all_player_totals(&self) -> BoxFuture<'static, SessionResult<HashMap<String, f64>>> {
        let store = self.clone();
        Box::pin(async move { store.all_player_totals().await })
    }

    fn set_player_delta(&self, uuid: &str, delta: f64) -> BoxFuture<'static, SessionResult<()>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.set_player_delta(uuid, delta).await })
    }

    fn get_player_delta(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<f64>>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.get_player_delta(uuid).await })
    }

    fn fold_pending_delta(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<f64>>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.fold_pending_delta(uuid).await })
    }

    fn set_player_team(&self, uuid: &str, team: &str) -> BoxFuture<'static, SessionResult<()>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        let team = team.to_owned();
        Box::pin(async move { store.set_player_team(uuid, team).await })
    }

    fn get_player_team(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<String>>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.get_player_team(uuid).await })
    }

    fn clear_session(&self, uuid: &str) -> BoxFuture<'static, SessionResult<()>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.clear_session(uuid).await })
    }

    fn set_team_total(&self, team: &str, total: f64) -> BoxFuture<'static, SessionResult<()>> {
        let store = self.clone();
        let team = team.to_owned();
        Box::pin(async move { store.set_team_total(team, total).await })
    }

    fn get_team_total(&self, team: &str) -> BoxFuture<'static, SessionResult<Option<f64>>> {
        let store = self.clone();
        let team = team.to_owned();
        Box::pin(async move { store.get_team_total(team).await })
    }

    fn ban(
        &self,
        uuid: &str,
        expires_at: Option<i64>,
        reason: Option<String>,
    ) -> BoxFuture<'static, SessionResult<()>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.ban(uuid, expires_at, reason).await })
    }

    fn unban(&self, uuid: &str) -> BoxFuture<'static, SessionResult<()>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.unban(uuid).await })
    }

    fn is_banned(&self, uuid: &str) -> BoxFuture<'static, SessionResult<bool>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.is_banned(uuid).await })
    }

    fn ban_info(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<BanInfo>>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.ban_info(uuid).await })
    }

    fn all_bans(&self) -> BoxFuture<'static, SessionResult<Vec<BanInfo>>> {
        let store = self.clone();
        Box::pin(async move { store.all_bans().await })
    }

    fn health_check(&self) -> BoxFuture<'static, SessionResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.health_check().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_masters_from_cluster_nodes_output() {
        let raw = "\
07c3 10.0.0.7:6379@16379 myself,master - 0 0 1 connected 0-5460\n\
a8f1 10.0.0.8:6379@16379 master - 0 1700000000000 2 connected 5461-10922\n\
b2c4 10.0.0.9:6379@16379,cache-2.internal master - 0 1700000000000 3 connected 10923-16383\n\
d911 10.0.0.10:6379@16379 slave a8f1 0 1700000000000 2 connected\n\
e5a0 10.0.0.11:6379@16379 master,fail - 0 1700000000000 4 disconnected\n";

        let masters = parse_master_addrs(raw);
        assert_eq!(
            masters,
            vec![
                "10.0.0.7:6379".to_owned(),
                "10.0.0.8:6379".to_owned(),
                "10.0.0.9:6379".to_owned(),
            ]
        );
    }

    #[test]
    fn ignores_replicas_and_malformed_lines() {
        let raw = "\
d911 10.0.0.10:6379@16379 slave a8f1 0 0 2 connected\n\
truncated-line\n\
\n";
        assert!(parse_master_addrs(raw).is_empty());
    }
}
