//! Hot per-session state over the clustered cache.
//!
//! The game service owns the `online/playtime/deltatime/team/team_total/
//! banned` key families between a player's Online and Offline. All
//! per-player keys share the `{uuid}` hash tag so pipelines against them hit
//! a single slot; the team totals live on their own slots and are only ever
//! touched with commutative operations.

pub mod keys;
mod memory;
mod redis;

use std::collections::HashMap;

use futures::future::BoxFuture;
use thiserror::Error;

pub use self::memory::InMemorySessionStore;
pub use self::redis::RedisSessionStore;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cache command failed while {context}")]
    Command {
        context: &'static str,
        #[source]
        source: ::redis::RedisError,
    },
    #[error("malformed value under `{key}`: `{value}`")]
    MalformedValue { key: String, value: String },
}

impl SessionError {
    pub(crate) fn command(context: &'static str, source: ::redis::RedisError) -> Self {
        SessionError::Command { context, source }
    }
}

/// Ban record as read back from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanInfo {
    pub uuid: String,
    pub reason: Option<String>,
    /// Unix seconds; `None` for a permanent ban.
    pub expires_at: Option<i64>,
    pub is_permanent: bool,
}

/// Narrow interface over the cache so tests can substitute an in-memory
/// implementation. Operations map one-to-one onto atomic cache primitives.
pub trait SessionStore: Send + Sync {
    /// Mark a player online, storing the session-start unix seconds with the
    /// online TTL.
    fn set_online(&self, uuid: &str, session_start: i64) -> BoxFuture<'static, SessionResult<()>>;

    /// Session-start unix seconds, if the player is currently online.
    fn online_since(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<i64>>>;

    /// Extend the online TTL. Returns `false` (not an error) when the key is
    /// absent; the client must go through Online again.
    fn refresh_online(&self, uuid: &str) -> BoxFuture<'static, SessionResult<bool>>;

    fn is_online(&self, uuid: &str) -> BoxFuture<'static, SessionResult<bool>>;

    /// Uuids of all currently-online players, cluster-wide.
    fn online_players(&self) -> BoxFuture<'static, SessionResult<Vec<String>>>;

    /// All currently-online players with their session-start unix seconds.
    fn online_sessions(&self) -> BoxFuture<'static, SessionResult<HashMap<String, i64>>>;

    fn set_player_total(&self, uuid: &str, total: f64) -> BoxFuture<'static, SessionResult<()>>;

    fn get_player_total(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<f64>>>;

    /// All player totals currently cached, cluster-wide.
    fn all_player_totals(&self) -> BoxFuture<'static, SessionResult<HashMap<String, f64>>>;

    fn set_player_delta(&self, uuid: &str, delta: f64) -> BoxFuture<'static, SessionResult<()>>;

    fn get_player_delta(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<f64>>>;

    /// Consume the pending delta: increment the player total and delete the
    /// delta in one single-slot pipeline, then fold the same amount into the
    /// player's team total. Returns the folded amount, or `None` when there
    /// was nothing to consume. A delta is consumed at most once.
    fn fold_pending_delta(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<f64>>>;

    fn set_player_team(&self, uuid: &str, team: &str) -> BoxFuture<'static, SessionResult<()>>;

    fn get_player_team(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<String>>>;

    /// Delete the online/playtime/deltatime/team keys in one pipeline.
    fn clear_session(&self, uuid: &str) -> BoxFuture<'static, SessionResult<()>>;

    /// Overwrite a team total (used by the syncer's reconciliation step).
    fn set_team_total(&self, team: &str, total: f64) -> BoxFuture<'static, SessionResult<()>>;

    fn get_team_total(&self, team: &str) -> BoxFuture<'static, SessionResult<Option<f64>>>;

    /// Write a ban record. `expires_at` is unix seconds; `None` bans
    /// permanently (value 0, no TTL), otherwise the key's TTL equals the
    /// remaining time. The optional reason shares the record's lifetime.
    fn ban(
        &self,
        uuid: &str,
        expires_at: Option<i64>,
        reason: Option<String>,
    ) -> BoxFuture<'static, SessionResult<()>>;

    fn unban(&self, uuid: &str) -> BoxFuture<'static, SessionResult<()>>;

    /// Whether the player is banned right now. An expired temporary ban
    /// reads as not banned and is cleaned up lazily in the background.
    fn is_banned(&self, uuid: &str) -> BoxFuture<'static, SessionResult<bool>>;

    fn ban_info(&self, uuid: &str) -> BoxFuture<'static, SessionResult<Option<BanInfo>>>;

    /// Every currently-active ban record, cluster-wide.
    fn all_bans(&self) -> BoxFuture<'static, SessionResult<Vec<BanInfo>>>;

    fn health_check(&self) -> BoxFuture<'static, SessionResult<()>>;
}
