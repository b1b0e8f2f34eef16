use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::dao::session_store::BanInfo;
use crate::error::ServiceError;
use crate::state::SharedGameState;

/// Reads of an absent delta report this neutral multiplier.
const DEFAULT_DELTA: f64 = 1.0;

/// Mark a player online: reject banned players, seed the session keys from
/// the durable profile, then set the online marker.
///
/// A Player service failure degrades to defaults (total 0, delta 1, no team)
/// so players can always enter; the syncer reconciles later.
pub async fn player_online(state: &SharedGameState, uuid: &str) -> Result<(), ServiceError> {
    if state.session().is_banned(uuid).await? {
        return Err(ServiceError::Forbidden(format!(
            "player {uuid} is banned and cannot go online"
        )));
    }

    let profile = match state.players().get_profile(uuid).await {
        Ok(profile) => profile,
        Err(err) => {
            warn!(uuid, error = %err, "profile fetch failed; initializing session with defaults");
            None
        }
    };

    match profile {
        Some(profile) => {
            state
                .session()
                .set_player_total(uuid, profile.total_playtime_ticks)
                .await?;
            state.session().set_player_delta(uuid, DEFAULT_DELTA).await?;
            if let Some(team) = profile.team.filter(|team| !team.is_empty()) {
                if let Err(err) = state.session().set_player_team(uuid, &team).await {
                    warn!(uuid, %team, error = %err, "failed to set team mapping");
                }
            }
        }
        None => {
            state.session().set_player_total(uuid, 0.0).await?;
            state.session().set_player_delta(uuid, DEFAULT_DELTA).await?;
        }
    }

    state.session().set_online(uuid, now_unix_secs()).await?;
    info!(uuid, "player online");
    Ok(())
}

/// Mark a player offline: persist the accumulated total to the Player
/// service, then clear every session key. Persistence failure is logged but
/// never blocks the teardown; the next syncer cycle re-establishes a
/// consistent state. Already-offline players are a no-op.
pub async fn player_offline(state: &SharedGameState, uuid: &str) -> Result<(), ServiceError> {
    if state.session().online_since(uuid).await?.is_none() {
        debug!(uuid, "player already offline");
        return Ok(());
    }

    let total = state.session().get_player_total(uuid).await?.unwrap_or(0.0);
    if let Err(err) = state.players().update_playtime(uuid, total).await {
        warn!(uuid, total, error = %err, "failed to persist playtime; clearing session anyway");
    }

    state.session().clear_session(uuid).await?;
    info!(uuid, total, "player offline");
    Ok(())
}

/// Extend the online TTL. An absent key is success: the game server learns
/// it must send the player through Online again.
pub async fn refresh_online(state: &SharedGameState, uuid: &str) -> Result<(), ServiceError> {
    if !state.session().refresh_online(uuid).await? {
        debug!(uuid, "refresh for a player that is not online");
    }
    Ok(())
}

pub async fn player_total(state: &SharedGameState, uuid: &str) -> Result<f64, ServiceError> {
    Ok(state.session().get_player_total(uuid).await?.unwrap_or(0.0))
}

/// Pending delta; a missing key reads as the documented neutral default.
pub async fn player_delta(state: &SharedGameState, uuid: &str) -> Result<f64, ServiceError> {
    match state.session().get_player_delta(uuid).await {
        Ok(Some(delta)) => Ok(delta),
        Ok(None) => Ok(DEFAULT_DELTA),
        Err(err) => {
            warn!(uuid, error = %err, "delta read failed; returning neutral default");
            Ok(DEFAULT_DELTA)
        }
    }
}

pub async fn team_total(state: &SharedGameState, team: &str) -> Result<f64, ServiceError> {
    Ok(state.session().get_team_total(team).await?.unwrap_or(0.0))
}

pub async fn is_online(state: &SharedGameState, uuid: &str) -> Result<bool, ServiceError> {
    Ok(state.session().is_online(uuid).await?)
}

pub async fn online_count(state: &SharedGameState) -> Result<usize, ServiceError> {
    Ok(state.session().online_players().await?.len())
}

/// All currently-online players with their session-start unix seconds.
pub async fn online_sessions(
    state: &SharedGameState,
) -> Result<std::collections::HashMap<String, i64>, ServiceError> {
    Ok(state.session().online_sessions().await?)
}

/// Seconds a player has been online for, or `None` when they are offline.
pub async fn session_duration(
    state: &SharedGameState,
    uuid: &str,
) -> Result<Option<i64>, ServiceError> {
    let since = state.session().online_since(uuid).await?;
    Ok(since.map(|since| (now_unix_secs() - since).max(0)))
}

/// Write a ban record and force currently-online players through Offline so
/// their playtime is persisted before the session keys disappear.
pub async fn ban_player(
    state: &SharedGameState,
    uuid: &str,
    expires_at: Option<i64>,
    reason: Option<String>,
) -> Result<(), ServiceError> {
    state.session().ban(uuid, expires_at, reason).await?;
    info!(uuid, ?expires_at, "player banned");

    match state.session().is_online(uuid).await {
        Ok(true) => {
            if let Err(err) = player_offline(state, uuid).await {
                warn!(uuid, error = %err, "failed to force banned player offline");
            }
        }
        Ok(false) => {}
        Err(err) => warn!(uuid, error = %err, "could not check online status after ban"),
    }
    Ok(())
}

pub async fn unban_player(state: &SharedGameState, uuid: &str) -> Result<(), ServiceError> {
    state.session().unban(uuid).await?;
    info!(uuid, "player unbanned");
    Ok(())
}

pub async fn ban_info(
    state: &SharedGameState,
    uuid: &str,
) -> Result<Option<BanInfo>, ServiceError> {
    // Routes through is_banned first, like the ban listing, so an expired
    // record still inside its TTL rounding window is cleaned up instead of
    // reported.
    if !state.session().is_banned(uuid).await? {
        return Ok(None);
    }
    Ok(state.session().ban_info(uuid).await?)
}

/// Every currently-active ban.
pub async fn banned_players(state: &SharedGameState) -> Result<Vec<BanInfo>, ServiceError> {
    Ok(state.session().all_bans().await?)
}

pub(crate) fn now_unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}
