use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dao::session_store::BanInfo;
use crate::dto::validation::{validate_ban_duration, validate_uuid};

/// Body shared by the online/offline/refresh/unban endpoints.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct PlayerUuidRequest {
    #[validate(custom(function = validate_uuid))]
    pub uuid: String,
}

/// Body of the admin ban endpoint.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct BanRequest {
    #[validate(custom(function = validate_uuid))]
    pub uuid: String,
    /// `0` bans permanently, positive values are seconds, `-1` is rejected
    /// (use the unban endpoint).
    #[validate(custom(function = validate_ban_duration))]
    pub duration_seconds: i64,
    #[serde(default)]
    #[validate(length(max = 512))]
    pub reason: Option<String>,
}

/// Acknowledgement naming the affected player.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlayerAckResponse {
    pub message: String,
    pub uuid: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlaytimeResponse {
    pub playtime: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeltaPlaytimeResponse {
    pub deltatime: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnlineStatusResponse {
    pub uuid: String,
    pub is_online: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamTotalResponse {
    pub team_id: String,
    pub total_playtime: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OnlineCountResponse {
    pub count: usize,
}

/// One online player and when their session began.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnlineSessionEntry {
    pub uuid: String,
    /// Unix seconds at which the session started.
    pub session_start: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OnlineSessionsResponse {
    pub players: Vec<OnlineSessionEntry>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionDurationResponse {
    pub uuid: String,
    /// Seconds the player has been online for in the current session.
    pub duration_seconds: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BanListResponse {
    pub bans: Vec<BanInfoResponse>,
    pub count: usize,
}

/// Outcome of an admin ban.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BanResponse {
    pub message: String,
    pub uuid: String,
    /// Unix seconds; `0` for a permanent ban.
    pub expires_at: i64,
    pub is_permanent: bool,
}

/// Current ban record of a player.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BanInfoResponse {
    pub uuid: String,
    pub reason: Option<String>,
    /// Unix seconds; absent for permanent bans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub is_permanent: bool,
}

impl From<BanInfo> for BanInfoResponse {
    fn from(info: BanInfo) -> Self {
        Self {
            uuid: info.uuid,
            reason: info.reason,
            expires_at: info.expires_at,
            is_permanent: info.is_permanent,
        }
    }
}
