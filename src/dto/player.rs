use std::collections::HashMap;

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{dao::models::PlayerProfile, dto::validation::validate_uuid};

/// Payload used to create a brand-new player profile.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateProfileRequest {
    /// Uuid of the player the profile belongs to.
    #[validate(custom(function = validate_uuid))]
    pub uuid: String,
}

/// Player profile as exposed over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub uuid: String,
    /// Empty until enrichment has resolved the real username.
    pub username: String,
    pub team: Option<String>,
    pub team_username: String,
    pub total_playtime_ticks: f64,
    pub delta_playtime_ticks: f64,
    pub banned: bool,
    /// RFC 3339 timestamp; absent for profiles that are not ban-scheduled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban_expires_at: Option<String>,
    pub created_at: String,
    pub last_login_at: String,
}

impl From<PlayerProfile> for ProfileDto {
    fn from(profile: PlayerProfile) -> Self {
        Self {
            uuid: profile.uuid,
            username: profile.username,
            team: profile.team,
            team_username: profile.team_username,
            total_playtime_ticks: profile.total_playtime_ticks,
            delta_playtime_ticks: profile.delta_playtime_ticks,
            banned: profile.banned,
            ban_expires_at: profile.ban_expires_at.map(rfc3339),
            created_at: rfc3339(profile.created_at),
            last_login_at: rfc3339(profile.last_login_at),
        }
    }
}

fn rfc3339(at: DateTime) -> String {
    at.try_to_rfc3339_string().unwrap_or_default()
}

/// Body of the playtime and delta-playtime update endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlaytimeRequest {
    pub ticks_to_set: f64,
}

/// Body of the profile ban-status update endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBanStatusRequest {
    pub banned: bool,
    /// RFC 3339 expiration; absent for permanent bans and unbans.
    #[serde(default)]
    pub ban_expires_at: Option<String>,
}

/// Response of the team totals aggregation endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncTeamTotalsResponse {
    /// Aggregated `{team → total playtime}` map.
    pub team_totals: HashMap<String, f64>,
    pub message: String,
}
