use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// Durable player profile, keyed by the player's uuid string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerProfile {
    #[serde(rename = "_id")]
    pub uuid: String,
    /// Empty until the enrichment worker fills it from the identity service.
    pub username: String,
    pub team: Option<String>,
    pub team_username: String,
    pub total_playtime_ticks: f64,
    pub delta_playtime_ticks: f64,
    pub banned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban_expires_at: Option<DateTime>,
    pub created_at: DateTime,
    pub last_login_at: DateTime,
}

impl PlayerProfile {
    /// Fresh profile as inserted at creation time, before enrichment.
    pub fn new(uuid: String, team: String, team_username: String, now: DateTime) -> Self {
        Self {
            uuid,
            username: String::new(),
            team: Some(team),
            team_username,
            total_playtime_ticks: 0.0,
            delta_playtime_ticks: 1.0,
            banned: false,
            ban_expires_at: None,
            created_at: now,
            last_login_at: now,
        }
    }
}

/// Durable team aggregate, keyed by the team name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamDoc {
    #[serde(rename = "_id")]
    pub name: String,
    pub player_count: i64,
    pub total_playtime: f64,
    pub created_at: DateTime,
    pub last_updated: DateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_profile_starts_neutral() {
        let now = DateTime::now();
        let profile = PlayerProfile::new(
            "00000000-0000-0000-0000-000000000001".into(),
            "AQUA_CREEPERS".into(),
            "Creeper1".into(),
            now,
        );
        assert!(profile.username.is_empty());
        assert_eq!(profile.total_playtime_ticks, 0.0);
        assert_eq!(profile.delta_playtime_ticks, 1.0);
        assert!(!profile.banned);
        assert_eq!(profile.created_at, profile.last_login_at);
    }
}
