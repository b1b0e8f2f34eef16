use mongodb::bson::DateTime;
use rand::{rng, seq::IndexedRandom};
use tracing::{info, warn};

use crate::dao::models::PlayerProfile;
use crate::dto::player::ProfileDto;
use crate::error::ServiceError;
use crate::services::enrichment;
use crate::state::SharedPlayerState;

/// Create a profile: assign the least-populated team, mint the sequential
/// team username, insert the document, and kick off username enrichment.
pub async fn create_profile(
    state: &SharedPlayerState,
    uuid: &str,
) -> Result<ProfileDto, ServiceError> {
    if state.profiles().get(uuid).await?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "profile {uuid} already exists"
        )));
    }

    let team = pick_team(state).await;
    let member_number = state.teams().increment_player_count(&team).await?;
    let team_username = format!("{}{member_number}", creature_base_name(&team));
    info!(uuid, %team, %team_username, "assigning new player");

    let profile = PlayerProfile::new(
        uuid.to_owned(),
        team,
        team_username,
        DateTime::now(),
    );
    if !state.profiles().create(profile.clone()).await? {
        // Lost a creation race after the early existence check.
        return Err(ServiceError::Conflict(format!(
            "profile {uuid} already exists"
        )));
    }

    // Username arrives asynchronously; the profile is served with an empty
    // one until then.
    let profiles = state.profiles().clone();
    let identity = state.identity().clone();
    let owned_uuid = uuid.to_owned();
    tokio::spawn(async move {
        enrichment::enrich_one(profiles, identity, owned_uuid).await;
    });

    Ok(profile.into())
}

/// Fetch a profile and touch its last-login timestamp in the background.
pub async fn get_profile(
    state: &SharedPlayerState,
    uuid: &str,
) -> Result<ProfileDto, ServiceError> {
    let profile = state
        .profiles()
        .get(uuid)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("profile {uuid} not found")))?;

    let profiles = state.profiles().clone();
    let owned_uuid = uuid.to_owned();
    tokio::spawn(async move {
        match profiles.set_last_login(&owned_uuid, DateTime::now()).await {
            Ok(true) => {}
            Ok(false) => warn!(uuid = %owned_uuid, "profile vanished before last-login update"),
            Err(err) => warn!(uuid = %owned_uuid, error = %err, "failed to update last login"),
        }
    });

    Ok(profile.into())
}

pub async fn update_playtime(
    state: &SharedPlayerState,
    uuid: &str,
    ticks: f64,
) -> Result<(), ServiceError> {
    require_match(state.profiles().set_playtime(uuid, ticks).await?, uuid)
}

pub async fn update_delta_playtime(
    state: &SharedPlayerState,
    uuid: &str,
    ticks: f64,
) -> Result<(), ServiceError> {
    require_match(state.profiles().set_delta_playtime(uuid, ticks).await?, uuid)
}

pub async fn update_ban_status(
    state: &SharedPlayerState,
    uuid: &str,
    banned: bool,
    expires_at: Option<DateTime>,
) -> Result<(), ServiceError> {
    require_match(
        state
            .profiles()
            .set_ban_status(uuid, banned, expires_at)
            .await?,
        uuid,
    )
}

pub async fn update_last_login(state: &SharedPlayerState, uuid: &str) -> Result<(), ServiceError> {
    require_match(
        state
            .profiles()
            .set_last_login(uuid, DateTime::now())
            .await?,
        uuid,
    )
}

fn require_match(matched: bool, uuid: &str) -> Result<(), ServiceError> {
    if matched {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!("profile {uuid} not found")))
    }
}

/// Pick the team with the fewest players, breaking ties uniformly at random.
/// Falls back to the configured default pair when the team list is empty or
/// every count read failed.
async fn pick_team(state: &SharedPlayerState) -> String {
    let teams = match state.teams().all_teams().await {
        Ok(teams) if !teams.is_empty() => teams.into_iter().map(|team| team.name).collect(),
        Ok(_) => Vec::new(),
        Err(err) => {
            warn!(error = %err, "could not list teams; falling back to defaults");
            Vec::new()
        }
    };

    let mut counts = Vec::with_capacity(teams.len());
    for team in teams {
        match state.teams().player_count(&team).await {
            Ok(count) => counts.push((team, count)),
            Err(err) => warn!(%team, error = %err, "could not read player count; skipping team"),
        }
    }

    if let Some(min) = counts.iter().map(|(_, count)| *count).min() {
        let least_populated: Vec<&String> = counts
            .iter()
            .filter(|(_, count)| *count == min)
            .map(|(team, _)| team)
            .collect();
        if let Some(team) = least_populated.choose(&mut rng()) {
            return (*team).clone();
        }
    }

    let defaults = state.default_teams();
    defaults
        .choose(&mut rng())
        .cloned()
        .unwrap_or_else(|| "AQUA_CREEPERS".to_owned())
}

/// Base name of a team's members: a fixed table for the known teams, and a
/// title-cased singular of the last underscore segment otherwise.
fn creature_base_name(team: &str) -> String {
    match team {
        "AQUA_CREEPERS" => "Creeper".to_owned(),
        "PURPLE_AXOLOTLS" => "Axolotl".to_owned(),
        _ => {
            let last_segment = team.rsplit('_').next().unwrap_or_default().to_lowercase();
            let singular = last_segment.strip_suffix('s').unwrap_or(&last_segment);
            let mut chars = singular.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => "Player".to_owned(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_teams_use_the_fixed_table() {
        assert_eq!(creature_base_name("AQUA_CREEPERS"), "Creeper");
        assert_eq!(creature_base_name("PURPLE_AXOLOTLS"), "Axolotl");
    }

    #[test]
    fn unknown_teams_derive_from_the_last_segment() {
        assert_eq!(creature_base_name("RED_PANDAS"), "Panda");
        assert_eq!(creature_base_name("GOLDEN_FOXES"), "Foxe");
        assert_eq!(creature_base_name("WOLVES"), "Wolve");
    }

    #[test]
    fn degenerate_team_names_fall_back_to_player() {
        assert_eq!(creature_base_name(""), "Player");
        assert_eq!(creature_base_name("_"), "Player");
        assert_eq!(creature_base_name("S"), "Player");
    }
}
