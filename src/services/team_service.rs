use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::ServiceError;
use crate::state::SharedPlayerState;

/// Aggregate playtime per team over all profiles, persist each total into
/// the team documents, and return the map.
///
/// Idempotent: with no intervening profile change, repeated runs produce the
/// same response and leave the team documents unchanged.
pub async fn sync_team_totals(
    state: &SharedPlayerState,
) -> Result<HashMap<String, f64>, ServiceError> {
    let totals = state.profiles().aggregate_team_playtime().await?;
    info!(teams = totals.len(), "aggregated team playtimes");

    for (team, total) in &totals {
        match state.teams().set_total_playtime(team, *total).await {
            Ok(()) => info!(%team, total, "team total persisted"),
            Err(err) => {
                // Keep going; the next aggregation pass retries this team.
                warn!(%team, error = %err, "failed to persist team total");
            }
        }
    }

    Ok(totals)
}
