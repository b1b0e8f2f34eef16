use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clients::PlayerApi;
use crate::cluster::AssignmentManager;
use crate::dao::session_store::SessionStore;

/// Sentinel key owned by exactly one instance per ring; its owner runs the
/// global sync cycle.
pub const SYNC_SENTINEL_KEY: &str = "global_playtime_sync_task";

/// Periodic backup of player totals to the Player service plus
/// reconciliation of team totals back into the cache.
///
/// Both phases overwrite by snapshot, so a transiently duplicated leader
/// during a membership change causes redundant work, not corruption.
pub struct Syncer {
    session: Arc<dyn SessionStore>,
    players: Arc<dyn PlayerApi>,
    assignment: Arc<AssignmentManager>,
    persistence_interval: Duration,
    backup_timeout: Duration,
    sync_timeout: Duration,
}

impl Syncer {
    pub fn new(
        session: Arc<dyn SessionStore>,
        players: Arc<dyn PlayerApi>,
        assignment: Arc<AssignmentManager>,
        persistence_interval: Duration,
        backup_timeout: Duration,
        sync_timeout: Duration,
    ) -> Self {
        Self {
            session,
            players,
            assignment,
            persistence_interval,
            backup_timeout,
            sync_timeout,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        info!(persistence_interval = ?self.persistence_interval, "syncer started");
        let mut ticker = interval(self.persistence_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("syncer stopping");
                    return;
                }
                _ = ticker.tick() => self.cycle().await,
            }
        }
    }

    /// One sync cycle; a no-op unless this instance owns the sentinel key.
    pub async fn cycle(&self) {
        if !self.assignment.is_responsible(SYNC_SENTINEL_KEY) {
            return;
        }
        info!("leader for the global sync task; backing up player totals");

        if timeout(self.backup_timeout, self.backup_player_totals())
            .await
            .is_err()
        {
            warn!(
                backup_timeout = ?self.backup_timeout,
                "player backup phase timed out; remaining players wait for the next cycle"
            );
        }

        if timeout(self.sync_timeout, self.reconcile_team_totals())
            .await
            .is_err()
        {
            warn!(
                sync_timeout = ?self.sync_timeout,
                "team reconciliation phase timed out; waiting for the next cycle"
            );
        }
    }

    /// Snapshot every cached player total and push it to the Player service.
    /// Per-player failures are logged and skipped.
    async fn backup_player_totals(&self) {
        let totals = match self.session.all_player_totals().await {
            Ok(totals) => totals,
            Err(err) => {
                warn!(error = %err, "failed to snapshot player totals; skipping backup phase");
                return;
            }
        };
        if totals.is_empty() {
            return;
        }

        info!(players = totals.len(), "persisting player totals");
        for (uuid, total) in totals {
            if let Err(err) = self.players.update_playtime(&uuid, total).await {
                warn!(%uuid, total, error = %err, "failed to persist player total");
            }
        }
    }

    /// Pull authoritative team totals from the Player service and overwrite
    /// the cached values.
    async fn reconcile_team_totals(&self) {
        let response = match self.players.sync_team_totals().await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "team totals sync call failed");
                return;
            }
        };
        if response.team_totals.is_empty() {
            info!("no team totals returned by the player service");
            return;
        }

        for (team, total) in response.team_totals {
            match self.session.set_team_total(&team, total).await {
                Ok(()) => info!(%team, total, "team total reconciled"),
                Err(err) => warn!(%team, error = %err, "failed to overwrite team total"),
            }
        }
    }
}
