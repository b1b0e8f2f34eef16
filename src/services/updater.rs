use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cluster::AssignmentManager;
use crate::dao::session_store::SessionStore;

/// Tick-driven playtime accumulator.
///
/// Every tick it scans the currently-online players, keeps the ones this
/// instance owns on the ring, and folds their pending deltas into the player
/// and team totals. Errors never stop the loop; the next tick retries.
pub struct Updater {
    session: Arc<dyn SessionStore>,
    assignment: Arc<AssignmentManager>,
    tick_interval: Duration,
}

impl Updater {
    pub fn new(
        session: Arc<dyn SessionStore>,
        assignment: Arc<AssignmentManager>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            session,
            assignment,
            tick_interval,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        info!(tick_interval = ?self.tick_interval, "updater started");
        let mut ticker = interval(self.tick_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("updater stopping");
                    return;
                }
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    /// One accumulation pass over the players assigned to this instance.
    pub async fn tick(&self) {
        let online = match self.session.online_players().await {
            Ok(online) => online,
            Err(err) => {
                warn!(error = %err, "failed to list online players for tick");
                return;
            }
        };
        if online.is_empty() {
            return;
        }

        let owned: Vec<String> = online
            .into_iter()
            .filter(|uuid| self.assignment.is_responsible(uuid))
            .collect();

        for uuid in owned {
            match self.session.fold_pending_delta(&uuid).await {
                Ok(Some(delta)) => debug!(%uuid, delta, "delta folded"),
                Ok(None) => {}
                Err(err) => warn!(%uuid, error = %err, "failed to fold pending delta"),
            }
        }
    }
}
