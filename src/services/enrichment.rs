use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clients::IdentityApi;
use crate::dao::profile_store::ProfileStore;

/// Pause between identity lookups so the external service's rate limits are
/// respected.
const CALL_PAUSE: Duration = Duration::from_millis(100);
/// Upper bound for one filler pass.
const CYCLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Background job filling missing usernames from the identity service.
pub struct EnrichmentWorker {
    profiles: Arc<dyn ProfileStore>,
    identity: Arc<dyn IdentityApi>,
    filler_interval: Duration,
}

impl EnrichmentWorker {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        identity: Arc<dyn IdentityApi>,
        filler_interval: Duration,
    ) -> Self {
        Self {
            profiles,
            identity,
            filler_interval,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        info!(filler_interval = ?self.filler_interval, "username filler started");
        let mut ticker = interval(self.filler_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("username filler stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if timeout(CYCLE_TIMEOUT, self.fill_missing()).await.is_err() {
                        warn!("username filler pass timed out; remaining profiles wait for the next pass");
                    }
                }
            }
        }
    }

    async fn fill_missing(&self) {
        let uuids = match self.profiles.uuids_missing_username().await {
            Ok(uuids) => uuids,
            Err(err) => {
                warn!(error = %err, "failed to list profiles pending enrichment");
                return;
            }
        };
        if uuids.is_empty() {
            return;
        }

        info!(pending = uuids.len(), "filling missing usernames");
        for uuid in uuids {
            sleep(CALL_PAUSE).await;
            enrich_one(self.profiles.clone(), self.identity.clone(), uuid).await;
        }
    }
}

/// Resolve and store the username of a single profile. Used by the filler
/// pass and by profile creation's fire-and-forget enrichment.
pub async fn enrich_one(
    profiles: Arc<dyn ProfileStore>,
    identity: Arc<dyn IdentityApi>,
    uuid: String,
) {
    let username = match identity.username_for(&uuid).await {
        Ok(Some(username)) => username,
        Ok(None) => {
            warn!(%uuid, "identity service knows no username for this uuid");
            return;
        }
        Err(err) => {
            warn!(%uuid, error = %err, "username lookup failed");
            return;
        }
    };

    match profiles.set_username(&uuid, &username).await {
        Ok(true) => info!(%uuid, %username, "username enriched"),
        Ok(false) => warn!(%uuid, "profile disappeared before enrichment"),
        Err(err) => warn!(%uuid, error = %err, "failed to store enriched username"),
    }
}
