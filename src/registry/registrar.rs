use std::collections::HashMap;

use redis::AsyncCommands;
use redis::cluster_async::ClusterConnection;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ServiceDescriptor, filter_active, now_unix_ms, registry_key};
use crate::config::CommonConfig;

/// Self-registration and heartbeating for one service instance.
///
/// The instance id is generated once per process and stays stable for its
/// lifetime; discovery convergence does not depend on any single cleaner
/// because every instance runs its own cleanup pass.
pub struct Registrar {
    conn: ClusterConnection,
    service_type: String,
    instance_id: String,
    config: CommonConfig,
}

impl Registrar {
    pub fn new(conn: ClusterConnection, service_type: &str, config: CommonConfig) -> Self {
        let instance_id = format!("{service_type}-{}", Uuid::new_v4());
        Self {
            conn,
            service_type: service_type.to_owned(),
            instance_id,
            config,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Heartbeat until cancelled, then deregister. Also drives the periodic
    /// cleanup pass when one is configured.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            service_type = %self.service_type,
            instance_id = %self.instance_id,
            host = %self.config.advertised_host,
            port = self.config.service_port,
            "service registrar started"
        );

        let mut heartbeat = interval(self.config.heartbeat_interval);
        let mut cleanup = interval(
            self.config
                .registry_cleanup_interval
                .max(std::time::Duration::from_millis(1)),
        );
        let cleanup_enabled = !self.config.registry_cleanup_interval.is_zero();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.deregister().await;
                    info!(instance_id = %self.instance_id, "service registrar stopped");
                    return;
                }
                _ = heartbeat.tick() => self.register().await,
                _ = cleanup.tick(), if cleanup_enabled => self.cleanup().await,
            }
        }
    }

    /// Write (or refresh) this instance's descriptor. Failures are logged and
    /// retried on the next tick; a missed heartbeat beyond the TTL simply
    /// hides the instance from discovery until the next success.
    async fn register(&self) {
        let descriptor = ServiceDescriptor {
            service_id: self.instance_id.clone(),
            service_type: self.service_type.clone(),
            host: self.config.advertised_host.clone(),
            port: self.config.service_port,
            last_seen: now_unix_ms(),
            metadata: HashMap::new(),
        };

        let payload = match serde_json::to_string(&descriptor) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to serialize service descriptor");
                return;
            }
        };

        let key = registry_key(&self.service_type);
        let mut conn = self.conn.clone();
        match conn
            .hset::<_, _, _, ()>(&key, &self.instance_id, payload)
            .await
        {
            Ok(()) => debug!(instance_id = %self.instance_id, "heartbeat written"),
            Err(err) => warn!(error = %err, "failed to write registry heartbeat"),
        }
    }

    async fn deregister(&self) {
        let key = registry_key(&self.service_type);
        let mut conn = self.conn.clone();
        if let Err(err) = conn.hdel::<_, _, ()>(&key, &self.instance_id).await {
            warn!(error = %err, "failed to deregister instance on shutdown");
        }
    }

    /// Drop stale and unparseable fields from this type's registry hash.
    async fn cleanup(&self) {
        let key = registry_key(&self.service_type);
        let mut conn = self.conn.clone();

        let entries: HashMap<String, String> = match conn.hgetall(&key).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "registry cleanup failed to read entries");
                return;
            }
        };

        let now = now_unix_ms();
        let ttl_ms = self.config.heartbeat_ttl.as_millis() as i64;
        let alive = filter_active(entries.clone(), now, ttl_ms);

        for instance_id in entries.keys() {
            if alive.contains_key(instance_id) {
                continue;
            }
            match conn.hdel::<_, _, ()>(&key, instance_id).await {
                Ok(()) => info!(%instance_id, "removed stale registry entry"),
                Err(err) => {
                    warn!(%instance_id, error = %err, "failed to remove stale registry entry");
                }
            }
        }
    }
}
