use std::collections::HashMap;
use std::time::Duration;

use redis::AsyncCommands;
use redis::cluster_async::ClusterConnection;
use thiserror::Error;

use super::{ServiceDescriptor, filter_active, now_unix_ms, registry_key};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry hash for `{service_type}`")]
    Read {
        service_type: String,
        #[source]
        source: redis::RedisError,
    },
}

/// Read side of the registry, usable by any service that wants discovery.
#[derive(Clone)]
pub struct RegistryClient {
    conn: ClusterConnection,
    /// Entries whose heartbeat is older than this are treated as dead.
    freshness_ttl: Duration,
}

impl RegistryClient {
    pub fn new(conn: ClusterConnection, freshness_ttl: Duration) -> Self {
        Self { conn, freshness_ttl }
    }

    /// Live instances of `service_type`, keyed by instance id.
    ///
    /// Unparseable entries are skipped here; the registrar's cleanup pass
    /// deletes them.
    pub async fn get_active(
        &self,
        service_type: &str,
    ) -> Result<HashMap<String, ServiceDescriptor>, RegistryError> {
        let key = registry_key(service_type);
        let mut conn = self.conn.clone();
        let entries: HashMap<String, String> =
            conn.hgetall(&key).await.map_err(|source| RegistryError::Read {
                service_type: service_type.to_owned(),
                source,
            })?;

        let ttl_ms = self.freshness_ttl.as_millis() as i64;
        Ok(filter_active(entries, now_unix_ms(), ttl_ms))
    }
}
