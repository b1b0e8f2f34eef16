//! Service discovery over the shared cache.
//!
//! Every instance writes its own descriptor into the hash
//! `services:<serviceType>` (field = instance id) on a heartbeat cadence and
//! removes it on graceful stop. Readers filter by freshness, so a crashed
//! instance disappears once its `last_seen` ages past the heartbeat TTL;
//! peers additionally garbage-collect stale fields so the hash stays small.

mod client;
mod registrar;

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub use client::RegistryClient;
pub use registrar::Registrar;

/// Prefix of the per-type registry hash, e.g. `services:game-service`.
const REGISTRY_HASH_PREFIX: &str = "services:";

pub(crate) fn registry_key(service_type: &str) -> String {
    format!("{REGISTRY_HASH_PREFIX}{service_type}")
}

pub(crate) fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Descriptor of a registered service instance, stored as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub service_id: String,
    pub service_type: String,
    pub host: String,
    pub port: u16,
    /// Unix milliseconds of the last successful heartbeat.
    pub last_seen: i64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl ServiceDescriptor {
    pub fn is_fresh(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms - self.last_seen <= ttl_ms
    }
}

/// Parse raw hash entries and keep only fresh ones.
pub(crate) fn filter_active(
    entries: HashMap<String, String>,
    now_ms: i64,
    ttl_ms: i64,
) -> HashMap<String, ServiceDescriptor> {
    entries
        .into_iter()
        .filter_map(|(instance_id, raw)| {
            let descriptor: ServiceDescriptor = serde_json::from_str(&raw).ok()?;
            descriptor
                .is_fresh(now_ms, ttl_ms)
                .then_some((instance_id, descriptor))
        })
        .collect()
}
