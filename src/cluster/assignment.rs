use std::sync::RwLock;
use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ring::HashRing;
use crate::registry::RegistryClient;

/// Decides which live instance owns a given key.
///
/// Holds the consistent-hash ring behind a reader/writer lock; lookups on the
/// hot path take a read lock only, the periodic refresh swaps in a freshly
/// built ring when the live membership actually changed.
pub struct AssignmentManager {
    instance_id: String,
    ring: RwLock<HashRing>,
}

impl AssignmentManager {
    /// Create a manager seeded with this instance alone, so single-instance
    /// deployments are responsible for everything before the first refresh.
    pub fn new(instance_id: impl Into<String>) -> Self {
        let instance_id = instance_id.into();
        let ring = HashRing::from_members([instance_id.clone()]);
        Self {
            instance_id,
            ring: RwLock::new(ring),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// True iff this instance owns `key` on the current ring.
    ///
    /// An empty ring (startup race, registry outage) owns nothing; callers
    /// treat that as "not responsible this cycle".
    pub fn is_responsible(&self, key: &str) -> bool {
        let ring = self.ring.read().expect("assignment ring lock poisoned");
        match ring.owner(key) {
            Some(owner) => owner == self.instance_id,
            None => {
                warn!(key, "assignment ring is empty; assuming not responsible");
                false
            }
        }
    }

    /// Rebuild the ring when the sorted live set differs from the current
    /// members. Returns whether a swap happened.
    pub fn refresh(&self, mut members: Vec<String>) -> bool {
        members.sort();
        members.dedup();

        {
            let ring = self.ring.read().expect("assignment ring lock poisoned");
            let mut current = ring.members().to_vec();
            current.sort();
            if current == members {
                return false;
            }
        }

        let next = HashRing::from_members(members.iter().cloned());
        let mut ring = self.ring.write().expect("assignment ring lock poisoned");
        *ring = next;
        info!(members = ?members, "assignment ring rebuilt");
        true
    }

    /// Periodically pull the live set for `service_type` and refresh the ring.
    pub async fn run(
        &self,
        registry: RegistryClient,
        service_type: &str,
        update_interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = interval(update_interval);
        info!(service_type, "assignment ring updater started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(service_type, "assignment ring updater stopping");
                    return;
                }
                _ = ticker.tick() => {
                    match registry.get_active(service_type).await {
                        Ok(active) => {
                            let members: Vec<String> = active.into_keys().collect();
                            if !self.refresh(members) {
                                debug!(service_type, "assignment ring unchanged");
                            }
                        }
                        Err(err) => {
                            warn!(service_type, error = %err, "failed to fetch active instances");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_manager_owns_every_key() {
        let manager = AssignmentManager::new("game-service-a");
        assert!(manager.is_responsible("00000000-0000-0000-0000-000000000001"));
        assert!(manager.is_responsible("global_playtime_sync_task"));
    }

    #[test]
    fn refresh_to_empty_set_owns_nothing() {
        let manager = AssignmentManager::new("game-service-a");
        assert!(manager.refresh(Vec::new()));
        assert!(!manager.is_responsible("any-key"));
    }

    #[test]
    fn refresh_is_a_noop_for_identical_membership() {
        let manager = AssignmentManager::new("game-service-a");
        assert!(!manager.refresh(vec!["game-service-a".into()]));
        assert!(manager.refresh(vec!["game-service-a".into(), "game-service-b".into()]));
        // Order must not matter.
        assert!(!manager.refresh(vec!["game-service-b".into(), "game-service-a".into()]));
    }

    #[test]
    fn every_key_has_exactly_one_owner_among_peers() {
        let a = AssignmentManager::new("instance-a");
        let b = AssignmentManager::new("instance-b");
        let members = vec!["instance-a".to_owned(), "instance-b".to_owned()];
        a.refresh(members.clone());
        b.refresh(members);

        for i in 0..100 {
            let key = format!("00000000-0000-0000-0000-{i:012}");
            let owners =
                usize::from(a.is_responsible(&key)) + usize::from(b.is_responsible(&key));
            assert_eq!(owners, 1, "key {key} must have exactly one owner");
        }
    }

    #[test]
    fn departed_member_loses_ownership() {
        let survivor = AssignmentManager::new("instance-a");
        survivor.refresh(vec!["instance-a".into(), "instance-b".into()]);

        // Find a key the peer owns, then drop the peer from the ring.
        let key = (0..1000)
            .map(|i| format!("key-{i}"))
            .find(|key| !survivor.is_responsible(key))
            .expect("some key should belong to the peer");

        survivor.refresh(vec!["instance-a".into()]);
        assert!(survivor.is_responsible(&key));
    }
}
