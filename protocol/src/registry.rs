use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::*;

/// What the registry remembers about one identity: its latest announcement only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub category: Option<String>,
    pub last_seen: Millis,
}

impl Presence {
    /// Live iff `now - last_seen <= window`. A `last_seen` in the future counts as live.
    pub fn is_alive(&self, now: Millis, window_ms: Millis) -> bool {
        now.saturating_sub(self.last_seen) <= window_ms
    }
}

/// Thread-safe map of identity to latest presence.
///
/// Every mutation and every expiry evaluation goes through the same lock.
/// Expiry is lazy: stale entries are only removed by [`snapshot_and_prune`],
/// so between queries the map may still hold musicians that have gone quiet.
///
/// Out-of-order delivery is not corrected; the last upsert processed wins.
///
/// [`snapshot_and_prune`]: PresenceRegistry::snapshot_and_prune
#[derive(Clone)]
pub struct PresenceRegistry {
    entries: Arc<RwLock<HashMap<Identity, Presence>>>,
    window_ms: Millis,
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new(LIVENESS_WINDOW_MS)
    }
}

impl PresenceRegistry {
    pub fn new(window_ms: Millis) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            window_ms,
        }
    }

    pub fn window_ms(&self) -> Millis {
        self.window_ms
    }

    /// Replace the identity's whole record with `(category, timestamp)`.
    pub async fn upsert(&self, identity: &str, category: Option<String>, timestamp: Millis) {
        let presence = Presence {
            category,
            last_seen: timestamp,
        };
        let previous = self.entries.write().await.insert(identity.to_owned(), presence);
        if previous.is_none() {
            tracing::info!(identity = %identity, "New musician joined");
        }
    }

    /// Remove every stale entry and return the live ones ordered by identity.
    ///
    /// Evaluation and removal happen under one write guard, so an upsert is
    /// either fully reflected in this snapshot or left for the next one.
    pub async fn snapshot_and_prune(&self, now: Millis) -> Vec<PresenceRecord> {
        let mut live = {
            let mut entries = self.entries.write().await;
            let before = entries.len();
            entries.retain(|id, presence| {
                let alive = presence.is_alive(now, self.window_ms);
                if !alive {
                    tracing::debug!(identity = %id, last_seen = presence.last_seen, "Musician went silent, removing");
                }
                alive
            });
            let removed = before - entries.len();
            if removed > 0 {
                tracing::info!(removed = removed, remaining = entries.len(), "Pruned silent musicians");
            }
            entries
                .iter()
                .map(|(id, p)| PresenceRecord {
                    identity: id.clone(),
                    category: p.category.clone(),
                    last_seen: p.last_seen,
                })
                .collect::<Vec<_>>()
        };
        live.sort_by(|a, b| a.identity.cmp(&b.identity));
        live
    }

    /// Number of entries currently held, stale ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Raw lookup without any expiry evaluation
    pub async fn get(&self, identity: &str) -> Option<Presence> {
        self.entries.read().await.get(identity).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::Rng;

    const W: Millis = LIVENESS_WINDOW_MS;

    #[tokio::test]
    async fn test_empty_registry_snapshot() {
        let reg = PresenceRegistry::default();
        assert!(reg.snapshot_and_prune(0).await.is_empty());
        assert!(reg.is_empty().await);
    }

    #[tokio::test]
    async fn test_liveness_window_boundary() {
        let reg = PresenceRegistry::new(W);
        reg.upsert("abc", Some("piano".into()), 10_000).await;

        assert_eq!(reg.snapshot_and_prune(10_000 + W - 1).await.len(), 1);
        // exactly W of silence is still live
        assert_eq!(reg.snapshot_and_prune(10_000 + W).await.len(), 1);
        assert!(reg.snapshot_and_prune(10_000 + W + 1).await.is_empty());

        // physically deleted: rolling time back does not resurrect it
        assert!(reg.snapshot_and_prune(10_000).await.is_empty());
        assert!(reg.get("abc").await.is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_instead_of_accumulating() {
        let reg = PresenceRegistry::default();
        reg.upsert("abc", Some("piano".into()), 1000).await;
        reg.upsert("abc", Some("trumpet".into()), 2000).await;

        let snap = reg.snapshot_and_prune(2500).await;
        assert_eq!(
            snap,
            vec![PresenceRecord {
                identity: "abc".into(),
                category: Some("trumpet".into()),
                last_seen: 2000,
            }]
        );
    }

    #[tokio::test]
    async fn test_last_write_wins_even_when_older() {
        // a late datagram carrying an older timestamp still overwrites
        let reg = PresenceRegistry::default();
        reg.upsert("abc", Some("flute".into()), 5000).await;
        reg.upsert("abc", Some("drum".into()), 4000).await;
        let p = reg.get("abc").await.unwrap();
        assert_eq!(p.category.as_deref(), Some("drum"));
        assert_eq!(p.last_seen, 4000);
    }

    #[tokio::test]
    async fn test_unknown_category_is_kept_as_absent() {
        let reg = PresenceRegistry::default();
        reg.upsert("abc", None, 0).await;
        let snap = reg.snapshot_and_prune(0).await;
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].category, None);
    }

    #[tokio::test]
    async fn test_prune_only_removes_stale_and_orders_by_identity() {
        let reg = PresenceRegistry::default();
        reg.upsert("charlie", Some("violin".into()), 9000).await;
        reg.upsert("alice", Some("piano".into()), 8000).await;
        reg.upsert("bob", Some("drum".into()), 1000).await;

        let snap = reg.snapshot_and_prune(10_000).await;
        let ids: Vec<_> = snap.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(ids, vec!["alice", "charlie"]);
        assert_eq!(reg.len().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_are_not_lost() {
        let reg = PresenceRegistry::default();
        let n = 500;
        let mut ids: Vec<String> = (0..n).map(|i| format!("musician-{i:04}")).collect();
        ids.shuffle(&mut rand::thread_rng());

        let handles: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let reg = reg.clone();
                let yields = rand::thread_rng().gen_range(0..4);
                tokio::spawn(async move {
                    for _ in 0..yields {
                        tokio::task::yield_now().await;
                    }
                    reg.upsert(&id, Some("piano".into()), 100).await;
                })
            })
            .collect();

        // interleave snapshots with the writers; nothing is stale at t=100
        for _ in 0..10 {
            let snap = reg.snapshot_and_prune(100).await;
            assert!(snap.len() <= n);
        }
        for h in handles {
            h.await.unwrap();
        }

        let snap = reg.snapshot_and_prune(100).await;
        assert_eq!(snap.len(), n);
        let mut seen = std::collections::HashSet::new();
        for rec in &snap {
            assert!(seen.insert(rec.identity.clone()), "duplicate {}", rec.identity);
            assert_eq!(rec.category.as_deref(), Some("piano"));
            assert_eq!(rec.last_seen, 100);
        }
    }
}
