use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::state::AppState;

/// Periodically prune silent musicians so the registry does not wait for
/// query traffic to shed them. Query results are unaffected.
pub async fn run_sweep_loop(state: Arc<AppState>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = timer.tick() => {
                let now = state.clock.now_millis();
                let live = state.registry.snapshot_and_prune(now).await;
                tracing::debug!(live = live.len(), "Sweep complete");
            }
            _ = shutdown.changed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestra_protocol::{ManualClock, LIVENESS_WINDOW_MS};

    #[tokio::test]
    async fn test_sweep_removes_stale_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let state = AppState::new(LIVENESS_WINDOW_MS, clock.clone());
        state.registry.upsert("old", Some("piano".into()), 0).await;
        state.registry.upsert("new", Some("flute".into()), 9000).await;
        clock.set(10_000);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_sweep_loop(state.clone(), Duration::from_millis(10), rx));

        tokio::time::timeout(Duration::from_secs(5), async {
            while state.registry.get("old").await.is_some() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("sweeper never pruned the stale entry");
        assert!(state.registry.get("new").await.is_some());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
