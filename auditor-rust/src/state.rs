use chrono::{DateTime, Utc};
use orchestra_protocol::{Clock, PresenceRegistry};
use std::sync::Arc;

/// Shared by the ingest loop, the snapshot server and the sweeper.
pub struct AppState {
    pub registry: PresenceRegistry,
    pub clock: Arc<dyn Clock>,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(window_ms: i64, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            registry: PresenceRegistry::new(window_ms),
            clock,
            start_time: Utc::now(),
        })
    }
}
