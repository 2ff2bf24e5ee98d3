//! TCP snapshot server: every connection gets one JSON line with the live musicians.

use anyhow::{Context, Result};
use orchestra_protocol::PresenceRecord;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};

use crate::state::AppState;

pub struct SnapshotServer {
    listener: TcpListener,
    state: Arc<AppState>,
    permits: Arc<Semaphore>,
    write_timeout: Duration,
}

impl SnapshotServer {
    pub async fn bind(
        addr: SocketAddr,
        state: Arc<AppState>,
        max_connections: usize,
        write_timeout: Duration,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind TCP {addr}"))?;
        tracing::info!(
            %addr,
            max_connections = max_connections,
            write_timeout_ms = write_timeout.as_millis() as u64,
            "Snapshot server listening"
        );
        Ok(Self {
            listener,
            state,
            permits: Arc::new(Semaphore::new(max_connections.max(1))),
            write_timeout,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until shutdown. At most `max_connections` are served at once;
    /// further clients wait in the listen backlog. A client that stops reading
    /// holds its slot for at most `write_timeout`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let permit = tokio::select! {
                permit = self.permits.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
                _ = shutdown.changed() => break,
            };

            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                },
                _ = shutdown.changed() => break,
            };

            let state = self.state.clone();
            let write_timeout = self.write_timeout;
            tokio::spawn(async move {
                handle_connection(stream, peer, &state, write_timeout).await;
                drop(permit);
            });
        }
        tracing::info!("Snapshot server stopped");
    }
}

/// Snapshot at accept time, write it, close. Write failures and stalled
/// readers are logged only; the stream is closed either way.
async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, state: &AppState, write_timeout: Duration) {
    let now = state.clock.now_millis();
    let records = state.registry.snapshot_and_prune(now).await;

    let body = match render_snapshot(&records) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(peer = %peer, error = %e, "Failed to serialize snapshot");
            return;
        }
    };

    match tokio::time::timeout(write_timeout, write_all(&mut stream, body.as_bytes())).await {
        Ok(Ok(())) => tracing::info!(peer = %peer, musicians = records.len(), "Served snapshot"),
        Ok(Err(e)) => tracing::warn!(peer = %peer, error = %e, "Failed to write snapshot"),
        Err(_) => tracing::warn!(
            peer = %peer,
            timeout_ms = write_timeout.as_millis() as u64,
            "Client stopped reading, dropping connection"
        ),
    }
    if let Err(e) = stream.shutdown().await {
        tracing::debug!(peer = %peer, error = %e, "Error closing connection");
    }
}

async fn write_all(stream: &mut TcpStream, bytes: &[u8]) -> std::io::Result<()> {
    stream.write_all(bytes).await?;
    stream.flush().await
}

/// One line: a JSON array of records, `[]` when nobody is playing.
pub fn render_snapshot(records: &[PresenceRecord]) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(records)?;
    line.push('\n');
    Ok(line)
}
