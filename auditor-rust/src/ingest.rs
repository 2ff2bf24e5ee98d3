//! UDP ingest: receives musician announcements and records them in the registry.

use anyhow::{Context, Result};
use orchestra_protocol::{Announcement, DecodeError, Instrument, PresenceRecord};
use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;

use crate::config::Config;
use crate::state::AppState;

/// Pause after a failed receive so a persistent socket error does not spin
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct IngestListener {
    socket: UdpSocket,
    state: Arc<AppState>,
    buffer_size: usize,
}

impl IngestListener {
    /// Bind the multicast port and join the group. Fails if either step fails.
    pub async fn join(cfg: &Config, state: Arc<AppState>) -> Result<Self> {
        let bind_addr = SocketAddrV4::new(std::net::Ipv4Addr::UNSPECIFIED, cfg.multicast_port);
        let socket = UdpSocket::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind UDP {bind_addr}"))?;
        socket
            .join_multicast_v4(cfg.multicast_addr, cfg.interface)
            .with_context(|| {
                format!("Failed to join multicast group {} on {}", cfg.multicast_addr, cfg.interface)
            })?;

        tracing::info!(
            group = %cfg.multicast_addr,
            port = cfg.multicast_port,
            interface = %cfg.interface,
            "Joined multicast group"
        );
        Ok(Self::from_socket(socket, state, cfg.buffer_size))
    }

    /// Wrap an already bound socket (unicast works too)
    pub fn from_socket(socket: UdpSocket, state: Arc<AppState>, buffer_size: usize) -> Self {
        Self {
            socket,
            state,
            buffer_size,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive announcements until shutdown. A bad datagram only costs itself.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, from)) => {
                        if let Err(e) = self.handle_datagram(&buf[..len]).await {
                            tracing::warn!(from = %from, len = len, error = %e, "Dropping announcement");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "UDP receive failed");
                        tokio::time::sleep(RECV_ERROR_BACKOFF).await;
                    }
                },
                _ = shutdown.changed() => break,
            }
        }
        tracing::info!("Ingest listener stopped");
    }

    /// Decode one datagram and upsert it, stamped with the receive time.
    pub async fn handle_datagram(&self, payload: &[u8]) -> Result<PresenceRecord, DecodeError> {
        let ann = Announcement::decode(payload)?;
        let category = Instrument::from_sound(&ann.sound).map(|i| i.name().to_string());
        if category.is_none() {
            tracing::debug!(identity = %ann.uuid, sound = %ann.sound, "Unknown sound, storing without instrument");
        }

        let now = self.state.clock.now_millis();
        self.state.registry.upsert(&ann.uuid, category.clone(), now).await;
        tracing::debug!(identity = %ann.uuid, instrument = ?category, "Heard musician");

        Ok(PresenceRecord {
            identity: ann.uuid,
            category,
            last_seen: now,
        })
    }
}
