use anyhow::{Context, Result};
use orchestra_protocol::Announcement;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;

use crate::config::Config;

/// Plays one instrument: sends the same announcement to the group forever.
pub struct Announcer {
    socket: UdpSocket,
    destination: SocketAddr,
    payload: Vec<u8>,
    interval: Duration,
}

impl Announcer {
    pub async fn new(cfg: &Config, uuid: &str) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .context("Failed to bind UDP socket")?;
        Self::with_socket(socket, SocketAddr::V4(cfg.destination), cfg, uuid)
    }

    pub fn with_socket(socket: UdpSocket, destination: SocketAddr, cfg: &Config, uuid: &str) -> Result<Self> {
        let payload = Announcement::new(uuid, cfg.instrument.sound())
            .encode()
            .context("Failed to encode announcement")?;
        Ok(Self {
            socket,
            destination,
            payload,
            interval: Duration::from_millis(cfg.interval_ms.max(1)),
        })
    }

    pub async fn send_once(&self) -> std::io::Result<usize> {
        self.socket.send_to(&self.payload, self.destination).await
    }

    /// Announce every interval until shutdown. Failed sends are skipped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = timer.tick() => match self.send_once().await {
                    Ok(_) => tracing::debug!(to = %self.destination, "Announced"),
                    Err(e) => tracing::warn!(to = %self.destination, error = %e, "Announcement failed"),
                },
                _ = shutdown.changed() => break,
            }
        }
    }
}
