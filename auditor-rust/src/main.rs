mod config;
mod ingest;
mod server;
mod state;
mod sweeper;

use anyhow::Result;
use clap::Parser;
use orchestra_protocol::{
    SystemClock, LIVENESS_WINDOW_MS, MULTICAST_ADDR, MULTICAST_PORT, QUERY_PORT,
    RECEIVE_BUFFER_SIZE, WRITE_TIMEOUT_MS,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orchestra-auditor", about = "Tracks which musicians are currently playing")]
struct Cli {
    /// Multicast group musicians announce on
    #[arg(long, default_value_t = MULTICAST_ADDR, env = "ORCHESTRA_MULTICAST_ADDR")]
    multicast_addr: Ipv4Addr,

    #[arg(long, default_value_t = MULTICAST_PORT, env = "ORCHESTRA_MULTICAST_PORT")]
    multicast_port: u16,

    /// IPv4 address of the interface to join the group on
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED, env = "ORCHESTRA_INTERFACE")]
    interface: Ipv4Addr,

    /// Port for snapshot queries
    #[arg(long, default_value_t = QUERY_PORT, env = "ORCHESTRA_TCP_PORT")]
    tcp_port: u16,

    /// Silence (ms) after which a musician is dropped
    #[arg(long, default_value_t = LIVENESS_WINDOW_MS, env = "ORCHESTRA_WINDOW_MS")]
    window_ms: i64,

    /// UDP receive buffer in bytes
    #[arg(long, default_value_t = RECEIVE_BUFFER_SIZE)]
    buffer_size: usize,

    /// Maximum query connections served at once
    #[arg(long, default_value = "64")]
    max_connections: usize,

    /// Milliseconds a query client gets to read its snapshot
    #[arg(long, default_value_t = WRITE_TIMEOUT_MS, env = "ORCHESTRA_WRITE_TIMEOUT_MS")]
    write_timeout_ms: u64,

    /// Background prune interval in seconds (0 = prune only on query)
    #[arg(long, default_value = "0")]
    sweep_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let cfg = config::Config {
        multicast_addr: cli.multicast_addr,
        multicast_port: cli.multicast_port,
        interface: cli.interface,
        tcp_port: cli.tcp_port,
        window_ms: cli.window_ms,
        buffer_size: cli.buffer_size,
        max_connections: cli.max_connections,
        write_timeout: Duration::from_millis(cli.write_timeout_ms.max(1)),
        sweep_interval: (cli.sweep_interval_secs > 0)
            .then(|| Duration::from_secs(cli.sweep_interval_secs)),
    };
    tracing::info!(
        group = %cfg.multicast_addr,
        udp_port = cfg.multicast_port,
        tcp_port = cfg.tcp_port,
        window_ms = cfg.window_ms,
        "Starting orchestra auditor"
    );

    let state = state::AppState::new(cfg.window_ms, Arc::new(SystemClock));

    // Both transports must come up, otherwise exit non-zero
    let ingest = ingest::IngestListener::join(&cfg, state.clone()).await?;
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, cfg.tcp_port));
    let server =
        server::SnapshotServer::bind(addr, state.clone(), cfg.max_connections, cfg.write_timeout).await?;
    tracing::info!(
        udp = ?ingest.local_addr().ok(),
        tcp = ?server.local_addr().ok(),
        "Transports ready"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let ingest_handle = tokio::spawn(ingest.run(shutdown_rx.clone()));
    let sweep_handle = cfg.sweep_interval.map(|interval| {
        tracing::info!(interval_secs = interval.as_secs(), "Background sweep enabled");
        tokio::spawn(sweeper::run_sweep_loop(state.clone(), interval, shutdown_rx.clone()))
    });

    server.run(shutdown_rx).await;

    let _ = ingest_handle.await;
    if let Some(handle) = sweep_handle {
        let _ = handle.await;
    }

    let uptime = chrono::Utc::now() - state.start_time;
    tracing::info!(uptime_secs = uptime.num_seconds(), "Auditor shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async { tokio::signal::ctrl_c().await.ok(); };
    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
