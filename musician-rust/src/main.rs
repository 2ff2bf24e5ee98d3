mod announcer;
mod config;

use anyhow::Result;
use clap::Parser;
use orchestra_protocol::{Instrument, ANNOUNCE_INTERVAL_MS, MULTICAST_ADDR, MULTICAST_PORT};
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orchestra-musician", about = "Plays an instrument on the orchestra multicast group")]
struct Cli {
    /// One of: piano, trumpet, flute, violin, drum
    instrument: String,

    #[arg(long, default_value_t = MULTICAST_ADDR, env = "ORCHESTRA_MULTICAST_ADDR")]
    multicast_addr: Ipv4Addr,

    #[arg(long, default_value_t = MULTICAST_PORT, env = "ORCHESTRA_MULTICAST_PORT")]
    multicast_port: u16,

    /// Delay between announcements in milliseconds
    #[arg(long, default_value_t = ANNOUNCE_INTERVAL_MS)]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let Some(instrument) = Instrument::from_name(&cli.instrument) else {
        anyhow::bail!(
            "Unknown instrument '{}', expected one of: piano, trumpet, flute, violin, drum",
            cli.instrument
        );
    };
    let cfg = config::Config {
        instrument,
        destination: SocketAddrV4::new(cli.multicast_addr, cli.multicast_port),
        interval_ms: cli.interval_ms,
    };

    let uuid = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        uuid = %uuid,
        instrument = %cfg.instrument,
        sound = cfg.instrument.sound(),
        to = %cfg.destination,
        "Starting musician"
    );

    let announcer = announcer::Announcer::new(&cfg, &uuid).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    announcer.run(shutdown_rx).await;

    tracing::info!("Musician stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async { signal::ctrl_c().await.ok(); };
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
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
