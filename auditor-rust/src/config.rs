use std::net::Ipv4Addr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub multicast_addr: Ipv4Addr,
    pub multicast_port: u16,
    /// Local interface used to join the multicast group
    pub interface: Ipv4Addr,
    pub tcp_port: u16,
    pub window_ms: i64,
    pub buffer_size: usize,
    pub max_connections: usize,
    /// Deadline for writing one snapshot to a query client
    pub write_timeout: Duration,
    /// `None` leaves expiry entirely to query traffic
    pub sweep_interval: Option<Duration>,
}
