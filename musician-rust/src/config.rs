use orchestra_protocol::Instrument;
use std::net::SocketAddrV4;

#[derive(Debug, Clone)]
pub struct Config {
    pub instrument: Instrument,
    pub destination: SocketAddrV4,
    pub interval_ms: u64,
}
