use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Opaque peer identifier (a v4 UUID string in practice)
pub type Identity = String;

/// Epoch milliseconds
pub type Millis = i64;

/// Multicast group musicians announce themselves on
pub const MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 22, 5);
pub const MULTICAST_PORT: u16 = 9904;
/// TCP port the auditor serves snapshots on
pub const QUERY_PORT: u16 = 2205;
/// Maximum silence before a musician is considered gone
pub const LIVENESS_WINDOW_MS: Millis = 5000;
/// Datagrams larger than this are truncated by the receiver
pub const RECEIVE_BUFFER_SIZE: usize = 1024;
pub const ANNOUNCE_INTERVAL_MS: u64 = 1000;
/// How long a query client may take to read its snapshot before it is dropped
pub const WRITE_TIMEOUT_MS: u64 = 5000;

/// Errors decoding an inbound announcement datagram
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("malformed announcement: {0}")]
    Json(#[from] serde_json::Error),
}

/// "I am `uuid` and I am playing `sound`"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub uuid: Identity,
    pub sound: String,
}

impl Announcement {
    pub fn new(uuid: impl Into<Identity>, sound: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            sound: sound.into(),
        }
    }

    /// Decode a raw datagram. Extra fields are ignored; missing or
    /// non-string `uuid`/`sound` are rejected.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(payload)?;
        Ok(serde_json::from_str(text.trim())?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// One live musician as returned to query clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    #[serde(rename = "uuid")]
    pub identity: Identity,
    /// `None` when the announced sound is not in the category table
    #[serde(rename = "instrument")]
    pub category: Option<String>,
    #[serde(rename = "lastActivity")]
    pub last_seen: Millis,
}
