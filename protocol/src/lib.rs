//! Orchestra presence protocol
//!
//! Musicians announce themselves over UDP multicast; the auditor remembers
//! who it heard from and when, and answers TCP queries with the live set.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐  UDP multicast   ┌─────────────────────────────┐  TCP   ┌────────┐
//!  │Musician A│ ───────────────► │ Auditor                     │ ◄───── │ client │
//!  └──────────┘  239.255.22.5    │  ingest ──► registry ◄── srv│ ─────► │        │
//!  ┌──────────┐      :9904       │            (one lock)       │  :2205 └────────┘
//!  │Musician B│ ───────────────► │                             │
//!  └──────────┘                  └─────────────────────────────┘
//! ```
//!
//! ## Announcements
//! - `{"uuid": "...", "sound": "pouet"}`, once per second per musician
//! - The sound is mapped to an instrument through [`Instrument::from_sound`]
//!
//! ## Liveness
//! - A musician is live while it was heard from within the last 5 seconds
//! - Expiry is lazy: stale entries are dropped when a snapshot is taken
//!
//! ## Queries
//! - Connect, read one line (a JSON array of [`PresenceRecord`]), done

pub mod clock;
pub mod instrument;
pub mod registry;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use instrument::Instrument;
pub use registry::{Presence, PresenceRegistry};
pub use types::*;
