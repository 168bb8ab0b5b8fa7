//! Secret Dating Bot Library
//!
//! This library provides tools to:
//! - Keep a directory of participants and pair searching participants 1:1
//! - Enforce per-participant match quotas with daily and referral bonuses
//! - Relay messages anonymously between partners over chat and live sessions
//! - Serve liveness, Prometheus metrics and directory stats over HTTP

pub mod bot;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pairing;
pub mod relay;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use pairing::{
    MatchOutcome, PairingDirectory, PairingState, Participant, ParticipantId, QuotaPolicy,
};
pub use relay::{Relay, RelayContent, SessionHub, Transport};
