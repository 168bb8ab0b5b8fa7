//! Participant records and their pairing state

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable external identity of a participant (the Telegram user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub i64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ParticipantId {
    fn from(id: i64) -> Self {
        ParticipantId(id)
    }
}

/// Handle of a live secondary session (e.g. an open web-app view).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        SessionToken(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionToken {
    fn from(token: &str) -> Self {
        SessionToken(token.to_string())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pairing state machine: `Idle -> Searching -> Paired -> Idle`.
///
/// The partner link lives inside `Paired`, so a searching or idle
/// participant cannot carry a stale partner id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "partner", rename_all = "snake_case")]
pub enum PairingState {
    Idle,
    Searching,
    Paired(ParticipantId),
}

impl PairingState {
    pub fn partner(&self) -> Option<ParticipantId> {
        match self {
            PairingState::Paired(partner) => Some(*partner),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PairingState::Idle => "idle",
            PairingState::Searching => "searching",
            PairingState::Paired(_) => "paired",
        }
    }
}

/// One end-user session tracked by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub state: PairingState,
    pub match_quota: u32,
    pub last_bonus_claim: Option<NaiveDate>,
    /// Live sessions, most recently attached last.
    pub reachable_channels: Vec<SessionToken>,
    pub referred_by: Option<ParticipantId>,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: impl Into<String>, match_quota: u32) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            state: PairingState::Idle,
            match_quota,
            last_bonus_claim: None,
            reachable_channels: Vec::new(),
            referred_by: None,
            joined_at: Utc::now(),
        }
    }

    pub fn partner(&self) -> Option<ParticipantId> {
        self.state.partner()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, PairingState::Idle)
    }

    pub fn is_searching(&self) -> bool {
        matches!(self.state, PairingState::Searching)
    }

    pub fn is_paired(&self) -> bool {
        matches!(self.state, PairingState::Paired(_))
    }
}
