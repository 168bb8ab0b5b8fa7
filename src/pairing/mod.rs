//! Anonymous 1:1 matchmaking.
//!
//! - [`participant`]: participant records and the pairing state machine
//! - [`directory`]: the shared registry that forms and releases pairs
//! - [`quota`]: match quota, daily bonus and referral policy

pub mod directory;
pub mod participant;
pub mod quota;

pub use directory::{
    DirectoryStats, MatchOutcome, Pairing, PairingDirectory, PartnerRoute, Registration,
};
pub use participant::{PairingState, Participant, ParticipantId, SessionToken};
pub use quota::QuotaPolicy;
