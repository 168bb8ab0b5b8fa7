//! Error types for the dating bot

use thiserror::Error;

use crate::pairing::ParticipantId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("Participant {0} is already paired")]
    AlreadyPaired(ParticipantId),

    #[error("Participant {0} is not paired")]
    NotPaired(ParticipantId),

    #[error("Match quota exhausted for participant {0}")]
    QuotaExhausted(ParticipantId),

    #[error("Daily bonus already claimed today by participant {0}")]
    AlreadyClaimedToday(ParticipantId),

    #[error("Invalid referral: {0}")]
    InvalidReferral(String),

    #[error("Delivery failed ({}): {reason}", delivery_kind(.permanent))]
    DeliveryFailed { permanent: bool, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Telegram API error: {0}")]
    TelegramError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

fn delivery_kind(permanent: &bool) -> &'static str {
    if *permanent {
        "permanent"
    } else {
        "transient"
    }
}

impl Error {
    /// Domain errors are reported back to the participant; the rest are logged.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::ParticipantNotFound(_)
                | Error::AlreadyPaired(_)
                | Error::NotPaired(_)
                | Error::QuotaExhausted(_)
                | Error::AlreadyClaimedToday(_)
                | Error::InvalidReferral(_)
                | Error::DeliveryFailed { .. }
        )
    }
}

impl From<teloxide::RequestError> for Error {
    fn from(err: teloxide::RequestError) -> Self {
        Error::TelegramError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}
