//! Transport seam between the relay and the outside world

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pairing::{ParticipantId, SessionToken};

/// Message payload forwarded between partners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelayContent {
    Text {
        text: String,
    },
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    Sticker {
        file_id: String,
    },
    Voice {
        file_id: String,
    },
}

impl RelayContent {
    pub fn text(text: impl Into<String>) -> Self {
        RelayContent::Text { text: text.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RelayContent::Text { .. } => "text",
            RelayContent::Photo { .. } => "photo",
            RelayContent::Sticker { .. } => "sticker",
            RelayContent::Voice { .. } => "voice",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// The participant's private chat with the bot.
    Chat,
    /// A live secondary session.
    Session,
}

impl ChannelKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelKind::Chat => "chat",
            ChannelKind::Session => "session",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Chat(ParticipantId),
    Session(SessionToken),
}

impl Endpoint {
    pub fn channel(&self) -> ChannelKind {
        match self {
            Endpoint::Chat(_) => ChannelKind::Chat,
            Endpoint::Session(_) => ChannelKind::Session,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Worth reporting but the endpoint may work again later.
    #[error("transient delivery failure: {0}")]
    Transient(String),

    /// The endpoint is gone (bot blocked, account deactivated, session closed).
    #[error("endpoint permanently unreachable: {0}")]
    Permanent(String),
}

impl DeliveryError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, DeliveryError::Permanent(_))
    }

    pub fn reason(&self) -> &str {
        match self {
            DeliveryError::Transient(reason) | DeliveryError::Permanent(reason) => reason,
        }
    }
}

/// "Deliver this to that endpoint". Implementations may fail.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, endpoint: &Endpoint, content: &RelayContent)
        -> Result<(), DeliveryError>;
}
