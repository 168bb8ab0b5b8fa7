//! Message relay between paired participants.
//!
//! Delivery order for a partner:
//! 1. live sessions, most recently attached first
//! 2. the partner's chat with the bot
//!
//! Delivery is best effort and at most once. A permanent failure on the chat
//! channel means the partner is gone, so the pairing is released.

pub mod session_hub;
pub mod transport;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::pairing::{PairingDirectory, ParticipantId};

pub use session_hub::SessionHub;
pub use transport::{ChannelKind, DeliveryError, Endpoint, RelayContent, Transport};

/// Successful hand-off to the partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partner: ParticipantId,
    pub channel: ChannelKind,
}

pub struct Relay {
    directory: Arc<PairingDirectory>,
    chat: Arc<dyn Transport>,
    sessions: Option<Arc<dyn Transport>>,
    /// One lane per sender keeps each sender's messages in order.
    lanes: DashMap<ParticipantId, Arc<Mutex<()>>>,
}

impl Relay {
    pub fn new(directory: Arc<PairingDirectory>, chat: Arc<dyn Transport>) -> Self {
        Self {
            directory,
            chat,
            sessions: None,
            lanes: DashMap::new(),
        }
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn Transport>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn directory(&self) -> &Arc<PairingDirectory> {
        &self.directory
    }

    /// Forward `content` from `sender` to its current partner.
    pub async fn relay(&self, sender: ParticipantId, content: &RelayContent) -> Result<Delivery> {
        let lane = self.lanes.entry(sender).or_default().clone();
        let result = {
            let _in_order = lane.lock().await;
            self.forward(sender, content).await
        };
        drop(lane);

        // Last one out of the lane removes it.
        self.lanes
            .remove_if(&sender, |_, lane| Arc::strong_count(lane) == 1);
        result
    }

    async fn forward(&self, sender: ParticipantId, content: &RelayContent) -> Result<Delivery> {
        let route = self.directory.partner_route(sender).await?;
        let partner = route.partner;

        if let Some(sessions) = &self.sessions {
            for token in route.sessions {
                let endpoint = Endpoint::Session(token.clone());
                match sessions.deliver(&endpoint, content).await {
                    Ok(()) => return Ok(self.delivered(sender, partner, ChannelKind::Session)),
                    Err(err) => {
                        metrics::record_relay(ChannelKind::Session.label(), "failed");
                        warn!(participant = %partner, channel = "session", "Session delivery failed: {}", err);
                        if err.is_permanent() {
                            self.directory.detach_session(partner, &token).await;
                        }
                    }
                }
            }
        }

        match self.chat.deliver(&Endpoint::Chat(partner), content).await {
            Ok(()) => Ok(self.delivered(sender, partner, ChannelKind::Chat)),
            Err(DeliveryError::Transient(reason)) => {
                metrics::record_relay(ChannelKind::Chat.label(), "failed");
                warn!(participant = %sender, partner = %partner, "Relay failed: {}", reason);
                Err(Error::DeliveryFailed {
                    permanent: false,
                    reason,
                })
            }
            Err(DeliveryError::Permanent(reason)) => {
                metrics::record_relay(ChannelKind::Chat.label(), "unreachable");
                warn!(participant = %sender, partner = %partner, "Partner unreachable: {}", reason);
                self.directory.end_pairing_with(sender, partner).await?;
                Err(Error::DeliveryFailed {
                    permanent: true,
                    reason,
                })
            }
        }
    }

    fn delivered(&self, sender: ParticipantId, partner: ParticipantId, channel: ChannelKind) -> Delivery {
        metrics::record_relay(channel.label(), "delivered");
        debug!(participant = %sender, partner = %partner, channel = channel.label(), "Relayed");
        Delivery { partner, channel }
    }
}
