//! In-process registry of live secondary sessions.
//!
//! Each open session is a bounded queue; whatever front-end serves the
//! session drains the receiving half.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::debug;

use super::transport::{DeliveryError, Endpoint, RelayContent, Transport};
use crate::error::Result;
use crate::pairing::{PairingDirectory, ParticipantId, SessionToken};

pub const DEFAULT_SESSION_BUFFER: usize = 32;

/// Sessions are attached by an external front-end through [`SessionHub::connect`];
/// the bot itself only delivers into them.
#[derive(Debug)]
pub struct SessionHub {
    sinks: RwLock<HashMap<SessionToken, mpsc::Sender<RelayContent>>>,
    buffer: usize,
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_BUFFER)
    }
}

impl SessionHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            sinks: RwLock::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Open a new session and return its token with the receiving half.
    pub async fn open(&self) -> (SessionToken, mpsc::Receiver<RelayContent>) {
        let token = SessionToken::generate();
        let (tx, rx) = mpsc::channel(self.buffer);
        self.sinks.write().await.insert(token.clone(), tx);
        debug!(session = %token, "Session opened");
        (token, rx)
    }

    /// Open a session and make it a reachable channel of `id`.
    pub async fn connect(
        &self,
        directory: &PairingDirectory,
        id: ParticipantId,
    ) -> Result<(SessionToken, mpsc::Receiver<RelayContent>)> {
        let (token, rx) = self.open().await;
        if let Err(err) = directory.attach_session(id, token.clone()).await {
            self.close(&token).await;
            return Err(err);
        }
        Ok((token, rx))
    }

    pub async fn disconnect(
        &self,
        directory: &PairingDirectory,
        id: ParticipantId,
        token: &SessionToken,
    ) {
        self.close(token).await;
        directory.detach_session(id, token).await;
    }

    pub async fn close(&self, token: &SessionToken) -> bool {
        self.sinks.write().await.remove(token).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sinks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sinks.read().await.is_empty()
    }
}

#[async_trait]
impl Transport for SessionHub {
    async fn deliver(
        &self,
        endpoint: &Endpoint,
        content: &RelayContent,
    ) -> std::result::Result<(), DeliveryError> {
        let Endpoint::Session(token) = endpoint else {
            return Err(DeliveryError::Permanent(
                "session hub only serves session endpoints".into(),
            ));
        };

        let sink = self.sinks.read().await.get(token).cloned();
        let Some(sink) = sink else {
            return Err(DeliveryError::Permanent(format!("unknown session {token}")));
        };

        match sink.try_send(content.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                Err(DeliveryError::Transient(format!("session {token} is backed up")))
            }
            Err(TrySendError::Closed(_)) => {
                self.close(token).await;
                Err(DeliveryError::Permanent(format!("session {token} closed")))
            }
        }
    }
}
