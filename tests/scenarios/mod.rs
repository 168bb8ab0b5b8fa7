//! End-to-end scenarios over the directory, quota policy and relay.

mod concurrency;
mod pairing_flow;
mod quota_flow;
mod relay_flow;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secret_dating_bot::pairing::{PairingDirectory, ParticipantId, QuotaPolicy};
use secret_dating_bot::relay::{DeliveryError, Endpoint, RelayContent, Transport};

/// Chat transport that records what it was asked to send.
#[derive(Default)]
pub struct InboxTransport {
    sent: Mutex<Vec<(ParticipantId, RelayContent)>>,
    unreachable: Mutex<Vec<ParticipantId>>,
}

impl InboxTransport {
    /// Every delivery to `id` fails permanently from now on.
    pub fn block(&self, id: ParticipantId) {
        self.unreachable.lock().unwrap().push(id);
    }

    pub fn inbox(&self, id: ParticipantId) -> Vec<RelayContent> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == id)
            .map(|(_, content)| content.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for InboxTransport {
    async fn deliver(
        &self,
        endpoint: &Endpoint,
        content: &RelayContent,
    ) -> Result<(), DeliveryError> {
        let Endpoint::Chat(id) = endpoint else {
            return Err(DeliveryError::Permanent("not a chat endpoint".into()));
        };
        if self.unreachable.lock().unwrap().contains(id) {
            return Err(DeliveryError::Permanent("Forbidden: bot was blocked by the user".into()));
        }
        self.sent.lock().unwrap().push((*id, content.clone()));
        Ok(())
    }
}

pub async fn directory_with(
    policy: QuotaPolicy,
    ids: impl IntoIterator<Item = i64>,
) -> Arc<PairingDirectory> {
    let directory = Arc::new(PairingDirectory::new(policy));
    for id in ids {
        directory
            .register(ParticipantId(id), format!("user{id}"))
            .await;
    }
    directory
}

/// Pairing is symmetric for every participant in the directory.
pub async fn assert_consistent(directory: &PairingDirectory) {
    let participants = directory.participants().await;
    for p in &participants {
        if let Some(partner) = p.partner() {
            assert_ne!(partner, p.id, "{} is paired with itself", p.id);
            let other = participants
                .iter()
                .find(|o| o.id == partner)
                .expect("partner must exist");
            assert_eq!(
                other.partner(),
                Some(p.id),
                "{} -> {} is not reciprocated",
                p.id,
                partner
            );
        }
    }
}
