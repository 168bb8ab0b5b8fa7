use std::sync::Arc;

use secret_dating_bot::error::Error;
use secret_dating_bot::pairing::{PairingState, ParticipantId, QuotaPolicy};
use secret_dating_bot::relay::{ChannelKind, Relay, RelayContent, SessionHub};

use super::{directory_with, InboxTransport};

const A: ParticipantId = ParticipantId(1);
const B: ParticipantId = ParticipantId(2);

async fn paired_relay() -> (Relay, Arc<InboxTransport>, Arc<SessionHub>) {
    let directory = directory_with(QuotaPolicy::default(), [1, 2]).await;
    directory.search_and_match(A).await.unwrap();
    directory.search_and_match(B).await.unwrap();

    let chat = Arc::new(InboxTransport::default());
    let sessions = Arc::new(SessionHub::default());
    let relay = Relay::new(directory, chat.clone()).with_sessions(sessions.clone());
    (relay, chat, sessions)
}

#[tokio::test]
async fn hello_reaches_partner_without_state_change() {
    let (relay, chat, _) = paired_relay().await;

    let delivery = relay.relay(A, &RelayContent::text("hello")).await.unwrap();
    assert_eq!(delivery.partner, B);
    assert_eq!(delivery.channel, ChannelKind::Chat);
    assert_eq!(chat.inbox(B), vec![RelayContent::text("hello")]);
    assert!(chat.inbox(A).is_empty());

    let a = relay.directory().snapshot(A).await.unwrap();
    assert_eq!(a.state, PairingState::Paired(B));
    assert_eq!(a.match_quota, 9);
}

#[tokio::test]
async fn live_session_is_preferred_over_chat() {
    let (relay, chat, sessions) = paired_relay().await;
    let (_token, mut rx) = sessions.connect(relay.directory(), B).await.unwrap();

    let photo = RelayContent::Photo {
        file_id: "AgADBAAD".into(),
        caption: Some("me".into()),
    };
    let delivery = relay.relay(A, &photo).await.unwrap();
    assert_eq!(delivery.channel, ChannelKind::Session);
    assert_eq!(rx.recv().await, Some(photo));
    assert!(chat.inbox(B).is_empty());
}

#[tokio::test]
async fn closed_session_falls_back_to_chat() {
    let (relay, chat, sessions) = paired_relay().await;
    let (_token, rx) = sessions.connect(relay.directory(), B).await.unwrap();
    drop(rx);

    let delivery = relay.relay(A, &RelayContent::text("still there?")).await.unwrap();
    assert_eq!(delivery.channel, ChannelKind::Chat);
    assert_eq!(chat.inbox(B), vec![RelayContent::text("still there?")]);
    assert!(relay
        .directory()
        .snapshot(B)
        .await
        .unwrap()
        .reachable_channels
        .is_empty());
}

#[tokio::test]
async fn blocked_partner_ends_the_pairing() {
    let (relay, chat, _) = paired_relay().await;
    chat.block(B);

    let err = relay.relay(A, &RelayContent::text("hi")).await.unwrap_err();
    assert!(matches!(err, Error::DeliveryFailed { permanent: true, .. }));

    for id in [A, B] {
        assert_eq!(
            relay.directory().snapshot(id).await.unwrap().state,
            PairingState::Idle
        );
    }
    assert!(matches!(
        relay.relay(A, &RelayContent::text("hi")).await,
        Err(Error::NotPaired(_))
    ));
}

#[tokio::test]
async fn messages_after_stop_are_rejected() {
    let (relay, chat, _) = paired_relay().await;
    relay.directory().end_pairing(B).await.unwrap();

    assert!(matches!(
        relay.relay(A, &RelayContent::text("wait")).await,
        Err(Error::NotPaired(id)) if id == A
    ));
    assert!(chat.inbox(B).is_empty());
}
