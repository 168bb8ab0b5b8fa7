use secret_dating_bot::error::Error;
use secret_dating_bot::pairing::{MatchOutcome, PairingState, ParticipantId, QuotaPolicy};

use super::{assert_consistent, directory_with};

const A: ParticipantId = ParticipantId(1);
const B: ParticipantId = ParticipantId(2);
const C: ParticipantId = ParticipantId(3);

#[tokio::test]
async fn fresh_participants_pair_and_spend_one_match_each() {
    let directory = directory_with(QuotaPolicy::default(), [1, 2]).await;

    directory.begin_search(A).await.unwrap();
    assert_eq!(directory.try_match(A).await.unwrap(), MatchOutcome::Waiting);

    directory.begin_search(B).await.unwrap();
    let outcome = directory.try_match(B).await.unwrap();
    assert!(matches!(outcome, MatchOutcome::Matched(ref p) if p.contains(A) && p.contains(B)));

    let a = directory.snapshot(A).await.unwrap();
    let b = directory.snapshot(B).await.unwrap();
    assert_eq!(a.state, PairingState::Paired(B));
    assert_eq!(b.state, PairingState::Paired(A));
    assert_eq!(a.match_quota, 9);
    assert_eq!(b.match_quota, 9);
    assert_consistent(&directory).await;
}

#[tokio::test]
async fn exhausted_participant_cannot_search() {
    let directory = directory_with(QuotaPolicy::new(0, 5, 3), [3]).await;

    let err = directory.begin_search(C).await.unwrap_err();
    assert!(matches!(err, Error::QuotaExhausted(id) if id == C));
    assert_eq!(directory.snapshot(C).await.unwrap().state, PairingState::Idle);
}

#[tokio::test]
async fn ending_a_pairing_releases_both_sides_once() {
    let directory = directory_with(QuotaPolicy::default(), [1, 2]).await;
    directory.search_and_match(A).await.unwrap();
    directory.search_and_match(B).await.unwrap();

    assert_eq!(directory.end_pairing(A).await.unwrap(), Some(B));
    for id in [A, B] {
        let p = directory.snapshot(id).await.unwrap();
        assert_eq!(p.state, PairingState::Idle);
        assert_eq!(p.partner(), None);
    }

    assert_eq!(directory.end_pairing(A).await.unwrap(), None);
    let stats = directory.stats().await;
    assert_eq!(stats.idle, 2);
    assert_eq!(stats.paired, 0);
}

#[tokio::test]
async fn longest_waiter_is_matched_first() {
    let directory = directory_with(QuotaPolicy::default(), [1, 2, 3]).await;
    directory.begin_search(C).await.unwrap();
    directory.begin_search(A).await.unwrap();

    let outcome = directory.search_and_match(B).await.unwrap();
    assert!(matches!(outcome, MatchOutcome::Matched(ref p) if p.contains(C)));
    assert!(directory.snapshot(A).await.unwrap().is_searching());
    assert_consistent(&directory).await;
}

#[tokio::test]
async fn paired_participant_cannot_search_again() {
    let directory = directory_with(QuotaPolicy::default(), [1, 2]).await;
    directory.search_and_match(A).await.unwrap();
    directory.search_and_match(B).await.unwrap();

    let err = directory.begin_search(A).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyPaired(_)));
    assert_eq!(
        directory.try_match(A).await.unwrap(),
        MatchOutcome::AlreadyPaired(B)
    );
}

#[tokio::test]
async fn cancelled_searcher_is_not_matched() {
    let directory = directory_with(QuotaPolicy::default(), [1, 2]).await;
    directory.search_and_match(A).await.unwrap();
    assert!(directory.cancel_search(A).await);
    assert!(!directory.cancel_search(A).await);

    assert_eq!(
        directory.search_and_match(B).await.unwrap(),
        MatchOutcome::Waiting
    );
    assert_eq!(directory.snapshot(A).await.unwrap().state, PairingState::Idle);
}

#[tokio::test]
async fn unknown_participant_is_reported() {
    let directory = directory_with(QuotaPolicy::default(), std::iter::empty()).await;
    let err = directory.begin_search(ParticipantId(99)).await.unwrap_err();
    assert!(matches!(err, Error::ParticipantNotFound(_)));
}
