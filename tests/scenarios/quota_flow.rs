use chrono::NaiveDate;
use secret_dating_bot::error::Error;
use secret_dating_bot::pairing::{MatchOutcome, ParticipantId, QuotaPolicy};

use super::directory_with;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, d).unwrap()
}

#[tokio::test]
async fn quota_runs_out_and_never_goes_negative() {
    let directory = directory_with(QuotaPolicy::new(1, 5, 3), [1, 2, 3]).await;
    let (a, b, c) = (ParticipantId(1), ParticipantId(2), ParticipantId(3));

    directory.search_and_match(a).await.unwrap();
    directory.search_and_match(b).await.unwrap();
    directory.end_pairing(a).await.unwrap();

    assert_eq!(directory.snapshot(a).await.unwrap().match_quota, 0);
    assert!(matches!(
        directory.search_and_match(a).await,
        Err(Error::QuotaExhausted(_))
    ));

    // C can still search but finds nobody eligible.
    assert_eq!(
        directory.search_and_match(c).await.unwrap(),
        MatchOutcome::Waiting
    );
    assert_eq!(directory.snapshot(b).await.unwrap().match_quota, 0);
}

#[tokio::test]
async fn daily_bonus_once_per_day() {
    let directory = directory_with(QuotaPolicy::new(0, 5, 3), [1]).await;
    let a = ParticipantId(1);

    assert_eq!(directory.claim_bonus(a, day(24)).await.unwrap(), 5);
    assert!(matches!(
        directory.claim_bonus(a, day(24)).await,
        Err(Error::AlreadyClaimedToday(_))
    ));
    assert_eq!(directory.claim_bonus(a, day(25)).await.unwrap(), 10);

    // The bonus makes the participant eligible again.
    directory.begin_search(a).await.unwrap();
}

#[tokio::test]
async fn exempt_participant_is_never_charged() {
    let policy = QuotaPolicy::new(0, 5, 3).with_exempt([ParticipantId(1)]);
    let directory = directory_with(policy, [1, 2]).await;
    directory.claim_bonus(ParticipantId(2), day(1)).await.unwrap();

    directory.search_and_match(ParticipantId(1)).await.unwrap();
    let outcome = directory.search_and_match(ParticipantId(2)).await.unwrap();
    assert!(matches!(outcome, MatchOutcome::Matched(_)));

    assert_eq!(directory.snapshot(ParticipantId(1)).await.unwrap().match_quota, 0);
    assert_eq!(directory.snapshot(ParticipantId(2)).await.unwrap().match_quota, 4);
}

#[tokio::test]
async fn referral_credits_referrer_once() {
    let directory = directory_with(QuotaPolicy::default(), [1, 2]).await;
    let (referrer, newcomer) = (ParticipantId(1), ParticipantId(2));

    assert_eq!(
        directory.grant_referral_bonus(referrer, newcomer).await.unwrap(),
        13
    );
    assert!(matches!(
        directory.grant_referral_bonus(referrer, newcomer).await,
        Err(Error::InvalidReferral(_))
    ));
    assert!(matches!(
        directory.grant_referral_bonus(newcomer, newcomer).await,
        Err(Error::InvalidReferral(_))
    ));
    assert_eq!(
        directory.snapshot(newcomer).await.unwrap().referred_by,
        Some(referrer)
    );
}
