use std::collections::HashSet;

use futures::future::join_all;
use secret_dating_bot::pairing::{MatchOutcome, ParticipantId, QuotaPolicy};

use super::{assert_consistent, directory_with};

const CROWD: i64 = 50;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_searches_never_double_pair() {
    let directory = directory_with(QuotaPolicy::default(), 1..=CROWD).await;

    let tasks = (1..=CROWD).map(|id| {
        let directory = directory.clone();
        tokio::spawn(async move { directory.search_and_match(ParticipantId(id)).await })
    });
    let outcomes: Vec<MatchOutcome> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let mut seen = HashSet::new();
    for outcome in &outcomes {
        if let MatchOutcome::Matched(pairing) = outcome {
            assert_ne!(pairing.initiator, pairing.partner);
            assert!(seen.insert(pairing.initiator), "{} paired twice", pairing.initiator);
            assert!(seen.insert(pairing.partner), "{} paired twice", pairing.partner);
        }
    }

    // Searches are serialized, so the pool never holds more than one waiter.
    let stats = directory.stats().await;
    assert_eq!(stats.paired, CROWD as usize);
    assert_eq!(stats.searching, 0);
    assert_eq!(seen.len(), CROWD as usize);
    assert_consistent(&directory).await;

    for p in directory.participants().await {
        assert_eq!(p.match_quota, 9, "{} charged more than once", p.id);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_churn_keeps_pairings_symmetric() {
    let directory = directory_with(QuotaPolicy::default(), 1..=CROWD).await;

    let tasks = (1..=CROWD).map(|id| {
        let directory = directory.clone();
        tokio::spawn(async move {
            let me = ParticipantId(id);
            for round in 0..3 {
                let _ = directory.search_and_match(me).await;
                if (id + round) % 2 == 0 {
                    directory.end_pairing(me).await.unwrap();
                } else {
                    directory.cancel_search(me).await;
                }
                tokio::task::yield_now().await;
            }
        })
    });
    for joined in join_all(tasks).await {
        joined.unwrap();
    }

    assert_consistent(&directory).await;
    for p in directory.participants().await {
        assert!(p.match_quota <= 10);
    }
}
