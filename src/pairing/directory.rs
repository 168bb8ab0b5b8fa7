//! Pairing directory: the single point of truth for participant state.
//!
//! Every mutation of a participant's pairing state happens inside one write
//! guard on the directory, and no `.await` occurs while that guard is held.
//! A waiting participant can therefore be claimed by at most one pairing,
//! and both sides of a link are always updated together.

use std::collections::{HashMap, VecDeque};

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::participant::{PairingState, Participant, ParticipantId, SessionToken};
use super::quota::QuotaPolicy;
use crate::error::{Error, Result};

/// A freshly formed link between two participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    /// The participant whose `try_match` formed the pair.
    pub initiator: ParticipantId,
    /// The waiting participant that was claimed from the pool.
    pub partner: ParticipantId,
}

impl Pairing {
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.initiator == id || self.partner == id
    }

    /// The other side of the pair as seen from `id`.
    pub fn other(&self, id: ParticipantId) -> ParticipantId {
        if self.initiator == id {
            self.partner
        } else {
            self.initiator
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched(Pairing),
    /// Still searching; nobody else is waiting yet.
    Waiting,
    /// The caller is idle and has not asked to search.
    NotSearching,
    /// The caller was already claimed by someone else's match.
    AlreadyPaired(ParticipantId),
}

/// Result of a first-contact registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub participant: Participant,
    pub created: bool,
}

/// Where the relay may currently reach a participant's partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerRoute {
    pub partner: ParticipantId,
    /// Live sessions of the partner, preferred (most recent) first.
    pub sessions: Vec<SessionToken>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryStats {
    pub total: usize,
    pub idle: usize,
    pub searching: usize,
    pub paired: usize,
}

#[derive(Debug, Default)]
struct Inner {
    participants: HashMap<ParticipantId, Participant>,
    /// Searching participants in admission order.
    pool: VecDeque<ParticipantId>,
}

impl Inner {
    fn get(&self, id: ParticipantId) -> Result<&Participant> {
        self.participants
            .get(&id)
            .ok_or(Error::ParticipantNotFound(id))
    }

    fn get_mut(&mut self, id: ParticipantId) -> Result<&mut Participant> {
        self.participants
            .get_mut(&id)
            .ok_or(Error::ParticipantNotFound(id))
    }

    fn begin_search(&mut self, policy: &QuotaPolicy, id: ParticipantId) -> Result<()> {
        let participant = self.get_mut(id)?;
        match participant.state {
            PairingState::Paired(_) => return Err(Error::AlreadyPaired(id)),
            PairingState::Searching => return Ok(()),
            PairingState::Idle => {}
        }
        policy.ensure_can_pair(participant)?;
        participant.state = PairingState::Searching;
        self.pool.push_back(id);
        debug!(participant = %id, waiting = self.pool.len(), "Joined search pool");
        Ok(())
    }

    fn try_match(&mut self, policy: &QuotaPolicy, id: ParticipantId) -> Result<MatchOutcome> {
        let me = self.get(id)?;
        match me.state {
            PairingState::Idle => return Ok(MatchOutcome::NotSearching),
            PairingState::Paired(partner) => return Ok(MatchOutcome::AlreadyPaired(partner)),
            PairingState::Searching => {}
        }
        if !policy.can_pair(me) {
            self.cancel_search(id);
            return Err(Error::QuotaExhausted(id));
        }

        // First found in admission order: the longest waiter wins.
        let candidate = self.pool.iter().copied().find(|other| {
            *other != id
                && self
                    .participants
                    .get(other)
                    .is_some_and(|p| p.is_searching() && policy.can_pair(p))
        });

        let Some(partner) = candidate else {
            return Ok(MatchOutcome::Waiting);
        };

        self.pool.retain(|waiting| *waiting != id && *waiting != partner);
        for (this, other) in [(id, partner), (partner, id)] {
            let participant = self.get_mut(this)?;
            participant.state = PairingState::Paired(other);
            policy.charge(participant);
        }

        Ok(MatchOutcome::Matched(Pairing {
            initiator: id,
            partner,
        }))
    }

    fn cancel_search(&mut self, id: ParticipantId) -> bool {
        let Some(participant) = self.participants.get_mut(&id) else {
            return false;
        };
        if !participant.is_searching() {
            return false;
        }
        participant.state = PairingState::Idle;
        self.pool.retain(|waiting| *waiting != id);
        true
    }

    /// Undo a fresh match: refund both sides, drop the unreachable partner
    /// to idle and put `id` back into the pool. Returns `false` if the link
    /// no longer holds.
    fn undo_match(
        &mut self,
        policy: &QuotaPolicy,
        id: ParticipantId,
        partner: ParticipantId,
    ) -> Result<bool> {
        let linked = self.get(id)?.state == PairingState::Paired(partner)
            && self
                .participants
                .get(&partner)
                .is_some_and(|p| p.state == PairingState::Paired(id));
        if !linked {
            return Ok(false);
        }

        let dropped = self.get_mut(partner)?;
        dropped.state = PairingState::Idle;
        policy.refund(dropped);

        let me = self.get_mut(id)?;
        me.state = PairingState::Searching;
        policy.refund(me);
        self.pool.push_front(id);
        Ok(true)
    }

    fn end_pairing(&mut self, id: ParticipantId) -> Result<Option<ParticipantId>> {
        let participant = self.get_mut(id)?;
        let Some(partner) = participant.partner() else {
            return Ok(None);
        };
        participant.state = PairingState::Idle;

        if let Some(other) = self.participants.get_mut(&partner) {
            if other.state == PairingState::Paired(id) {
                other.state = PairingState::Idle;
            }
        }
        Ok(Some(partner))
    }
}

/// Shared registry of participants and their pairing state.
#[derive(Debug)]
pub struct PairingDirectory {
    inner: RwLock<Inner>,
    policy: QuotaPolicy,
}

impl PairingDirectory {
    pub fn new(policy: QuotaPolicy) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            policy,
        }
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Create the participant on first contact, or refresh its display name.
    pub async fn register(
        &self,
        id: ParticipantId,
        display_name: impl Into<String>,
    ) -> Registration {
        let display_name = display_name.into();
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner.participants.get_mut(&id) {
            existing.display_name = display_name;
            return Registration {
                participant: existing.clone(),
                created: false,
            };
        }

        let participant = Participant::new(id, display_name, self.policy.initial_quota);
        inner.participants.insert(id, participant.clone());
        info!(participant = %id, name = %participant.display_name, "New participant");
        Registration {
            participant,
            created: true,
        }
    }

    /// Enter the search pool.
    pub async fn begin_search(&self, id: ParticipantId) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.begin_search(&self.policy, id)
    }

    /// Pair `id` with the longest-waiting other searcher, if any.
    pub async fn try_match(&self, id: ParticipantId) -> Result<MatchOutcome> {
        let mut inner = self.inner.write().await;
        let outcome = inner.try_match(&self.policy, id)?;
        log_outcome(&outcome);
        Ok(outcome)
    }

    /// `begin_search` followed by `try_match` in one critical section.
    pub async fn search_and_match(&self, id: ParticipantId) -> Result<MatchOutcome> {
        let mut inner = self.inner.write().await;
        inner.begin_search(&self.policy, id)?;
        let outcome = inner.try_match(&self.policy, id)?;
        log_outcome(&outcome);
        Ok(outcome)
    }

    /// Leave the search pool. Returns `false` if the participant was not searching.
    pub async fn cancel_search(&self, id: ParticipantId) -> bool {
        let mut inner = self.inner.write().await;
        let cancelled = inner.cancel_search(id);
        if cancelled {
            debug!(participant = %id, "Search cancelled");
        }
        cancelled
    }

    /// Release a pairing, returning both sides to idle.
    ///
    /// Idempotent: a participant that is not paired is left untouched and
    /// `Ok(None)` is returned. Otherwise the released partner is returned.
    pub async fn end_pairing(&self, id: ParticipantId) -> Result<Option<ParticipantId>> {
        let mut inner = self.inner.write().await;
        let released = inner.end_pairing(id)?;
        if let Some(partner) = released {
            info!(participant = %id, partner = %partner, "Pairing ended");
        }
        Ok(released)
    }

    /// End the pairing only if `id` is still linked to `partner`.
    ///
    /// Used by corrective actions that observed the link earlier and must not
    /// tear down a newer pairing formed in the meantime.
    pub async fn end_pairing_with(
        &self,
        id: ParticipantId,
        partner: ParticipantId,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.get(id)?.partner() != Some(partner) {
            return Ok(false);
        }
        inner.end_pairing(id)?;
        info!(participant = %id, partner = %partner, "Pairing ended after delivery failure");
        Ok(true)
    }

    /// Roll back a match whose claimed `partner` turned out to be unreachable,
    /// then look for the next waiter in the same critical section.
    ///
    /// Both charges are refunded and the partner leaves the pool. If the link
    /// was already released elsewhere nothing is undone and the caller's
    /// current state decides the outcome.
    pub async fn undo_match(
        &self,
        id: ParticipantId,
        partner: ParticipantId,
    ) -> Result<MatchOutcome> {
        let mut inner = self.inner.write().await;
        if inner.undo_match(&self.policy, id, partner)? {
            info!(participant = %id, partner = %partner, "Match rolled back, partner unreachable");
        }
        let outcome = inner.try_match(&self.policy, id)?;
        log_outcome(&outcome);
        Ok(outcome)
    }

    pub async fn partner_route(&self, id: ParticipantId) -> Result<PartnerRoute> {
        let inner = self.inner.read().await;
        let partner = inner.get(id)?.partner().ok_or(Error::NotPaired(id))?;
        let sessions = inner
            .participants
            .get(&partner)
            .map(|p| p.reachable_channels.iter().rev().cloned().collect())
            .unwrap_or_default();
        Ok(PartnerRoute { partner, sessions })
    }

    pub async fn attach_session(&self, id: ParticipantId, token: SessionToken) -> Result<()> {
        let mut inner = self.inner.write().await;
        let participant = inner.get_mut(id)?;
        participant.reachable_channels.retain(|t| *t != token);
        participant.reachable_channels.push(token);
        Ok(())
    }

    pub async fn detach_session(&self, id: ParticipantId, token: &SessionToken) -> bool {
        let mut inner = self.inner.write().await;
        let Some(participant) = inner.participants.get_mut(&id) else {
            return false;
        };
        let before = participant.reachable_channels.len();
        participant.reachable_channels.retain(|t| t != token);
        before != participant.reachable_channels.len()
    }

    /// Daily quota top-up. Returns the new quota.
    pub async fn claim_bonus(&self, id: ParticipantId, today: NaiveDate) -> Result<u32> {
        let mut inner = self.inner.write().await;
        let participant = inner.get_mut(id)?;
        let quota = self.policy.claim_daily_bonus(participant, today)?;
        info!(participant = %id, quota, "Daily bonus claimed");
        Ok(quota)
    }

    /// Credit `referrer` for bringing in `newcomer`. Granted at most once per
    /// newcomer; self-referral and unknown referrers are refused.
    pub async fn grant_referral_bonus(
        &self,
        referrer: ParticipantId,
        newcomer: ParticipantId,
    ) -> Result<u32> {
        if referrer == newcomer {
            return Err(Error::InvalidReferral(format!(
                "participant {newcomer} cannot refer themselves"
            )));
        }

        let mut inner = self.inner.write().await;
        if !inner.participants.contains_key(&referrer) {
            return Err(Error::InvalidReferral(format!(
                "unknown referrer {referrer}"
            )));
        }
        let joined = inner.get_mut(newcomer)?;
        if let Some(existing) = joined.referred_by {
            return Err(Error::InvalidReferral(format!(
                "participant {newcomer} was already referred by {existing}"
            )));
        }
        joined.referred_by = Some(referrer);

        let quota = self.policy.credit_referral(inner.get_mut(referrer)?);
        info!(referrer = %referrer, newcomer = %newcomer, quota, "Referral bonus granted");
        Ok(quota)
    }

    pub async fn snapshot(&self, id: ParticipantId) -> Option<Participant> {
        self.inner.read().await.participants.get(&id).cloned()
    }

    pub async fn participants(&self) -> Vec<Participant> {
        let inner = self.inner.read().await;
        let mut all: Vec<Participant> = inner.participants.values().cloned().collect();
        all.sort_by_key(|p| p.id);
        all
    }

    pub async fn stats(&self) -> DirectoryStats {
        let inner = self.inner.read().await;
        let mut stats = DirectoryStats {
            total: inner.participants.len(),
            ..Default::default()
        };
        for participant in inner.participants.values() {
            match participant.state {
                PairingState::Idle => stats.idle += 1,
                PairingState::Searching => stats.searching += 1,
                PairingState::Paired(_) => stats.paired += 1,
            }
        }
        stats
    }
}

fn log_outcome(outcome: &MatchOutcome) {
    if let MatchOutcome::Matched(pairing) = outcome {
        info!(
            participant = %pairing.initiator,
            partner = %pairing.partner,
            "Participants matched"
        );
        crate::metrics::record_match();
    }
}
