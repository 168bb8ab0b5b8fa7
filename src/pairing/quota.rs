//! Match quota and bonus policy.
//!
//! The policy is pure: it inspects and mutates a single [`Participant`]
//! record and is always applied by the directory while it holds the write
//! lock, so quota changes are atomic with the pairing transition that
//! triggers them.

use std::collections::HashSet;

use chrono::NaiveDate;

use super::participant::{Participant, ParticipantId};
use crate::error::{Error, Result};

pub const DEFAULT_INITIAL_QUOTA: u32 = 10;
pub const DEFAULT_DAILY_BONUS: u32 = 5;
pub const DEFAULT_REFERRAL_BONUS: u32 = 3;

#[derive(Debug, Clone)]
pub struct QuotaPolicy {
    pub initial_quota: u32,
    pub daily_bonus: u32,
    pub referral_bonus: u32,
    exempt: HashSet<ParticipantId>,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            initial_quota: DEFAULT_INITIAL_QUOTA,
            daily_bonus: DEFAULT_DAILY_BONUS,
            referral_bonus: DEFAULT_REFERRAL_BONUS,
            exempt: HashSet::new(),
        }
    }
}

impl QuotaPolicy {
    pub fn new(initial_quota: u32, daily_bonus: u32, referral_bonus: u32) -> Self {
        Self {
            initial_quota,
            daily_bonus,
            referral_bonus,
            exempt: HashSet::new(),
        }
    }

    pub fn with_exempt(mut self, ids: impl IntoIterator<Item = ParticipantId>) -> Self {
        self.exempt.extend(ids);
        self
    }

    pub fn is_exempt(&self, id: ParticipantId) -> bool {
        self.exempt.contains(&id)
    }

    /// Whether the participant may enter (or be claimed from) the search pool.
    pub fn can_pair(&self, participant: &Participant) -> bool {
        self.is_exempt(participant.id) || participant.match_quota > 0
    }

    pub fn ensure_can_pair(&self, participant: &Participant) -> Result<()> {
        if self.can_pair(participant) {
            Ok(())
        } else {
            Err(Error::QuotaExhausted(participant.id))
        }
    }

    /// Charge one pairing. Exempt participants are never charged.
    pub fn charge(&self, participant: &mut Participant) {
        if !self.is_exempt(participant.id) {
            participant.match_quota = participant.match_quota.saturating_sub(1);
        }
    }

    /// Give back a charge for a pairing that was rolled back.
    pub fn refund(&self, participant: &mut Participant) {
        if !self.is_exempt(participant.id) {
            participant.match_quota = participant.match_quota.saturating_add(1);
        }
    }

    /// Apply the once-per-calendar-day top-up.
    pub fn claim_daily_bonus(&self, participant: &mut Participant, today: NaiveDate) -> Result<u32> {
        if participant.last_bonus_claim == Some(today) {
            return Err(Error::AlreadyClaimedToday(participant.id));
        }
        participant.match_quota = participant.match_quota.saturating_add(self.daily_bonus);
        participant.last_bonus_claim = Some(today);
        Ok(participant.match_quota)
    }

    pub fn credit_referral(&self, referrer: &mut Participant) -> u32 {
        referrer.match_quota = referrer.match_quota.saturating_add(self.referral_bonus);
        referrer.match_quota
    }
}
