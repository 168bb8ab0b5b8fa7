//! User-visible replies

use crate::error::Error;
use crate::pairing::Participant;

pub const SEARCHING: &str = "🔎 Looking for a partner... You'll be notified as soon as someone joins.\n/cancel to stop searching.";
pub const PARTNER_FOUND: &str = "💌 Partner found! Say hi! Everything you send is forwarded anonymously.\n/stop to end the chat.";
pub const CHAT_ENDED: &str = "👋 You left the chat. /search to find someone new.";
pub const PARTNER_LEFT: &str = "💔 Your partner left the chat. /search to find someone new.";
pub const PARTNER_UNAVAILABLE: &str = "😕 Your partner is no longer reachable, so the chat was closed. /search to find someone new.";
pub const SEARCH_CANCELLED: &str = "Search cancelled.";
pub const NOT_SEARCHING: &str = "You are not searching right now. /search to start.";
pub const STILL_SEARCHING: &str = "🔎 Still looking for a partner, so your message was not sent.\n/cancel to stop searching.";
pub const NOT_IN_CHAT: &str = "You are not in a chat. /search to find a partner.";
pub const UNSUPPORTED_CONTENT: &str = "Only text, photos, stickers and voice messages can be forwarded.";
pub const REFERRAL_UNAVAILABLE: &str = "Referral links are not available right now.";

pub fn welcome(participant: &Participant) -> String {
    format!(
        "👋 Hello, {}! Welcome to Secret Dating Bot.\n\n\
         Chat anonymously with a random partner.\n\
         💫 Matches left: {}\n\n\
         /search to find a partner, /bonus for a daily top-up, /help for all commands.",
        participant.display_name, participant.match_quota
    )
}

pub fn profile(participant: &Participant, exempt: bool) -> String {
    let quota = if exempt {
        "unlimited".to_string()
    } else {
        participant.match_quota.to_string()
    };
    format!(
        "🤴 {}\nStatus: {}\n💫 Matches left: {}",
        participant.display_name,
        participant.state.label(),
        quota
    )
}

pub fn bonus_claimed(quota: u32) -> String {
    format!("🎁 Daily bonus claimed! Matches left: {quota}")
}

pub fn referral_credited(quota: u32) -> String {
    format!("👥 Someone joined with your link! Matches left: {quota}")
}

pub fn referral_link(link: &str, bonus: u32) -> String {
    format!("Invite friends and get {bonus} extra matches for each one:\n{link}")
}

/// Render a domain error for the participant who triggered it.
pub fn error_message(err: &Error) -> String {
    match err {
        Error::AlreadyPaired(_) => "You are already in a chat. /stop to leave it first.".into(),
        Error::NotPaired(_) => NOT_IN_CHAT.into(),
        Error::QuotaExhausted(_) => {
            "😔 You have no matches left. Claim your /bonus tomorrow or invite friends with /referral."
                .into()
        }
        Error::AlreadyClaimedToday(_) => "⏳ You already claimed today's bonus. Come back tomorrow!".into(),
        Error::DeliveryFailed { permanent: true, .. } => PARTNER_UNAVAILABLE.into(),
        Error::DeliveryFailed { permanent: false, .. } => {
            "⚠️ Your message could not be delivered. Please try again.".into()
        }
        Error::ParticipantNotFound(_) => "Please send /start first.".into(),
        Error::InvalidReferral(_) => "This referral link can't be used.".into(),
        _ => "Something went wrong. Please try again later.".into(),
    }
}
