//! Update handlers: translate commands and messages into directory and
//! relay operations, then report the outcome to the participant.

use std::time::Instant;

use chrono::Local;
use teloxide::prelude::*;
use teloxide::types::User;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use super::commands::{parse_referral, Command};
use super::texts;
use super::BotState;
use crate::error::{Error, Result};
use crate::metrics;
use crate::pairing::{MatchOutcome, ParticipantId, Registration};
use crate::relay::{Endpoint, RelayContent, Transport};

pub async fn handle_command(msg: Message, cmd: Command, state: BotState) -> ResponseResult<()> {
    if !msg.chat.is_private() {
        return Ok(());
    }

    let handler = cmd.handler_name();
    metrics::record_update_start(handler);
    let started = Instant::now();

    let id = ParticipantId(msg.chat.id.0);
    let registration = state.directory.register(id, display_name(msg.from())).await;

    let result = match cmd {
        Command::Start(payload) => on_start(&state, &registration, &payload).await,
        Command::Help => state.say(id, Command::descriptions().to_string()).await,
        Command::Search => on_search(&state, id).await,
        Command::Stop => on_stop(&state, id).await,
        Command::Cancel => on_cancel(&state, id).await,
        Command::Bonus => on_bonus(&state, id).await,
        Command::Profile => on_profile(&state, id).await,
        Command::Referral => on_referral(&state, id).await,
    };

    metrics::record_update_result(handler, started.elapsed(), result.is_ok());
    metrics::record_directory_stats(&state.directory.stats().await);
    report(&state, id, result).await;
    Ok(())
}

/// Any non-command message: forward it to the partner.
pub async fn handle_message(msg: Message, state: BotState) -> ResponseResult<()> {
    if !msg.chat.is_private() {
        return Ok(());
    }

    metrics::record_update_start("relay");
    let started = Instant::now();

    let id = ParticipantId(msg.chat.id.0);
    state.directory.register(id, display_name(msg.from())).await;

    let result = on_relay(&state, id, relay_content(&msg)).await;

    metrics::record_update_result("relay", started.elapsed(), result.is_ok());
    report(&state, id, result).await;
    Ok(())
}

async fn on_relay(state: &BotState, id: ParticipantId, content: Option<RelayContent>) -> Result<()> {
    let Some(content) = content else {
        return state.say(id, texts::UNSUPPORTED_CONTENT).await;
    };

    let err = match state.relay.relay(id, &content).await {
        Ok(_) => return Ok(()),
        Err(err) => err,
    };

    if matches!(err, Error::NotPaired(_)) {
        let searching = state
            .directory
            .snapshot(id)
            .await
            .is_some_and(|p| p.is_searching());
        if searching {
            return state.say(id, texts::STILL_SEARCHING).await;
        }
    }
    Err(err)
}

async fn on_start(state: &BotState, registration: &Registration, payload: &str) -> Result<()> {
    let participant = &registration.participant;

    if registration.created {
        if let Some(referrer) = parse_referral(payload) {
            match state
                .directory
                .grant_referral_bonus(referrer, participant.id)
                .await
            {
                Ok(quota) => {
                    if let Err(err) = state.say(referrer, texts::referral_credited(quota)).await {
                        warn!(participant = %referrer, "Failed to notify referrer: {}", err);
                    }
                }
                Err(err) => warn!(participant = %participant.id, "Referral ignored: {}", err),
            }
        }
    }

    state.say(participant.id, texts::welcome(participant)).await
}

async fn on_search(state: &BotState, id: ParticipantId) -> Result<()> {
    let mut outcome = state.directory.search_and_match(id).await?;
    loop {
        match outcome {
            MatchOutcome::Matched(pairing) => {
                let partner = pairing.other(id);
                // The partner has been waiting; make sure they are still around.
                match state.say(partner, texts::PARTNER_FOUND).await {
                    Err(Error::DeliveryFailed {
                        permanent: true,
                        reason,
                    }) => {
                        warn!(participant = %id, partner = %partner, "Claimed partner unreachable: {}", reason);
                        outcome = state.directory.undo_match(id, partner).await?;
                        continue;
                    }
                    Err(err) => warn!(participant = %partner, "Failed to announce match: {}", err),
                    Ok(()) => {}
                }
                return state.say(id, texts::PARTNER_FOUND).await;
            }
            MatchOutcome::Waiting => return state.say(id, texts::SEARCHING).await,
            MatchOutcome::AlreadyPaired(_) => return Err(Error::AlreadyPaired(id)),
            MatchOutcome::NotSearching => return state.say(id, texts::NOT_SEARCHING).await,
        }
    }
}

async fn on_stop(state: &BotState, id: ParticipantId) -> Result<()> {
    if let Some(partner) = state.directory.end_pairing(id).await? {
        if let Err(err) = state.say(partner, texts::PARTNER_LEFT).await {
            warn!(participant = %partner, "Failed to notify partner: {}", err);
        }
        return state.say(id, texts::CHAT_ENDED).await;
    }

    if state.directory.cancel_search(id).await {
        state.say(id, texts::SEARCH_CANCELLED).await
    } else {
        state.say(id, texts::NOT_IN_CHAT).await
    }
}

async fn on_cancel(state: &BotState, id: ParticipantId) -> Result<()> {
    if state.directory.cancel_search(id).await {
        state.say(id, texts::SEARCH_CANCELLED).await
    } else {
        state.say(id, texts::NOT_SEARCHING).await
    }
}

async fn on_bonus(state: &BotState, id: ParticipantId) -> Result<()> {
    let today = Local::now().date_naive();
    let quota = state.directory.claim_bonus(id, today).await?;
    state.say(id, texts::bonus_claimed(quota)).await
}

async fn on_profile(state: &BotState, id: ParticipantId) -> Result<()> {
    let participant = state
        .directory
        .snapshot(id)
        .await
        .ok_or(Error::ParticipantNotFound(id))?;
    let exempt = state.directory.policy().is_exempt(id);
    state.say(id, texts::profile(&participant, exempt)).await
}

async fn on_referral(state: &BotState, id: ParticipantId) -> Result<()> {
    match state.config.referral_link(id) {
        Some(link) => {
            let bonus = state.directory.policy().referral_bonus;
            state.say(id, texts::referral_link(&link, bonus)).await
        }
        None => state.say(id, texts::REFERRAL_UNAVAILABLE).await,
    }
}

/// Show domain errors to the participant; log everything else.
async fn report(state: &BotState, id: ParticipantId, result: Result<()>) {
    let Err(err) = result else {
        return;
    };

    if !err.is_user_facing() {
        error!(participant = %id, "Update failed: {}", err);
        return;
    }

    info!(participant = %id, "Rejected: {}", err);
    if let Err(send_err) = state.say(id, texts::error_message(&err)).await {
        error!(participant = %id, "Failed to send error reply: {}", send_err);
    }
}

pub fn relay_content(msg: &Message) -> Option<RelayContent> {
    if let Some(text) = msg.text() {
        return Some(RelayContent::text(text));
    }
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some(RelayContent::Photo {
            file_id: photo.file.id.clone(),
            caption: msg.caption().map(str::to_string),
        });
    }
    if let Some(sticker) = msg.sticker() {
        return Some(RelayContent::Sticker {
            file_id: sticker.file.id.clone(),
        });
    }
    msg.voice().map(|voice| RelayContent::Voice {
        file_id: voice.file.id.clone(),
    })
}

pub fn display_name(user: Option<&User>) -> String {
    match user {
        Some(u) => {
            if !u.first_name.is_empty() {
                return u.first_name.clone();
            }
            if let Some(username) = &u.username {
                if !username.is_empty() {
                    return username.clone();
                }
            }
            u.id.0.to_string()
        }
        None => "Stranger".to_string(),
    }
}

impl BotState {
    /// Send a bot-authored text over the chat channel.
    async fn say(&self, to: ParticipantId, text: impl Into<String>) -> Result<()> {
        self.chat
            .deliver(&Endpoint::Chat(to), &RelayContent::text(text))
            .await
            .map_err(|err| Error::DeliveryFailed {
                permanent: err.is_permanent(),
                reason: err.reason().to_string(),
            })
    }
}
