//! Bot command set

use teloxide::utils::command::BotCommands;

use crate::pairing::ParticipantId;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "start the bot (optionally with a referral code)")]
    Start(String),
    #[command(description = "show this help")]
    Help,
    #[command(description = "find an anonymous partner")]
    Search,
    #[command(description = "leave the current chat or search")]
    Stop,
    #[command(description = "stop searching")]
    Cancel,
    #[command(description = "claim the daily bonus")]
    Bonus,
    #[command(description = "show your status and remaining matches")]
    Profile,
    #[command(description = "get your referral link")]
    Referral,
}

impl Command {
    /// Metric label for the handler serving this command.
    pub fn handler_name(&self) -> &'static str {
        match self {
            Command::Start(_) => "start",
            Command::Help => "help",
            Command::Search => "search",
            Command::Stop => "stop",
            Command::Cancel => "cancel",
            Command::Bonus => "bonus",
            Command::Profile => "profile",
            Command::Referral => "referral",
        }
    }
}

/// Extract the referrer from a `/start ref_<id>` deep-link payload.
pub fn parse_referral(payload: &str) -> Option<ParticipantId> {
    payload
        .trim()
        .strip_prefix("ref_")
        .and_then(|id| id.parse::<i64>().ok())
        .map(ParticipantId)
}
