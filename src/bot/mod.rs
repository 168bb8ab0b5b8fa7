//! Telegram front-end: dispatcher wiring, commands and replies.

pub mod commands;
pub mod handlers;
pub mod telegram;
pub mod texts;

use std::net::SocketAddr;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::config::Config;
use crate::metrics;
use crate::pairing::PairingDirectory;
use crate::relay::{Relay, SessionHub, Transport};

pub use commands::Command;
pub use telegram::TelegramTransport;

/// Shared state handed to every update handler.
#[derive(Clone)]
pub struct BotState {
    pub directory: Arc<PairingDirectory>,
    pub relay: Arc<Relay>,
    pub chat: Arc<dyn Transport>,
    pub config: Arc<Config>,
}

impl BotState {
    pub fn new(config: Config, chat: Arc<dyn Transport>, sessions: Arc<SessionHub>) -> Self {
        let directory = Arc::new(PairingDirectory::new(config.quota_policy()));
        let relay = Relay::new(directory.clone(), chat.clone()).with_sessions(sessions);
        Self {
            directory,
            relay: Arc::new(relay),
            chat,
            config: Arc::new(config),
        }
    }
}

/// Run the bot with long polling until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    info!(
        token = %config.masked_token(),
        initial_quota = config.initial_quota,
        daily_bonus = config.daily_bonus,
        referral_bonus = config.referral_bonus,
        admins = config.admin_ids.len(),
        "Starting Secret Dating Bot"
    );

    let bot = Bot::new(config.bot_token.clone());
    let chat: Arc<dyn Transport> = Arc::new(TelegramTransport::new(bot.clone()));
    let sessions = Arc::new(SessionHub::default());
    let metrics_addr = config.metrics_addr.clone();
    let state = BotState::new(config, chat, sessions);

    if let Some(addr) = metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket, state.directory.clone()),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", err);
    }

    let handler = Update::filter_message()
        .branch(dptree::entry().filter_command::<Command>().endpoint({
            let state = state.clone();
            move |msg: Message, cmd: Command| handlers::handle_command(msg, cmd, state.clone())
        }))
        .branch(dptree::endpoint({
            let state = state.clone();
            move |msg: Message| handlers::handle_message(msg, state.clone())
        }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");
    Ok(())
}
