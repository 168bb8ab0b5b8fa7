//! Bot-chat transport backed by the Telegram Bot API

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use teloxide::{ApiError, RequestError};

use crate::relay::{DeliveryError, Endpoint, RelayContent, Transport};

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Errors meaning the user is gone for good; everything else may recover.
pub fn classify_request_error(err: RequestError) -> DeliveryError {
    match err {
        RequestError::Api(
            ApiError::BotBlocked
            | ApiError::BotKicked
            | ApiError::UserDeactivated
            | ApiError::ChatNotFound,
        ) => DeliveryError::Permanent(err.to_string()),
        other => DeliveryError::Transient(other.to_string()),
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn deliver(
        &self,
        endpoint: &Endpoint,
        content: &RelayContent,
    ) -> Result<(), DeliveryError> {
        let Endpoint::Chat(participant) = endpoint else {
            return Err(DeliveryError::Permanent(
                "telegram transport only serves chat endpoints".into(),
            ));
        };
        let chat_id = ChatId(participant.0);

        let sent = match content {
            RelayContent::Text { text } => self.bot.send_message(chat_id, text.clone()).await,
            RelayContent::Photo { file_id, caption } => {
                let mut request = self
                    .bot
                    .send_photo(chat_id, InputFile::file_id(file_id.clone()));
                if let Some(caption) = caption {
                    request = request.caption(caption.clone());
                }
                request.await
            }
            RelayContent::Sticker { file_id } => {
                self.bot
                    .send_sticker(chat_id, InputFile::file_id(file_id.clone()))
                    .await
            }
            RelayContent::Voice { file_id } => {
                self.bot
                    .send_voice(chat_id, InputFile::file_id(file_id.clone()))
                    .await
            }
        };

        sent.map(|_| ()).map_err(classify_request_error)
    }
}
