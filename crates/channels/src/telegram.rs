//! Telegram sender using the Bot API `sendMessage` method.

use serde::Deserialize;
use serde_json::json;

use async_trait::async_trait;
use courier_common::types::Channel;

use crate::{ChannelSender, SendError};

/// Telegram Bot API sender. The recipient is a chat id.
pub struct TelegramSender {
    client: reqwest::Client,
    bot_token: String,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramSender {
    pub fn new(bot_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token,
        }
    }

    fn api_url(&self) -> String {
        format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token)
    }
}

#[async_trait]
impl ChannelSender for TelegramSender {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), SendError> {
        let response = self
            .client
            .post(self.api_url())
            .json(&json!({
                "chat_id": recipient,
                "text": message,
            }))
            .send()
            .await?;

        let parsed: TelegramResponse = response.json().await?;
        if !parsed.ok {
            return Err(SendError::new(
                parsed
                    .description
                    .unwrap_or_else(|| "Telegram sending failed".to_string()),
            ));
        }

        tracing::info!(chat_id = %recipient, "Telegram message sent");
        Ok(())
    }

    fn channel(&self) -> Channel {
        Channel::Telegram
    }
}
