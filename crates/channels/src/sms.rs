//! SMS sender backed by an HTTP gateway.
//!
//! The gateway contract is a JSON POST with an API-key header; any non-2xx
//! response or gateway-reported error becomes a [`SendError`] carrying the
//! provider detail.

use serde::Deserialize;
use serde_json::json;

use async_trait::async_trait;
use courier_common::types::Channel;

use crate::{ChannelSender, SendError};

/// SMS gateway sender.
pub struct SmsSender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: Option<String>,
}

/// Gateway response body. `status` is "ok" on success; failures carry a
/// human-readable `error` detail.
#[derive(Debug, Deserialize)]
struct GatewayResponse {
    status: String,
    error: Option<String>,
}

impl SmsSender {
    pub fn new(api_url: String, api_key: String, from: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl ChannelSender for SmsSender {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), SendError> {
        let body = json!({
            "to": recipient,
            "from": self.from,
            "message": message,
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("X-API-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SendError::new(format!(
                "SMS gateway returned {}: {}",
                status, detail
            )));
        }

        let parsed: GatewayResponse = response.json().await?;
        if parsed.status != "ok" {
            return Err(SendError::new(
                parsed
                    .error
                    .unwrap_or_else(|| "SMS sending failed".to_string()),
            ));
        }

        tracing::info!(recipient = %recipient, "SMS sent");
        Ok(())
    }

    fn channel(&self) -> Channel {
        Channel::Sms
    }
}
