//! Email sender using the Resend HTTP API.

use serde::Deserialize;
use serde_json::json;

use async_trait::async_trait;
use courier_common::types::Channel;

use crate::{ChannelSender, SendError};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Maximum length of a subject derived from the message body.
const MAX_SUBJECT_LEN: usize = 80;

/// Resend API email sender.
pub struct EmailSender {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

#[derive(Debug, Deserialize)]
struct ResendError {
    message: Option<String>,
}

impl EmailSender {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

/// Derive a subject line from the first line of the message body.
pub(crate) fn subject_from_message(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        return "Notification".to_string();
    }
    first_line.chars().take(MAX_SUBJECT_LEN).collect()
}

#[async_trait]
impl ChannelSender for EmailSender {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), SendError> {
        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [recipient],
                "subject": subject_from_message(message),
                "text": message,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ResendError>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("Email API returned {}", status));
            return Err(SendError::new(detail));
        }

        tracing::info!(recipient = %recipient, "Email sent");
        Ok(())
    }

    fn channel(&self) -> Channel {
        Channel::Email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_is_first_line() {
        assert_eq!(
            subject_from_message("Your inquiry was approved\nDetails inside."),
            "Your inquiry was approved"
        );
    }

    #[test]
    fn test_subject_truncated() {
        let long = "x".repeat(200);
        assert_eq!(subject_from_message(&long).chars().count(), MAX_SUBJECT_LEN);
    }

    #[test]
    fn test_subject_fallback_for_blank_message() {
        assert_eq!(subject_from_message("\n\n"), "Notification");
    }
}
