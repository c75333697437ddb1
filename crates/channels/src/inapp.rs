//! In-app sender.
//!
//! For the `notification` channel the log row itself IS the inbox item:
//! creation already made it visible to the owning user, so "sending" has no
//! external transport and always succeeds. The sender exists so the
//! dispatcher treats every channel uniformly.

use async_trait::async_trait;
use courier_common::types::Channel;

use crate::{ChannelSender, SendError};

/// In-app inbox sender. The recipient is the owning user's id.
pub struct InAppSender;

impl InAppSender {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InAppSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelSender for InAppSender {
    async fn send(&self, recipient: &str, _message: &str) -> Result<(), SendError> {
        tracing::debug!(user_id = %recipient, "In-app notification delivered");
        Ok(())
    }

    fn channel(&self) -> Channel {
        Channel::Notification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_app_always_succeeds() {
        let sender = InAppSender::new();
        assert!(sender.send("42", "hello").await.is_ok());
        assert_eq!(sender.channel(), Channel::Notification);
    }
}
