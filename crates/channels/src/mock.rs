//! Scriptable sender for tests.
//!
//! Delivery outcome is set per test (`fail_with` / `succeed`) and every
//! `send` call is counted, which is what the dispatcher/scheduler race
//! tests assert on.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use courier_common::types::Channel;

use crate::{ChannelSender, SendError};

/// Test sender with a scriptable outcome.
pub struct MockSender {
    channel: Channel,
    fail_with: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl MockSender {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            fail_with: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make subsequent sends fail with the given provider detail.
    pub fn fail_with(&self, detail: impl Into<String>) {
        *self.fail_with.lock().unwrap() = Some(detail.into());
    }

    /// Make subsequent sends succeed.
    pub fn succeed(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    /// Number of times `send` was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelSender for MockSender {
    async fn send(&self, _recipient: &str, _message: &str) -> Result<(), SendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with.lock().unwrap().clone() {
            Some(detail) => Err(SendError::new(detail)),
            None => Ok(()),
        }
    }

    fn channel(&self) -> Channel {
        self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_outcomes() {
        let sender = MockSender::new(Channel::Sms);
        assert!(sender.send("0912", "hi").await.is_ok());

        sender.fail_with("timeout");
        assert_eq!(
            sender.send("0912", "hi").await,
            Err(SendError::new("timeout"))
        );

        sender.succeed();
        assert!(sender.send("0912", "hi").await.is_ok());
        assert_eq!(sender.calls(), 3);
    }
}
