//! Channel registry, keyed by [`Channel`].
//!
//! Holds no delivery state; it only resolves a channel identifier to the
//! sender capability registered for it.

use std::collections::HashMap;
use std::sync::Arc;

use courier_common::config::AppConfig;
use courier_common::types::Channel;

use crate::email::EmailSender;
use crate::inapp::InAppSender;
use crate::sms::SmsSender;
use crate::telegram::TelegramSender;
use crate::ChannelSender;

/// Registry of channel senders, used by the dispatcher.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    senders: HashMap<Channel, Arc<dyn ChannelSender>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            senders: HashMap::new(),
        }
    }

    /// Build a registry from configured transports.
    ///
    /// A channel whose credentials are missing is simply not registered;
    /// dispatching to it marks the entry failed with "unknown channel".
    /// The in-app sender needs no external transport and is always present.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(InAppSender::new()));

        if let (Some(url), Some(key)) = (&config.sms_api_url, &config.sms_api_key) {
            registry.register(Arc::new(SmsSender::new(
                url.clone(),
                key.clone(),
                config.sms_from.clone(),
            )));
        }

        if let Some(token) = &config.telegram_bot_token {
            registry.register(Arc::new(TelegramSender::new(token.clone())));
        }

        if let (Some(key), Some(from)) = (&config.resend_api_key, &config.email_from) {
            registry.register(Arc::new(EmailSender::new(key.clone(), from.clone())));
        }

        tracing::info!(channels = ?registry.channels(), "Channel registry built");
        registry
    }

    /// Register a sender under the channel it reports via
    /// [`ChannelSender::channel`]. Re-registering a channel replaces the
    /// previous sender.
    pub fn register(&mut self, sender: Arc<dyn ChannelSender>) {
        self.senders.insert(sender.channel(), sender);
    }

    /// Resolve the sender for a channel.
    pub fn resolve(&self, channel: Channel) -> Option<Arc<dyn ChannelSender>> {
        self.senders.get(&channel).cloned()
    }

    /// Channels with a registered sender.
    pub fn channels(&self) -> Vec<Channel> {
        self.senders.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSender;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ChannelRegistry::new();
        registry.register(Arc::new(MockSender::new(Channel::Sms)));

        assert!(registry.resolve(Channel::Sms).is_some());
        assert!(registry.resolve(Channel::Email).is_none());
    }

    #[test]
    fn test_reregister_replaces() {
        let mut registry = ChannelRegistry::new();
        let first = Arc::new(MockSender::new(Channel::Sms));
        let second = Arc::new(MockSender::new(Channel::Sms));
        registry.register(first.clone());
        registry.register(second.clone());

        let resolved = registry.resolve(Channel::Sms).unwrap();
        assert_eq!(resolved.channel(), Channel::Sms);
        assert_eq!(registry.channels().len(), 1);
    }
}
