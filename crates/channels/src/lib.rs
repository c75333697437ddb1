//! Channel transports.
//!
//! Each delivery medium implements the [`ChannelSender`] trait; the
//! [`registry::ChannelRegistry`] maps a [`Channel`] to its sender so the
//! dispatcher stays channel-agnostic and new channels plug in without
//! touching dispatch logic.

pub mod email;
pub mod inapp;
pub mod mock;
pub mod registry;
pub mod sms;
pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;

use courier_common::types::Channel;

pub use registry::ChannelRegistry;

/// A provider-reported delivery failure.
///
/// The display string is what gets persisted into a log row's
/// `error_message`; it is data, not a control-flow fault, and is never
/// propagated to callers as an application error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SendError(pub String);

impl SendError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

impl From<reqwest::Error> for SendError {
    fn from(err: reqwest::Error) -> Self {
        Self(err.to_string())
    }
}

/// A single-channel delivery capability.
///
/// Implementations are expected to return or time out on their own; the
/// dispatcher records whatever they report and never interrupts an
/// in-flight send.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Deliver `message` to `recipient` (a channel-specific address).
    async fn send(&self, recipient: &str, message: &str) -> Result<(), SendError>;

    /// The channel this sender serves.
    fn channel(&self) -> Channel;
}
