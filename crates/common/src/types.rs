use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Delivery channel for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Telegram,
    Email,
    /// In-app inbox entry, owned by a user.
    Notification,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Sms => write!(f, "sms"),
            Channel::Telegram => write!(f, "telegram"),
            Channel::Email => write!(f, "email"),
            Channel::Notification => write!(f, "notification"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sms" => Ok(Channel::Sms),
            "telegram" => Ok(Channel::Telegram),
            "email" => Ok(Channel::Email),
            "notification" => Ok(Channel::Notification),
            other => Err(AppError::Validation(format!(
                "Unknown channel '{}'. Valid channels: sms, telegram, email, notification",
                other
            ))),
        }
    }
}

/// Delivery status of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Pending => write!(f, "pending"),
            DeliveryStatus::Sent => write!(f, "sent"),
            DeliveryStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One delivery attempt and its full lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationLog {
    pub id: i64,
    pub channel: Channel,
    pub recipient: String,
    pub message: String,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    /// When present and in the future, dispatch is deferred to the scheduler.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Scheduler claim marker; a claimed row is no longer claimable.
    pub claimed_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    /// Owning user, set iff `channel == Notification`.
    pub user_id: Option<String>,
    pub is_read: bool,
    pub title: Option<String>,
    pub link: Option<String>,
}

/// A recipient identifier, classified once by the resolver so downstream
/// code never re-parses the raw string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RecipientAddress {
    Phone(String),
    Email(String),
    UserId(String),
}

impl RecipientAddress {
    /// Classify a raw recipient string by shape: digits-only (optional
    /// leading `+`) is a phone number, anything containing `@` is an email
    /// address, everything else is an opaque user id.
    ///
    /// Returns `None` for blank input.
    pub fn detect(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.contains('@') {
            return Some(RecipientAddress::Email(trimmed.to_string()));
        }

        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return Some(RecipientAddress::Phone(trimmed.to_string()));
        }

        Some(RecipientAddress::UserId(trimmed.to_string()))
    }

    /// The raw address string handed to a channel sender.
    pub fn as_str(&self) -> &str {
        match self {
            RecipientAddress::Phone(s) => s,
            RecipientAddress::Email(s) => s,
            RecipientAddress::UserId(s) => s,
        }
    }

    /// Whether this address shape is deliverable on the given channel.
    pub fn fits_channel(&self, channel: Channel) -> bool {
        matches!(
            (self, channel),
            (RecipientAddress::Phone(_), Channel::Sms)
                | (RecipientAddress::Phone(_), Channel::Telegram)
                | (RecipientAddress::Email(_), Channel::Email)
                | (RecipientAddress::UserId(_), Channel::Notification)
        )
    }
}

impl std::fmt::Display for RecipientAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A logical bulk-send audience, expanded by the resolver at send time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    All,
    Customers,
    Experts,
    Admins,
    /// Explicit raw recipients, one per line in the original request.
    Custom(Vec<String>),
}

impl Audience {
    /// Parse a symbolic audience name.
    pub fn symbolic(s: &str) -> Result<Self, AppError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Audience::All),
            "customers" => Ok(Audience::Customers),
            "experts" => Ok(Audience::Experts),
            "admins" => Ok(Audience::Admins),
            other => Err(AppError::Validation(format!(
                "Unknown audience '{}'. Valid audiences: all, customers, experts, admins",
                other
            ))),
        }
    }

    /// Build a custom audience from a newline-delimited recipient list.
    /// Blank lines are skipped.
    pub fn custom_from_lines(text: &str) -> Self {
        Audience::Custom(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

/// Inbox listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboxFilter {
    #[default]
    All,
    Unread,
    Read,
}

/// Aggregate delivery counts over a creation-date range.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationStats {
    pub total: i64,
    pub sent: i64,
    pub failed: i64,
    pub pending: i64,
    pub sms_sent: i64,
    pub telegram_sent: i64,
    pub email_sent: i64,
    pub notification_sent: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_from_str() {
        assert_eq!("sms".parse::<Channel>().unwrap(), Channel::Sms);
        assert_eq!("Telegram".parse::<Channel>().unwrap(), Channel::Telegram);
        assert_eq!(" email ".parse::<Channel>().unwrap(), Channel::Email);
        assert_eq!(
            "notification".parse::<Channel>().unwrap(),
            Channel::Notification
        );
        assert!("push".parse::<Channel>().is_err());
    }

    #[test]
    fn test_detect_phone() {
        assert_eq!(
            RecipientAddress::detect("09120000000"),
            Some(RecipientAddress::Phone("09120000000".to_string()))
        );
        assert_eq!(
            RecipientAddress::detect("+989120000000"),
            Some(RecipientAddress::Phone("+989120000000".to_string()))
        );
    }

    #[test]
    fn test_detect_email() {
        assert_eq!(
            RecipientAddress::detect("user@example.com"),
            Some(RecipientAddress::Email("user@example.com".to_string()))
        );
    }

    #[test]
    fn test_detect_user_id() {
        assert_eq!(
            RecipientAddress::detect("user-42"),
            Some(RecipientAddress::UserId("user-42".to_string()))
        );
        // A bare "+" is not a phone number
        assert_eq!(
            RecipientAddress::detect("+"),
            Some(RecipientAddress::UserId("+".to_string()))
        );
    }

    #[test]
    fn test_detect_blank() {
        assert_eq!(RecipientAddress::detect("   "), None);
        assert_eq!(RecipientAddress::detect(""), None);
    }

    #[test]
    fn test_fits_channel() {
        let phone = RecipientAddress::Phone("0912".into());
        assert!(phone.fits_channel(Channel::Sms));
        assert!(phone.fits_channel(Channel::Telegram));
        assert!(!phone.fits_channel(Channel::Email));
        assert!(!phone.fits_channel(Channel::Notification));

        let email = RecipientAddress::Email("a@b.c".into());
        assert!(email.fits_channel(Channel::Email));
        assert!(!email.fits_channel(Channel::Sms));

        let uid = RecipientAddress::UserId("u1".into());
        assert!(uid.fits_channel(Channel::Notification));
        assert!(!uid.fits_channel(Channel::Telegram));
    }

    #[test]
    fn test_audience_symbolic() {
        assert_eq!(Audience::symbolic("all").unwrap(), Audience::All);
        assert_eq!(Audience::symbolic("Experts").unwrap(), Audience::Experts);
        assert!(Audience::symbolic("robots").is_err());
    }

    #[test]
    fn test_audience_custom_from_lines() {
        let audience = Audience::custom_from_lines("0912000\n\n  a@b.c  \n");
        assert_eq!(
            audience,
            Audience::Custom(vec!["0912000".to_string(), "a@b.c".to_string()])
        );
    }
}
