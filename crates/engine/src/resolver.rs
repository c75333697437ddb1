//! Recipient resolver — expands a logical audience into concrete
//! per-channel recipient addresses.
//!
//! Symbolic audiences (`all`, `customers`, `experts`, `admins`) are expanded
//! against the external user directory at resolution time, never cached, so
//! fan-out always reflects current membership. Custom lists are
//! shape-classified once into [`RecipientAddress`] values and routed to the
//! channels their shape fits.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use courier_common::error::AppError;
use courier_common::types::{Audience, Channel, RecipientAddress};

/// A directory entry with the per-channel identifiers the engine cares about.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DirectoryUser {
    pub id: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// External user directory collaborator.
///
/// The engine never decides who the business recipients are; it only asks
/// the directory to expand a symbolic audience.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn users_in_audience(&self, audience: &Audience) -> Result<Vec<DirectoryUser>, AppError>;
}

/// Default directory implementation over the `users` table.
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn role_filter(audience: &Audience) -> Option<&'static str> {
        match audience {
            Audience::All => None,
            Audience::Customers => Some("customer"),
            Audience::Experts => Some("expert"),
            Audience::Admins => Some("admin"),
            Audience::Custom(_) => None,
        }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn users_in_audience(&self, audience: &Audience) -> Result<Vec<DirectoryUser>, AppError> {
        // Custom lists never touch the directory.
        if matches!(audience, Audience::Custom(_)) {
            return Ok(Vec::new());
        }

        let users: Vec<DirectoryUser> = sqlx::query_as(
            r#"
            SELECT id, phone, email FROM users
            WHERE ($1::text IS NULL OR role = $1)
            ORDER BY id
            "#,
        )
        .bind(Self::role_filter(audience))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

/// Resolves audiences into per-channel recipient sets.
pub struct RecipientResolver {
    directory: Arc<dyn UserDirectory>,
}

impl RecipientResolver {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Expand `audience` for each requested channel.
    ///
    /// Every requested channel appears in the result, possibly with an
    /// empty set — an empty audience is "zero messages", not an error.
    /// Recipients are deduplicated per channel, preserving first-seen
    /// order, since duplicate delivery is wasted cost and can trip
    /// provider rate limits.
    pub async fn resolve(
        &self,
        audience: &Audience,
        channels: &[Channel],
    ) -> Result<HashMap<Channel, Vec<RecipientAddress>>, AppError> {
        let mut result: HashMap<Channel, Vec<RecipientAddress>> = channels
            .iter()
            .map(|&channel| (channel, Vec::new()))
            .collect();

        match audience {
            Audience::Custom(lines) => {
                let addresses: Vec<RecipientAddress> = lines
                    .iter()
                    .filter_map(|line| RecipientAddress::detect(line))
                    .collect();

                for (&channel, recipients) in result.iter_mut() {
                    *recipients = dedup_preserving_order(
                        addresses
                            .iter()
                            .filter(|addr| addr.fits_channel(channel))
                            .cloned(),
                    );
                }
            }
            symbolic => {
                let users = self.directory.users_in_audience(symbolic).await?;

                for (&channel, recipients) in result.iter_mut() {
                    *recipients = dedup_preserving_order(
                        users.iter().filter_map(|user| address_for(user, channel)),
                    );
                }
            }
        }

        Ok(result)
    }
}

/// Pick the identifier a directory user is reachable at on a channel.
/// Users missing that identifier are skipped.
fn address_for(user: &DirectoryUser, channel: Channel) -> Option<RecipientAddress> {
    match channel {
        Channel::Sms | Channel::Telegram => {
            user.phone.as_deref().map(|p| RecipientAddress::Phone(p.to_string()))
        }
        Channel::Email => user
            .email
            .as_deref()
            .map(|e| RecipientAddress::Email(e.to_string())),
        Channel::Notification => Some(RecipientAddress::UserId(user.id.clone())),
    }
}

fn dedup_preserving_order(
    addresses: impl Iterator<Item = RecipientAddress>,
) -> Vec<RecipientAddress> {
    let mut seen = HashSet::new();
    addresses.filter(|addr| seen.insert(addr.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubDirectory {
        users: Vec<DirectoryUser>,
    }

    #[async_trait]
    impl UserDirectory for StubDirectory {
        async fn users_in_audience(
            &self,
            _audience: &Audience,
        ) -> Result<Vec<DirectoryUser>, AppError> {
            Ok(self.users.clone())
        }
    }

    fn user(id: &str, phone: Option<&str>, email: Option<&str>) -> DirectoryUser {
        DirectoryUser {
            id: id.to_string(),
            phone: phone.map(str::to_string),
            email: email.map(str::to_string),
        }
    }

    fn resolver(users: Vec<DirectoryUser>) -> RecipientResolver {
        RecipientResolver::new(Arc::new(StubDirectory { users }))
    }

    #[tokio::test]
    async fn test_symbolic_audience_per_channel_identifiers() {
        let resolver = resolver(vec![
            user("u1", Some("0912000001"), Some("one@example.com")),
            user("u2", Some("0912000002"), None),
            user("u3", None, Some("three@example.com")),
        ]);

        let resolved = resolver
            .resolve(
                &Audience::Customers,
                &[Channel::Sms, Channel::Email, Channel::Notification],
            )
            .await
            .unwrap();

        assert_eq!(
            resolved[&Channel::Sms],
            vec![
                RecipientAddress::Phone("0912000001".into()),
                RecipientAddress::Phone("0912000002".into()),
            ]
        );
        assert_eq!(
            resolved[&Channel::Email],
            vec![
                RecipientAddress::Email("one@example.com".into()),
                RecipientAddress::Email("three@example.com".into()),
            ]
        );
        assert_eq!(
            resolved[&Channel::Notification],
            vec![
                RecipientAddress::UserId("u1".into()),
                RecipientAddress::UserId("u2".into()),
                RecipientAddress::UserId("u3".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicates_removed_per_channel() {
        // Two users sharing one phone line
        let resolver = resolver(vec![
            user("u1", Some("0912000001"), None),
            user("u2", Some("0912000001"), None),
        ]);

        let resolved = resolver
            .resolve(&Audience::All, &[Channel::Sms])
            .await
            .unwrap();

        assert_eq!(resolved[&Channel::Sms].len(), 1);
    }

    #[tokio::test]
    async fn test_empty_audience_yields_empty_sets() {
        let resolver = resolver(vec![]);

        let resolved = resolver
            .resolve(&Audience::Experts, &[Channel::Sms, Channel::Email])
            .await
            .unwrap();

        assert_eq!(resolved.len(), 2);
        assert!(resolved.values().all(Vec::is_empty));
    }

    #[tokio::test]
    async fn test_custom_list_routed_by_shape() {
        let resolver = resolver(vec![]);
        let audience = Audience::custom_from_lines(
            "09120000000\nsomeone@example.com\nuser-7\n09120000000\n",
        );

        let resolved = resolver
            .resolve(
                &audience,
                &[Channel::Sms, Channel::Telegram, Channel::Email, Channel::Notification],
            )
            .await
            .unwrap();

        // The duplicate phone collapses; phones serve both sms and telegram
        assert_eq!(
            resolved[&Channel::Sms],
            vec![RecipientAddress::Phone("09120000000".into())]
        );
        assert_eq!(
            resolved[&Channel::Telegram],
            vec![RecipientAddress::Phone("09120000000".into())]
        );
        assert_eq!(
            resolved[&Channel::Email],
            vec![RecipientAddress::Email("someone@example.com".into())]
        );
        assert_eq!(
            resolved[&Channel::Notification],
            vec![RecipientAddress::UserId("user-7".into())]
        );
    }
}
