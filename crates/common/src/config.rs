use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Seconds to wait for a free pool connection (default: 5)
    pub db_acquire_timeout_secs: u64,

    /// Seconds between scheduler ticks (default: 60)
    pub scheduler_tick_secs: u64,

    /// Maximum scheduled entries claimed per tick (default: 100)
    pub scheduler_batch_size: i64,

    /// Maximum in-flight dispatches during bulk fan-out (default: 8)
    pub dispatch_concurrency: usize,

    /// SMS gateway endpoint
    pub sms_api_url: Option<String>,

    /// SMS gateway API key
    pub sms_api_key: Option<String>,

    /// SMS sender line
    pub sms_from: Option<String>,

    /// Telegram bot token
    pub telegram_bot_token: Option<String>,

    /// Resend API key for email delivery
    pub resend_api_key: Option<String>,

    /// Email sender address
    pub email_from: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            db_acquire_timeout_secs: std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_ACQUIRE_TIMEOUT_SECS must be a valid u64"))?,
            scheduler_tick_secs: std::env::var("SCHEDULER_TICK_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SCHEDULER_TICK_SECS must be a valid u64"))?,
            scheduler_batch_size: std::env::var("SCHEDULER_BATCH_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SCHEDULER_BATCH_SIZE must be a valid i64"))?,
            dispatch_concurrency: std::env::var("DISPATCH_CONCURRENCY")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DISPATCH_CONCURRENCY must be a valid usize"))?,
            sms_api_url: std::env::var("SMS_API_URL").ok(),
            sms_api_key: std::env::var("SMS_API_KEY").ok(),
            sms_from: std::env::var("SMS_FROM").ok(),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            email_from: std::env::var("EMAIL_FROM").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_defaults_applied() {
        unsafe {
            std::env::set_var("DATABASE_URL", "postgres://localhost/courier");
            std::env::remove_var("DB_MAX_CONNECTIONS");
            std::env::remove_var("DB_ACQUIRE_TIMEOUT_SECS");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.db_max_connections, 20);
        assert_eq!(config.db_acquire_timeout_secs, 5);
        assert_eq!(config.scheduler_tick_secs, 60);
    }
}
