use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Duration;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("THOUGHTS_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("THOUGHTS_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let port: u16 = lookup("THOUGHTS_PORT")
            .unwrap_or_else(|| "3001".into())
            .parse()
            .context("THOUGHTS_PORT must be a port number")?;

        // 2 hours
        let ttl_secs: i64 = lookup("THOUGHTS_TOKEN_TTL_SECS")
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("THOUGHTS_TOKEN_TTL_SECS must be a number of seconds")?
            .unwrap_or(7200);
        let token_ttl = Duration::try_seconds(ttl_secs)
            .filter(|ttl| *ttl > Duration::zero())
            .filter(|ttl| chrono::Utc::now().checked_add_signed(*ttl).is_some())
            .with_context(|| {
                format!("THOUGHTS_TOKEN_TTL_SECS must be a positive, representable lifetime, got {}", ttl_secs)
            })?;

        Ok(Self {
            host: lookup("THOUGHTS_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: lookup("THOUGHTS_DB_PATH")
                .unwrap_or_else(|| "thoughts.db".into())
                .into(),
            jwt_secret,
            token_ttl,
        })
    }
}
