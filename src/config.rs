use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// SMTP settings taken from the environment. Used when no email
/// configuration has been stored through the API yet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailConfig {
    pub server: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub admin_email: Option<String>,
    pub timeout_secs: u64,
}

/// When a low-stock alert fires after a subtractive movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertTrigger {
    /// Only when the movement takes stock from above the minimum to at or below it.
    Edge,
    /// On every movement that leaves stock at or below the minimum.
    Level,
}

impl FromStr for AlertTrigger {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edge" => Ok(Self::Edge),
            "level" => Ok(Self::Level),
            other => anyhow::bail!("unknown LOW_STOCK_TRIGGER value: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub low_stock_trigger: AlertTrigger,
    pub daily_summary_enabled: bool,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "stockroom".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "stockroom-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let mail = MailConfig {
            server: env_opt("MAIL_SERVER"),
            port: env_or("MAIL_PORT", 587),
            username: env_opt("MAIL_USERNAME"),
            password: env_opt("MAIL_PASSWORD"),
            from: env_opt("MAIL_FROM"),
            admin_email: env_opt("ADMIN_EMAIL"),
            timeout_secs: env_or("MAIL_TIMEOUT_SECS", 10),
        };
        let low_stock_trigger = match env_opt("LOW_STOCK_TRIGGER") {
            Some(v) => v.parse()?,
            None => AlertTrigger::Edge,
        };

        Ok(Self {
            database_url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080),
            jwt,
            mail,
            low_stock_trigger,
            daily_summary_enabled: env_or("DAILY_SUMMARY_ENABLED", true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_trigger_parses_case_insensitively() {
        assert_eq!("edge".parse::<AlertTrigger>().unwrap(), AlertTrigger::Edge);
        assert_eq!(" LEVEL ".parse::<AlertTrigger>().unwrap(), AlertTrigger::Level);
        assert!("sometimes".parse::<AlertTrigger>().is_err());
    }

    #[test]
    fn env_or_falls_back_on_garbage() {
        std::env::set_var("STOCKROOM_TEST_PORT", "not-a-number");
        assert_eq!(env_or::<u16>("STOCKROOM_TEST_PORT", 587), 587);
        std::env::set_var("STOCKROOM_TEST_PORT", "2525");
        assert_eq!(env_or::<u16>("STOCKROOM_TEST_PORT", 587), 2525);
    }
}
