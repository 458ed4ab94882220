use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, Time};
use uuid::Uuid;

use super::repo_types::{EmailConfig, DEFAULT_SMTP_PORT};
use crate::{
    auth::validation::{is_valid_email, normalize_email},
    error::AppError,
};

pub const DEFAULT_SUMMARY_TIME: &str = "18:00";

lazy_static! {
    static ref HHMM_RE: Regex = Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").unwrap();
}

/// Parse a 24h `HH:MM` time of day.
pub fn parse_summary_time(raw: &str) -> Option<Time> {
    let caps = HHMM_RE.captures(raw.trim())?;
    let hour = caps[1].parse().ok()?;
    let minute = caps[2].parse().ok()?;
    Time::from_hms(hour, minute, 0).ok()
}

fn summary_time(raw: &str) -> Result<String, AppError> {
    let raw = raw.trim();
    if parse_summary_time(raw).is_none() {
        return Err(AppError::validation("Daily summary time must be in HH:MM format"));
    }
    Ok(raw.to_string())
}

fn optional_email(field: &str, raw: Option<String>) -> Result<Option<String>, AppError> {
    match raw.map(|v| normalize_email(&v)).filter(|v| !v.is_empty()) {
        Some(v) if !is_valid_email(&v) => Err(AppError::validation(format!("Invalid {field}"))),
        other => Ok(other),
    }
}

/// Stored configuration as returned to clients. The password never leaves
/// the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfigDto {
    pub id: Uuid,
    pub mail_username: String,
    pub mail_server: String,
    pub mail_port: i32,
    pub mail_from: Option<String>,
    pub test_email: Option<String>,
    pub has_password: bool,
    pub enable_low_stock_alerts: bool,
    pub enable_out_of_stock_alerts: bool,
    pub enable_transaction_receipts: bool,
    pub enable_daily_summary: bool,
    pub daily_summary_time: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<EmailConfig> for EmailConfigDto {
    fn from(c: EmailConfig) -> Self {
        Self {
            has_password: !c.mail_password.is_empty(),
            id: c.id,
            mail_username: c.mail_username,
            mail_server: c.mail_server,
            mail_port: c.mail_port,
            mail_from: c.mail_from,
            test_email: c.test_email,
            enable_low_stock_alerts: c.enable_low_stock_alerts,
            enable_out_of_stock_alerts: c.enable_out_of_stock_alerts,
            enable_transaction_receipts: c.enable_transaction_receipts,
            enable_daily_summary: c.enable_daily_summary,
            daily_summary_time: c.daily_summary_time,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEmailConfigRequest {
    pub mail_username: String,
    pub mail_password: Option<String>,
    pub mail_server: String,
    pub mail_port: Option<u16>,
    pub mail_from: Option<String>,
    pub test_email: Option<String>,
    pub enable_low_stock_alerts: Option<bool>,
    pub enable_out_of_stock_alerts: Option<bool>,
    pub enable_transaction_receipts: Option<bool>,
    pub enable_daily_summary: Option<bool>,
    pub daily_summary_time: Option<String>,
}

/// Validated configuration. `mail_password: None` keeps the stored password.
#[derive(Debug, PartialEq)]
pub struct EmailConfigInput {
    pub mail_username: String,
    pub mail_password: Option<String>,
    pub mail_server: String,
    pub mail_port: u16,
    pub mail_from: Option<String>,
    pub test_email: Option<String>,
    pub enable_low_stock_alerts: bool,
    pub enable_out_of_stock_alerts: bool,
    pub enable_transaction_receipts: bool,
    pub enable_daily_summary: bool,
    pub daily_summary_time: String,
}

impl SaveEmailConfigRequest {
    /// `has_stored_password` tells whether an omitted password is acceptable.
    pub fn validate(self, has_stored_password: bool) -> Result<EmailConfigInput, AppError> {
        let mail_username = self.mail_username.trim().to_string();
        let mail_server = self.mail_server.trim().to_string();
        if mail_username.is_empty() || mail_server.is_empty() {
            return Err(AppError::validation("Mail username and server are required"));
        }
        let mail_password = self.mail_password.filter(|p| !p.is_empty());
        if mail_password.is_none() && !has_stored_password {
            return Err(AppError::validation("Mail password is required"));
        }
        let mail_port = self.mail_port.unwrap_or(DEFAULT_SMTP_PORT);
        if mail_port == 0 {
            return Err(AppError::validation("Mail port must be between 1 and 65535"));
        }

        Ok(EmailConfigInput {
            mail_username,
            mail_password,
            mail_server,
            mail_port,
            mail_from: self
                .mail_from
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty()),
            test_email: optional_email("test email", self.test_email)?,
            enable_low_stock_alerts: self.enable_low_stock_alerts.unwrap_or(true),
            enable_out_of_stock_alerts: self.enable_out_of_stock_alerts.unwrap_or(true),
            enable_transaction_receipts: self.enable_transaction_receipts.unwrap_or(false),
            enable_daily_summary: self.enable_daily_summary.unwrap_or(false),
            daily_summary_time: summary_time(
                self.daily_summary_time.as_deref().unwrap_or(DEFAULT_SUMMARY_TIME),
            )?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEmailRequest {
    #[serde(alias = "email")]
    pub test_email: Option<String>,
}

/// Notification flags exposed by `/notifications/settings`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub enable_low_stock_alerts: bool,
    pub enable_out_of_stock_alerts: bool,
    pub enable_transaction_receipts: bool,
    pub enable_daily_summary: bool,
    pub daily_summary_time: String,
}

impl From<&EmailConfig> for NotificationSettings {
    fn from(c: &EmailConfig) -> Self {
        Self {
            enable_low_stock_alerts: c.enable_low_stock_alerts,
            enable_out_of_stock_alerts: c.enable_out_of_stock_alerts,
            enable_transaction_receipts: c.enable_transaction_receipts,
            enable_daily_summary: c.enable_daily_summary,
            daily_summary_time: c.daily_summary_time.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub enable_low_stock_alerts: Option<bool>,
    pub enable_out_of_stock_alerts: Option<bool>,
    pub enable_transaction_receipts: Option<bool>,
    pub enable_daily_summary: Option<bool>,
    pub daily_summary_time: Option<String>,
}

#[derive(Debug, Default, PartialEq)]
pub struct SettingsChanges {
    pub enable_low_stock_alerts: Option<bool>,
    pub enable_out_of_stock_alerts: Option<bool>,
    pub enable_transaction_receipts: Option<bool>,
    pub enable_daily_summary: Option<bool>,
    pub daily_summary_time: Option<String>,
}

impl UpdateSettingsRequest {
    pub fn validate(self) -> Result<SettingsChanges, AppError> {
        Ok(SettingsChanges {
            enable_low_stock_alerts: self.enable_low_stock_alerts,
            enable_out_of_stock_alerts: self.enable_out_of_stock_alerts,
            enable_transaction_receipts: self.enable_transaction_receipts,
            enable_daily_summary: self.enable_daily_summary,
            daily_summary_time: self.daily_summary_time.as_deref().map(summary_time).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::time;

    use super::*;

    fn request(json: &str) -> SaveEmailConfigRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn summary_time_must_be_hh_mm() {
        assert_eq!(parse_summary_time("18:00"), Some(time!(18:00)));
        assert_eq!(parse_summary_time(" 07:05 "), Some(Time::from_hms(7, 5, 0).unwrap()));
        assert_eq!(parse_summary_time("23:59"), Some(time!(23:59)));
        assert!(parse_summary_time("24:00").is_none());
        assert!(parse_summary_time("7:00").is_none());
        assert!(parse_summary_time("18:60").is_none());
        assert!(parse_summary_time("six pm").is_none());
    }

    #[test]
    fn first_save_requires_password() {
        let json = r#"{"mailUsername":"alerts@example.com","mailServer":"smtp.example.com"}"#;
        assert!(request(json).validate(false).is_err());

        let input = request(json).validate(true).unwrap();
        assert_eq!(input.mail_password, None);
        assert_eq!(input.mail_port, DEFAULT_SMTP_PORT);
        assert_eq!(input.daily_summary_time, DEFAULT_SUMMARY_TIME);
        assert!(input.enable_low_stock_alerts);
        assert!(input.enable_out_of_stock_alerts);
        assert!(!input.enable_daily_summary);
    }

    #[test]
    fn save_rejects_bad_time_and_test_email() {
        let bad_time = r#"{"mailUsername":"u","mailPassword":"p","mailServer":"s",
                           "dailySummaryTime":"25:00"}"#;
        assert!(request(bad_time).validate(false).is_err());

        let bad_email = r#"{"mailUsername":"u","mailPassword":"p","mailServer":"s",
                            "testEmail":"nope"}"#;
        assert!(request(bad_email).validate(false).is_err());
    }

    #[test]
    fn dto_hides_password() {
        let cfg = EmailConfig {
            id: Uuid::new_v4(),
            mail_username: "alerts@example.com".into(),
            mail_password: "hunter2".into(),
            mail_server: "smtp.example.com".into(),
            mail_port: 587,
            mail_from: None,
            test_email: None,
            enable_low_stock_alerts: true,
            enable_out_of_stock_alerts: true,
            enable_transaction_receipts: false,
            enable_daily_summary: false,
            daily_summary_time: "18:00".into(),
            is_active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let v = serde_json::to_value(EmailConfigDto::from(cfg)).unwrap();
        assert!(v.get("mailPassword").is_none());
        assert_eq!(v["hasPassword"], true);
        assert!(!v.to_string().contains("hunter2"));
    }

    #[test]
    fn settings_update_validates_time() {
        let req: UpdateSettingsRequest =
            serde_json::from_str(r#"{"enableDailySummary":true,"dailySummaryTime":"9:00"}"#).unwrap();
        assert!(req.validate().is_err());

        let req: UpdateSettingsRequest =
            serde_json::from_str(r#"{"enableDailySummary":true}"#).unwrap();
        assert_eq!(
            req.validate().unwrap(),
            SettingsChanges {
                enable_daily_summary: Some(true),
                ..Default::default()
            }
        );
    }
}
