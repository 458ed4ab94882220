use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::notifications::mailer::SmtpSettings;

pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Stored SMTP and notification settings. At most one row is active.
#[derive(Debug, Clone, FromRow)]
pub struct EmailConfig {
    pub id: Uuid,
    pub mail_username: String,
    pub mail_password: String,
    pub mail_server: String,
    pub mail_port: i32,
    pub mail_from: Option<String>,
    pub test_email: Option<String>,
    pub enable_low_stock_alerts: bool,
    pub enable_out_of_stock_alerts: bool,
    pub enable_transaction_receipts: bool,
    pub enable_daily_summary: bool,
    pub daily_summary_time: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl EmailConfig {
    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            server: self.mail_server.clone(),
            port: u16::try_from(self.mail_port).unwrap_or(DEFAULT_SMTP_PORT),
            username: Some(self.mail_username.clone()).filter(|u| !u.is_empty()),
            password: Some(self.mail_password.clone()).filter(|p| !p.is_empty()),
            from: self.mail_from.clone(),
        }
    }
}
