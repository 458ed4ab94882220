use serde::Serialize;
use tracing::{info, warn};

use super::{
    mailer::{MailerHandle, OutgoingEmail},
    templates::{self, AlertContext},
};
use crate::{
    email_config::repo_types::EmailConfig, inventory::levels::AlertKind,
    products::repo_types::Product, state::AppState, transactions::repo_types::StockTransaction,
    users::repo_types::User,
};

/// What happened to an alert or receipt. Never an error: the stock movement
/// that caused it has already been committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertOutcome {
    Sent,
    Disabled,
    NoRecipients,
    Failed(String),
}

impl AlertOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            AlertOutcome::Sent => "sent",
            AlertOutcome::Disabled => "disabled",
            AlertOutcome::NoRecipients => "no-recipients",
            AlertOutcome::Failed(_) => "failed",
        }
    }
}

impl Serialize for AlertOutcome {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.status())
    }
}

/// Which notifications are switched on. Without a stored configuration
/// stock alerts are on and the rest off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertFlags {
    pub low_stock: bool,
    pub out_of_stock: bool,
    pub receipts: bool,
    pub daily_summary: bool,
}

impl Default for AlertFlags {
    fn default() -> Self {
        Self {
            low_stock: true,
            out_of_stock: true,
            receipts: false,
            daily_summary: false,
        }
    }
}

impl From<Option<&EmailConfig>> for AlertFlags {
    fn from(cfg: Option<&EmailConfig>) -> Self {
        match cfg {
            Some(c) => Self {
                low_stock: c.enable_low_stock_alerts,
                out_of_stock: c.enable_out_of_stock_alerts,
                receipts: c.enable_transaction_receipts,
                daily_summary: c.enable_daily_summary,
            },
            None => Self::default(),
        }
    }
}

impl AlertFlags {
    pub async fn load(state: &AppState) -> Self {
        match EmailConfig::active(&state.db).await {
            Ok(cfg) => Self::from(cfg.as_ref()),
            Err(e) => {
                warn!(error = %e, "could not load notification flags; using defaults");
                Self::default()
            }
        }
    }

    pub fn allows(&self, kind: AlertKind) -> bool {
        match kind {
            AlertKind::LowStock => self.low_stock,
            AlertKind::OutOfStock => self.out_of_stock,
        }
    }
}

/// Admin emails plus the extra address, case-insensitively deduplicated,
/// first occurrence wins.
pub fn merge_recipients(admins: Vec<String>, extra: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(admins.len() + 1);
    for email in admins.into_iter().chain(extra.map(str::to_string)) {
        let email = email.trim().to_string();
        if email.is_empty() || out.iter().any(|e| e.eq_ignore_ascii_case(&email)) {
            continue;
        }
        out.push(email);
    }
    out
}

pub async fn recipients(state: &AppState) -> sqlx::Result<Vec<String>> {
    let admins = User::active_admin_emails(&state.db).await?;
    Ok(merge_recipients(admins, state.config.mail.admin_email.as_deref()))
}

/// Render and send one email, folding every failure into the outcome.
pub async fn deliver<F>(mailer: &MailerHandle, enabled: bool, to: Vec<String>, build: F) -> AlertOutcome
where
    F: FnOnce(Vec<String>) -> anyhow::Result<OutgoingEmail>,
{
    if !enabled {
        return AlertOutcome::Disabled;
    }
    if to.is_empty() {
        return AlertOutcome::NoRecipients;
    }
    let email = match build(to) {
        Ok(e) => e,
        Err(e) => return AlertOutcome::Failed(e.to_string()),
    };
    match mailer.send(&email).await {
        Ok(()) => AlertOutcome::Sent,
        Err(e) => {
            warn!(subject = %email.subject, error = %e, "email delivery failed");
            AlertOutcome::Failed(e.to_string())
        }
    }
}

/// Send a stock alert to the admin recipients, honouring the enable flags.
pub async fn dispatch_stock_alert(
    state: &AppState,
    flags: AlertFlags,
    kind: AlertKind,
    product: &Product,
    ctx: &AlertContext<'_>,
) -> AlertOutcome {
    if !flags.allows(kind) {
        return AlertOutcome::Disabled;
    }
    let to = match recipients(state).await {
        Ok(to) => to,
        Err(e) => {
            warn!(error = %e, "could not resolve alert recipients");
            return AlertOutcome::Failed("could not resolve recipients".into());
        }
    };
    let outcome = deliver(&state.mailer, true, to, |to| {
        templates::stock_alert(kind, product, ctx, to)
    })
    .await;
    info!(
        product_id = %product.id,
        kind = kind.as_str(),
        outcome = outcome.status(),
        "stock alert dispatched"
    );
    outcome
}

/// Email a receipt for `tx` to `to`, if receipts are switched on.
pub async fn send_receipt(
    state: &AppState,
    flags: AlertFlags,
    tx: &StockTransaction,
    to: Option<String>,
) -> AlertOutcome {
    let to: Vec<String> = to.into_iter().collect();
    deliver(&state.mailer, flags.receipts, to, |mut to| {
        templates::receipt(tx, to.remove(0))
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::notifications::mailer::testing::RecordingMailer;

    fn email(to: Vec<String>) -> anyhow::Result<OutgoingEmail> {
        Ok(OutgoingEmail {
            to,
            subject: "Low Stock Alert: Kit".into(),
            html: "<p>low</p>".into(),
        })
    }

    #[test]
    fn recipients_are_deduplicated() {
        let merged = merge_recipients(
            vec!["a@example.com".into(), "B@example.com".into()],
            Some("b@example.com"),
        );
        assert_eq!(merged, vec!["a@example.com", "B@example.com"]);

        let merged = merge_recipients(vec![], Some("ops@example.com"));
        assert_eq!(merged, vec!["ops@example.com"]);
        assert!(merge_recipients(vec![], None).is_empty());
    }

    #[test]
    fn flags_default_to_stock_alerts_only() {
        let flags = AlertFlags::from(None);
        assert!(flags.allows(AlertKind::LowStock));
        assert!(flags.allows(AlertKind::OutOfStock));
        assert!(!flags.receipts);
        assert!(!flags.daily_summary);
    }

    #[tokio::test]
    async fn deliver_reports_each_outcome() {
        let recorder = Arc::new(RecordingMailer::default());
        let mailer = MailerHandle::new(recorder.clone(), Duration::from_secs(1));
        let to = vec!["a@example.com".to_string()];

        assert_eq!(deliver(&mailer, false, to.clone(), email).await, AlertOutcome::Disabled);
        assert_eq!(deliver(&mailer, true, vec![], email).await, AlertOutcome::NoRecipients);
        assert_eq!(deliver(&mailer, true, to.clone(), email).await, AlertOutcome::Sent);
        assert_eq!(recorder.sent().len(), 1);
        assert_eq!(recorder.sent()[0].to, to);

        let broken = MailerHandle::new(Arc::new(RecordingMailer::failing()), Duration::from_secs(1));
        let outcome = deliver(&broken, true, to, email).await;
        assert_eq!(outcome.status(), "failed");
    }

    #[test]
    fn outcome_serializes_as_status() {
        assert_eq!(
            serde_json::to_value(AlertOutcome::NoRecipients).unwrap(),
            serde_json::json!("no-recipients")
        );
        assert_eq!(
            serde_json::to_value(AlertOutcome::Failed("x".into())).unwrap(),
            serde_json::json!("failed")
        );
    }
}
