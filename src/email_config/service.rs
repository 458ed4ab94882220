use std::{sync::Arc, time::Duration};

use sqlx::PgPool;
use tracing::{info, warn};

use super::repo_types::EmailConfig;
use crate::{
    config::AppConfig,
    notifications::mailer::{build_mailer, Mailer, SmtpSettings},
    state::AppState,
};

/// Stored configuration first, then `MAIL_*` environment, then log-only.
pub async fn load_mailer(db: &PgPool, config: &AppConfig) -> Arc<dyn Mailer> {
    let timeout = Duration::from_secs(config.mail.timeout_secs.max(1));
    let stored = match EmailConfig::active(db).await {
        Ok(c) => c.map(|c| c.smtp_settings()),
        Err(e) => {
            warn!(error = %e, "could not load stored email configuration");
            None
        }
    };
    let settings = stored.or_else(|| SmtpSettings::from_env(&config.mail));
    if settings.is_none() {
        info!("no smtp configuration; emails will be logged");
    }
    build_mailer(settings.as_ref(), timeout)
}

/// Rebuild the live mailer after the stored configuration changed.
pub async fn reload_mailer(state: &AppState) {
    let mailer = load_mailer(&state.db, &state.config).await;
    state.mailer.replace(mailer).await;
}
