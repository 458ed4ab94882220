use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{EmailConfigDto, SaveEmailConfigRequest, TestEmailRequest},
    repo_types::EmailConfig,
    service::reload_mailer,
};
use crate::{
    auth::{
        extractors::AdminUser,
        validation::{is_valid_email, normalize_email},
    },
    error::{AppError, AppResult},
    notifications::templates,
    response::{ApiResponse, AppJson},
    state::AppState,
    users::repo_types::User,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/email-config", get(get_config).post(save_config))
        .route("/email-config/test", post(send_test))
}

#[instrument(skip(state))]
pub async fn get_config(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<ApiResponse<Option<EmailConfigDto>>> {
    let cfg = EmailConfig::active(&state.db).await?;
    Ok(ApiResponse::ok(cfg.map(EmailConfigDto::from)))
}

#[instrument(skip(state, payload))]
pub async fn save_config(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(payload): AppJson<SaveEmailConfigRequest>,
) -> AppResult<ApiResponse<EmailConfigDto>> {
    let has_password = payload.mail_password.as_deref().is_some_and(|p| !p.is_empty())
        || EmailConfig::active(&state.db)
            .await?
            .is_some_and(|c| !c.mail_password.is_empty());
    let input = payload.validate(has_password)?;

    let saved = EmailConfig::save(&state.db, &input).await?;
    reload_mailer(&state).await;

    info!(server = %saved.mail_server, port = saved.mail_port, by = %admin.id, "email configuration saved");
    Ok(ApiResponse::ok(EmailConfigDto::from(saved)).message("Email configuration saved successfully"))
}

/// Send a test email with the live mailer. Falls back to the stored test
/// address, then to the caller's own address.
#[instrument(skip(state, payload))]
pub async fn send_test(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(payload): AppJson<TestEmailRequest>,
) -> AppResult<ApiResponse<Option<()>>> {
    let to = match payload.test_email.map(|e| normalize_email(&e)).filter(|e| !e.is_empty()) {
        Some(e) => e,
        None => {
            let stored = EmailConfig::active(&state.db).await?.and_then(|c| c.test_email);
            match stored {
                Some(e) => e,
                None => User::find_by_id(&state.db, admin.id)
                    .await?
                    .map(|u| u.email)
                    .ok_or(AppError::validation("Test email address is required"))?,
            }
        }
    };
    if !is_valid_email(&to) {
        return Err(AppError::validation("Invalid test email address"));
    }

    let mailer = state.mailer.current().await;
    let email = templates::test_email(to.clone(), mailer.kind())?;
    state.mailer.send(&email).await.map_err(|e| {
        warn!(error = %e, "test email failed");
        AppError::Mail(format!("Failed to send test email: {e}"))
    })?;

    info!(%to, "test email sent");
    Ok(ApiResponse::ok(None).message(format!("Test email sent to {to}")))
}
