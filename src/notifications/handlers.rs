use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    alerts::{self, AlertFlags, AlertOutcome},
    dto::{sweep, BulkAlertReport, DeliveryReport, TestNotificationRequest, WelcomeEmailRequest},
    summary::{send_daily_summary, DailySummary},
    templates,
};
use crate::{
    auth::{
        extractors::{AdminUser, AuthUser},
        validation::{is_valid_email, normalize_email},
    },
    email_config::{
        dto::{NotificationSettings, UpdateSettingsRequest},
        repo_types::EmailConfig,
    },
    error::{AppError, AppResult},
    inventory::levels::AlertKind,
    products::repo_types::Product,
    response::{ApiResponse, AppJson, AppPath},
    state::AppState,
    transactions::repo_types::StockTransaction,
    users::repo_types::User,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications/test", post(send_test))
        .route("/notifications/low-stock-alert/:product_id", post(low_stock_alert))
        .route("/notifications/out-of-stock-alert/:product_id", post(out_of_stock_alert))
        .route("/notifications/welcome-email/:user_id", post(welcome_email))
        .route("/notifications/transaction-receipt/:transaction_id", post(transaction_receipt))
        .route("/notifications/daily-summary", post(daily_summary))
        .route("/notifications/settings", get(get_settings).put(update_settings))
        .route("/notifications/bulk-alerts", post(bulk_alerts))
}

/// Manual sends fail loudly: anything but `Sent` becomes an error.
fn require_sent(outcome: AlertOutcome) -> AppResult<AlertOutcome> {
    match outcome {
        AlertOutcome::Sent => Ok(outcome),
        AlertOutcome::NoRecipients => Err(AppError::NoRecipients),
        AlertOutcome::Disabled => Err(AppError::validation("Notification is disabled")),
        AlertOutcome::Failed(e) => Err(AppError::Mail(format!("Failed to send email: {e}"))),
    }
}

async fn admin_recipients(state: &AppState) -> AppResult<Vec<String>> {
    let to = alerts::recipients(state).await?;
    if to.is_empty() {
        warn!("no active admin recipients");
        return Err(AppError::NoRecipients);
    }
    Ok(to)
}

#[instrument(skip(state, payload))]
pub async fn send_test(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppJson(payload): AppJson<TestNotificationRequest>,
) -> AppResult<ApiResponse<DeliveryReport>> {
    let to = normalize_email(&payload.email);
    if !is_valid_email(&to) {
        return Err(AppError::validation("Invalid email"));
    }
    let kind = state.mailer.current().await.kind();
    let outcome = alerts::deliver(&state.mailer, true, vec![to.clone()], |mut to| {
        templates::test_email(to.remove(0), kind)
    })
    .await;
    let status = require_sent(outcome)?;
    Ok(ApiResponse::ok(DeliveryReport {
        recipients: vec![to],
        status,
    })
    .message("Test email sent successfully"))
}

async fn manual_stock_alert(state: &AppState, product_id: Uuid, kind: AlertKind) -> AppResult<DeliveryReport> {
    let product = Product::find(&state.db, product_id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    let to = admin_recipients(state).await?;
    let outcome = alerts::deliver(&state.mailer, true, to.clone(), |to| {
        templates::manual_stock_alert(kind, &product, to)
    })
    .await;
    info!(product_id = %product.id, kind = kind.as_str(), outcome = outcome.status(), "manual stock alert");
    Ok(DeliveryReport {
        recipients: to,
        status: require_sent(outcome)?,
    })
}

#[instrument(skip(state))]
pub async fn low_stock_alert(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<ApiResponse<DeliveryReport>> {
    let report = manual_stock_alert(&state, product_id, AlertKind::LowStock).await?;
    Ok(ApiResponse::ok(report).message("Low stock alert sent successfully"))
}

#[instrument(skip(state))]
pub async fn out_of_stock_alert(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<ApiResponse<DeliveryReport>> {
    let report = manual_stock_alert(&state, product_id, AlertKind::OutOfStock).await?;
    Ok(ApiResponse::ok(report).message("Out of stock alert sent successfully"))
}

#[instrument(skip(state, payload))]
pub async fn welcome_email(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(user_id): AppPath<Uuid>,
    AppJson(payload): AppJson<WelcomeEmailRequest>,
) -> AppResult<ApiResponse<DeliveryReport>> {
    if payload.temp_password.trim().is_empty() {
        return Err(AppError::validation("Temporary password is required"));
    }
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let outcome = alerts::deliver(&state.mailer, true, vec![user.email.clone()], |_| {
        templates::welcome(&user.username, &user.email, &payload.temp_password)
    })
    .await;
    let status = require_sent(outcome)?;
    info!(user_id = %user.id, "welcome email sent");
    Ok(ApiResponse::ok(DeliveryReport {
        recipients: vec![user.email],
        status,
    })
    .message("Welcome email sent successfully"))
}

/// Owner or admin may request a receipt; it goes to the transaction's user.
#[instrument(skip(state))]
pub async fn transaction_receipt(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(transaction_id): AppPath<Uuid>,
) -> AppResult<ApiResponse<DeliveryReport>> {
    let tx = StockTransaction::find(&state.db, transaction_id)
        .await?
        .ok_or(AppError::NotFound("Transaction"))?;
    if !auth.is_admin() && !tx.belongs_to(auth.id) {
        return Err(AppError::Forbidden("Access denied".into()));
    }
    let owner = match tx.user_id {
        Some(id) => User::find_by_id(&state.db, id).await?,
        None => None,
    }
    .ok_or(AppError::NotFound("User"))?;

    let outcome = alerts::deliver(&state.mailer, true, vec![owner.email.clone()], |mut to| {
        templates::receipt(&tx, to.remove(0))
    })
    .await;
    let status = require_sent(outcome)?;
    Ok(ApiResponse::ok(DeliveryReport {
        recipients: vec![owner.email],
        status,
    })
    .message("Transaction receipt sent successfully"))
}

#[instrument(skip(state))]
pub async fn daily_summary(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<ApiResponse<DailySummary>> {
    let (summary, outcome) = send_daily_summary(&state).await?;
    require_sent(outcome)?;
    Ok(ApiResponse::ok(summary).message("Daily summary sent successfully"))
}

#[instrument(skip(state))]
pub async fn get_settings(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<ApiResponse<NotificationSettings>> {
    let cfg = EmailConfig::active(&state.db)
        .await?
        .ok_or(AppError::NotFound("Email configuration"))?;
    Ok(ApiResponse::ok(NotificationSettings::from(&cfg)))
}

#[instrument(skip(state, payload))]
pub async fn update_settings(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(payload): AppJson<UpdateSettingsRequest>,
) -> AppResult<ApiResponse<NotificationSettings>> {
    let changes = payload.validate()?;
    let cfg = EmailConfig::update_settings(&state.db, changes)
        .await?
        .ok_or(AppError::NotFound("Email configuration"))?;
    info!(by = %admin.id, "notification settings updated");
    Ok(ApiResponse::ok(NotificationSettings::from(&cfg))
        .message("Notification settings updated successfully"))
}

/// Alert on every product currently out of stock or low, one email each.
#[instrument(skip(state))]
pub async fn bulk_alerts(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<ApiResponse<BulkAlertReport>> {
    let to = admin_recipients(&state).await?;
    let flags = AlertFlags::load(&state).await;
    let products = Product::all(&state.db).await?;

    let mut report = BulkAlertReport::default();
    for (product, kind) in sweep(&products, flags) {
        let outcome = alerts::deliver(&state.mailer, true, to.clone(), |to| {
            templates::manual_stock_alert(kind, product, to)
        })
        .await;
        report.record(product, kind, outcome);
    }

    info!(
        by = %admin.id,
        sent = report.sent,
        failed = report.failed,
        "bulk alerts processed"
    );
    let message = format!(
        "Processed {} out of stock and {} low stock alerts",
        report.out_of_stock, report.low_stock
    );
    Ok(ApiResponse::ok(report).message(message))
}
