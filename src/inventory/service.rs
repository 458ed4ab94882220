use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    levels::{evaluate_alert, AlertKind, StockStatus},
    movement::{plan, MovementError, TransactionKind},
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    notifications::{
        alerts::{dispatch_stock_alert, send_receipt, AlertFlags, AlertOutcome},
        templates::AlertContext,
    },
    products::repo_types::Product,
    state::AppState,
    transactions::{
        dto::TransactionDto,
        repo::NewTransaction,
        repo_types::StockTransaction,
    },
    users::repo_types::User,
};

pub const MAX_NOTES_LEN: usize = 500;

/// Largest amount that fits `transactions.amount NUMERIC(14, 2)`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

#[derive(Debug, Clone)]
pub struct MovementRequest<'a> {
    pub product_id: Uuid,
    pub kind: TransactionKind,
    pub quantity: i32,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSnapshot {
    pub previous: i32,
    pub current: i32,
    pub min_stock: i32,
    pub status: StockStatus,
}

#[derive(Debug, Serialize)]
pub struct AlertReport {
    pub kind: Option<AlertKind>,
    pub status: Option<AlertOutcome>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementResult {
    #[serde(flatten)]
    pub transaction: TransactionDto,
    pub stock: StockSnapshot,
    pub alert: AlertReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<AlertOutcome>,
}

fn check_request(actor: &AuthUser, req: &MovementRequest<'_>) -> AppResult<String> {
    if req.quantity <= 0 {
        return Err(MovementError::NonPositiveQuantity.into());
    }
    if req.kind.requires_admin() && !actor.is_admin() {
        return Err(AppError::Forbidden(
            "Only administrators can record stock-in and stock-out transactions".into(),
        ));
    }
    let notes = req.notes.map(str::trim).unwrap_or_default();
    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(AppError::validation(format!(
            "Notes must be at most {MAX_NOTES_LEN} characters"
        )));
    }
    Ok(notes.to_string())
}

fn line_amount(price: Decimal, quantity: i32) -> AppResult<Decimal> {
    let amount = price
        .checked_mul(Decimal::from(quantity))
        .ok_or(MovementError::Overflow)?
        .round_dp(2);
    if amount > MAX_AMOUNT {
        return Err(AppError::validation(format!(
            "Transaction amount must be at most {MAX_AMOUNT}"
        )));
    }
    Ok(amount)
}

/// Apply one stock movement. The stock update and the transaction record
/// commit together under a row lock on the product; alerts and the receipt
/// go out after commit and never undo the movement.
#[instrument(skip(state, actor), fields(actor = %actor.id))]
pub async fn apply_movement(
    state: &AppState,
    actor: &AuthUser,
    req: MovementRequest<'_>,
) -> AppResult<MovementResult> {
    let notes = check_request(actor, &req)?;

    let mut tx = state.db.begin().await?;
    let product = Product::find_for_update(&mut tx, req.product_id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let change = plan(req.kind, product.stock, req.quantity)?;
    let amount = line_amount(product.price, req.quantity)?;

    Product::set_stock(&mut tx, product.id, change.current).await?;
    let record = StockTransaction::insert(
        &mut tx,
        NewTransaction {
            kind: req.kind,
            product_id: product.id,
            product_name: &product.name,
            product_sku: &product.sku,
            quantity: req.quantity,
            amount,
            notes: &notes,
            user_id: actor.id,
            user_name: &actor.username,
            change,
        },
    )
    .await?;
    tx.commit().await?;

    info!(
        transaction_id = %record.id,
        product_id = %product.id,
        kind = req.kind.as_str(),
        previous = change.previous,
        current = change.current,
        "stock movement recorded"
    );

    let product = Product {
        stock: change.current,
        ..product
    };
    let flags = AlertFlags::load(state).await;

    let alert_kind = if req.kind.is_subtractive() {
        evaluate_alert(
            change.previous,
            change.current,
            product.min_stock,
            state.config.low_stock_trigger,
        )
    } else {
        None
    };
    let alert_status = match alert_kind {
        Some(kind) => {
            let ctx = AlertContext {
                previous_stock: Some(change.previous),
                quantity: Some(req.quantity),
                actor: Some(&actor.username),
                notes: Some(&notes),
            };
            Some(dispatch_stock_alert(state, flags, kind, &product, &ctx).await)
        }
        None => None,
    };

    let receipt = if flags.receipts {
        let to = match User::find_by_id(&state.db, actor.id).await {
            Ok(user) => user.map(|u| u.email),
            Err(e) => {
                warn!(error = %e, "could not load receipt recipient");
                None
            }
        };
        Some(send_receipt(state, flags, &record, to).await)
    } else {
        None
    };

    Ok(MovementResult {
        stock: StockSnapshot {
            previous: change.previous,
            current: change.current,
            min_stock: product.min_stock,
            status: product.stock_status(),
        },
        alert: AlertReport {
            kind: alert_kind,
            status: alert_status,
        },
        receipt,
        transaction: record.into(),
    })
}
