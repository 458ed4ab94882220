use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateTransactionRequest, ListQuery, TransactionDto},
    export,
    repo_types::StockTransaction,
};
use crate::{
    auth::extractors::{AdminUser, AuthUser},
    error::{AppError, AppResult},
    inventory::service::{apply_movement, MovementRequest, MovementResult},
    response::{ApiResponse, AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route("/transactions/my-transactions", get(my_transactions))
        .route("/transactions/export.csv", get(export_csv))
        .route("/transactions/:id", get(get_transaction))
}

#[instrument(skip(state, payload))]
pub async fn create_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<CreateTransactionRequest>,
) -> AppResult<ApiResponse<MovementResult>> {
    let result = apply_movement(
        &state,
        &auth,
        MovementRequest {
            product_id: payload.product,
            kind: payload.kind,
            quantity: payload.quantity,
            notes: payload.notes.as_deref(),
        },
    )
    .await?;
    Ok(ApiResponse::created(result).message("Transaction recorded successfully"))
}

/// Admins see every transaction, everyone else only their own.
#[instrument(skip(state))]
pub async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> AppResult<ApiResponse<Vec<TransactionDto>>> {
    let scope = (!auth.is_admin()).then_some(auth.id);
    let rows = StockTransaction::list(&state.db, &query.into_filter(scope)).await?;
    Ok(ApiResponse::list(rows.into_iter().map(TransactionDto::from).collect()))
}

#[instrument(skip(state))]
pub async fn my_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> AppResult<ApiResponse<Vec<TransactionDto>>> {
    let rows = StockTransaction::list(&state.db, &query.into_filter(Some(auth.id))).await?;
    Ok(ApiResponse::list(rows.into_iter().map(TransactionDto::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<TransactionDto>> {
    let tx = StockTransaction::find(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("Transaction"))?;
    if !auth.is_admin() && !tx.belongs_to(auth.id) {
        return Err(AppError::Forbidden("Access denied".into()));
    }
    Ok(ApiResponse::ok(tx.into()))
}

#[instrument(skip(state))]
pub async fn export_csv(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<Response> {
    let rows = StockTransaction::all(&state.db).await?;
    let body = export::to_csv(&rows)?;
    info!(rows = rows.len(), by = %admin.id, "transactions exported");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}
