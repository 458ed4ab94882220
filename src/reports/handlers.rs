use axum::{extract::State, routing::get, Router};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        AdminStats, Dashboard, DashboardStats, EmployeePerformance, MyPerformance,
        ProductPerformance, SalesStats,
    },
    repo,
};
use crate::{
    auth::extractors::{AdminUser, AuthUser},
    error::AppResult,
    response::ApiResponse,
    state::AppState,
    transactions::{dto::TransactionDto, repo::TransactionFilter, repo_types::StockTransaction},
};

const RECENT: i64 = 10;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/dashboard", get(dashboard))
        .route("/reports/employee-performance", get(employee_performance))
        .route("/reports/product-performance", get(product_performance))
        .route("/reports/my-performance", get(my_performance))
}

async fn recent(state: &AppState, user: Option<Uuid>) -> AppResult<Vec<TransactionDto>> {
    let filter = TransactionFilter {
        user,
        limit: RECENT,
        ..Default::default()
    };
    let rows = StockTransaction::list(&state.db, &filter).await?;
    Ok(rows.into_iter().map(TransactionDto::from).collect())
}

/// Product figures are global; transaction figures are scoped to the caller
/// unless they are an admin.
#[instrument(skip(state))]
pub async fn dashboard(State(state): State<AppState>, auth: AuthUser) -> AppResult<ApiResponse<Dashboard>> {
    let scope = (!auth.is_admin()).then_some(auth.id);
    let products = repo::product_totals(&state.db).await?;
    let totals = repo::transaction_totals(&state.db, scope).await?;

    let admin = if auth.is_admin() {
        Some(AdminStats {
            total_employees: repo::employee_count(&state.db).await?,
            stock_in_count: totals.stock_in,
            stock_out_count: totals.stock_out,
            categories: repo::categories(&state.db)
                .await?
                .into_iter()
                .map(Into::into)
                .collect(),
        })
    } else {
        None
    };

    Ok(ApiResponse::ok(Dashboard {
        stats: DashboardStats::new(products, totals, admin),
        recent_transactions: recent(&state, scope).await?,
    }))
}

#[instrument(skip(state))]
pub async fn employee_performance(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<ApiResponse<Vec<EmployeePerformance>>> {
    let rows = repo::employee_performance(&state.db).await?;
    Ok(ApiResponse::list(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn product_performance(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<ApiResponse<Vec<ProductPerformance>>> {
    let rows = repo::product_performance(&state.db).await?;
    Ok(ApiResponse::list(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn my_performance(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<ApiResponse<MyPerformance>> {
    let totals = repo::transaction_totals(&state.db, Some(auth.id)).await?;
    let top = repo::top_products(&state.db, auth.id).await?;
    Ok(ApiResponse::ok(MyPerformance {
        stats: SalesStats::from(&totals),
        top_products: top.into_iter().map(Into::into).collect(),
        recent_transactions: recent(&state, Some(auth.id)).await?,
    }))
}
