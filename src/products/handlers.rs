use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        CreateProductRequest, ProductDto, ProductFilter, StockAdjustRequest, StockAdjustment,
        UpdateProductRequest,
    },
    repo_types::Product,
};
use crate::{
    auth::extractors::{AdminUser, AuthUser},
    error::{AppError, AppResult},
    inventory::{
        movement::TransactionKind,
        service::{apply_movement, MovementRequest, MovementResult},
    },
    response::{ApiResponse, AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/stock", post(adjust_stock))
}

#[instrument(skip(state, _auth))]
pub async fn list_products(
    State(state): State<AppState>,
    _auth: AuthUser,
    AppQuery(filter): AppQuery<ProductFilter>,
) -> AppResult<ApiResponse<Vec<ProductDto>>> {
    let products = Product::list(&state.db, &filter).await?;
    Ok(ApiResponse::list(products.into_iter().map(ProductDto::from).collect()))
}

#[instrument(skip(state, _auth))]
pub async fn get_product(
    State(state): State<AppState>,
    _auth: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<ProductDto>> {
    let product = Product::find(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    Ok(ApiResponse::ok(product.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(payload): AppJson<CreateProductRequest>,
) -> AppResult<ApiResponse<ProductDto>> {
    let new = payload.validate()?;
    if Product::sku_taken(&state.db, &new.sku, None).await? {
        warn!(sku = %new.sku, "duplicate sku");
        return Err(AppError::Conflict("Product with this SKU already exists".into()));
    }

    let product = Product::create(&state.db, &new, admin.id).await?;
    info!(product_id = %product.id, sku = %product.sku, "product created");
    Ok(ApiResponse::created(ProductDto::from(product)).message("Product created successfully"))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateProductRequest>,
) -> AppResult<ApiResponse<ProductDto>> {
    let changes = payload.validate()?;
    if let Some(sku) = &changes.sku {
        if Product::sku_taken(&state.db, sku, Some(id)).await? {
            warn!(%sku, "duplicate sku");
            return Err(AppError::Conflict("Product with this SKU already exists".into()));
        }
    }

    let product = Product::update(&state.db, id, changes)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    info!(product_id = %product.id, by = %admin.id, "product updated");
    Ok(ApiResponse::ok(ProductDto::from(product)).message("Product updated successfully"))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<Option<()>>> {
    if !Product::delete(&state.db, id).await? {
        return Err(AppError::NotFound("Product"));
    }
    info!(product_id = %id, by = %admin.id, "product deleted");
    Ok(ApiResponse::ok(None).message("Product deleted successfully"))
}

/// Manual stock adjustment, recorded as a stock-in or stock-out movement.
#[instrument(skip(state, payload))]
pub async fn adjust_stock(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<StockAdjustRequest>,
) -> AppResult<ApiResponse<MovementResult>> {
    let kind = match payload.kind {
        StockAdjustment::Add => TransactionKind::StockIn,
        StockAdjustment::Remove => TransactionKind::StockOut,
    };
    let result = apply_movement(
        &state,
        &admin,
        MovementRequest {
            product_id: id,
            kind,
            quantity: payload.quantity,
            notes: payload.notes.as_deref(),
        },
    )
    .await?;
    Ok(ApiResponse::created(result).message("Stock updated successfully"))
}
