use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::products::repo_types::Category;

#[derive(Debug, FromRow)]
pub struct ProductTotals {
    pub total: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
    pub inventory_value: Decimal,
}

#[derive(Debug, FromRow)]
pub struct TransactionTotals {
    pub total: i64,
    pub purchases: i64,
    pub revenue: Decimal,
    pub stock_in: i64,
    pub stock_out: i64,
    pub items_sold: i64,
}

#[derive(Debug, FromRow)]
pub struct CategoryRow {
    pub category: Category,
    pub products: i64,
    pub stock: i64,
    pub value: Decimal,
}

#[derive(Debug, FromRow)]
pub struct EmployeeRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub total_transactions: i64,
    pub total_purchases: i64,
    pub total_revenue: Decimal,
    pub total_items_sold: i64,
}

#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: Category,
    pub stock: i32,
    pub min_stock: i32,
    pub total_sold: i64,
    pub total_revenue: Decimal,
    pub total_transactions: i64,
}

#[derive(Debug, FromRow)]
pub struct TopProductRow {
    pub product_id: Option<Uuid>,
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub revenue: Decimal,
    pub transactions: i64,
}

pub async fn product_totals(db: &PgPool) -> sqlx::Result<ProductTotals> {
    sqlx::query_as::<_, ProductTotals>(
        r#"
        SELECT COUNT(*) AS total,
               COUNT(*) FILTER (WHERE stock > 0 AND stock <= min_stock) AS low_stock,
               COUNT(*) FILTER (WHERE stock = 0) AS out_of_stock,
               COALESCE(SUM(price * stock), 0) AS inventory_value
        FROM products
        "#,
    )
    .fetch_one(db)
    .await
}

/// Totals over all transactions, or one user's when `user` is set.
pub async fn transaction_totals(db: &PgPool, user: Option<Uuid>) -> sqlx::Result<TransactionTotals> {
    sqlx::query_as::<_, TransactionTotals>(
        r#"
        SELECT COUNT(*) AS total,
               COUNT(*) FILTER (WHERE kind = 'purchase') AS purchases,
               COALESCE(SUM(amount) FILTER (WHERE kind = 'purchase'), 0) AS revenue,
               COUNT(*) FILTER (WHERE kind = 'stock-in') AS stock_in,
               COUNT(*) FILTER (WHERE kind = 'stock-out') AS stock_out,
               COALESCE(SUM(quantity) FILTER (WHERE kind = 'purchase'), 0)::BIGINT AS items_sold
        FROM transactions
        WHERE ($1::uuid IS NULL OR user_id = $1)
        "#,
    )
    .bind(user)
    .fetch_one(db)
    .await
}

pub async fn employee_count(db: &PgPool) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'employee'")
        .fetch_one(db)
        .await
}

pub async fn categories(db: &PgPool) -> sqlx::Result<Vec<CategoryRow>> {
    sqlx::query_as::<_, CategoryRow>(
        r#"
        SELECT category,
               COUNT(*) AS products,
               COALESCE(SUM(stock), 0)::BIGINT AS stock,
               COALESCE(SUM(price * stock), 0) AS value
        FROM products
        GROUP BY category
        ORDER BY category
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn employee_performance(db: &PgPool) -> sqlx::Result<Vec<EmployeeRow>> {
    sqlx::query_as::<_, EmployeeRow>(
        r#"
        SELECT u.id, u.username, u.email,
               COUNT(t.id) AS total_transactions,
               COUNT(t.id) FILTER (WHERE t.kind = 'purchase') AS total_purchases,
               COALESCE(SUM(t.amount) FILTER (WHERE t.kind = 'purchase'), 0) AS total_revenue,
               COALESCE(SUM(t.quantity) FILTER (WHERE t.kind = 'purchase'), 0)::BIGINT AS total_items_sold
        FROM users u
        LEFT JOIN transactions t ON t.user_id = u.id
        WHERE u.role = 'employee'
        GROUP BY u.id
        ORDER BY total_revenue DESC, u.username
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn product_performance(db: &PgPool) -> sqlx::Result<Vec<ProductRow>> {
    sqlx::query_as::<_, ProductRow>(
        r#"
        SELECT p.id, p.name, p.sku, p.category, p.stock, p.min_stock,
               COALESCE(SUM(t.quantity) FILTER (WHERE t.kind = 'purchase'), 0)::BIGINT AS total_sold,
               COALESCE(SUM(t.amount) FILTER (WHERE t.kind = 'purchase'), 0) AS total_revenue,
               COUNT(t.id) AS total_transactions
        FROM products p
        LEFT JOIN transactions t ON t.product_id = p.id
        GROUP BY p.id
        ORDER BY total_revenue DESC, p.name
        "#,
    )
    .fetch_all(db)
    .await
}

/// A user's five best-selling products by purchase revenue.
pub async fn top_products(db: &PgPool, user: Uuid) -> sqlx::Result<Vec<TopProductRow>> {
    sqlx::query_as::<_, TopProductRow>(
        r#"
        SELECT product_id,
               MAX(product_name) AS name,
               product_sku AS sku,
               SUM(quantity)::BIGINT AS quantity,
               SUM(amount) AS revenue,
               COUNT(*) AS transactions
        FROM transactions
        WHERE user_id = $1 AND kind = 'purchase'
        GROUP BY product_id, product_sku
        ORDER BY revenue DESC
        LIMIT 5
        "#,
    )
    .bind(user)
    .fetch_all(db)
    .await
}
