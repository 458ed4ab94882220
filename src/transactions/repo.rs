use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::repo_types::StockTransaction;
use crate::inventory::movement::{StockChange, TransactionKind};

const TRANSACTION_COLUMNS: &str = "id, kind, product_id, product_name, product_sku, \
     quantity, amount, notes, user_id, user_name, previous_stock, current_stock, created_at";

pub struct NewTransaction<'a> {
    pub kind: TransactionKind,
    pub product_id: Uuid,
    pub product_name: &'a str,
    pub product_sku: &'a str,
    pub quantity: i32,
    pub amount: Decimal,
    pub notes: &'a str,
    pub user_id: Uuid,
    pub user_name: &'a str,
    pub change: StockChange,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub product: Option<Uuid>,
    pub user: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

impl StockTransaction {
    /// Insert inside the caller's database transaction, next to the stock update.
    pub async fn insert(conn: &mut PgConnection, new: NewTransaction<'_>) -> sqlx::Result<StockTransaction> {
        sqlx::query_as::<_, StockTransaction>(&format!(
            r#"
            INSERT INTO transactions (id, kind, product_id, product_name, product_sku, quantity,
                                      amount, notes, user_id, user_name, previous_stock, current_stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.kind)
        .bind(new.product_id)
        .bind(new.product_name)
        .bind(new.product_sku)
        .bind(new.quantity)
        .bind(new.amount)
        .bind(new.notes)
        .bind(new.user_id)
        .bind(new.user_name)
        .bind(new.change.previous)
        .bind(new.change.current)
        .fetch_one(conn)
        .await
    }

    pub async fn list(db: &PgPool, filter: &TransactionFilter) -> sqlx::Result<Vec<StockTransaction>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE TRUE"));
        if let Some(kind) = filter.kind {
            qb.push(" AND kind = ").push_bind(kind);
        }
        if let Some(product) = filter.product {
            qb.push(" AND product_id = ").push_bind(product);
        }
        if let Some(user) = filter.user {
            qb.push(" AND user_id = ").push_bind(user);
        }
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        qb.build_query_as::<StockTransaction>().fetch_all(db).await
    }

    pub async fn find(db: &PgPool, id: Uuid) -> sqlx::Result<Option<StockTransaction>> {
        sqlx::query_as::<_, StockTransaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Whole history, oldest first, for export.
    pub async fn all(db: &PgPool) -> sqlx::Result<Vec<StockTransaction>> {
        sqlx::query_as::<_, StockTransaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY created_at"
        ))
        .fetch_all(db)
        .await
    }
}
