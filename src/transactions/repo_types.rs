use rust_decimal::Decimal;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::inventory::movement::TransactionKind;

/// Stock transaction record. Product and user names are snapshotted so the
/// history survives deletion of either.
#[derive(Debug, Clone, FromRow)]
pub struct StockTransaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: i32,
    pub amount: Decimal,
    pub notes: String,
    pub user_id: Option<Uuid>,
    pub user_name: String,
    pub previous_stock: i32,
    pub current_stock: i32,
    pub created_at: OffsetDateTime,
}

impl StockTransaction {
    pub fn belongs_to(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }
}
