use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{repo::TransactionFilter, repo_types::StockTransaction};
use crate::inventory::movement::TransactionKind;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 500;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub product: Option<Uuid>,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: i32,
    pub amount: Decimal,
    pub notes: String,
    pub user: Option<Uuid>,
    pub user_name: String,
    pub previous_stock: i32,
    pub current_stock: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<StockTransaction> for TransactionDto {
    fn from(t: StockTransaction) -> Self {
        Self {
            id: t.id,
            kind: t.kind,
            product: t.product_id,
            product_name: t.product_name,
            product_sku: t.product_sku,
            quantity: t.quantity,
            amount: t.amount,
            notes: t.notes,
            user: t.user_id,
            user_name: t.user_name,
            previous_stock: t.previous_stock,
            current_stock: t.current_stock,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    #[serde(alias = "productId")]
    pub product: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    pub product: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    /// `user` restricts the listing to one user's transactions.
    pub fn into_filter(self, user: Option<Uuid>) -> TransactionFilter {
        TransactionFilter {
            kind: self.kind,
            product: self.product,
            user,
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_accepts_legacy_kinds() {
        let id = Uuid::new_v4();
        let r: CreateTransactionRequest =
            serde_json::from_str(&format!(r#"{{"product":"{id}","type":"OUT","quantity":3}}"#)).unwrap();
        assert_eq!(r.kind, TransactionKind::StockOut);
        assert_eq!(r.product, id);

        let r: CreateTransactionRequest =
            serde_json::from_str(&format!(r#"{{"productId":"{id}","type":"purchase","quantity":1}}"#))
                .unwrap();
        assert_eq!(r.kind, TransactionKind::Purchase);
    }

    #[test]
    fn list_query_clamps_paging() {
        let f = ListQuery::default().into_filter(None);
        assert_eq!((f.limit, f.offset), (DEFAULT_LIMIT, 0));

        let f = ListQuery {
            limit: Some(10_000),
            offset: Some(-4),
            ..Default::default()
        }
        .into_filter(None);
        assert_eq!((f.limit, f.offset), (MAX_LIMIT, 0));

        let me = Uuid::new_v4();
        let f = ListQuery {
            limit: Some(0),
            ..Default::default()
        }
        .into_filter(Some(me));
        assert_eq!(f.limit, 1);
        assert_eq!(f.user, Some(me));
    }

    #[test]
    fn dto_renames_kind_to_type() {
        let t = StockTransaction {
            id: Uuid::new_v4(),
            kind: TransactionKind::StockIn,
            product_id: None,
            product_name: "Kit".into(),
            product_sku: "K-1".into(),
            quantity: 2,
            amount: Decimal::new(1000, 2),
            notes: String::new(),
            user_id: None,
            user_name: "ann".into(),
            previous_stock: 1,
            current_stock: 3,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let v = serde_json::to_value(TransactionDto::from(t)).unwrap();
        assert_eq!(v["type"], "stock-in");
        assert_eq!(v["previousStock"], 1);
        assert!(v["product"].is_null());
    }
}
