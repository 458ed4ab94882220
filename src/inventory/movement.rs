use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AppError;

/// Kind of a stock transaction. `IN` / `OUT` are accepted as aliases on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    #[serde(alias = "IN", alias = "in")]
    StockIn,
    #[serde(alias = "OUT", alias = "out")]
    StockOut,
    Purchase,
}

impl TransactionKind {
    pub fn is_subtractive(&self) -> bool {
        matches!(self, TransactionKind::StockOut | TransactionKind::Purchase)
    }

    /// Stock-in and stock-out are inventory management; purchases are open
    /// to every active user.
    pub fn requires_admin(&self) -> bool {
        matches!(self, TransactionKind::StockIn | TransactionKind::StockOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::StockIn => "stock-in",
            TransactionKind::StockOut => "stock-out",
            TransactionKind::Purchase => "purchase",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MovementError {
    #[error("Quantity must be a positive integer")]
    NonPositiveQuantity,
    #[error("Insufficient stock. Available: {available}")]
    Insufficient { available: i32, requested: i32 },
    #[error("Resulting stock is out of range")]
    Overflow,
}

impl From<MovementError> for AppError {
    fn from(e: MovementError) -> Self {
        match e {
            MovementError::Insufficient {
                available,
                requested,
            } => AppError::InsufficientStock {
                available,
                requested,
            },
            other => AppError::Validation(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockChange {
    pub previous: i32,
    pub current: i32,
}

/// Compute the stock after applying `quantity` of `kind` to `stock`.
/// Never produces a negative count.
pub fn plan(kind: TransactionKind, stock: i32, quantity: i32) -> Result<StockChange, MovementError> {
    if quantity <= 0 {
        return Err(MovementError::NonPositiveQuantity);
    }
    let current = if kind.is_subtractive() {
        if quantity > stock {
            return Err(MovementError::Insufficient {
                available: stock,
                requested: quantity,
            });
        }
        stock - quantity
    } else {
        stock.checked_add(quantity).ok_or(MovementError::Overflow)?
    };
    Ok(StockChange {
        previous: stock,
        current,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_in_adds() {
        let change = plan(TransactionKind::StockIn, 4, 6).unwrap();
        assert_eq!(change, StockChange { previous: 4, current: 10 });
    }

    #[test]
    fn purchase_and_stock_out_subtract() {
        assert_eq!(plan(TransactionKind::Purchase, 10, 3).unwrap().current, 7);
        assert_eq!(plan(TransactionKind::StockOut, 10, 10).unwrap().current, 0);
    }

    #[test]
    fn over_withdrawal_is_rejected_and_reports_available() {
        let err = plan(TransactionKind::StockOut, 2, 5).unwrap_err();
        assert_eq!(err, MovementError::Insufficient { available: 2, requested: 5 });
        assert_eq!(err.to_string(), "Insufficient stock. Available: 2");
    }

    #[test]
    fn zero_or_negative_quantity_is_rejected() {
        assert_eq!(plan(TransactionKind::StockIn, 1, 0), Err(MovementError::NonPositiveQuantity));
        assert_eq!(plan(TransactionKind::Purchase, 1, -3), Err(MovementError::NonPositiveQuantity));
    }

    #[test]
    fn overflow_is_caught() {
        assert_eq!(plan(TransactionKind::StockIn, i32::MAX, 1), Err(MovementError::Overflow));
    }

    #[test]
    fn legacy_in_out_aliases_deserialize() {
        let k: TransactionKind = serde_json::from_str("\"IN\"").unwrap();
        assert_eq!(k, TransactionKind::StockIn);
        let k: TransactionKind = serde_json::from_str("\"OUT\"").unwrap();
        assert_eq!(k, TransactionKind::StockOut);
        let k: TransactionKind = serde_json::from_str("\"purchase\"").unwrap();
        assert_eq!(k, TransactionKind::Purchase);
        assert!(serde_json::from_str::<TransactionKind>("\"refund\"").is_err());
    }

    #[test]
    fn only_purchases_are_open_to_employees() {
        assert!(TransactionKind::StockIn.requires_admin());
        assert!(TransactionKind::StockOut.requires_admin());
        assert!(!TransactionKind::Purchase.requires_admin());
    }
}
