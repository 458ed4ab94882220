use serde::{Deserialize, Serialize};

use crate::config::AlertTrigger;

/// Stock status derived from the current count and the product's minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn derive(stock: i32, min_stock: i32) -> Self {
        if stock <= 0 {
            StockStatus::OutOfStock
        } else if stock <= min_stock {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    LowStock,
    OutOfStock,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::LowStock => "low-stock",
            AlertKind::OutOfStock => "out-of-stock",
        }
    }
}

/// Decide which alert, if any, a subtractive movement from `previous` to
/// `current` raises. Out-of-stock wins over low-stock; at most one is returned.
pub fn evaluate_alert(
    previous: i32,
    current: i32,
    min_stock: i32,
    trigger: AlertTrigger,
) -> Option<AlertKind> {
    if current >= previous {
        return None;
    }
    if current == 0 {
        return Some(AlertKind::OutOfStock);
    }
    if current > min_stock {
        return None;
    }
    match trigger {
        AlertTrigger::Edge if previous <= min_stock => None,
        _ => Some(AlertKind::LowStock),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_thresholds() {
        assert_eq!(StockStatus::derive(0, 5), StockStatus::OutOfStock);
        for s in 1..=5 {
            assert_eq!(StockStatus::derive(s, 5), StockStatus::LowStock, "stock {s}");
        }
        assert_eq!(StockStatus::derive(6, 5), StockStatus::InStock);
        // a zero minimum means any positive stock is healthy
        assert_eq!(StockStatus::derive(1, 0), StockStatus::InStock);
    }

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&StockStatus::OutOfStock).unwrap();
        assert_eq!(json, "\"out-of-stock\"");
    }

    #[test]
    fn reaching_zero_signals_only_out_of_stock() {
        for trigger in [AlertTrigger::Edge, AlertTrigger::Level] {
            assert_eq!(evaluate_alert(10, 0, 5, trigger), Some(AlertKind::OutOfStock));
            assert_eq!(evaluate_alert(3, 0, 5, trigger), Some(AlertKind::OutOfStock));
        }
    }

    #[test]
    fn edge_trigger_fires_once_when_crossing_minimum() {
        assert_eq!(evaluate_alert(8, 5, 5, AlertTrigger::Edge), Some(AlertKind::LowStock));
        assert_eq!(evaluate_alert(5, 4, 5, AlertTrigger::Edge), None);
        assert_eq!(evaluate_alert(8, 6, 5, AlertTrigger::Edge), None);
    }

    #[test]
    fn level_trigger_fires_on_every_qualifying_movement() {
        assert_eq!(evaluate_alert(8, 5, 5, AlertTrigger::Level), Some(AlertKind::LowStock));
        assert_eq!(evaluate_alert(5, 4, 5, AlertTrigger::Level), Some(AlertKind::LowStock));
        assert_eq!(evaluate_alert(8, 6, 5, AlertTrigger::Level), None);
    }

    #[test]
    fn restocking_never_alerts() {
        assert_eq!(evaluate_alert(0, 3, 5, AlertTrigger::Level), None);
        assert_eq!(evaluate_alert(2, 2, 5, AlertTrigger::Level), None);
    }
}
