use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::alerts::{AlertFlags, AlertOutcome};
use crate::{inventory::levels::{AlertKind, StockStatus}, products::repo_types::Product};

#[derive(Debug, Deserialize)]
pub struct TestNotificationRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeEmailRequest {
    pub temp_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub recipients: Vec<String>,
    pub status: AlertOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAlertEntry {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub kind: AlertKind,
    pub status: AlertOutcome,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAlertReport {
    pub out_of_stock: usize,
    pub low_stock: usize,
    pub sent: usize,
    pub failed: usize,
    pub alerts: Vec<BulkAlertEntry>,
}

impl BulkAlertReport {
    pub fn record(&mut self, product: &Product, kind: AlertKind, status: AlertOutcome) {
        match kind {
            AlertKind::OutOfStock => self.out_of_stock += 1,
            AlertKind::LowStock => self.low_stock += 1,
        }
        match status {
            AlertOutcome::Sent => self.sent += 1,
            AlertOutcome::Failed(_) => self.failed += 1,
            _ => {}
        }
        self.alerts.push(BulkAlertEntry {
            product_id: product.id,
            name: product.name.clone(),
            sku: product.sku.clone(),
            kind,
            status,
        });
    }
}

/// Products that deserve an alert in a sweep, judged on current level only.
/// Out-of-stock products come first.
pub fn sweep(products: &[Product], flags: AlertFlags) -> Vec<(&Product, AlertKind)> {
    let pick = |status: StockStatus, kind: AlertKind| {
        products
            .iter()
            .filter(move |p| p.stock_status() == status)
            .map(move |p| (p, kind))
    };
    let mut out = Vec::new();
    if flags.out_of_stock {
        out.extend(pick(StockStatus::OutOfStock, AlertKind::OutOfStock));
    }
    if flags.low_stock {
        out.extend(pick(StockStatus::LowStock, AlertKind::LowStock));
    }
    out
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use time::OffsetDateTime;

    use super::*;
    use crate::products::repo_types::Category;

    fn product(sku: &str, stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: sku.to_lowercase(),
            sku: sku.into(),
            category: Category::DataScience,
            supplier: "Data Corp".into(),
            price: Decimal::ONE,
            stock,
            min_stock: 5,
            created_by: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn sweep_orders_out_of_stock_first_and_honours_flags() {
        let products = vec![product("LOW", 3), product("OK", 50), product("OUT", 0)];

        let all = sweep(&products, AlertFlags::default());
        let picked: Vec<_> = all.iter().map(|(p, k)| (p.sku.as_str(), *k)).collect();
        assert_eq!(
            picked,
            vec![("OUT", AlertKind::OutOfStock), ("LOW", AlertKind::LowStock)]
        );

        let only_low = AlertFlags {
            out_of_stock: false,
            ..AlertFlags::default()
        };
        assert_eq!(sweep(&products, only_low).len(), 1);
    }

    #[test]
    fn report_counts_outcomes() {
        let p = product("X", 0);
        let mut report = BulkAlertReport::default();
        report.record(&p, AlertKind::OutOfStock, AlertOutcome::Sent);
        report.record(&p, AlertKind::LowStock, AlertOutcome::Failed("timeout".into()));
        assert_eq!((report.out_of_stock, report.low_stock), (1, 1));
        assert_eq!((report.sent, report.failed), (1, 1));
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["alerts"][1]["status"], "failed");
    }
}
