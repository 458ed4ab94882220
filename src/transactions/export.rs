use serde::Serialize;
use time::format_description::well_known::Rfc3339;

use super::repo_types::StockTransaction;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow<'a> {
    date: String,
    #[serde(rename = "type")]
    kind: &'static str,
    product: &'a str,
    sku: &'a str,
    quantity: i32,
    amount: String,
    user: &'a str,
    previous_stock: i32,
    current_stock: i32,
    notes: &'a str,
}

/// Render transactions as CSV with a header row.
pub fn to_csv(rows: &[StockTransaction]) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        wtr.write_record([
            "date",
            "type",
            "product",
            "sku",
            "quantity",
            "amount",
            "user",
            "previousStock",
            "currentStock",
            "notes",
        ])?;
    }
    for t in rows {
        wtr.serialize(CsvRow {
            date: t.created_at.format(&Rfc3339)?,
            kind: t.kind.as_str(),
            product: &t.product_name,
            sku: &t.product_sku,
            quantity: t.quantity,
            amount: t.amount.to_string(),
            user: &t.user_name,
            previous_stock: t.previous_stock,
            current_stock: t.current_stock,
            notes: &t.notes,
        })?;
    }
    let buf = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::inventory::movement::TransactionKind;

    const HEADER: &str =
        "date,type,product,sku,quantity,amount,user,previousStock,currentStock,notes";

    #[test]
    fn empty_export_still_has_header() {
        let out = String::from_utf8(to_csv(&[]).unwrap()).unwrap();
        assert_eq!(out.trim_end(), HEADER);
    }

    #[test]
    fn fields_are_quoted_when_needed() {
        let t = StockTransaction {
            id: Uuid::new_v4(),
            kind: TransactionKind::Purchase,
            product_id: Some(Uuid::new_v4()),
            product_name: "Kit, deluxe".into(),
            product_sku: "KIT-1".into(),
            quantity: 2,
            amount: Decimal::new(59998, 2),
            notes: "rush".into(),
            user_id: None,
            user_name: "bob".into(),
            previous_stock: 10,
            current_stock: 8,
            created_at: datetime!(2024-03-01 12:00 UTC),
        };
        let out = String::from_utf8(to_csv(&[t]).unwrap()).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some(HEADER));
        assert_eq!(
            lines.next(),
            Some("2024-03-01T12:00:00Z,purchase,\"Kit, deluxe\",KIT-1,2,599.98,bob,10,8,rush")
        );
    }
}
