use askama::Template;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::error;

use super::{mailer::OutgoingEmail, summary::DailySummary};
use crate::{
    inventory::levels::AlertKind, products::repo_types::Product,
    transactions::repo_types::StockTransaction,
};

/// What caused an alert. Manual alerts sent by an admin carry no movement.
#[derive(Debug, Clone, Default)]
pub struct AlertContext<'a> {
    pub previous_stock: Option<i32>,
    pub quantity: Option<i32>,
    pub actor: Option<&'a str>,
    pub notes: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "low_stock.html")]
struct LowStockEmail<'a> {
    product_name: &'a str,
    sku: &'a str,
    stock: i32,
    min_stock: i32,
    previous_stock: String,
    quantity: String,
    actor: &'a str,
    notes: &'a str,
}

#[derive(Template)]
#[template(path = "out_of_stock.html")]
struct OutOfStockEmail<'a> {
    product_name: &'a str,
    sku: &'a str,
    previous_stock: String,
    quantity: String,
    actor: &'a str,
    notes: &'a str,
}

#[derive(Template)]
#[template(path = "test_email.html")]
struct TestEmail<'a> {
    sent_at: String,
    transport: &'a str,
}

#[derive(Template)]
#[template(path = "welcome.html")]
struct WelcomeEmail<'a> {
    username: &'a str,
    email: &'a str,
    temp_password: &'a str,
}

#[derive(Template)]
#[template(path = "receipt.html")]
struct ReceiptEmail<'a> {
    reference: String,
    date: String,
    kind: &'static str,
    product_name: &'a str,
    sku: &'a str,
    quantity: i32,
    amount: String,
    user_name: &'a str,
    notes: &'a str,
}

#[derive(Template)]
#[template(path = "daily_summary.html")]
struct DailySummaryEmail<'a> {
    date: String,
    summary: &'a DailySummary,
}

fn render(template: &impl Template, name: &str) -> anyhow::Result<String> {
    template.render().map_err(|e| {
        error!(template = name, error = %e, "failed to render email template");
        anyhow::Error::new(e)
    })
}

fn or_dash(v: Option<i32>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}

fn timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

pub fn stock_alert(
    kind: AlertKind,
    product: &Product,
    ctx: &AlertContext<'_>,
    to: Vec<String>,
) -> anyhow::Result<OutgoingEmail> {
    let actor = ctx.actor.unwrap_or("System");
    let notes = ctx.notes.filter(|n| !n.is_empty()).unwrap_or("-");
    let (subject, html) = match kind {
        AlertKind::LowStock => (
            format!("Low Stock Alert: {}", product.name),
            render(
                &LowStockEmail {
                    product_name: &product.name,
                    sku: &product.sku,
                    stock: product.stock,
                    min_stock: product.min_stock,
                    previous_stock: or_dash(ctx.previous_stock),
                    quantity: or_dash(ctx.quantity),
                    actor,
                    notes,
                },
                "low_stock",
            )?,
        ),
        AlertKind::OutOfStock => (
            format!("Out of Stock Alert: {}", product.name),
            render(
                &OutOfStockEmail {
                    product_name: &product.name,
                    sku: &product.sku,
                    previous_stock: or_dash(ctx.previous_stock),
                    quantity: or_dash(ctx.quantity),
                    actor,
                    notes,
                },
                "out_of_stock",
            )?,
        ),
    };
    Ok(OutgoingEmail { to, subject, html })
}

/// An admin-triggered alert. There is no movement behind it, so the
/// movement fields render as placeholders.
pub fn manual_stock_alert(kind: AlertKind, product: &Product, to: Vec<String>) -> anyhow::Result<OutgoingEmail> {
    stock_alert(kind, product, &AlertContext::default(), to)
}

pub fn test_email(to: String, transport: &str) -> anyhow::Result<OutgoingEmail> {
    let html = render(
        &TestEmail {
            sent_at: timestamp(OffsetDateTime::now_utc()),
            transport,
        },
        "test_email",
    )?;
    Ok(OutgoingEmail {
        to: vec![to],
        subject: "Stockroom test email".into(),
        html,
    })
}

pub fn welcome(username: &str, email: &str, temp_password: &str) -> anyhow::Result<OutgoingEmail> {
    let html = render(
        &WelcomeEmail {
            username,
            email,
            temp_password,
        },
        "welcome",
    )?;
    Ok(OutgoingEmail {
        to: vec![email.to_string()],
        subject: "Welcome to Stockroom".into(),
        html,
    })
}

pub fn receipt(tx: &StockTransaction, to: String) -> anyhow::Result<OutgoingEmail> {
    let html = render(
        &ReceiptEmail {
            reference: tx.id.to_string(),
            date: timestamp(tx.created_at),
            kind: tx.kind.as_str(),
            product_name: &tx.product_name,
            sku: &tx.product_sku,
            quantity: tx.quantity,
            amount: tx.amount.to_string(),
            user_name: &tx.user_name,
            notes: if tx.notes.is_empty() { "-" } else { &tx.notes },
        },
        "receipt",
    )?;
    Ok(OutgoingEmail {
        to: vec![to],
        subject: format!("Transaction Receipt: {} {}", tx.kind.as_str(), tx.product_name),
        html,
    })
}

pub fn daily_summary(summary: &DailySummary, to: Vec<String>) -> anyhow::Result<OutgoingEmail> {
    let date = summary.date.to_string();
    let html = render(
        &DailySummaryEmail {
            date: date.clone(),
            summary,
        },
        "daily_summary",
    )?;
    Ok(OutgoingEmail {
        to,
        subject: format!("Daily Inventory Summary: {date}"),
        html,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use time::macros::date;
    use uuid::Uuid;

    use super::*;
    use crate::products::repo_types::Category;

    fn product(stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Vision Kit".into(),
            sku: "AI-007".into(),
            category: Category::ArtificialIntelligence,
            supplier: "Tech Solutions".into(),
            price: Decimal::new(1500, 2),
            stock,
            min_stock: 5,
            created_by: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn low_stock_mentions_product_and_actor() {
        let ctx = AlertContext {
            previous_stock: Some(7),
            quantity: Some(3),
            actor: Some("carol"),
            notes: None,
        };
        let mail = stock_alert(
            AlertKind::LowStock,
            &product(4),
            &ctx,
            vec!["admin@example.com".into()],
        )
        .unwrap();
        assert_eq!(mail.subject, "Low Stock Alert: Vision Kit");
        assert!(mail.html.contains("AI-007"));
        assert!(mail.html.contains("carol"));
        assert!(mail.html.contains("Low Stock Alert"));
    }

    #[test]
    fn manual_out_of_stock_uses_placeholders() {
        let mail = stock_alert(
            AlertKind::OutOfStock,
            &product(0),
            &AlertContext::default(),
            vec!["admin@example.com".into()],
        )
        .unwrap();
        assert_eq!(mail.subject, "Out of Stock Alert: Vision Kit");
        assert!(mail.html.contains("System"));
    }

    #[test]
    fn manual_alert_leaves_previous_stock_blank() {
        let mail = manual_stock_alert(AlertKind::LowStock, &product(3), vec![]).unwrap();
        let row = mail.html.split("Previous stock").nth(1).unwrap();
        let cell = &row[..row.find("</tr>").unwrap()];
        assert!(cell.contains(">-</td>"), "{cell}");
        assert!(!cell.contains(">3</td>"));
    }

    #[test]
    fn product_names_are_html_escaped() {
        let mut p = product(2);
        p.name = "<b>Kit</b>".into();
        let mail = stock_alert(AlertKind::LowStock, &p, &AlertContext::default(), vec![]).unwrap();
        assert!(!mail.html.contains("<b>Kit</b>"));
        assert!(mail.html.contains("&lt;b&gt;Kit"));
    }

    #[test]
    fn summary_subject_carries_date() {
        let summary = DailySummary {
            date: date!(2024 - 05 - 02),
            in_stock: 3,
            low_stock: 1,
            out_of_stock: 2,
            today_transactions: 4,
            stock_in: 1,
            stock_out: 1,
            purchases: 2,
            revenue: Decimal::new(4500, 2),
        };
        let mail = daily_summary(&summary, vec!["a@example.com".into()]).unwrap();
        assert_eq!(mail.subject, "Daily Inventory Summary: 2024-05-02");
        assert!(mail.html.contains("45.00"));
    }

    #[test]
    fn welcome_goes_to_the_new_user() {
        let mail = welcome("dave", "dave@example.com", "Temp123!").unwrap();
        assert_eq!(mail.to, vec!["dave@example.com".to_string()]);
        assert!(mail.html.contains("Temp123!"));
    }
}
