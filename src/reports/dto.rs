use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::repo::{
    CategoryRow, EmployeeRow, ProductRow, ProductTotals, TopProductRow, TransactionTotals,
};
use crate::{
    inventory::levels::StockStatus, products::repo_types::Category,
    transactions::dto::TransactionDto,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: i64,
    pub low_stock_products: i64,
    pub out_of_stock_products: i64,
    pub inventory_value: Decimal,
    pub total_transactions: i64,
    pub total_revenue: Decimal,
    pub purchase_count: i64,
    #[serde(flatten)]
    pub admin: Option<AdminStats>,
}

impl DashboardStats {
    pub fn new(products: ProductTotals, tx: TransactionTotals, admin: Option<AdminStats>) -> Self {
        Self {
            total_products: products.total,
            low_stock_products: products.low_stock,
            out_of_stock_products: products.out_of_stock,
            inventory_value: products.inventory_value,
            total_transactions: tx.total,
            total_revenue: tx.revenue,
            purchase_count: tx.purchases,
            admin,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_employees: i64,
    pub stock_in_count: i64,
    pub stock_out_count: i64,
    pub categories: Vec<CategoryBreakdown>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub category: Category,
    pub products: i64,
    pub stock: i64,
    pub value: Decimal,
}

impl From<CategoryRow> for CategoryBreakdown {
    fn from(r: CategoryRow) -> Self {
        Self {
            category: r.category,
            products: r.products,
            stock: r.stock,
            value: r.value,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_transactions: Vec<TransactionDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesStats {
    pub total_transactions: i64,
    pub total_purchases: i64,
    pub total_revenue: Decimal,
    pub total_items_sold: i64,
}

impl From<&TransactionTotals> for SalesStats {
    fn from(t: &TransactionTotals) -> Self {
        Self {
            total_transactions: t.total,
            total_purchases: t.purchases,
            total_revenue: t.revenue,
            total_items_sold: t.items_sold,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmployeeSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct EmployeePerformance {
    pub employee: EmployeeSummary,
    pub stats: SalesStats,
}

impl From<EmployeeRow> for EmployeePerformance {
    fn from(r: EmployeeRow) -> Self {
        Self {
            employee: EmployeeSummary {
                id: r.id,
                username: r.username,
                email: r.email,
            },
            stats: SalesStats {
                total_transactions: r.total_transactions,
                total_purchases: r.total_purchases,
                total_revenue: r.total_revenue,
                total_items_sold: r.total_items_sold,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: Category,
    pub current_stock: i32,
    pub stock_status: StockStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total_sold: i64,
    pub total_revenue: Decimal,
    pub total_transactions: i64,
}

#[derive(Debug, Serialize)]
pub struct ProductPerformance {
    pub product: ProductSummary,
    pub stats: ProductStats,
}

impl From<ProductRow> for ProductPerformance {
    fn from(r: ProductRow) -> Self {
        Self {
            product: ProductSummary {
                stock_status: StockStatus::derive(r.stock, r.min_stock),
                id: r.id,
                name: r.name,
                sku: r.sku,
                category: r.category,
                current_stock: r.stock,
            },
            stats: ProductStats {
                total_sold: r.total_sold,
                total_revenue: r.total_revenue,
                total_transactions: r.total_transactions,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: Option<Uuid>,
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub revenue: Decimal,
    pub transactions: i64,
}

impl From<TopProductRow> for TopProduct {
    fn from(r: TopProductRow) -> Self {
        Self {
            product_id: r.product_id,
            name: r.name,
            sku: r.sku,
            quantity: r.quantity,
            revenue: r.revenue,
            transactions: r.transactions,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyPerformance {
    pub stats: SalesStats,
    pub top_products: Vec<TopProduct>,
    pub recent_transactions: Vec<TransactionDto>,
}
