use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::inventory::levels::StockStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_category")]
pub enum Category {
    #[serde(rename = "Artificial Intelligence")]
    #[sqlx(rename = "Artificial Intelligence")]
    ArtificialIntelligence,
    #[serde(rename = "Machine Learning")]
    #[sqlx(rename = "Machine Learning")]
    MachineLearning,
    #[serde(rename = "Data Science")]
    #[sqlx(rename = "Data Science")]
    DataScience,
    #[serde(rename = "Web Development")]
    #[sqlx(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "App Development")]
    #[sqlx(rename = "App Development")]
    AppDevelopment,
}

/// Product record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: Category,
    pub supplier: String,
    pub price: Decimal,
    pub stock: i32,
    pub min_stock: i32,
    pub created_by: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Product {
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::derive(self.stock, self.min_stock)
    }
}
