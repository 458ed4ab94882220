use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Category, Product};
use crate::{error::AppError, inventory::levels::StockStatus};

pub const DEFAULT_MIN_STOCK: i32 = 5;

/// Largest price that fits `products.price NUMERIC(12, 2)`.
pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

lazy_static! {
    static ref SKU_RE: Regex = Regex::new(r"^[A-Z0-9][A-Z0-9_-]{0,31}$").unwrap();
}

/// Trim and uppercase a SKU, rejecting anything outside `[A-Z0-9_-]`.
pub fn normalize_sku(raw: &str) -> Result<String, AppError> {
    let sku = raw.trim().to_uppercase();
    if !SKU_RE.is_match(&sku) {
        return Err(AppError::validation(
            "SKU must be 1-32 letters, digits, '-' or '_'",
        ));
    }
    Ok(sku)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: Category,
    pub supplier: String,
    pub price: Decimal,
    pub stock: i32,
    pub min_stock: i32,
    pub stock_status: StockStatus,
    pub created_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        Self {
            stock_status: p.stock_status(),
            id: p.id,
            name: p.name,
            sku: p.sku,
            category: p.category,
            supplier: p.supplier,
            price: p.price,
            stock: p.stock,
            min_stock: p.min_stock,
            created_by: p.created_by,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub sku: String,
    pub category: Category,
    pub supplier: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    pub min_stock: Option<i32>,
}

/// Validated, normalized product fields ready for insertion.
#[derive(Debug)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub category: Category,
    pub supplier: String,
    pub price: Decimal,
    pub stock: i32,
    pub min_stock: i32,
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(v.to_string())
}

fn non_negative_price(price: Decimal) -> Result<Decimal, AppError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(AppError::validation("Price must be a positive number"));
    }
    let price = price.round_dp(2);
    if price > MAX_PRICE {
        return Err(AppError::validation(format!("Price must be at most {MAX_PRICE}")));
    }
    Ok(price)
}

fn non_negative(field: &str, v: i32) -> Result<i32, AppError> {
    if v < 0 {
        return Err(AppError::validation(format!("{field} must be a non-negative integer")));
    }
    Ok(v)
}

impl CreateProductRequest {
    pub fn validate(self) -> Result<NewProduct, AppError> {
        Ok(NewProduct {
            name: required("Name", &self.name)?,
            sku: normalize_sku(&self.sku)?,
            category: self.category,
            supplier: required("Supplier", &self.supplier)?,
            price: non_negative_price(self.price)?,
            stock: non_negative("Stock", self.stock)?,
            min_stock: non_negative("Minimum stock", self.min_stock.unwrap_or(DEFAULT_MIN_STOCK))?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<Category>,
    pub supplier: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub min_stock: Option<i32>,
}

#[derive(Debug, Default, PartialEq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<Category>,
    pub supplier: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub min_stock: Option<i32>,
}

impl UpdateProductRequest {
    pub fn validate(self) -> Result<ProductChanges, AppError> {
        Ok(ProductChanges {
            name: self.name.as_deref().map(|v| required("Name", v)).transpose()?,
            sku: self.sku.as_deref().map(normalize_sku).transpose()?,
            category: self.category,
            supplier: self
                .supplier
                .as_deref()
                .map(|v| required("Supplier", v))
                .transpose()?,
            price: self.price.map(non_negative_price).transpose()?,
            stock: self.stock.map(|v| non_negative("Stock", v)).transpose()?,
            min_stock: self
                .min_stock
                .map(|v| non_negative("Minimum stock", v))
                .transpose()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub category: Option<Category>,
    pub search: Option<String>,
    pub stock_status: Option<StockStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockAdjustment {
    Add,
    Remove,
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustRequest {
    #[serde(rename = "type")]
    pub kind: StockAdjustment,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(json: &str) -> Result<NewProduct, AppError> {
        serde_json::from_str::<CreateProductRequest>(json).unwrap().validate()
    }

    #[test]
    fn sku_is_trimmed_and_uppercased() {
        assert_eq!(normalize_sku("  ai-001 ").unwrap(), "AI-001");
        assert!(normalize_sku("").is_err());
        assert!(normalize_sku("has space").is_err());
        assert!(normalize_sku("-LEADING").is_err());
    }

    #[test]
    fn create_defaults_min_stock_to_five() {
        let p = create(
            r#"{"name":"AI Kit","sku":"ai-001","category":"Artificial Intelligence",
                "supplier":"Tech Solutions","price":299.99}"#,
        )
        .unwrap();
        assert_eq!(p.min_stock, DEFAULT_MIN_STOCK);
        assert_eq!(p.stock, 0);
        assert_eq!(p.sku, "AI-001");
        assert_eq!(p.price, Decimal::new(29999, 2));
    }

    #[test]
    fn create_rejects_negative_values() {
        let base = |extra: &str| {
            format!(
                r#"{{"name":"n","sku":"S1","category":"Data Science","supplier":"s",{extra}}}"#
            )
        };
        assert!(create(&base(r#""price":-1"#)).is_err());
        assert!(create(&base(r#""price":1,"stock":-2"#)).is_err());
        assert!(create(&base(r#""price":1,"minStock":-1"#)).is_err());
        assert!(create(&base(r#""price":0"#)).is_ok());
    }

    #[test]
    fn price_is_bounded_by_column_precision() {
        assert_eq!(MAX_PRICE, Decimal::new(999_999_999_999, 2));
        let base = |price: &str| {
            format!(
                r#"{{"name":"n","sku":"S1","category":"Data Science","supplier":"s","price":{price}}}"#
            )
        };
        assert_eq!(create(&base("9999999999.99")).unwrap().price, MAX_PRICE);
        let err = create(&base("1000000000000")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let req: UpdateProductRequest = serde_json::from_str(r#"{"price":10000000000}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn unknown_category_fails_to_parse() {
        let res = serde_json::from_str::<CreateProductRequest>(
            r#"{"name":"n","sku":"S1","category":"Gardening","supplier":"s","price":1}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn update_only_touches_given_fields() {
        let req: UpdateProductRequest =
            serde_json::from_str(r#"{"sku":"ml-2","minStock":3}"#).unwrap();
        let changes = req.validate().unwrap();
        assert_eq!(
            changes,
            ProductChanges {
                sku: Some("ML-2".into()),
                min_stock: Some(3),
                ..Default::default()
            }
        );
    }

    #[test]
    fn dto_exposes_derived_status() {
        let product = Product {
            id: Uuid::new_v4(),
            name: "Toolkit".into(),
            sku: "ML-002".into(),
            category: Category::MachineLearning,
            supplier: "Data Corp".into(),
            price: Decimal::new(19999, 2),
            stock: 3,
            min_stock: 5,
            created_by: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let v = serde_json::to_value(ProductDto::from(product)).unwrap();
        assert_eq!(v["stockStatus"], "low-stock");
        assert_eq!(v["minStock"], 5);
        assert_eq!(v["category"], "Machine Learning");
        assert_eq!(v["price"], 199.99);
    }

    #[test]
    fn stock_adjust_parses_type_field() {
        let r: StockAdjustRequest = serde_json::from_str(r#"{"type":"remove","quantity":2}"#).unwrap();
        assert_eq!(r.kind, StockAdjustment::Remove);
        assert_eq!(r.quantity, 2);
    }
}
