use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    dto::{NewProduct, ProductChanges, ProductFilter},
    repo_types::Product,
};
use crate::inventory::levels::StockStatus;

const PRODUCT_COLUMNS: &str = "id, name, sku, category, supplier, price, stock, min_stock, \
                               created_by, created_at, updated_at";

/// Escape `%`, `_` and `\` so a search term is matched literally by ILIKE.
fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

impl Product {
    pub async fn list(db: &PgPool, filter: &ProductFilter) -> sqlx::Result<Vec<Product>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));

        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category);
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = like_pattern(term);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR sku ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR supplier ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        match filter.stock_status {
            Some(StockStatus::OutOfStock) => {
                qb.push(" AND stock = 0");
            }
            Some(StockStatus::LowStock) => {
                qb.push(" AND stock > 0 AND stock <= min_stock");
            }
            Some(StockStatus::InStock) => {
                qb.push(" AND stock > min_stock");
            }
            None => {}
        }
        qb.push(" ORDER BY created_at DESC");

        qb.build_query_as::<Product>().fetch_all(db).await
    }

    pub async fn all(db: &PgPool) -> sqlx::Result<Vec<Product>> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name"
        ))
        .fetch_all(db)
        .await
    }

    pub async fn find(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Product>> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Load and row-lock a product inside a transaction. Concurrent
    /// movements on the same product wait here until the holder commits.
    pub async fn find_for_update(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<Product>> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub async fn set_stock(conn: &mut PgConnection, id: Uuid, stock: i32) -> sqlx::Result<()> {
        sqlx::query("UPDATE products SET stock = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(stock)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn sku_taken(db: &PgPool, sku: &str, except: Option<Uuid>) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM products WHERE sku = $1 AND id IS DISTINCT FROM $2)",
        )
        .bind(sku)
        .bind(except)
        .fetch_one(db)
        .await
    }

    pub async fn create(db: &PgPool, new: &NewProduct, created_by: Uuid) -> sqlx::Result<Product> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (id, name, sku, category, supplier, price, stock, min_stock, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.sku)
        .bind(new.category)
        .bind(&new.supplier)
        .bind(new.price)
        .bind(new.stock)
        .bind(new.min_stock)
        .bind(created_by)
        .fetch_one(db)
        .await
    }

    pub async fn update(db: &PgPool, id: Uuid, changes: ProductChanges) -> sqlx::Result<Option<Product>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE products SET updated_at = now()");
        if let Some(v) = changes.name {
            qb.push(", name = ").push_bind(v);
        }
        if let Some(v) = changes.sku {
            qb.push(", sku = ").push_bind(v);
        }
        if let Some(v) = changes.category {
            qb.push(", category = ").push_bind(v);
        }
        if let Some(v) = changes.supplier {
            qb.push(", supplier = ").push_bind(v);
        }
        if let Some(v) = changes.price {
            qb.push(", price = ").push_bind(v);
        }
        if let Some(v) = changes.stock {
            qb.push(", stock = ").push_bind(v);
        }
        if let Some(v) = changes.min_stock {
            qb.push(", min_stock = ").push_bind(v);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {PRODUCT_COLUMNS}"));
        qb.build_query_as::<Product>().fetch_optional(db).await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("kit"), "%kit%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
