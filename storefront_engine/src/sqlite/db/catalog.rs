use log::trace;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewProduct, Product, ProductUpdate},
    traits::{CatalogError, ProductQuery},
};

pub async fn fetch_products(query: ProductQuery, conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM products WHERE 1 = 1");
    if !query.include_inactive {
        builder.push(" AND active = TRUE");
    }
    if let Some(category) = query.category {
        builder.push(" AND lower(category) = lower(");
        builder.push_bind(category);
        builder.push(")");
    }
    if let Some(search) = query.search {
        let pattern = format!("%{}%", search.to_lowercase());
        builder.push(" AND (lower(name) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR lower(description) LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    builder.push(" ORDER BY name ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as::<Product>().fetch_all(conn).await
}

pub async fn fetch_product_by_slug(slug: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE slug = $1").bind(slug).fetch_optional(conn).await
}

pub async fn fetch_products_by_ids(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM products WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");
    builder.build_query_as::<Product>().fetch_all(conn).await
}

/// Inserts a product, or replaces every field of the existing product with the same slug.
pub async fn upsert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO products (slug, name, description, price, stock, active, category, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (slug) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                price = excluded.price,
                stock = excluded.stock,
                active = excluded.active,
                category = excluded.category,
                image_url = excluded.image_url,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(product.slug)
    .bind(product.name)
    .bind(product.description)
    .bind(product.price)
    .bind(product.stock)
    .bind(product.active)
    .bind(product.category)
    .bind(product.image_url)
    .fetch_one(conn)
    .await
}

pub async fn update_product(
    id: i64,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<Product, CatalogError> {
    if update.is_empty() {
        return Err(CatalogError::EmptyUpdate);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE products SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(name) = update.name {
        set_clause.push("name = ");
        set_clause.push_bind_unseparated(name);
    }
    if let Some(description) = update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description);
    }
    if let Some(price) = update.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(stock) = update.stock {
        set_clause.push("stock = ");
        set_clause.push_bind_unseparated(stock);
    }
    if let Some(active) = update.active {
        set_clause.push("active = ");
        set_clause.push_bind_unseparated(active);
    }
    if let Some(category) = update.category {
        set_clause.push("category = ");
        set_clause.push_bind_unseparated(category);
    }
    if let Some(image_url) = update.image_url {
        set_clause.push("image_url = ");
        set_clause.push_bind_unseparated(image_url);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let product: Option<Product> = builder.build_query_as().fetch_optional(conn).await?;
    product.ok_or_else(|| CatalogError::ProductNotFound(format!("id {id}")))
}
