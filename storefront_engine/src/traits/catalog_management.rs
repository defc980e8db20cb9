use thiserror::Error;

use crate::{
    db_types::{NewProduct, Product, ProductUpdate},
    traits::ProductQuery,
};

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Invalid product. {0}")]
    InvalidProduct(String),
    #[error("The product update request contained no changes")]
    EmptyUpdate,
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Products matching the query, sorted by name. Inactive products are excluded unless the query asks for them.
    async fn fetch_products(&self, query: ProductQuery) -> Result<Vec<Product>, CatalogError>;
    async fn fetch_product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogError>;
    /// Fetches every product in `ids`, active or not. Unknown ids are silently absent from the result.
    async fn fetch_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>, CatalogError>;
    /// Inserts the product, or overwrites the product with the same slug.
    async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;
    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Product, CatalogError>;
}
