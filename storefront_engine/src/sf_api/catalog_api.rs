//! Product catalog reads for the storefront and writes for the admin back-office.

use std::fmt::Debug;

use log::*;
use regex::Regex;

use crate::{
    db_types::{NewProduct, Product, ProductUpdate},
    traits::{CatalogError, CatalogManagement, ProductQuery},
};

const SLUG_PATTERN: &str = r"^[a-z0-9]+(-[a-z0-9]+)*$";

pub fn is_valid_slug(slug: &str) -> bool {
    Regex::new(SLUG_PATTERN).map(|re| re.is_match(slug)).unwrap_or(false)
}

pub struct CatalogApi<B> {
    db: B,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn products(&self, query: ProductQuery) -> Result<Vec<Product>, CatalogError> {
        self.db.fetch_products(query).await
    }

    /// The active product with this slug. Inactive products are hidden from the storefront.
    pub async fn product(&self, slug: &str) -> Result<Product, CatalogError> {
        self.db
            .fetch_product_by_slug(slug)
            .await?
            .filter(|p| p.active)
            .ok_or_else(|| CatalogError::ProductNotFound(slug.to_string()))
    }

    pub async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        if !is_valid_slug(&product.slug) {
            return Err(CatalogError::InvalidProduct(format!(
                "'{}' is not a valid slug. Use lower-case letters, digits and single hyphens",
                product.slug
            )));
        }
        if product.name.trim().is_empty() {
            return Err(CatalogError::InvalidProduct("A product name is required".into()));
        }
        check_price_and_stock(Some(product.price.value()), Some(product.stock))?;
        let product = self.db.upsert_product(product).await?;
        info!("🧪️ Product '{}' saved at {} ({} in stock)", product.slug, product.price, product.stock);
        Ok(product)
    }

    pub async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Product, CatalogError> {
        if update.is_empty() {
            return Err(CatalogError::EmptyUpdate);
        }
        if update.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
            return Err(CatalogError::InvalidProduct("A product name cannot be blank".into()));
        }
        check_price_and_stock(update.price.map(|p| p.value()), update.stock)?;
        let product = self.db.update_product(id, update).await?;
        info!("🧪️ Product '{}' updated", product.slug);
        Ok(product)
    }
}

fn check_price_and_stock(price: Option<i64>, stock: Option<i64>) -> Result<(), CatalogError> {
    if price.is_some_and(|p| p < 0) {
        return Err(CatalogError::InvalidProduct("Prices cannot be negative".into()));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(CatalogError::InvalidProduct("Stock cannot be negative".into()));
    }
    Ok(())
}
