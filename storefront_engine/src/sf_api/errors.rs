use thiserror::Error;

use crate::traits::{CatalogError, OrderFlowError};

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Invalid checkout request. {0}")]
    Validation(String),
    #[error("Product {0} does not exist")]
    UnknownProduct(i64),
    #[error("{0} is not available for purchase")]
    ProductUnavailable(String),
    #[error("Quantity {quantity} of {product} is not allowed. Each line must order between 1 and {max}")]
    InvalidQuantity { product: String, quantity: i64, max: i64 },
    #[error("Only {available} of {product} left in stock, but {requested} were requested")]
    InsufficientStock { product: String, available: i64, requested: i64 },
    #[error("{0}")]
    Catalog(#[from] CatalogError),
    #[error("{0}")]
    Order(#[from] OrderFlowError),
}
