//! Primitives shared by every crate in the storefront workspace.
mod cents;

pub mod helpers;
pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError, CURRENCY_CODE, CURRENCY_CODE_LOWER};
pub use secret::Secret;
