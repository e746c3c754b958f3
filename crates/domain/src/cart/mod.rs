//! Per-user shopping cart.
//!
//! Each user has at most one cart stream, keyed by
//! `AggregateId::derived("cart", user)`. Line prices are snapshots taken
//! when the line is first added and never recomputed from the catalog.

mod aggregate;
mod events;
mod service;

pub use aggregate::{Cart, CartLine, CartLineInput};
pub use events::{
    CartClearedData, CartEvent, CartLineQuantityChangedData, CartLineRemovedData, CartOpenedData,
};
pub use service::CartService;

use thiserror::Error;

use crate::value_objects::ProductId;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The user has no cart yet.
    #[error("Cart not found")]
    NotFound,

    #[error("Invalid quantity: {qty} (must be at least 1)")]
    InvalidQuantity { qty: i64 },

    #[error("Invalid price for {product}: prices must not be negative")]
    InvalidPrice { product: ProductId },

    #[error("Product id is required")]
    ProductRequired,

    #[error("Line total for {product} is out of range")]
    AmountOutOfRange { product: ProductId },
}
