//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;

pub use aggregate::{Order, OrderTotals};
pub use commands::*;
pub use events::{OrderDeliveredData, OrderEvent, OrderPaidData, OrderPlacedData};
pub use service::OrderService;
pub use state::OrderState;

use thiserror::Error;

use crate::value_objects::ProductId;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("No order items")]
    NoItems,

    #[error("Invalid quantity for {product}: {qty} (must be at least 1)")]
    InvalidQuantity { product: ProductId, qty: u32 },

    #[error("Invalid price for {product}: prices must not be negative")]
    InvalidPrice { product: ProductId },

    #[error("Invalid {field}: must not be negative")]
    NegativeAmount { field: &'static str },

    #[error("Order total is out of range")]
    AmountOutOfRange,

    #[error("Shipping address {field} is required")]
    InvalidAddress { field: &'static str },

    #[error("Order already placed")]
    AlreadyPlaced,

    #[error("Order not found")]
    NotPlaced,

    /// Paid with a different payment than the one being recorded.
    #[error("Order already paid with payment {payment_id}")]
    AlreadyPaid { payment_id: String },

    #[error("Order must be paid before it can be delivered")]
    NotPaid,
}
