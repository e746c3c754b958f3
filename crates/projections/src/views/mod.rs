//! Read model views.

pub mod buyer_orders;

pub use buyer_orders::{BuyerOrdersView, OrderSummary};
