//! Domain layer of the storefront.
//!
//! Event-sourced aggregates for the cart, order, product reviews and buyer
//! profile, the [`CommandHandler`] that loads and persists them, and the
//! services the checkout orchestrator and HTTP layer call into.

pub mod aggregate;
pub mod cart;
pub mod command;
pub mod error;
pub mod money;
pub mod order;
pub mod product;
pub mod profile;
pub mod value_objects;

pub use aggregate::{Aggregate, DomainEvent};
pub use cart::{Cart, CartError, CartEvent, CartLine, CartLineInput, CartService};
pub use command::{Command, CommandHandler, CommandResult};
pub use error::DomainError;
pub use money::{Currency, Money, MoneyError};
pub use order::{
    MarkOrderDelivered, MarkOrderPaid, Order, OrderError, OrderEvent, OrderService, OrderState,
    OrderTotals, PlaceOrder,
};
pub use product::{
    ListProductInput, Product, ProductEvent, ProductService, Review, ReviewError, ReviewId,
};
pub use profile::{Profile, ProfileError, ProfileEvent, ProfileService};
pub use value_objects::{ContactInfo, PaymentResult, ProductId, ShippingAddress};
