//! Shared identifiers for the storefront workspace.

pub mod types;

pub use types::{AggregateId, Identity, UserId};
