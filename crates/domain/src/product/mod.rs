//! Reviewable catalog products.
//!
//! A product's reviews live in its own event stream, keyed by
//! `AggregateId::derived("product", product_id)`. The rating and review
//! count are derived in `apply`, so every replay agrees with the review
//! collection.

mod aggregate;
mod events;
mod service;

pub use aggregate::{ListProductInput, Product, Review, ReviewId};
pub use events::{ProductEvent, ProductListedData, ReviewRemovedData};
pub use service::ProductService;

use thiserror::Error;

/// Errors that can occur during product and review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Product already listed")]
    AlreadyListed,

    #[error("Invalid product: {0}")]
    InvalidListing(&'static str),

    #[error("Product already reviewed")]
    AlreadyReviewed,

    #[error("Rating must be between 1 and 5, got {rating}")]
    InvalidRating { rating: i64 },

    #[error("Review not found")]
    ReviewNotFound,

    /// The actor is neither the review's author nor an admin, or lacks the
    /// seller role for listing.
    #[error("Not authorized")]
    Forbidden,
}
