//! Product domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::money::Money;
use crate::value_objects::ProductId;

use super::{Review, ReviewId};

/// Events that can occur on a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    ProductListed(ProductListedData),

    ReviewAdded(Review),

    ReviewRemoved(ReviewRemovedData),
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductListed(_) => "ProductListed",
            ProductEvent::ReviewAdded(_) => "ReviewAdded",
            ProductEvent::ReviewRemoved(_) => "ReviewRemoved",
        }
    }
}

/// Data for ProductListed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListedData {
    pub aggregate_id: AggregateId,
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub price: Money,
    pub discount: u8,
    pub discounted_price: Money,
    pub seller: UserId,
    pub listed_at: DateTime<Utc>,
}

/// Data for ReviewRemoved event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRemovedData {
    pub review_id: ReviewId,

    /// The author, or the admin who removed it.
    pub removed_by: UserId,

    pub removed_at: DateTime<Utc>,
}

impl ProductEvent {
    pub fn review_removed(review_id: ReviewId, removed_by: UserId) -> Self {
        ProductEvent::ReviewRemoved(ReviewRemovedData {
            review_id,
            removed_by,
            removed_at: Utc::now(),
        })
    }
}
