//! Product aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, Identity, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::Aggregate;
use crate::money::Money;
use crate::value_objects::ProductId;

use super::{ProductEvent, ReviewError, events::ProductListedData};

/// Identifier of a single review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(Uuid);

impl ReviewId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One buyer's review of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user: UserId,
    /// Display name of the author at the time of writing.
    pub name: String,
    /// 1 to 5.
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Fields a seller supplies when listing a product.
#[derive(Debug, Clone)]
pub struct ListProductInput {
    pub name: String,
    pub image: String,
    pub price: Money,
    /// Percentage off, 0 to 100.
    pub discount: i64,
}

impl ListProductInput {
    pub fn new(name: impl Into<String>, price: Money) -> Self {
        Self {
            name: name.into(),
            image: String::new(),
            price,
            discount: 0,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_discount(mut self, discount: i64) -> Self {
        self.discount = discount;
        self
    }
}

/// A reviewable catalog product.
#[derive(Debug, Clone, Default)]
pub struct Product {
    id: Option<AggregateId>,
    version: Version,
    product_id: Option<ProductId>,
    name: String,
    image: String,
    price: Money,
    discount: u8,
    discounted_price: Money,
    seller: Option<UserId>,
    reviews: Vec<Review>,
    rating: f64,
    num_reviews: u32,
}

impl Aggregate for Product {
    type Event = ProductEvent;
    type Error = ReviewError;

    fn aggregate_type() -> &'static str {
        "Product"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ProductEvent::ProductListed(data) => self.apply_product_listed(data),
            ProductEvent::ReviewAdded(review) => {
                self.reviews.push(review);
                self.recompute_rating();
            }
            ProductEvent::ReviewRemoved(data) => {
                self.reviews.retain(|review| review.id != data.review_id);
                self.recompute_rating();
            }
        }
    }
}

// Query methods
impl Product {
    pub fn product_id(&self) -> Option<&ProductId> {
        self.product_id.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn discount(&self) -> u8 {
        self.discount
    }

    /// Zero when there is no discount.
    pub fn discounted_price(&self) -> Money {
        self.discounted_price
    }

    pub fn seller(&self) -> Option<&UserId> {
        self.seller.as_ref()
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn review(&self, review_id: ReviewId) -> Option<&Review> {
        self.reviews.iter().find(|review| review.id == review_id)
    }

    /// Mean of all review ratings, 0 when there are none.
    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn num_reviews(&self) -> u32 {
        self.num_reviews
    }

    pub fn has_review_by(&self, user: &UserId) -> bool {
        self.reviews.iter().any(|review| &review.user == user)
    }
}

// Command methods (return events)
impl Product {
    /// Registers the product. Only admins and sellers may list.
    pub fn list(
        &self,
        aggregate_id: AggregateId,
        product_id: ProductId,
        seller: &Identity,
        input: ListProductInput,
    ) -> Result<Vec<ProductEvent>, ReviewError> {
        if !(seller.is_admin || seller.is_seller) {
            return Err(ReviewError::Forbidden);
        }
        if self.id.is_some() {
            return Err(ReviewError::AlreadyListed);
        }
        if input.name.trim().is_empty() {
            return Err(ReviewError::InvalidListing("name is required"));
        }
        if input.price.is_negative() {
            return Err(ReviewError::InvalidListing("price must not be negative"));
        }
        let discount = u8::try_from(input.discount)
            .ok()
            .filter(|d| *d <= 100)
            .ok_or(ReviewError::InvalidListing("discount must be between 0 and 100"))?;

        Ok(vec![ProductEvent::ProductListed(ProductListedData {
            aggregate_id,
            product_id,
            name: input.name,
            image: input.image,
            price: input.price,
            discount,
            discounted_price: input.price.percent_off(discount),
            seller: seller.user_id.clone(),
            listed_at: Utc::now(),
        })])
    }

    /// Adds `author`'s review. One review per user per product.
    pub fn add_review(
        &self,
        author: &Identity,
        rating: i64,
        comment: impl Into<String>,
    ) -> Result<Vec<ProductEvent>, ReviewError> {
        if self.id.is_none() {
            return Err(ReviewError::ProductNotFound);
        }
        let rating = u8::try_from(rating)
            .ok()
            .filter(|r| (1..=5).contains(r))
            .ok_or(ReviewError::InvalidRating { rating })?;
        if self.has_review_by(&author.user_id) {
            return Err(ReviewError::AlreadyReviewed);
        }

        Ok(vec![ProductEvent::ReviewAdded(Review {
            id: ReviewId::new(),
            user: author.user_id.clone(),
            name: author.name.clone(),
            rating,
            comment: comment.into(),
            created_at: Utc::now(),
        })])
    }

    /// Removes a review. Only its author or an admin may do so.
    pub fn remove_review(
        &self,
        review_id: ReviewId,
        actor: &Identity,
    ) -> Result<Vec<ProductEvent>, ReviewError> {
        if self.id.is_none() {
            return Err(ReviewError::ProductNotFound);
        }
        let review = self.review(review_id).ok_or(ReviewError::ReviewNotFound)?;
        if !actor.can_access(&review.user) {
            return Err(ReviewError::Forbidden);
        }

        Ok(vec![ProductEvent::review_removed(
            review_id,
            actor.user_id.clone(),
        )])
    }
}

// Apply event helpers
impl Product {
    fn apply_product_listed(&mut self, data: ProductListedData) {
        self.id = Some(data.aggregate_id);
        self.product_id = Some(data.product_id);
        self.name = data.name;
        self.image = data.image;
        self.price = data.price;
        self.discount = data.discount;
        self.discounted_price = data.discounted_price;
        self.seller = Some(data.seller);
    }

    fn recompute_rating(&mut self) {
        self.num_reviews = self.reviews.len() as u32;
        self.rating = if self.reviews.is_empty() {
            0.0
        } else {
            let sum: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
            f64::from(sum) / self.reviews.len() as f64
        };
    }
}
