//! Product service: listing and the review aggregator.

use common::{AggregateId, Identity};
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::value_objects::ProductId;

use super::{ListProductInput, Product, ReviewError, ReviewId};

impl From<ReviewError> for DomainError {
    fn from(e: ReviewError) -> Self {
        DomainError::Review(e)
    }
}

/// Service for products and their reviews.
pub struct ProductService<S: EventStore> {
    handler: CommandHandler<S, Product>,
}

impl<S: EventStore> ProductService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Product> {
        &self.handler
    }

    pub fn stream_id(product: &ProductId) -> AggregateId {
        AggregateId::derived("product", product.as_str())
    }

    #[tracing::instrument(skip(self, seller, input), fields(user_id = %seller.user_id))]
    pub async fn list_product(
        &self,
        seller: &Identity,
        input: ListProductInput,
    ) -> Result<Product, DomainError> {
        let product_id = ProductId::generate();
        let stream_id = Self::stream_id(&product_id);

        let result = self
            .handler
            .execute(stream_id, |product| {
                product.list(stream_id, product_id.clone(), seller, input)
            })
            .await?;

        tracing::info!(product_id = %product_id, "product listed");
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self, author, comment), fields(user_id = %author.user_id))]
    pub async fn add_review(
        &self,
        product: &ProductId,
        author: &Identity,
        rating: i64,
        comment: String,
    ) -> Result<CommandResult<Product>, DomainError> {
        let result = self
            .handler
            .execute(Self::stream_id(product), |p| {
                p.add_review(author, rating, comment)
            })
            .await?;

        metrics::counter!("reviews_added_total").increment(1);
        Ok(result)
    }

    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn remove_review(
        &self,
        product: &ProductId,
        review_id: ReviewId,
        actor: &Identity,
    ) -> Result<CommandResult<Product>, DomainError> {
        let result = self
            .handler
            .execute(Self::stream_id(product), |p| {
                p.remove_review(review_id, actor)
            })
            .await?;

        metrics::counter!("reviews_removed_total").increment(1);
        Ok(result)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, product: &ProductId) -> Result<Option<Product>, DomainError> {
        self.handler.load_existing(Self::stream_id(product)).await
    }
}

impl<S: EventStore + Clone> Clone for ProductService<S> {
    fn clone(&self) -> Self {
        Self::new(self.handler.store().clone())
    }
}
