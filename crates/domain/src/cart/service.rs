//! Cart service: the per-user cart store.

use common::{AggregateId, UserId};
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::value_objects::ProductId;

use super::{Cart, CartError, CartLine, CartLineInput};

/// Attempts per cart command before a concurrency conflict is surfaced.
const CART_WRITE_ATTEMPTS: usize = 3;

impl From<CartError> for DomainError {
    fn from(e: CartError) -> Self {
        DomainError::Cart(e)
    }
}

/// Service for managing user carts.
pub struct CartService<S: EventStore> {
    handler: CommandHandler<S, Cart>,
}

impl<S: EventStore> CartService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Cart> {
        &self.handler
    }

    /// The stream id of `user`'s cart.
    pub fn cart_id(user: &UserId) -> AggregateId {
        AggregateId::derived("cart", user.as_str())
    }

    /// Current lines, empty when the user never added anything.
    #[tracing::instrument(skip(self), fields(user_id = %user))]
    pub async fn get(&self, user: &UserId) -> Result<Vec<CartLine>, DomainError> {
        let cart = self.handler.load(Self::cart_id(user)).await?;
        Ok(cart.lines().to_vec())
    }

    /// Loads the whole aggregate, `None` if the cart was never created.
    pub async fn get_cart(&self, user: &UserId) -> Result<Option<Cart>, DomainError> {
        self.handler.load_existing(Self::cart_id(user)).await
    }

    #[tracing::instrument(skip(self, input), fields(user_id = %user, product = %input.product))]
    pub async fn upsert_line(
        &self,
        user: &UserId,
        input: CartLineInput,
    ) -> Result<Vec<CartLine>, DomainError> {
        let cart_id = Self::cart_id(user);
        let result = self
            .handler
            .execute_retrying(cart_id, CART_WRITE_ATTEMPTS, |cart| {
                cart.upsert_line(cart_id, user, input.clone())
            })
            .await?;

        Ok(result.aggregate.lines().to_vec())
    }

    #[tracing::instrument(skip(self), fields(user_id = %user))]
    pub async fn remove_line(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<Vec<CartLine>, DomainError> {
        let result = self
            .handler
            .execute_retrying(Self::cart_id(user), CART_WRITE_ATTEMPTS, |cart| {
                cart.remove_line(product)
            })
            .await?;

        Ok(result.aggregate.lines().to_vec())
    }

    #[tracing::instrument(skip(self), fields(user_id = %user))]
    pub async fn clear(&self, user: &UserId) -> Result<CommandResult<Cart>, DomainError> {
        self.handler
            .execute_retrying(Self::cart_id(user), CART_WRITE_ATTEMPTS, Cart::clear)
            .await
    }
}

impl<S: EventStore + Clone> Clone for CartService<S> {
    fn clone(&self) -> Self {
        Self::new(self.handler.store().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use event_store::InMemoryEventStore;

    fn service() -> CartService<InMemoryEventStore> {
        CartService::new(InMemoryEventStore::new())
    }

    #[tokio::test]
    async fn get_without_cart_is_empty() {
        let lines = service().get(&UserId::new("u-1")).await.unwrap();
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn upsert_then_get() {
        let service = service();
        let user = UserId::new("u-1");

        service
            .upsert_line(&user, CartLineInput::new("p1", "Mug", 2, Money::from_cents(1000)))
            .await
            .unwrap();
        let lines = service.get(&user).await.unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].qty, 2);
    }

    #[tokio::test]
    async fn carts_are_per_user() {
        let service = service();
        service
            .upsert_line(
                &UserId::new("u-1"),
                CartLineInput::new("p1", "Mug", 1, Money::from_cents(1000)),
            )
            .await
            .unwrap();

        assert!(service.get(&UserId::new("u-2")).await.unwrap().is_empty());
        assert!(matches!(
            service.clear(&UserId::new("u-2")).await,
            Err(DomainError::Cart(CartError::NotFound))
        ));
    }

    #[tokio::test]
    async fn concurrent_upserts_of_different_products_all_land() {
        let store = InMemoryEventStore::new();
        let user = UserId::new("u-1");

        let mut tasks = Vec::new();
        for i in 0..2 {
            let service = CartService::new(store.clone());
            let user = user.clone();
            tasks.push(tokio::spawn(async move {
                service
                    .upsert_line(
                        &user,
                        CartLineInput::new(format!("p{i}"), "Item", 1, Money::from_cents(100)),
                    )
                    .await
                    .map(|_| ())
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let lines = CartService::new(store).get(&user).await.unwrap();
        assert_eq!(lines.len(), 2);
    }
}
