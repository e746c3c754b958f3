//! Order service: the order store.

use common::AggregateId;
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{MarkOrderDelivered, MarkOrderPaid, Order, OrderError, PlaceOrder};

impl From<OrderError> for DomainError {
    fn from(e: OrderError) -> Self {
        DomainError::Order(e)
    }
}

/// Service for managing orders.
///
/// Wraps the command handler for the order aggregate. Ownership and role
/// checks belong to the caller; this layer only enforces the order's own
/// lifecycle rules.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: EventStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, user_id = %cmd.user))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<CommandResult<Order>, DomainError> {
        let order_id = cmd.order_id;
        let result = self.handler.execute(order_id, |order| order.place(cmd)).await?;

        tracing::info!(
            total_cents = result.aggregate.total_price().cents(),
            items = result.aggregate.items().len(),
            "order placed"
        );
        Ok(result)
    }

    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, payment_id = %cmd.payment_result.id))]
    pub async fn mark_paid(&self, cmd: MarkOrderPaid) -> Result<CommandResult<Order>, DomainError> {
        let payment_result = cmd.payment_result;

        self.handler
            .execute(cmd.order_id, |order| order.mark_paid(payment_result))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(
        &self,
        cmd: MarkOrderDelivered,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.handler
            .execute(cmd.order_id, Order::mark_delivered)
            .await
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: AggregateId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id).await
    }
}

impl<S: EventStore + Clone> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self::new(self.handler.store().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartLine;
    use crate::money::Money;
    use crate::value_objects::{PaymentResult, ProductId, ShippingAddress};
    use common::UserId;
    use event_store::InMemoryEventStore;

    fn place_cmd(order_id: AggregateId) -> PlaceOrder {
        PlaceOrder::new(
            order_id,
            UserId::new("u-1"),
            vec![CartLine {
                product: ProductId::new("p1"),
                name: "Mug".into(),
                image: String::new(),
                unit_price: Money::from_cents(1000),
                qty: 1,
            }],
            ShippingAddress::new("DE", "10115", "Berlin", "Invalidenstr. 1"),
        )
    }

    #[tokio::test]
    async fn test_place_and_load() {
        let service = OrderService::new(InMemoryEventStore::new());
        let order_id = AggregateId::new();

        let result = service.place_order(place_cmd(order_id)).await.unwrap();
        assert_eq!(result.events.len(), 1);

        let order = service.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.total_price().cents(), 1000);
        assert!(!order.is_paid());
    }

    #[tokio::test]
    async fn test_get_unknown_order() {
        let service = OrderService::new(InMemoryEventStore::new());
        assert!(service.get_order(AggregateId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_paid_twice_writes_once() {
        let store = InMemoryEventStore::new();
        let service = OrderService::new(store.clone());
        let order_id = AggregateId::new();
        service.place_order(place_cmd(order_id)).await.unwrap();

        let cmd = MarkOrderPaid::new(order_id, PaymentResult::new("pi_1", "succeeded"));
        let first = service.mark_paid(cmd.clone()).await.unwrap();
        let second = service.mark_paid(cmd).await.unwrap();

        assert_eq!(first.events.len(), 1);
        assert!(second.events.is_empty());
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn test_mark_unknown_order_paid() {
        let service = OrderService::new(InMemoryEventStore::new());
        let result = service
            .mark_paid(MarkOrderPaid::new(
                AggregateId::new(),
                PaymentResult::new("pi_1", "succeeded"),
            ))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::NotPlaced))
        ));
    }
}
