//! Integration tests for the Order aggregate.
//!
//! These tests drive orders through the service over the in-memory store:
//! placement from a cart snapshot, settlement, delivery, replay and
//! concurrent writers.

use common::{AggregateId, UserId};
use domain::{
    Aggregate, CartLine, CartLineInput, CartService, DomainError, DomainEvent, MarkOrderDelivered,
    MarkOrderPaid, Money, Order, OrderError, OrderEvent, OrderService, OrderState, PaymentResult,
    PlaceOrder, ProductId, ShippingAddress,
};
use event_store::{EventStore, EventStoreError, InMemoryEventStore, Version};

fn create_service() -> OrderService<InMemoryEventStore> {
    OrderService::new(InMemoryEventStore::new())
}

fn address() -> ShippingAddress {
    ShippingAddress::new("NL", "1012 AB", "Amsterdam", "Damrak 1")
}

fn line(product: &str, cents: i64, qty: u32) -> CartLine {
    CartLine {
        product: ProductId::new(product),
        name: format!("Product {product}"),
        image: format!("/images/{product}.jpg"),
        unit_price: Money::from_cents(cents),
        qty,
    }
}

mod order_lifecycle {
    use super::*;

    #[tokio::test]
    async fn single_item_checkout_to_paid() {
        let service = create_service();
        let order_id = AggregateId::new();

        let result = service
            .place_order(PlaceOrder::new(
                order_id,
                UserId::new("buyer-1"),
                vec![line("p1", 1000, 1)],
                address(),
            ))
            .await
            .unwrap();
        assert_eq!(result.aggregate.state(), OrderState::Unpaid);
        assert_eq!(result.aggregate.total_price().cents(), 1000);
        assert!(!result.aggregate.is_paid());
        assert_eq!(result.new_version, Version::first());

        let result = service
            .mark_paid(MarkOrderPaid::new(
                order_id,
                PaymentResult::new("pi_1", "succeeded"),
            ))
            .await
            .unwrap();
        assert!(result.aggregate.is_paid());
        assert!(result.aggregate.paid_at().is_some());
        assert_eq!(result.aggregate.payment_result().unwrap().id, "pi_1");

        let result = service
            .mark_delivered(MarkOrderDelivered::new(order_id))
            .await
            .unwrap();
        assert_eq!(result.aggregate.state(), OrderState::Delivered);
        assert_eq!(result.new_version, Version::new(3));
    }

    #[tokio::test]
    async fn order_snapshots_cart_prices() {
        let store = InMemoryEventStore::new();
        let carts = CartService::new(store.clone());
        let orders = OrderService::new(store);
        let buyer = UserId::new("buyer-1");

        carts
            .upsert_line(
                &buyer,
                CartLineInput::new("p1", "Mug", 2, Money::from_cents(1500))
                    .with_discounted_price(Money::from_cents(1200)),
            )
            .await
            .unwrap();
        let snapshot = carts.get(&buyer).await.unwrap();

        let order_id = AggregateId::new();
        orders
            .place_order(
                PlaceOrder::new(order_id, buyer, snapshot, address())
                    .with_fees(Money::from_cents(240), Money::from_cents(500)),
            )
            .await
            .unwrap();

        let order = orders.get_order(order_id).await.unwrap().unwrap();
        let totals = order.totals();
        assert_eq!(order.items()[0].unit_price.cents(), 1200);
        assert_eq!(totals.items_price.cents(), 2400);
        assert_eq!(
            totals.total_price,
            totals
                .items_price
                .checked_add(totals.tax_price)
                .and_then(|sum| sum.checked_add(totals.shipping_price))
                .unwrap()
        );
        assert_eq!(totals.total_price.cents(), 3140);
    }

    #[tokio::test]
    async fn aggregate_reconstruction_from_events() {
        let store = InMemoryEventStore::new();
        let service = OrderService::new(store.clone());
        let order_id = AggregateId::new();

        service
            .place_order(PlaceOrder::new(
                order_id,
                UserId::new("buyer-1"),
                vec![line("p1", 999, 3), line("p2", 1, 1)],
                address(),
            ))
            .await
            .unwrap();
        service
            .mark_paid(MarkOrderPaid::new(
                order_id,
                PaymentResult::new("pi_9", "succeeded").with_email("buyer@example.com"),
            ))
            .await
            .unwrap();

        let envelopes = store.get_events_for_aggregate(order_id).await.unwrap();
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].aggregate_type, "Order");

        let mut order = Order::default();
        for envelope in envelopes {
            let event: OrderEvent = serde_json::from_value(envelope.payload).unwrap();
            order.apply(event);
        }

        assert_eq!(order.id(), Some(order_id));
        assert_eq!(order.items().len(), 2);
        assert_eq!(order.total_price().cents(), 2998);
        assert_eq!(
            order.payment_result().unwrap().email_address,
            "buyer@example.com"
        );
    }

    #[tokio::test]
    async fn event_types_are_stored() {
        let store = InMemoryEventStore::new();
        let service = OrderService::new(store.clone());
        let order_id = AggregateId::new();

        let placed = service
            .place_order(PlaceOrder::new(
                order_id,
                UserId::new("buyer-1"),
                vec![line("p1", 100, 1)],
                address(),
            ))
            .await
            .unwrap();

        assert_eq!(placed.events[0].event_type(), "OrderPlaced");
        assert_eq!(store.event_types(order_id).await, ["OrderPlaced"]);
    }
}

mod concurrency {
    use super::*;
    use event_store::{AppendOptions, EventEnvelope};

    #[tokio::test]
    async fn concurrent_settlements_detected() {
        let store = InMemoryEventStore::new();
        let service = OrderService::new(store.clone());
        let order_id = AggregateId::new();

        service
            .place_order(PlaceOrder::new(
                order_id,
                UserId::new("buyer-1"),
                vec![line("p1", 100, 1)],
                address(),
            ))
            .await
            .unwrap();

        // Two writers both loaded version 1.
        let paid = |id: &str| {
            let event = OrderEvent::order_paid(PaymentResult::new(id, "succeeded"));
            EventEnvelope::from_event(
                order_id,
                "Order",
                Version::new(2),
                event.event_type(),
                &event,
            )
            .unwrap()
        };

        store
            .append(vec![paid("pi_1")], AppendOptions::expect_version(Version::first()))
            .await
            .unwrap();
        let result = store
            .append(vec![paid("pi_2")], AppendOptions::expect_version(Version::first()))
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn same_payment_from_parallel_requests_settles_once() {
        let store = InMemoryEventStore::new();
        let order_id = AggregateId::new();
        create_service_on(&store)
            .place_order(PlaceOrder::new(
                order_id,
                UserId::new("buyer-1"),
                vec![line("p1", 100, 1)],
                address(),
            ))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let service = create_service_on(&store);
            tasks.push(tokio::spawn(async move {
                service
                    .mark_paid(MarkOrderPaid::new(
                        order_id,
                        PaymentResult::new("pi_1", "succeeded"),
                    ))
                    .await
            }));
        }

        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => {}
                Err(e) => assert!(e.is_concurrency_conflict(), "unexpected error: {e}"),
            }
        }
        assert_eq!(
            store.event_types(order_id).await,
            ["OrderPlaced", "OrderPaid"]
        );
    }

    fn create_service_on(store: &InMemoryEventStore) -> OrderService<InMemoryEventStore> {
        OrderService::new(store.clone())
    }
}

mod error_handling {
    use super::*;

    #[tokio::test]
    async fn order_cannot_be_placed_twice() {
        let service = create_service();
        let order_id = AggregateId::new();
        let cmd = PlaceOrder::new(
            order_id,
            UserId::new("buyer-1"),
            vec![line("p1", 100, 1)],
            address(),
        );

        service.place_order(cmd.clone()).await.unwrap();
        let result = service.place_order(cmd).await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::AlreadyPlaced))
        ));
    }

    #[tokio::test]
    async fn different_payment_is_rejected_after_settlement() {
        let service = create_service();
        let order_id = AggregateId::new();
        service
            .place_order(PlaceOrder::new(
                order_id,
                UserId::new("buyer-1"),
                vec![line("p1", 100, 1)],
                address(),
            ))
            .await
            .unwrap();
        service
            .mark_paid(MarkOrderPaid::new(
                order_id,
                PaymentResult::new("pi_1", "succeeded"),
            ))
            .await
            .unwrap();

        let result = service
            .mark_paid(MarkOrderPaid::new(
                order_id,
                PaymentResult::new("pi_2", "succeeded"),
            ))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::AlreadyPaid { .. }))
        ));

        let order = service.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.payment_result().unwrap().id, "pi_1");
    }

    #[tokio::test]
    async fn unpaid_order_cannot_be_delivered() {
        let service = create_service();
        let order_id = AggregateId::new();
        service
            .place_order(PlaceOrder::new(
                order_id,
                UserId::new("buyer-1"),
                vec![line("p1", 100, 1)],
                address(),
            ))
            .await
            .unwrap();

        let result = service
            .mark_delivered(MarkOrderDelivered::new(order_id))
            .await;
        assert!(matches!(result, Err(DomainError::Order(OrderError::NotPaid))));
    }

    #[tokio::test]
    async fn empty_order_is_rejected_without_writing() {
        let store = InMemoryEventStore::new();
        let service = OrderService::new(store.clone());

        let result = service
            .place_order(PlaceOrder::new(
                AggregateId::new(),
                UserId::new("buyer-1"),
                vec![],
                address(),
            ))
            .await;

        assert!(matches!(result, Err(DomainError::Order(OrderError::NoItems))));
        assert_eq!(store.event_count().await, 0);
    }
}
