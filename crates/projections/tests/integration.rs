//! Integration tests: domain services → ProjectionProcessor → BuyerOrdersView.

use common::{AggregateId, UserId};
use domain::{
    CartLineInput, CartService, MarkOrderDelivered, MarkOrderPaid, Money, OrderService,
    PaymentResult, PlaceOrder, ShippingAddress,
};
use event_store::InMemoryEventStore;
use projections::{BuyerOrdersView, ProjectionProcessor, ReadModel};

fn setup() -> (
    CartService<InMemoryEventStore>,
    OrderService<InMemoryEventStore>,
    ProjectionProcessor<InMemoryEventStore>,
    BuyerOrdersView,
) {
    let store = InMemoryEventStore::new();
    let view = BuyerOrdersView::new();

    let mut processor = ProjectionProcessor::new(store.clone());
    processor.register(Box::new(view.clone()));

    (
        CartService::new(store.clone()),
        OrderService::new(store),
        processor,
        view,
    )
}

fn address() -> ShippingAddress {
    ShippingAddress::new("ES", "28013", "Madrid", "Calle Mayor 1")
}

async fn checkout(
    carts: &CartService<InMemoryEventStore>,
    orders: &OrderService<InMemoryEventStore>,
    buyer: &UserId,
) -> AggregateId {
    carts
        .upsert_line(buyer, CartLineInput::new("p1", "Widget", 3, Money::from_cents(1000)))
        .await
        .unwrap();
    carts
        .upsert_line(buyer, CartLineInput::new("p2", "Gadget", 1, Money::from_cents(2500)))
        .await
        .unwrap();

    let order_id = AggregateId::new();
    let items = carts.get(buyer).await.unwrap();
    orders
        .place_order(
            PlaceOrder::new(order_id, buyer.clone(), items, address())
                .with_fees(Money::from_cents(550), Money::zero()),
        )
        .await
        .unwrap();
    carts.clear(buyer).await.unwrap();
    order_id
}

#[tokio::test]
async fn test_full_order_lifecycle_in_view() {
    let (carts, orders, processor, view) = setup();
    let buyer = UserId::new("buyer-1");

    let order_id = checkout(&carts, &orders, &buyer).await;
    processor.run_catch_up().await.unwrap();

    let summary = view.get(order_id).await.unwrap();
    assert_eq!(summary.total_price.cents(), 6050); // 3*10 + 1*25 + 5.50 tax
    assert_eq!(summary.item_count, 2);
    assert!(!summary.is_paid);

    orders
        .mark_paid(MarkOrderPaid::new(
            order_id,
            PaymentResult::new("pi_100", "succeeded"),
        ))
        .await
        .unwrap();
    orders
        .mark_delivered(MarkOrderDelivered::new(order_id))
        .await
        .unwrap();
    processor.run_catch_up().await.unwrap();

    let summary = view.get(order_id).await.unwrap();
    assert!(summary.is_paid);
    assert!(summary.is_delivered);
}

#[tokio::test]
async fn test_cart_events_do_not_create_rows() {
    let (carts, _orders, processor, view) = setup();

    carts
        .upsert_line(
            &UserId::new("buyer-1"),
            CartLineInput::new("p1", "Widget", 1, Money::from_cents(100)),
        )
        .await
        .unwrap();
    processor.run_catch_up().await.unwrap();

    assert_eq!(view.count(), 0);
    assert!(view.orders_for(&UserId::new("buyer-1")).await.is_empty());
}

#[tokio::test]
async fn test_rebuild_matches_incremental() {
    let (carts, orders, processor, view) = setup();
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");

    checkout(&carts, &orders, &alice).await;
    processor.run_catch_up().await.unwrap();
    checkout(&carts, &orders, &alice).await;
    checkout(&carts, &orders, &bob).await;
    processor.run_catch_up().await.unwrap();

    let before = view.orders_for(&alice).await;
    processor.rebuild_all().await.unwrap();
    let after = view.orders_for(&alice).await;

    assert_eq!(before.len(), 2);
    assert_eq!(before, after);
    assert_eq!(view.orders_for(&bob).await.len(), 1);
    assert_eq!(view.count(), 3);
}
