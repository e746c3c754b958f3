//! Per-buyer order history, backing "my orders".

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use domain::{Money, OrderEvent};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// One row of a buyer's order history.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub order_id: AggregateId,
    pub created_at: DateTime<Utc>,
    pub total_price: Money,
    pub item_count: usize,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
}

struct BuyerOrdersState {
    /// Orders per buyer, in placement order.
    by_buyer: HashMap<UserId, Vec<OrderSummary>>,
    /// Maps order_id -> buyer for settlement and delivery events.
    order_to_buyer: HashMap<AggregateId, UserId>,
    position: ProjectionPosition,
}

impl BuyerOrdersState {
    fn summary_mut(&mut self, order_id: AggregateId) -> Option<&mut OrderSummary> {
        let buyer = self.order_to_buyer.get(&order_id)?;
        self.by_buyer
            .get_mut(buyer)?
            .iter_mut()
            .find(|summary| summary.order_id == order_id)
    }
}

/// Read model of every buyer's orders.
#[derive(Clone)]
pub struct BuyerOrdersView {
    state: Arc<RwLock<BuyerOrdersState>>,
}

impl BuyerOrdersView {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(BuyerOrdersState {
                by_buyer: HashMap::new(),
                order_to_buyer: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// `buyer`'s orders, newest first.
    pub async fn orders_for(&self, buyer: &UserId) -> Vec<OrderSummary> {
        let state = self.state.read().await;
        let mut orders = state.by_buyer.get(buyer).cloned().unwrap_or_default();
        orders.reverse();
        orders
    }

    pub async fn get(&self, order_id: AggregateId) -> Option<OrderSummary> {
        let state = self.state.read().await;
        let buyer = state.order_to_buyer.get(&order_id)?;
        state
            .by_buyer
            .get(buyer)?
            .iter()
            .find(|summary| summary.order_id == order_id)
            .cloned()
    }

    /// Orders placed but never settled, oldest first.
    pub async fn unpaid_orders(&self) -> Vec<OrderSummary> {
        let state = self.state.read().await;
        let mut unpaid: Vec<OrderSummary> = state
            .by_buyer
            .values()
            .flatten()
            .filter(|summary| !summary.is_paid)
            .cloned()
            .collect();
        unpaid.sort_by_key(|summary| summary.created_at);
        unpaid
    }
}

impl Default for BuyerOrdersView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for BuyerOrdersView {
    fn name(&self) -> &'static str {
        "BuyerOrdersView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type != "Order" {
            let mut state = self.state.write().await;
            state.position = state.position.advance();
            return Ok(());
        }

        let order_event: OrderEvent = serde_json::from_value(event.payload.clone())?;
        let order_id = event.aggregate_id;

        let mut state = self.state.write().await;

        match order_event {
            OrderEvent::OrderPlaced(data) => {
                state.order_to_buyer.insert(order_id, data.user.clone());
                state
                    .by_buyer
                    .entry(data.user)
                    .or_default()
                    .push(OrderSummary {
                        order_id,
                        created_at: data.placed_at,
                        total_price: data.totals.total_price,
                        item_count: data.items.len(),
                        is_paid: false,
                        paid_at: None,
                        is_delivered: false,
                        delivered_at: None,
                    });
            }
            OrderEvent::OrderPaid(data) => {
                if let Some(summary) = state.summary_mut(order_id) {
                    summary.is_paid = true;
                    summary.paid_at = Some(data.paid_at);
                }
            }
            OrderEvent::OrderDelivered(data) => {
                if let Some(summary) = state.summary_mut(order_id) {
                    summary.is_delivered = true;
                    summary.delivered_at = Some(data.delivered_at);
                }
            }
        }

        state.position = state.position.advance();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.by_buyer.clear();
        state.order_to_buyer.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for BuyerOrdersView {
    fn name(&self) -> &'static str {
        "BuyerOrdersView"
    }

    fn count(&self) -> usize {
        self.state
            .try_read()
            .map(|s| s.order_to_buyer.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CartLine, DomainEvent, OrderTotals, PaymentResult, ProductId, ShippingAddress};
    use event_store::Version;

    fn make_envelope(aggregate_id: AggregateId, version: i64, event: &OrderEvent) -> EventEnvelope {
        EventEnvelope::from_event(
            aggregate_id,
            "Order",
            Version::new(version),
            event.event_type(),
            event,
        )
        .unwrap()
    }

    fn placed(order_id: AggregateId, buyer: &str, cents: i64) -> OrderEvent {
        let items = vec![CartLine {
            product: ProductId::new("p1"),
            name: "Mug".into(),
            image: String::new(),
            unit_price: Money::from_cents(cents),
            qty: 1,
        }];
        let totals = OrderTotals::compute(&items, Money::zero(), Money::zero()).unwrap();
        OrderEvent::order_placed(
            order_id,
            UserId::new(buyer),
            items,
            ShippingAddress::new("DE", "10115", "Berlin", "Invalidenstr. 1"),
            "Card".into(),
            totals,
        )
    }

    #[tokio::test]
    async fn test_order_placed_adds_summary() {
        let view = BuyerOrdersView::new();
        let order_id = AggregateId::new();

        view.handle(&make_envelope(order_id, 1, &placed(order_id, "u-1", 1000)))
            .await
            .unwrap();

        let orders = view.orders_for(&UserId::new("u-1")).await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id, order_id);
        assert_eq!(orders[0].total_price.cents(), 1000);
        assert_eq!(orders[0].item_count, 1);
        assert!(!orders[0].is_paid);
        assert_eq!(view.count(), 1);
    }

    #[tokio::test]
    async fn test_settlement_and_delivery_update_summary() {
        let view = BuyerOrdersView::new();
        let order_id = AggregateId::new();

        view.handle(&make_envelope(order_id, 1, &placed(order_id, "u-1", 1000)))
            .await
            .unwrap();
        let paid = OrderEvent::order_paid(PaymentResult::new("pi_1", "succeeded"));
        view.handle(&make_envelope(order_id, 2, &paid)).await.unwrap();
        view.handle(&make_envelope(order_id, 3, &OrderEvent::order_delivered()))
            .await
            .unwrap();

        let summary = view.get(order_id).await.unwrap();
        assert!(summary.is_paid);
        assert!(summary.paid_at.is_some());
        assert!(summary.is_delivered);
        assert!(view.unpaid_orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_orders_are_per_buyer_newest_first() {
        let view = BuyerOrdersView::new();
        let first = AggregateId::new();
        let second = AggregateId::new();
        let other = AggregateId::new();

        view.handle(&make_envelope(first, 1, &placed(first, "u-1", 100)))
            .await
            .unwrap();
        view.handle(&make_envelope(other, 1, &placed(other, "u-2", 100)))
            .await
            .unwrap();
        view.handle(&make_envelope(second, 1, &placed(second, "u-1", 200)))
            .await
            .unwrap();

        let ids: Vec<AggregateId> = view
            .orders_for(&UserId::new("u-1"))
            .await
            .iter()
            .map(|s| s.order_id)
            .collect();
        assert_eq!(ids, [second, first]);
        assert_eq!(view.unpaid_orders().await.len(), 3);
        assert!(view.orders_for(&UserId::new("nobody")).await.is_empty());
    }

    #[tokio::test]
    async fn test_other_streams_only_advance_position() {
        let view = BuyerOrdersView::new();
        let cart_event = EventEnvelope::new(
            AggregateId::new(),
            "Cart",
            Version::first(),
            "CartCleared",
            serde_json::json!({}),
        );

        view.handle(&cart_event).await.unwrap();

        assert_eq!(view.position().await.events_processed, 1);
        assert_eq!(view.count(), 0);
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let view = BuyerOrdersView::new();
        let order_id = AggregateId::new();
        view.handle(&make_envelope(order_id, 1, &placed(order_id, "u-1", 100)))
            .await
            .unwrap();

        view.reset().await.unwrap();

        assert_eq!(view.count(), 0);
        assert_eq!(view.position().await, ProjectionPosition::zero());
    }
}
