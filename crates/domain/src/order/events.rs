//! Order domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::cart::CartLine;
use crate::value_objects::{PaymentResult, ShippingAddress};

use super::OrderTotals;

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// The order was created, unpaid, from a cart snapshot.
    OrderPlaced(OrderPlacedData),

    /// Settlement was recorded.
    OrderPaid(OrderPaidData),

    OrderDelivered(OrderDeliveredData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::OrderPaid(_) => "OrderPaid",
            OrderEvent::OrderDelivered(_) => "OrderDelivered",
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: AggregateId,

    /// The buyer.
    pub user: UserId,

    /// Line snapshots, priced as they were in the cart.
    pub items: Vec<CartLine>,

    pub shipping_address: ShippingAddress,

    pub payment_method: String,

    /// Server-computed totals.
    pub totals: OrderTotals,

    pub placed_at: DateTime<Utc>,
}

/// Data for OrderPaid event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPaidData {
    pub payment_result: PaymentResult,
    pub paid_at: DateTime<Utc>,
}

/// Data for OrderDelivered event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDeliveredData {
    pub delivered_at: DateTime<Utc>,
}

// Convenience constructors for events
impl OrderEvent {
    pub fn order_placed(
        order_id: AggregateId,
        user: UserId,
        items: Vec<CartLine>,
        shipping_address: ShippingAddress,
        payment_method: String,
        totals: OrderTotals,
    ) -> Self {
        OrderEvent::OrderPlaced(OrderPlacedData {
            order_id,
            user,
            items,
            shipping_address,
            payment_method,
            totals,
            placed_at: Utc::now(),
        })
    }

    pub fn order_paid(payment_result: PaymentResult) -> Self {
        OrderEvent::OrderPaid(OrderPaidData {
            payment_result,
            paid_at: Utc::now(),
        })
    }

    pub fn order_delivered() -> Self {
        OrderEvent::OrderDelivered(OrderDeliveredData {
            delivered_at: Utc::now(),
        })
    }
}
