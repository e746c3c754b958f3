//! Cart domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::value_objects::ProductId;

use super::CartLine;

/// Events that can occur on a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    /// The user's cart was created by their first add.
    CartOpened(CartOpenedData),

    /// A new line entered the cart with its price snapshot.
    CartLineAdded(CartLine),

    /// An existing line's quantity was replaced.
    CartLineQuantityChanged(CartLineQuantityChangedData),

    CartLineRemoved(CartLineRemovedData),

    /// All lines were dropped, either explicitly or after settlement.
    CartCleared(CartClearedData),
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::CartOpened(_) => "CartOpened",
            CartEvent::CartLineAdded(_) => "CartLineAdded",
            CartEvent::CartLineQuantityChanged(_) => "CartLineQuantityChanged",
            CartEvent::CartLineRemoved(_) => "CartLineRemoved",
            CartEvent::CartCleared(_) => "CartCleared",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartOpenedData {
    pub cart_id: AggregateId,
    pub owner: UserId,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineQuantityChangedData {
    pub product: ProductId,
    pub old_qty: u32,
    pub new_qty: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineRemovedData {
    pub product: ProductId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartClearedData {
    pub cleared_at: DateTime<Utc>,

    /// Number of lines that were dropped.
    pub line_count: usize,
}

impl CartEvent {
    pub fn cart_opened(cart_id: AggregateId, owner: UserId) -> Self {
        CartEvent::CartOpened(CartOpenedData {
            cart_id,
            owner,
            opened_at: Utc::now(),
        })
    }

    pub fn line_quantity_changed(product: ProductId, old_qty: u32, new_qty: u32) -> Self {
        CartEvent::CartLineQuantityChanged(CartLineQuantityChangedData {
            product,
            old_qty,
            new_qty,
        })
    }

    pub fn line_removed(product: ProductId) -> Self {
        CartEvent::CartLineRemoved(CartLineRemovedData { product })
    }

    pub fn cart_cleared(line_count: usize) -> Self {
        CartEvent::CartCleared(CartClearedData {
            cleared_at: Utc::now(),
            line_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    #[test]
    fn event_types() {
        let id = AggregateId::new();
        assert_eq!(
            CartEvent::cart_opened(id, UserId::new("u-1")).event_type(),
            "CartOpened"
        );
        assert_eq!(
            CartEvent::line_removed(ProductId::new("p1")).event_type(),
            "CartLineRemoved"
        );
        assert_eq!(CartEvent::cart_cleared(2).event_type(), "CartCleared");
    }

    #[test]
    fn line_added_serialization() {
        let line = CartLine {
            product: ProductId::new("p1"),
            name: "Mug".into(),
            image: "/img/mug.png".into(),
            unit_price: Money::from_cents(1250),
            qty: 2,
        };
        let json = serde_json::to_value(CartEvent::CartLineAdded(line)).unwrap();
        assert_eq!(json["type"], "CartLineAdded");
        assert_eq!(json["data"]["product"], "p1");

        let back: CartEvent = serde_json::from_value(json).unwrap();
        match back {
            CartEvent::CartLineAdded(line) => {
                assert_eq!(line.qty, 2);
                assert_eq!(line.unit_price.cents(), 1250);
            }
            other => panic!("expected CartLineAdded, got {other:?}"),
        }
    }
}
