//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::cart::CartLine;
use crate::money::{Money, MoneyError};
use crate::value_objects::{PaymentResult, ShippingAddress};

use super::{OrderError, OrderEvent, OrderState, PlaceOrder, events::OrderPlacedData};

/// Price breakdown of an order, fixed at placement.
///
/// `total_price == items_price + tax_price + shipping_price` always holds
/// for values built by [`OrderTotals::compute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    pub items_price: Money,
    pub tax_price: Money,
    pub shipping_price: Money,
    pub total_price: Money,
}

impl OrderTotals {
    /// Fails with [`MoneyError::Overflow`] when any line or the grand total
    /// leaves the cents range.
    pub fn compute(
        items: &[CartLine],
        tax_price: Money,
        shipping_price: Money,
    ) -> Result<Self, MoneyError> {
        let items_price = Money::try_sum(items.iter().map(CartLine::line_total))?;
        let total_price = items_price
            .checked_add(tax_price)?
            .checked_add(shipping_price)?;
        Ok(Self {
            items_price,
            tax_price,
            shipping_price,
            total_price,
        })
    }
}

/// Order aggregate root.
///
/// Created once by [`Order::place`]. After that only the settlement
/// sub-state (paid, delivered) changes.
#[derive(Debug, Clone, Default)]
pub struct Order {
    id: Option<AggregateId>,
    version: Version,
    user: Option<UserId>,
    state: OrderState,
    items: Vec<CartLine>,
    shipping_address: Option<ShippingAddress>,
    payment_method: String,
    totals: OrderTotals,
    created_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    payment_result: Option<PaymentResult>,
    delivered_at: Option<DateTime<Utc>>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
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
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(data),
            OrderEvent::OrderPaid(data) => {
                self.state = OrderState::Paid;
                self.paid_at = Some(data.paid_at);
                self.payment_result = Some(data.payment_result);
            }
            OrderEvent::OrderDelivered(data) => {
                self.state = OrderState::Delivered;
                self.delivered_at = Some(data.delivered_at);
            }
        }
    }
}

// Query methods
impl Order {
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// True when `user` placed this order.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.user.as_ref() == Some(user)
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    pub fn shipping_address(&self) -> Option<&ShippingAddress> {
        self.shipping_address.as_ref()
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn totals(&self) -> OrderTotals {
        self.totals
    }

    pub fn total_price(&self) -> Money {
        self.totals.total_price
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn is_paid(&self) -> bool {
        self.state.is_paid()
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn payment_result(&self) -> Option<&PaymentResult> {
        self.payment_result.as_ref()
    }

    pub fn is_delivered(&self) -> bool {
        self.state == OrderState::Delivered
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }
}

// Command methods (return events)
impl Order {
    /// Creates the order from a cart snapshot. Totals are computed here,
    /// never taken from the client.
    pub fn place(&self, cmd: PlaceOrder) -> Result<Vec<OrderEvent>, OrderError> {
        let PlaceOrder {
            order_id,
            user,
            items,
            shipping_address,
            payment_method,
            tax_price,
            shipping_price,
        } = cmd;

        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        for item in &items {
            if item.qty == 0 {
                return Err(OrderError::InvalidQuantity {
                    product: item.product.clone(),
                    qty: item.qty,
                });
            }
            if item.unit_price.is_negative() {
                return Err(OrderError::InvalidPrice {
                    product: item.product.clone(),
                });
            }
        }
        if tax_price.is_negative() {
            return Err(OrderError::NegativeAmount { field: "taxPrice" });
        }
        if shipping_price.is_negative() {
            return Err(OrderError::NegativeAmount {
                field: "shippingPrice",
            });
        }
        if let Some(field) = shipping_address.missing_field() {
            return Err(OrderError::InvalidAddress { field });
        }

        let totals = OrderTotals::compute(&items, tax_price, shipping_price)
            .map_err(|_| OrderError::AmountOutOfRange)?;
        let payment_method = match payment_method.trim() {
            "" => "Card".to_string(),
            method => method.to_string(),
        };

        Ok(vec![OrderEvent::order_placed(
            order_id,
            user,
            items,
            shipping_address,
            payment_method,
            totals,
        )])
    }

    /// Records settlement.
    ///
    /// Re-recording the payment the order was already paid with is a no-op;
    /// a different payment is rejected.
    pub fn mark_paid(&self, result: PaymentResult) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_none() {
            return Err(OrderError::NotPlaced);
        }
        if let Some(existing) = &self.payment_result {
            if existing.id == result.id {
                return Ok(vec![]);
            }
            return Err(OrderError::AlreadyPaid {
                payment_id: existing.id.clone(),
            });
        }

        Ok(vec![OrderEvent::order_paid(result)])
    }

    pub fn mark_delivered(&self) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_none() {
            return Err(OrderError::NotPlaced);
        }
        if self.state == OrderState::Delivered {
            return Ok(vec![]);
        }
        if !self.state.can_mark_delivered() {
            return Err(OrderError::NotPaid);
        }

        Ok(vec![OrderEvent::order_delivered()])
    }
}

// Apply event helpers
impl Order {
    fn apply_order_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.user = Some(data.user);
        self.state = OrderState::Unpaid;
        self.items = data.items;
        self.shipping_address = Some(data.shipping_address);
        self.payment_method = data.payment_method;
        self.totals = data.totals;
        self.created_at = Some(data.placed_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::ProductId;

    fn line(product: &str, cents: i64, qty: u32) -> CartLine {
        CartLine {
            product: ProductId::new(product),
            name: product.to_uppercase(),
            image: String::new(),
            unit_price: Money::from_cents(cents),
            qty,
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress::new("DE", "10115", "Berlin", "Invalidenstr. 1")
    }

    fn placed_order() -> Order {
        let mut order = Order::default();
        let events = order
            .place(
                PlaceOrder::new(
                    AggregateId::new(),
                    UserId::new("u-1"),
                    vec![line("p1", 1000, 2), line("p2", 250, 1)],
                    address(),
                )
                .with_fees(Money::from_cents(300), Money::from_cents(500)),
            )
            .unwrap();
        order.apply_events(events);
        order
    }

    #[test]
    fn test_place_computes_totals() {
        let order = placed_order();

        assert_eq!(order.state(), OrderState::Unpaid);
        assert!(!order.is_paid());
        assert_eq!(order.totals().items_price.cents(), 2250);
        assert_eq!(order.total_price().cents(), 3050);
        assert!(order.is_owned_by(&UserId::new("u-1")));
        assert!(!order.is_owned_by(&UserId::new("u-2")));
        assert!(order.created_at().is_some());
    }

    #[test]
    fn test_place_twice_fails() {
        let order = placed_order();
        let result = order.place(PlaceOrder::new(
            AggregateId::new(),
            UserId::new("u-1"),
            vec![line("p1", 1000, 1)],
            address(),
        ));
        assert!(matches!(result, Err(OrderError::AlreadyPlaced)));
    }

    #[test]
    fn test_place_validation() {
        let order = Order::default();
        let id = AggregateId::new();
        let user = UserId::new("u-1");
        let place = |items: Vec<CartLine>, address: ShippingAddress, tax: i64| {
            order.place(
                PlaceOrder::new(id, user.clone(), items, address)
                    .with_fees(Money::from_cents(tax), Money::zero()),
            )
        };

        assert!(matches!(
            place(vec![], address(), 0),
            Err(OrderError::NoItems)
        ));
        assert!(matches!(
            place(vec![line("p1", 100, 0)], address(), 0),
            Err(OrderError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            place(vec![line("p1", -100, 1)], address(), 0),
            Err(OrderError::InvalidPrice { .. })
        ));
        assert!(matches!(
            place(vec![line("p1", 100, 1)], address(), -1),
            Err(OrderError::NegativeAmount { field: "taxPrice" })
        ));
        let mut bad = address();
        bad.postal_code.clear();
        assert!(matches!(
            place(vec![line("p1", 100, 1)], bad, 0),
            Err(OrderError::InvalidAddress {
                field: "postalCode"
            })
        ));
    }

    #[test]
    fn test_blank_payment_method_defaults_to_card() {
        let mut order = Order::default();
        let events = order
            .place(
                PlaceOrder::new(
                    AggregateId::new(),
                    UserId::new("u-1"),
                    vec![line("p1", 100, 1)],
                    address(),
                )
                .with_payment_method("  "),
            )
            .unwrap();
        order.apply_events(events);
        assert_eq!(order.payment_method(), "Card");
    }

    #[test]
    fn test_mark_paid_is_idempotent_for_same_payment() {
        let mut order = placed_order();
        let result = PaymentResult::new("pi_1", "succeeded");

        let events = order.mark_paid(result.clone()).unwrap();
        order.apply_events(events);
        assert!(order.is_paid());
        assert!(order.paid_at().is_some());

        assert!(order.mark_paid(result.clone()).unwrap().is_empty());
        assert_eq!(order.payment_result(), Some(&result));

        let other = order.mark_paid(PaymentResult::new("pi_2", "succeeded"));
        assert!(matches!(other, Err(OrderError::AlreadyPaid { payment_id }) if payment_id == "pi_1"));
    }

    #[test]
    fn test_mark_paid_requires_order() {
        let result = Order::default().mark_paid(PaymentResult::new("pi_1", "succeeded"));
        assert!(matches!(result, Err(OrderError::NotPlaced)));
    }

    #[test]
    fn test_delivery_requires_payment() {
        let mut order = placed_order();
        assert!(matches!(order.mark_delivered(), Err(OrderError::NotPaid)));

        let events = order
            .mark_paid(PaymentResult::new("pi_1", "succeeded"))
            .unwrap();
        order.apply_events(events);
        let events = order.mark_delivered().unwrap();
        order.apply_events(events);

        assert!(order.is_delivered());
        assert!(order.is_paid());
        assert!(order.delivered_at().is_some());
        assert!(order.mark_delivered().unwrap().is_empty());
    }

    #[test]
    fn test_place_rejects_totals_out_of_range() {
        let cmd = PlaceOrder::new(
            AggregateId::new(),
            UserId::new("u-1"),
            vec![line("p1", 9_000_000_000_000_000_000, 2)],
            address(),
        );
        assert!(matches!(
            Order::default().place(cmd),
            Err(OrderError::AmountOutOfRange)
        ));

        let cmd = PlaceOrder::new(
            AggregateId::new(),
            UserId::new("u-1"),
            vec![line("p1", i64::MAX, 1)],
            address(),
        )
        .with_fees(Money::zero(), Money::from_cents(1));
        assert!(matches!(
            Order::default().place(cmd),
            Err(OrderError::AmountOutOfRange)
        ));
    }
}
