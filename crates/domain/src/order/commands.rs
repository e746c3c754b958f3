//! Order commands.

use common::{AggregateId, UserId};

use crate::cart::CartLine;
use crate::command::Command;
use crate::money::Money;
use crate::value_objects::{PaymentResult, ShippingAddress};

use super::Order;

/// Command to create an unpaid order from a cart snapshot.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: AggregateId,

    /// The buyer.
    pub user: UserId,

    pub items: Vec<CartLine>,

    pub shipping_address: ShippingAddress,

    /// Free-form method name, "Card" when blank.
    pub payment_method: String,

    pub tax_price: Money,

    pub shipping_price: Money,
}

impl PlaceOrder {
    /// A new order with zero tax and shipping.
    pub fn new(
        order_id: AggregateId,
        user: UserId,
        items: Vec<CartLine>,
        shipping_address: ShippingAddress,
    ) -> Self {
        Self {
            order_id,
            user,
            items,
            shipping_address,
            payment_method: String::new(),
            tax_price: Money::zero(),
            shipping_price: Money::zero(),
        }
    }

    pub fn with_fees(mut self, tax_price: Money, shipping_price: Money) -> Self {
        self.tax_price = tax_price;
        self.shipping_price = shipping_price;
        self
    }

    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = payment_method.into();
        self
    }
}

impl Command for PlaceOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to record settlement of an order.
#[derive(Debug, Clone)]
pub struct MarkOrderPaid {
    pub order_id: AggregateId,
    pub payment_result: PaymentResult,
}

impl MarkOrderPaid {
    pub fn new(order_id: AggregateId, payment_result: PaymentResult) -> Self {
        Self {
            order_id,
            payment_result,
        }
    }
}

impl Command for MarkOrderPaid {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to flag a paid order as delivered.
#[derive(Debug, Clone)]
pub struct MarkOrderDelivered {
    pub order_id: AggregateId,
}

impl MarkOrderDelivered {
    pub fn new(order_id: AggregateId) -> Self {
        Self { order_id }
    }
}

impl Command for MarkOrderDelivered {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_target_their_order() {
        let order_id = AggregateId::new();
        let address = ShippingAddress::new("DE", "10115", "Berlin", "Invalidenstr. 1");

        let place = PlaceOrder::new(order_id, UserId::new("u-1"), vec![], address)
            .with_fees(Money::from_cents(10), Money::from_cents(20))
            .with_payment_method("PayPal");
        assert_eq!(place.aggregate_id(), order_id);
        assert_eq!(place.tax_price.cents(), 10);
        assert_eq!(place.payment_method, "PayPal");

        let paid = MarkOrderPaid::new(order_id, PaymentResult::new("pi_1", "succeeded"));
        assert_eq!(paid.aggregate_id(), order_id);
        assert_eq!(MarkOrderDelivered::new(order_id).aggregate_id(), order_id);
    }
}
