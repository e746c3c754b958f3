//! Checkout saga state machine.

use serde::{Deserialize, Serialize};

/// Where a checkout is in its lifecycle.
///
/// ```text
/// CartReady ──► OrderCreated ──► PaymentConfirmed ──► Settled
/// ```
///
/// A failed settlement leaves the saga in `PaymentConfirmed` with a
/// failure recorded; the order stays unpaid for manual support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    #[default]
    CartReady,

    /// The unpaid order exists.
    OrderCreated,

    /// The buyer reported a successful payment.
    PaymentConfirmed,

    /// The order is marked paid (terminal).
    Settled,
}

impl CheckoutState {
    pub fn can_confirm_payment(&self) -> bool {
        matches!(self, CheckoutState::OrderCreated)
    }

    pub fn can_settle(&self) -> bool {
        matches!(self, CheckoutState::PaymentConfirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Settled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::CartReady => "CART_READY",
            CheckoutState::OrderCreated => "ORDER_CREATED",
            CheckoutState::PaymentConfirmed => "PAYMENT_CONFIRMED",
            CheckoutState::Settled => "SETTLED",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
