//! Order settlement state.

use serde::{Deserialize, Serialize};

/// Where an order is in its lifecycle.
///
/// ```text
/// Unpaid ──► Paid ──► Delivered
/// ```
///
/// Item, address and amount fields are fixed at placement; only this
/// settlement sub-state moves, and it never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderState {
    /// Placed, waiting for the buyer to complete payment.
    #[default]
    Unpaid,

    /// Settlement recorded.
    Paid,

    /// Handed over by fulfillment (terminal state).
    Delivered,
}

impl OrderState {
    pub fn can_mark_paid(&self) -> bool {
        matches!(self, OrderState::Unpaid)
    }

    pub fn can_mark_delivered(&self) -> bool {
        matches!(self, OrderState::Paid)
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, OrderState::Paid | OrderState::Delivered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Unpaid => "Unpaid",
            OrderState::Paid => "Paid",
            OrderState::Delivered => "Delivered",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_only_move_forward() {
        assert!(OrderState::Unpaid.can_mark_paid());
        assert!(!OrderState::Paid.can_mark_paid());
        assert!(!OrderState::Delivered.can_mark_paid());

        assert!(!OrderState::Unpaid.can_mark_delivered());
        assert!(OrderState::Paid.can_mark_delivered());

        assert!(!OrderState::Unpaid.is_paid());
        assert!(OrderState::Delivered.is_paid());
        assert_eq!(OrderState::default(), OrderState::Unpaid);
    }
}
