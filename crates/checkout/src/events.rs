//! Checkout saga events.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use domain::{ContactInfo, DomainEvent, Money, ShippingAddress};
use serde::{Deserialize, Serialize};

/// Cleanup step that clears the buyer's cart.
pub const STEP_CLEAR_CART: &str = "clear_cart";

/// Cleanup step that saves contact and address onto the buyer's profile.
pub const STEP_SAVE_PROFILE: &str = "save_profile";

/// Facts recorded while a checkout moves through its steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CheckoutEvent {
    /// The unpaid order was created.
    CheckoutStarted(CheckoutStartedData),

    /// The buyer reported a successful payment for the order.
    PaymentConfirmed(PaymentConfirmedData),

    /// The order was marked paid.
    SettlementRecorded { settled_at: DateTime<Utc> },

    /// Payment went through but the order could not be marked paid.
    SettlementFailed {
        reason: String,
        failed_at: DateTime<Utc>,
    },

    CleanupStepCompleted { step: String },

    /// A cleanup step failed; the checkout is still settled.
    CleanupStepFailed { step: String, error: String },
}

impl DomainEvent for CheckoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CheckoutEvent::CheckoutStarted(_) => "CheckoutStarted",
            CheckoutEvent::PaymentConfirmed(_) => "PaymentConfirmed",
            CheckoutEvent::SettlementRecorded { .. } => "SettlementRecorded",
            CheckoutEvent::SettlementFailed { .. } => "SettlementFailed",
            CheckoutEvent::CleanupStepCompleted { .. } => "CleanupStepCompleted",
            CheckoutEvent::CleanupStepFailed { .. } => "CleanupStepFailed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutStartedData {
    pub checkout_id: AggregateId,
    pub order_id: AggregateId,
    pub user: UserId,
    pub total_price: Money,
    /// Saved to the profile after settlement.
    pub contact_info: Option<ContactInfo>,
    pub shipping_address: Option<ShippingAddress>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmedData {
    pub payment_intent_id: String,
    pub status: String,
    /// True when the intent was re-fetched from the gateway and matched.
    pub verified: bool,
    pub confirmed_at: DateTime<Utc>,
}

impl CheckoutEvent {
    pub fn checkout_started(
        checkout_id: AggregateId,
        order_id: AggregateId,
        user: UserId,
        total_price: Money,
        contact_info: Option<ContactInfo>,
        shipping_address: Option<ShippingAddress>,
    ) -> Self {
        CheckoutEvent::CheckoutStarted(CheckoutStartedData {
            checkout_id,
            order_id,
            user,
            total_price,
            contact_info,
            shipping_address,
            started_at: Utc::now(),
        })
    }

    pub fn payment_confirmed(
        payment_intent_id: impl Into<String>,
        status: impl Into<String>,
        verified: bool,
    ) -> Self {
        CheckoutEvent::PaymentConfirmed(PaymentConfirmedData {
            payment_intent_id: payment_intent_id.into(),
            status: status.into(),
            verified,
            confirmed_at: Utc::now(),
        })
    }

    pub fn settlement_recorded() -> Self {
        CheckoutEvent::SettlementRecorded {
            settled_at: Utc::now(),
        }
    }

    pub fn settlement_failed(reason: impl Into<String>) -> Self {
        CheckoutEvent::SettlementFailed {
            reason: reason.into(),
            failed_at: Utc::now(),
        }
    }

    pub fn cleanup_step_completed(step: impl Into<String>) -> Self {
        CheckoutEvent::CleanupStepCompleted { step: step.into() }
    }

    pub fn cleanup_step_failed(step: impl Into<String>, error: impl Into<String>) -> Self {
        CheckoutEvent::CleanupStepFailed {
            step: step.into(),
            error: error.into(),
        }
    }
}
