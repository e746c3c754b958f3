//! Checkout saga aggregate.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use domain::{Aggregate, ContactInfo, Money, ShippingAddress};
use event_store::Version;

use crate::error::CheckoutError;
use crate::events::CheckoutEvent;
use crate::state::CheckoutState;

/// The event-sourced record of one checkout.
///
/// Keyed by [`CheckoutSaga::stream_id`] of the order, so the saga of an
/// order can be found without an index. Its events form the audit trail
/// support uses to reconcile a payment with its order.
#[derive(Debug, Clone, Default)]
pub struct CheckoutSaga {
    id: Option<AggregateId>,
    version: Version,
    order_id: Option<AggregateId>,
    user: Option<UserId>,
    state: CheckoutState,
    total_price: Money,
    contact_info: Option<ContactInfo>,
    shipping_address: Option<ShippingAddress>,
    payment_intent_id: Option<String>,
    verified: bool,
    completed_cleanup: Vec<String>,
    failed_cleanup: Vec<(String, String)>,
    failure: Option<String>,
    started_at: Option<DateTime<Utc>>,
    settled_at: Option<DateTime<Utc>>,
}

impl CheckoutSaga {
    /// The saga stream of `order_id`.
    pub fn stream_id(order_id: AggregateId) -> AggregateId {
        AggregateId::derived("checkout", &order_id.to_string())
    }
}

impl Aggregate for CheckoutSaga {
    type Event = CheckoutEvent;
    type Error = CheckoutError;

    fn aggregate_type() -> &'static str {
        "Checkout"
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
            CheckoutEvent::CheckoutStarted(data) => {
                self.id = Some(data.checkout_id);
                self.order_id = Some(data.order_id);
                self.user = Some(data.user);
                self.total_price = data.total_price;
                self.contact_info = data.contact_info;
                self.shipping_address = data.shipping_address;
                self.started_at = Some(data.started_at);
                self.state = CheckoutState::OrderCreated;
            }
            CheckoutEvent::PaymentConfirmed(data) => {
                self.payment_intent_id = Some(data.payment_intent_id);
                self.verified = data.verified;
                self.state = CheckoutState::PaymentConfirmed;
            }
            CheckoutEvent::SettlementRecorded { settled_at } => {
                self.settled_at = Some(settled_at);
                self.failure = None;
                self.state = CheckoutState::Settled;
            }
            CheckoutEvent::SettlementFailed { reason, .. } => {
                self.failure = Some(reason);
            }
            CheckoutEvent::CleanupStepCompleted { step } => {
                self.completed_cleanup.push(step);
            }
            CheckoutEvent::CleanupStepFailed { step, error } => {
                self.failed_cleanup.push((step, error));
            }
        }
    }
}

impl CheckoutSaga {
    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn order_id(&self) -> Option<AggregateId> {
        self.order_id
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn contact_info(&self) -> Option<&ContactInfo> {
        self.contact_info.as_ref()
    }

    pub fn shipping_address(&self) -> Option<&ShippingAddress> {
        self.shipping_address.as_ref()
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent_id.as_deref()
    }

    /// Whether the gateway confirmed the reported payment.
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn completed_cleanup(&self) -> &[String] {
        &self.completed_cleanup
    }

    /// Cleanup steps that failed, with their error messages.
    pub fn failed_cleanup(&self) -> &[(String, String)] {
        &self.failed_cleanup
    }

    /// Why the last settlement attempt failed, cleared once settled.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.settled_at
    }
}
