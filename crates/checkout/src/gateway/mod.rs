//! Payment gateway boundary.
//!
//! The storefront never moves money itself. It asks the gateway for a
//! payment intent, hands the intent's client secret to the browser, and
//! later may re-fetch the intent to check what the buyer reported.

pub mod memory;
pub mod stripe;

use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use domain::{Currency, Money};
use thiserror::Error;

pub use memory::InMemoryPaymentGateway;
pub use stripe::{STRIPE_API_BASE, StripeConfig, StripeGateway};

/// Errors reported by a payment gateway.
///
/// Messages come from the provider and never contain credentials.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The provider refused the request.
    #[error("{0}")]
    Rejected(String),

    /// The provider could not be reached or failed internally.
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    fn kind(&self) -> &'static str {
        match self {
            GatewayError::Rejected(_) => "rejected",
            GatewayError::Unavailable(_) => "unavailable",
        }
    }
}

/// Keys the browser needs to talk to the provider directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicConfig {
    pub publishable_key: String,
}

/// What to charge.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub amount: Money,
    pub currency: Currency,
    /// Attached as provider metadata for reconciliation.
    pub order_id: Option<AggregateId>,
}

impl IntentRequest {
    pub fn new(amount: Money, currency: Currency) -> Self {
        Self {
            amount,
            currency,
            order_id: None,
        }
    }

    pub fn for_order(mut self, order_id: AggregateId) -> Self {
        self.order_id = Some(order_id);
        self
    }
}

/// The provider's record of an intended charge.
///
/// `client_secret` is forwarded to the browser and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: Money,
    pub currency: Currency,
    pub status: String,
    /// The order named in the intent's metadata at creation.
    pub order_id: Option<AggregateId>,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn public_config(&self) -> PublicConfig;

    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;
}

#[async_trait]
impl<T: PaymentGateway + ?Sized> PaymentGateway for Arc<T> {
    fn public_config(&self) -> PublicConfig {
        (**self).public_config()
    }

    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError> {
        (**self).create_intent(request).await
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        (**self).retrieve_intent(intent_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_arc_dyn_gateway_delegates() {
        let inner = InMemoryPaymentGateway::new().with_publishable_key("pk_test_1");
        let gateway: Arc<dyn PaymentGateway> = Arc::new(inner.clone());

        let intent = gateway
            .create_intent(IntentRequest::new(Money::from_cents(500), Currency::default()))
            .await
            .unwrap();

        assert_eq!(gateway.public_config().publishable_key, "pk_test_1");
        assert_eq!(inner.intent_count(), 1);
        assert_eq!(gateway.retrieve_intent(&intent.id).await.unwrap(), intent);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            GatewayError::Rejected("Your card was declined.".into()).to_string(),
            "Your card was declined."
        );
        assert_eq!(GatewayError::Unavailable("timeout".into()).kind(), "unavailable");
    }
}
