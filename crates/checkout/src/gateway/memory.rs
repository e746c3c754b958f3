//! In-memory payment gateway for tests and for running without provider
//! credentials.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::AggregateId;
use uuid::Uuid;

use super::{GatewayError, IntentRequest, PaymentGateway, PaymentIntent, PublicConfig};

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    intents: HashMap<String, PaymentIntent>,
    next_id: u32,
    reject_with: Option<String>,
    unavailable: bool,
}

/// Gateway that keeps intents in a map.
///
/// Intents start as `requires_payment_method`; [`confirm_intent`] plays
/// the browser's part and moves one to `succeeded`.
///
/// [`confirm_intent`]: InMemoryPaymentGateway::confirm_intent
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
    publishable_key: String,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_publishable_key(mut self, key: impl Into<String>) -> Self {
        self.publishable_key = key.into();
        self
    }

    /// Makes intent creation fail with `Rejected(message)`, or succeed
    /// again with `None`.
    pub fn set_rejecting(&self, message: Option<&str>) {
        self.write().reject_with = message.map(str::to_string);
    }

    /// Makes every call fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.write().unavailable = unavailable;
    }

    /// Marks an intent paid, as the provider does after the browser
    /// confirms it.
    pub fn confirm_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let mut state = self.write();
        let intent = state
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| GatewayError::Rejected(format!("No such payment_intent: '{intent_id}'")))?;
        intent.status = "succeeded".to_string();
        Ok(intent.clone())
    }

    pub fn intent_count(&self) -> usize {
        self.read().intents.len()
    }

    /// The order id an intent was created for, if any.
    pub fn order_for(&self, intent_id: &str) -> Option<AggregateId> {
        self.read()
            .intents
            .get(intent_id)
            .and_then(|intent| intent.order_id)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryGatewayState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryGatewayState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    fn public_config(&self) -> PublicConfig {
        PublicConfig {
            publishable_key: self.publishable_key.clone(),
        }
    }

    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let mut state = self.write();

        if state.unavailable {
            return Err(GatewayError::Unavailable("connection refused".to_string()));
        }
        if let Some(message) = &state.reject_with {
            return Err(GatewayError::Rejected(message.clone()));
        }
        if !request.amount.is_positive() {
            return Err(GatewayError::Rejected(
                "This value must be greater than or equal to 1.".to_string(),
            ));
        }

        state.next_id += 1;
        let id = format!("pi_mem_{:04}", state.next_id);
        let intent = PaymentIntent {
            client_secret: format!("{id}_secret_{}", Uuid::new_v4().simple()),
            id: id.clone(),
            amount: request.amount,
            currency: request.currency,
            status: "requires_payment_method".to_string(),
            order_id: request.order_id,
        };

        state.intents.insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let state = self.read();
        if state.unavailable {
            return Err(GatewayError::Unavailable("connection refused".to_string()));
        }
        state
            .intents
            .get(intent_id)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected(format!("No such payment_intent: '{intent_id}'")))
    }
}
