//! Checkout orchestrator: drives one buyer's checkout across the cart,
//! order, profile and payment gateway.

use std::time::Instant;

use common::{AggregateId, Identity, UserId};
use domain::{
    Aggregate, CartError, CartLine, CartService, CommandHandler, ContactInfo, Currency,
    DomainError, DomainEvent, Money, Order, OrderError, OrderService, OrderTotals, PaymentResult,
    PlaceOrder, ProfileService, ShippingAddress,
};
use event_store::{AppendOptions, EventEnvelope, EventStore, Version};

use crate::aggregate::CheckoutSaga;
use crate::error::{CheckoutError, Result};
use crate::events::{CheckoutEvent, STEP_CLEAR_CART, STEP_SAVE_PROFILE};
use crate::gateway::{IntentRequest, PaymentGateway, PublicConfig};

/// Attempts at marking an order paid before a concurrency conflict fails
/// the settlement.
const ORDER_WRITE_ATTEMPTS: usize = 3;

const UNVERIFIED_PAYMENT: &str = "payment could not be verified";

/// Checkout behaviour switches.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Used when a client does not name a currency.
    pub currency: Currency,

    /// Re-fetch the intent from the gateway before marking an order paid.
    pub verify_payments: bool,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            verify_payments: false,
        }
    }
}

/// Request for a payment intent.
///
/// With `order_id` the amount is taken from the order; otherwise the
/// client-supplied `amount` is charged.
#[derive(Debug, Clone, Default)]
pub struct CreateIntentInput {
    pub amount: Option<Money>,
    pub currency: Option<Currency>,
    pub order_id: Option<AggregateId>,
}

/// What the browser needs to confirm a payment.
#[derive(Debug, Clone)]
pub struct IntentHandle {
    pub intent_id: String,
    pub client_secret: String,
    pub amount: Money,
    pub currency: Currency,
}

/// Order placement request as sent by the checkout form.
#[derive(Debug, Clone)]
pub struct PlaceOrderInput {
    /// Item snapshot; the caller's cart when `None`.
    pub order_items: Option<Vec<CartLine>>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub tax_price: Money,
    pub shipping_price: Money,
    /// Client-computed totals, checked against the server's.
    pub items_price: Option<Money>,
    pub total_price: Option<Money>,
    pub contact_info: Option<ContactInfo>,
}

impl PlaceOrderInput {
    pub fn new(shipping_address: ShippingAddress) -> Self {
        Self {
            order_items: None,
            shipping_address,
            payment_method: String::new(),
            tax_price: Money::zero(),
            shipping_price: Money::zero(),
            items_price: None,
            total_price: None,
            contact_info: None,
        }
    }

    pub fn with_items(mut self, items: Vec<CartLine>) -> Self {
        self.order_items = Some(items);
        self
    }

    pub fn with_fees(mut self, tax_price: Money, shipping_price: Money) -> Self {
        self.tax_price = tax_price;
        self.shipping_price = shipping_price;
        self
    }

    pub fn with_client_totals(mut self, items_price: Money, total_price: Money) -> Self {
        self.items_price = Some(items_price);
        self.total_price = Some(total_price);
        self
    }

    pub fn with_contact(mut self, contact_info: ContactInfo) -> Self {
        self.contact_info = Some(contact_info);
        self
    }
}

/// Saga writer for one request.
///
/// Saga events are an audit trail next to the order, which stays the
/// source of truth. After the first failed append the recorder stops
/// writing, so a stale version never produces a half-ordered stream.
struct SagaRecorder {
    checkout_id: AggregateId,
    saga: CheckoutSaga,
    healthy: bool,
}

impl SagaRecorder {
    fn new(checkout_id: AggregateId, saga: CheckoutSaga) -> Self {
        Self {
            checkout_id,
            saga,
            healthy: true,
        }
    }
}

/// Sequences the checkout steps the client drives.
///
/// Every entry point takes the caller's [`Identity`]; ownership is checked
/// here, not in the stores.
pub struct CheckoutOrchestrator<S: EventStore, G: PaymentGateway> {
    store: S,
    orders: OrderService<S>,
    carts: CartService<S>,
    profiles: ProfileService<S>,
    sagas: CommandHandler<S, CheckoutSaga>,
    gateway: G,
    config: CheckoutConfig,
}

impl<S, G> CheckoutOrchestrator<S, G>
where
    S: EventStore + Clone,
    G: PaymentGateway,
{
    pub fn new(store: S, gateway: G, config: CheckoutConfig) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            carts: CartService::new(store.clone()),
            profiles: ProfileService::new(store.clone()),
            sagas: CommandHandler::new(store.clone()),
            store,
            gateway,
            config,
        }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    pub fn payment_config(&self) -> PublicConfig {
        self.gateway.public_config()
    }

    /// Step 2: asks the gateway for a payment intent.
    ///
    /// Nothing is written locally and repeated calls create distinct
    /// intents.
    #[tracing::instrument(skip(self, identity, input), fields(user_id = %identity.user_id))]
    pub async fn create_intent(
        &self,
        identity: &Identity,
        input: CreateIntentInput,
    ) -> Result<IntentHandle> {
        let currency = input
            .currency
            .unwrap_or_else(|| self.config.currency.clone());

        let request = match (input.order_id, input.amount) {
            (Some(order_id), _) => {
                let order = self.owned_order(identity, order_id).await?;
                if order.is_paid() {
                    return Err(CheckoutError::Conflict("Order is already paid".to_string()));
                }
                IntentRequest::new(order.total_price(), currency).for_order(order_id)
            }
            (None, Some(amount)) if amount.is_positive() => IntentRequest::new(amount, currency),
            (None, Some(_)) => {
                return Err(CheckoutError::validation("amount must be greater than zero"));
            }
            (None, None) => return Err(CheckoutError::validation("amount is required")),
        };

        let intent = self.gateway.create_intent(request).await.inspect_err(|e| {
            tracing::warn!(error = %e, "payment intent creation failed");
        })?;

        metrics::counter!("payment_intents_created_total").increment(1);
        tracing::info!(
            intent_id = %intent.id,
            amount_cents = intent.amount.cents(),
            currency = %intent.currency,
            "payment intent created"
        );

        Ok(IntentHandle {
            intent_id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency,
        })
    }

    /// Step 3: creates the unpaid order, the checkout's durability
    /// checkpoint.
    #[tracing::instrument(skip(self, identity, input), fields(user_id = %identity.user_id))]
    pub async fn place_order(&self, identity: &Identity, input: PlaceOrderInput) -> Result<Order> {
        let user = &identity.user_id;
        let items = match input.order_items {
            Some(items) => items,
            None => self.carts.get(user).await?,
        };
        if items.is_empty() {
            return Err(DomainError::Order(OrderError::NoItems).into());
        }

        let totals = OrderTotals::compute(&items, input.tax_price, input.shipping_price)
            .map_err(|_| DomainError::Order(OrderError::AmountOutOfRange))?;
        check_client_total("itemsPrice", input.items_price, totals.items_price)?;
        check_client_total("totalPrice", input.total_price, totals.total_price)?;

        let order_id = AggregateId::new();
        let cmd = PlaceOrder::new(
            order_id,
            user.clone(),
            items,
            input.shipping_address.clone(),
        )
        .with_fees(input.tax_price, input.shipping_price)
        .with_payment_method(input.payment_method);

        let order = self.orders.place_order(cmd).await?.aggregate;
        metrics::counter!("checkout_orders_placed_total").increment(1);

        let checkout_id = CheckoutSaga::stream_id(order_id);
        let mut recorder = SagaRecorder::new(checkout_id, CheckoutSaga::default());
        self.record(
            &mut recorder,
            CheckoutEvent::checkout_started(
                checkout_id,
                order_id,
                user.clone(),
                order.total_price(),
                input.contact_info,
                Some(input.shipping_address),
            ),
        )
        .await;

        tracing::info!(%order_id, step = "order_created", "checkout order created");
        Ok(order)
    }

    /// Step 5: marks the order paid with the payment the buyer reported,
    /// then runs the cleanup steps.
    ///
    /// Replaying the same payment returns the paid order without writing
    /// anything. A different payment for a paid order is a conflict.
    #[tracing::instrument(
        skip(self, identity, result),
        fields(user_id = %identity.user_id, payment_id = %result.id)
    )]
    pub async fn record_settlement(
        &self,
        identity: &Identity,
        order_id: AggregateId,
        result: PaymentResult,
    ) -> Result<Order> {
        let started = Instant::now();
        let order = self.owned_order(identity, order_id).await?;

        if let Some(existing) = order.payment_result() {
            if existing.id == result.id {
                tracing::info!(%order_id, "settlement already recorded");
                return Ok(order);
            }
            return Err(already_paid(&existing.id));
        }

        let verified = if self.config.verify_payments {
            self.verify_payment(&order, &result).await?;
            true
        } else {
            false
        };

        let mut recorder = self.saga_recorder(order_id, &order).await;
        self.record(
            &mut recorder,
            CheckoutEvent::payment_confirmed(&result.id, &result.status, verified),
        )
        .await;

        let paid = self
            .orders
            .handler()
            .execute_retrying(order_id, ORDER_WRITE_ATTEMPTS, |order| {
                order.mark_paid(result.clone())
            })
            .await;

        let paid = match paid {
            Ok(paid) => paid,
            Err(DomainError::Order(OrderError::AlreadyPaid { payment_id })) => {
                return Err(already_paid(&payment_id));
            }
            Err(e) => {
                tracing::error!(%order_id, error = %e, step = "settlement", "failed to mark order paid");
                metrics::counter!("checkout_settlement_failures_total").increment(1);
                self.record(&mut recorder, CheckoutEvent::settlement_failed(e.to_string()))
                    .await;
                metrics::histogram!("checkout_settlement_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                return Err(CheckoutError::SettlementFailed {
                    order_id,
                    source: e,
                });
            }
        };

        // A concurrent replay of the same payment won the race.
        if paid.events.is_empty() {
            return Ok(paid.aggregate);
        }

        self.record(&mut recorder, CheckoutEvent::settlement_recorded())
            .await;
        metrics::counter!("checkout_settlements_total").increment(1);
        tracing::info!(%order_id, step = "settled", "settlement recorded");

        self.cleanup(&mut recorder, &identity.user_id, &paid.aggregate)
            .await;

        metrics::histogram!("checkout_settlement_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(paid.aggregate)
    }

    /// The saga of an order, for support tooling.
    pub async fn get_checkout(&self, order_id: AggregateId) -> Result<Option<CheckoutSaga>> {
        Ok(self
            .sagas
            .load_existing(CheckoutSaga::stream_id(order_id))
            .await?)
    }

    /// Step 6. Neither step can undo the settlement; failures are logged
    /// and recorded on the saga.
    async fn cleanup(&self, recorder: &mut SagaRecorder, user: &UserId, order: &Order) {
        let order_id = recorder.saga.order_id();

        let cleared = match self.carts.clear(user).await {
            Ok(_) | Err(DomainError::Cart(CartError::NotFound)) => Ok(()),
            Err(e) => Err(e),
        };
        self.record_cleanup(recorder, STEP_CLEAR_CART, cleared).await;

        let contact = recorder.saga.contact_info().cloned();
        let address = recorder
            .saga
            .shipping_address()
            .or(order.shipping_address())
            .cloned();
        if contact.is_none() && address.is_none() {
            return;
        }

        let saved = self
            .profiles
            .save_checkout_details(user, contact, address)
            .await
            .map(|_| ());
        self.record_cleanup(recorder, STEP_SAVE_PROFILE, saved).await;

        tracing::debug!(?order_id, "checkout cleanup finished");
    }

    async fn record_cleanup(
        &self,
        recorder: &mut SagaRecorder,
        step: &'static str,
        outcome: std::result::Result<(), DomainError>,
    ) {
        let event = match outcome {
            Ok(()) => CheckoutEvent::cleanup_step_completed(step),
            Err(e) => {
                tracing::warn!(
                    checkout_id = %recorder.checkout_id,
                    step,
                    error = %e,
                    "checkout cleanup step failed"
                );
                metrics::counter!("checkout_cleanup_failures_total", "step" => step).increment(1);
                CheckoutEvent::cleanup_step_failed(step, e.to_string())
            }
        };
        self.record(recorder, event).await;
    }

    /// Checks the reported payment against the gateway's own record.
    async fn verify_payment(&self, order: &Order, result: &PaymentResult) -> Result<()> {
        let intent = self
            .gateway
            .retrieve_intent(&result.id)
            .await
            .map_err(|e| match e {
                crate::gateway::GatewayError::Rejected(_) => {
                    CheckoutError::validation(UNVERIFIED_PAYMENT)
                }
                unavailable => CheckoutError::Gateway(unavailable),
            })?;

        // An intent created for another order cannot settle this one, even
        // when the totals agree
        let other_order = intent.order_id.is_some_and(|id| Some(id) != order.id());
        if intent.id != result.id
            || other_order
            || !intent.is_succeeded()
            || intent.amount != order.total_price()
            || intent.currency != self.config.currency
        {
            tracing::warn!(
                reported_id = %result.id,
                intent_id = %intent.id,
                intent_order_id = ?intent.order_id,
                status = %intent.status,
                intent_cents = intent.amount.cents(),
                order_cents = order.total_price().cents(),
                "reported payment does not match the gateway"
            );
            return Err(CheckoutError::validation(UNVERIFIED_PAYMENT));
        }
        Ok(())
    }

    /// Loads an order the caller owns. Someone else's order is reported as
    /// missing.
    async fn owned_order(&self, identity: &Identity, order_id: AggregateId) -> Result<Order> {
        self.orders
            .get_order(order_id)
            .await?
            .filter(|order| order.is_owned_by(&identity.user_id))
            .ok_or(CheckoutError::OrderNotFound(order_id))
    }

    /// Loads the saga of `order`, starting one for orders placed without a
    /// saga record.
    async fn saga_recorder(&self, order_id: AggregateId, order: &Order) -> SagaRecorder {
        let checkout_id = CheckoutSaga::stream_id(order_id);

        let saga = match self.sagas.load(checkout_id).await {
            Ok(saga) => saga,
            Err(e) => {
                tracing::warn!(%checkout_id, error = %e, "failed to load checkout saga");
                let mut recorder = SagaRecorder::new(checkout_id, CheckoutSaga::default());
                recorder.healthy = false;
                return recorder;
            }
        };

        let needs_start = saga.id().is_none();
        let mut recorder = SagaRecorder::new(checkout_id, saga);
        if needs_start && let Some(user) = order.user() {
            self.record(
                &mut recorder,
                CheckoutEvent::checkout_started(
                    checkout_id,
                    order_id,
                    user.clone(),
                    order.total_price(),
                    None,
                    order.shipping_address().cloned(),
                ),
            )
            .await;
        }
        recorder
    }

    /// Appends one saga event, best effort.
    async fn record(&self, recorder: &mut SagaRecorder, event: CheckoutEvent) {
        if !recorder.healthy {
            return;
        }

        let current = recorder.saga.version();
        match self
            .append_saga_event(recorder.checkout_id, current, &event)
            .await
        {
            Ok(version) => {
                recorder.saga.apply(event);
                recorder.saga.set_version(version);
            }
            Err(e) => {
                recorder.healthy = false;
                tracing::warn!(
                    checkout_id = %recorder.checkout_id,
                    event_type = event.event_type(),
                    error = %e,
                    "failed to record checkout event"
                );
            }
        }
    }

    async fn append_saga_event(
        &self,
        checkout_id: AggregateId,
        current_version: Version,
        event: &CheckoutEvent,
    ) -> Result<Version> {
        let envelope = EventEnvelope::from_event(
            checkout_id,
            CheckoutSaga::aggregate_type(),
            current_version.next(),
            event.event_type(),
            event,
        )?;

        Ok(self
            .store
            .append(vec![envelope], AppendOptions::after(current_version))
            .await?)
    }
}

fn check_client_total(field: &str, client: Option<Money>, server: Money) -> Result<()> {
    match client {
        Some(client) if client != server => Err(CheckoutError::Validation(format!(
            "{field} {client} does not match the computed {server}"
        ))),
        _ => Ok(()),
    }
}

fn already_paid(payment_id: &str) -> CheckoutError {
    CheckoutError::Conflict(format!("Order is already paid with payment {payment_id}"))
}
