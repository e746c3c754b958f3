//! Checkout orchestration for the storefront.
//!
//! Checkout is a choreographed saga: the buyer's client drives each step
//! with its own request, and the orchestrator records progress as an
//! event-sourced [`CheckoutSaga`] keyed by the order id.
//!
//! 1. Price quote (the client reads its cart)
//! 2. Payment intent creation at the gateway
//! 3. Order creation, unpaid: the recovery anchor
//! 4. Payment confirmation, between the browser and the gateway
//! 5. Settlement recording, idempotent
//! 6. Cleanup: clear the cart, save checkout details to the profile
//!
//! Steps 5 and 6 are the only ones that write after money has moved, so a
//! failure there is recorded on the saga instead of being retried.

pub mod aggregate;
pub mod error;
pub mod events;
pub mod gateway;
pub mod orchestrator;
pub mod state;

pub use aggregate::CheckoutSaga;
pub use error::{CheckoutError, SETTLEMENT_SUPPORT_MESSAGE};
pub use events::CheckoutEvent;
pub use gateway::{
    GatewayError, InMemoryPaymentGateway, IntentRequest, PaymentGateway, PaymentIntent,
    PublicConfig, STRIPE_API_BASE, StripeConfig, StripeGateway,
};
pub use orchestrator::{
    CheckoutConfig, CheckoutOrchestrator, CreateIntentInput, IntentHandle, PlaceOrderInput,
};
pub use state::CheckoutState;
