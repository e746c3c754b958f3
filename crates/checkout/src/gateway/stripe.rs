//! Stripe payment-intent client.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::AggregateId;
use domain::{Currency, Money};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{GatewayError, IntentRequest, PaymentGateway, PaymentIntent, PublicConfig};

pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials and endpoint for [`StripeGateway`].
#[derive(Clone)]
pub struct StripeConfig {
    secret_key: String,
    publishable_key: String,
    api_base: String,
    timeout: Duration,
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>, publishable_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            publishable_key: publishable_key.into(),
            api_base: STRIPE_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"<redacted>")
            .field("publishable_key", &self.publishable_key)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Talks to the Stripe REST API with form-encoded requests and basic auth.
#[derive(Debug, Clone)]
pub struct StripeGateway {
    client: Client,
    config: StripeConfig,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn stripe_request<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        endpoint: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<T, GatewayError> {
        let started = Instant::now();
        let result = self.send(method, endpoint, form).await;

        metrics::histogram!("payment_gateway_request_seconds", "operation" => operation)
            .record(started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            metrics::counter!(
                "payment_gateway_errors_total",
                "operation" => operation,
                "kind" => e.kind()
            )
            .increment(1);
        }
        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{endpoint}", self.config.api_base);

        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.config.secret_key, Option::<&str>::None);
        if let Some(form) = form {
            request = request.form(form);
        }

        let response = request.send().await.map_err(|e| {
            let e = e.without_url();
            tracing::error!(error = %e, endpoint, "stripe request failed");
            GatewayError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            let message = provider_message(&body)
                .unwrap_or_else(|| format!("Payment provider rejected the request ({status})"));
            tracing::warn!(%status, endpoint, provider_message = %message, "stripe rejected request");
            return Err(GatewayError::Rejected(message));
        }
        if !status.is_success() {
            tracing::error!(%status, endpoint, "stripe returned an error");
            return Err(GatewayError::Unavailable(unavailable_message(status)));
        }

        response.json::<T>().await.map_err(|e| {
            tracing::error!(error = %e, endpoint, "failed to parse stripe response");
            GatewayError::Unavailable("malformed response from payment provider".to_string())
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn public_config(&self) -> PublicConfig {
        PublicConfig {
            publishable_key: self.config.publishable_key.clone(),
        }
    }

    #[tracing::instrument(skip(self, request), fields(amount_cents = request.amount.cents(), currency = %request.currency))]
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let amount = request.amount.cents().to_string();
        let order_id = request.order_id.map(|id| id.to_string());

        let mut form = vec![
            ("amount", amount.as_str()),
            ("currency", request.currency.as_str()),
            ("automatic_payment_methods[enabled]", "true"),
        ];
        if let Some(order_id) = &order_id {
            form.push(("metadata[order_id]", order_id.as_str()));
        }

        let intent: StripePaymentIntent = self
            .stripe_request(
                "create_intent",
                Method::POST,
                "/payment_intents",
                Some(form.as_slice()),
            )
            .await?;
        intent.try_into()
    }

    #[tracing::instrument(skip(self))]
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        if !is_object_id(intent_id) {
            tracing::warn!("refusing to look up malformed payment intent id");
            return Err(GatewayError::Rejected(
                "Invalid payment intent id".to_string(),
            ));
        }

        let intent: StripePaymentIntent = self
            .stripe_request(
                "retrieve_intent",
                Method::GET,
                &format!("/payment_intents/{intent_id}"),
                None,
            )
            .await?;
        intent.try_into()
    }
}

/// Stripe ids are a type prefix and an alphanumeric suffix, e.g. `pi_3Mt...`.
/// Anything else must not reach the request path.
fn is_object_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn unavailable_message(status: StatusCode) -> String {
    format!("payment provider returned {status}")
}

/// Pulls `error.message` out of a Stripe error body.
fn provider_message(body: &str) -> Option<String> {
    serde_json::from_str::<StripeErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .filter(|m| !m.is_empty())
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

/// Payment intent as returned by Stripe.
#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    amount: i64,
    currency: String,
    status: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl TryFrom<StripePaymentIntent> for PaymentIntent {
    type Error = GatewayError;

    fn try_from(intent: StripePaymentIntent) -> Result<Self, Self::Error> {
        let currency = Currency::parse(&intent.currency)
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        let order_id = intent
            .metadata
            .get("order_id")
            .and_then(|id| AggregateId::parse(id).ok());
        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret.unwrap_or_default(),
            amount: Money::from_cents(intent.amount),
            currency,
            status: intent.status,
            order_id,
        })
    }
}
