//! Payment gateway endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use checkout::CreateIntentInput;
use domain::Currency;
use event_store::EventStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{JsonBody, parse_money, parse_order_id};
use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfigResponse {
    pub publishable_key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    /// Ignored when `order_id` is given; the order's total is charged.
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSecretResponse {
    pub client_secret: String,
}

/// GET /payment/config
pub async fn config<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<PaymentConfigResponse> {
    Json(PaymentConfigResponse {
        publishable_key: state.checkout.payment_config().publishable_key,
    })
}

/// POST /payment/create-payment-intent
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn create_intent<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
    JsonBody(req): JsonBody<CreateIntentRequest>,
) -> Result<Json<ClientSecretResponse>, ApiError> {
    let input = CreateIntentInput {
        amount: req.amount.map(parse_money).transpose()?,
        currency: req
            .currency
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(Currency::parse)
            .transpose()?,
        order_id: req.order_id.as_deref().map(parse_order_id).transpose()?,
    };

    let handle = state.checkout.create_intent(&identity, input).await?;
    Ok(Json(ClientSecretResponse {
        client_secret: handle.client_secret,
    }))
}
