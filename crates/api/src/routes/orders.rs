//! Order placement, settlement and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use checkout::{CheckoutSaga, PlaceOrderInput};
use common::{AggregateId, Identity};
use domain::{
    CartLine, ContactInfo, MarkOrderDelivered, Money, Order, PaymentResult, ProductId,
    ShippingAddress,
};
use event_store::EventStore;
use projections::OrderSummary;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::{CartLineResponse, lines};
use super::{JsonBody, money, parse_money, parse_order_id};
use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub price: Decimal,
    pub qty: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddressRequest {
    pub country: String,
    pub postal_code: String,
    pub city: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Falls back to the caller's cart when absent.
    #[serde(default)]
    pub order_items: Option<Vec<OrderItemRequest>>,
    #[serde(default)]
    pub shipping_address: ShippingAddressRequest,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub items_price: Option<Decimal>,
    #[serde(default)]
    pub tax_price: Decimal,
    #[serde(default)]
    pub shipping_price: Decimal,
    #[serde(default)]
    pub total_price: Option<Decimal>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
}

/// Payment confirmation in the shape the checkout page posts it.
#[derive(Debug, Default, Deserialize)]
pub struct PayOrderRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub update_time: String,
    #[serde(default)]
    pub payer: Payer,
}

#[derive(Debug, Default, Deserialize)]
pub struct Payer {
    #[serde(default)]
    pub email_address: String,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub order_items: Vec<CartLineResponse>,
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: String,
    #[serde(serialize_with = "money")]
    pub items_price: Money,
    #[serde(serialize_with = "money")]
    pub tax_price: Money,
    #[serde(serialize_with = "money")]
    pub shipping_price: Money,
    #[serde(serialize_with = "money")]
    pub total_price: Money,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_result: Option<PaymentResult>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        use domain::Aggregate;

        let totals = order.totals();
        Self {
            id: order.id().map(|id| id.to_string()).unwrap_or_default(),
            user: order.user().map(|u| u.to_string()).unwrap_or_default(),
            order_items: lines(order.items()),
            shipping_address: order.shipping_address().cloned(),
            payment_method: order.payment_method().to_string(),
            items_price: totals.items_price,
            tax_price: totals.tax_price,
            shipping_price: totals.shipping_price,
            total_price: totals.total_price,
            is_paid: order.is_paid(),
            paid_at: order.paid_at(),
            payment_result: order.payment_result().cloned(),
            is_delivered: order.is_delivered(),
            delivered_at: order.delivered_at(),
            created_at: order.created_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "money")]
    pub total_price: Money,
    pub item_count: usize,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<OrderSummary> for OrderSummaryResponse {
    fn from(summary: OrderSummary) -> Self {
        Self {
            id: summary.order_id.to_string(),
            created_at: summary.created_at,
            total_price: summary.total_price,
            item_count: summary.item_count,
            is_paid: summary.is_paid,
            paid_at: summary.paid_at,
            is_delivered: summary.is_delivered,
            delivered_at: summary.delivered_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FailedStepResponse {
    pub step: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStatusResponse {
    pub order_id: String,
    pub state: &'static str,
    pub payment_intent_id: Option<String>,
    pub verified: bool,
    pub completed_cleanup: Vec<String>,
    pub failed_cleanup: Vec<FailedStepResponse>,
    pub failure: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl CheckoutStatusResponse {
    fn new(order_id: String, saga: &CheckoutSaga) -> Self {
        Self {
            order_id,
            state: saga.state().as_str(),
            payment_intent_id: saga.payment_intent_id().map(str::to_string),
            verified: saga.is_verified(),
            completed_cleanup: saga.completed_cleanup().to_vec(),
            failed_cleanup: saga
                .failed_cleanup()
                .iter()
                .map(|(step, error)| FailedStepResponse {
                    step: step.clone(),
                    error: error.clone(),
                })
                .collect(),
            failure: saga.failure().map(str::to_string),
            started_at: saga.started_at(),
            settled_at: saga.settled_at(),
        }
    }
}

// -- Handlers --

/// POST /orders: creates the unpaid order.
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
    JsonBody(req): JsonBody<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let address = req.shipping_address;
    let mut input = PlaceOrderInput::new(ShippingAddress::new(
        address.country,
        address.postal_code,
        address.city,
        address.address,
    ))
    .with_fees(parse_money(req.tax_price)?, parse_money(req.shipping_price)?);
    input.payment_method = req.payment_method;
    input.items_price = req.items_price.map(parse_money).transpose()?;
    input.total_price = req.total_price.map(parse_money).transpose()?;

    if let Some(items) = req.order_items {
        let items = items
            .into_iter()
            .map(|item| {
                Ok(CartLine {
                    product: ProductId::new(item.product),
                    name: item.name,
                    image: item.image,
                    unit_price: parse_money(item.price)?,
                    qty: item.qty,
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;
        input = input.with_items(items);
    }
    if let Some(contact) = req.contact_info {
        input = input.with_contact(contact);
    }

    let order = state.checkout.place_order(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/myorders
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn my_orders<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    state.projection_processor.run_catch_up().await?;

    let orders = state
        .buyer_orders
        .orders_for(&identity.user_id)
        .await
        .into_iter()
        .map(OrderSummaryResponse::from)
        .collect();
    Ok(Json(orders))
}

/// GET /orders/{id}: owner or admin.
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id, order_id = %id))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = accessible_order(&state, &identity, parse_order_id(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// PUT /orders/{id}/pay: records the settlement of a confirmed payment.
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id, order_id = %id))]
pub async fn pay<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<PayOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    if req.id.trim().is_empty() {
        return Err(ApiError::validation("payment id is required"));
    }

    let mut result = PaymentResult::new(req.id, req.status).with_email(req.payer.email_address);
    result.update_time = req.update_time;

    let order = state
        .checkout
        .record_settlement(&identity, order_id, result)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// PUT /orders/{id}/deliver: admin only.
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id, order_id = %id))]
pub async fn deliver<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    if !identity.is_admin {
        return Err(ApiError::Forbidden("Not authorized as an admin".to_string()));
    }
    let order_id = parse_order_id(&id)?;

    let result = state
        .orders
        .mark_delivered(MarkOrderDelivered::new(order_id))
        .await?;
    Ok(Json(OrderResponse::from(&result.aggregate)))
}

/// GET /orders/{id}/checkout: progress of the order's checkout.
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id, order_id = %id))]
pub async fn checkout_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<CheckoutStatusResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    accessible_order(&state, &identity, order_id).await?;

    let saga = state
        .checkout
        .get_checkout(order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Checkout not found"))?;
    Ok(Json(CheckoutStatusResponse::new(id, &saga)))
}

/// Loads an order the caller owns, or any order for an admin. Others get
/// the same 404 as a missing order.
async fn accessible_order<S: EventStore + Clone + 'static>(
    state: &AppState<S>,
    identity: &Identity,
    order_id: AggregateId,
) -> Result<Order, ApiError> {
    state
        .orders
        .get_order(order_id)
        .await?
        .filter(|order| order.user().is_some_and(|owner| identity.can_access(owner)))
        .ok_or_else(|| ApiError::not_found("Order not found"))
}
