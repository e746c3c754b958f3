//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{CartLine, CartLineInput, Money, ProductId};
use event_store::EventStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{JsonBody, MessageResponse, money, parse_money};
use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// A cart or order line on the wire. `price` is the unit price snapshot.
#[derive(Debug, Serialize)]
pub struct CartLineResponse {
    pub product: String,
    pub name: String,
    pub image: String,
    #[serde(serialize_with = "money")]
    pub price: Money,
    pub qty: u32,
}

impl From<&CartLine> for CartLineResponse {
    fn from(line: &CartLine) -> Self {
        Self {
            product: line.product.to_string(),
            name: line.name.clone(),
            image: line.image.clone(),
            price: line.unit_price,
            qty: line.qty,
        }
    }
}

pub(crate) fn lines(lines: &[CartLine]) -> Vec<CartLineResponse> {
    lines.iter().map(CartLineResponse::from).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertCartRequest {
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub name: String,
    pub qty: i64,
    #[serde(default)]
    pub image: String,
    pub price: Decimal,
    #[serde(default)]
    pub discounted_price: Option<Decimal>,
}

/// GET /cart
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<Vec<CartLineResponse>>, ApiError> {
    let cart = state.carts.get(&identity.user_id).await?;
    Ok(Json(lines(&cart)))
}

/// POST /cart: adds a line or changes its quantity.
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id, product = %req.product))]
pub async fn upsert<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
    JsonBody(req): JsonBody<UpsertCartRequest>,
) -> Result<Json<Vec<CartLineResponse>>, ApiError> {
    let mut input = CartLineInput::new(
        req.product.trim(),
        req.name,
        req.qty,
        parse_money(req.price)?,
    )
    .with_image(req.image);
    if let Some(discounted) = req.discounted_price {
        input = input.with_discounted_price(parse_money(discounted)?);
    }

    let cart = state.carts.upsert_line(&identity.user_id, input).await?;
    Ok(Json(lines(&cart)))
}

/// DELETE /cart/{product_id}
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id, product = %product_id))]
pub async fn remove_line<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<CartLineResponse>>, ApiError> {
    let cart = state
        .carts
        .remove_line(&identity.user_id, &ProductId::new(product_id))
        .await?;
    Ok(Json(lines(&cart)))
}

/// DELETE /cart
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn clear<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<MessageResponse>, ApiError> {
    state.carts.clear(&identity.user_id).await?;
    Ok(Json(MessageResponse::new("Cart cleared")))
}
