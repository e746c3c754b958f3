//! HTTP handlers.
//!
//! Bodies use camelCase keys, ids are serialized as `_id` and money is a
//! decimal number on the wire.

pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod payment;
pub mod products;
pub mod users;

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::extract::rejection::JsonRejection;
use common::AggregateId;
use domain::Money;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::error::ApiError;

/// `Json` whose rejections use the API error body.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| JsonBody(value))
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Serializes [`Money`] as a decimal number.
pub(crate) fn money<S: Serializer>(amount: &Money, serializer: S) -> Result<S::Ok, S::Error> {
    rust_decimal::serde::float::serialize(&amount.to_decimal(), serializer)
}

pub(crate) fn parse_money(amount: Decimal) -> Result<Money, ApiError> {
    Ok(Money::from_decimal(amount)?)
}

pub(crate) fn parse_order_id(id: &str) -> Result<AggregateId, ApiError> {
    AggregateId::parse(id).map_err(|_| ApiError::not_found("Order not found"))
}
