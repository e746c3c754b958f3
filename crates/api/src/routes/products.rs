//! Product listing and review endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{ListProductInput, Money, Product, ProductId, Review, ReviewError, ReviewId};
use event_store::EventStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{JsonBody, MessageResponse, money, parse_money};
use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Review> for ReviewResponse {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id.to_string(),
            user: review.user.to_string(),
            name: review.name.clone(),
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: review.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub image: String,
    #[serde(serialize_with = "money")]
    pub price: Money,
    pub discount: u8,
    #[serde(serialize_with = "money")]
    pub discounted_price: Money,
    pub seller: Option<String>,
    pub rating: f64,
    pub num_reviews: u32,
    pub reviews: Vec<ReviewResponse>,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product
                .product_id()
                .map(ProductId::to_string)
                .unwrap_or_default(),
            name: product.name().to_string(),
            image: product.image().to_string(),
            price: product.price(),
            discount: product.discount(),
            discounted_price: product.discounted_price(),
            seller: product.seller().map(|s| s.to_string()),
            rating: product.rating(),
            num_reviews: product.num_reviews(),
            reviews: product.reviews().iter().map(ReviewResponse::from).collect(),
        }
    }
}

/// POST /products: admins and sellers only.
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
    JsonBody(req): JsonBody<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let input = ListProductInput::new(req.name, parse_money(req.price)?)
        .with_image(req.image)
        .with_discount(req.discount);

    let product = state.products.list_product(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(&product))))
}

/// GET /products/{id}
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .products
        .get_product(&ProductId::new(id))
        .await?
        .ok_or_else(|| ApiError::not_found(ReviewError::ProductNotFound.to_string()))?;
    Ok(Json(ProductResponse::from(&product)))
}

/// POST /products/{id}/reviews
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id, product = %id))]
pub async fn add_review<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ReviewRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    state
        .products
        .add_review(&ProductId::new(id), &identity, req.rating, req.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new("Review added"))))
}

/// DELETE /products/{id}/reviews/{review_id}: the author or an admin.
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id, product = %id, review_id = %review_id))]
pub async fn remove_review<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
    Path((id, review_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let review_id = ReviewId::parse(&review_id)
        .map_err(|_| ApiError::not_found(ReviewError::ReviewNotFound.to_string()))?;

    state
        .products
        .remove_review(&ProductId::new(id), review_id, &identity)
        .await?;
    Ok(Json(MessageResponse::new("Review removed")))
}
