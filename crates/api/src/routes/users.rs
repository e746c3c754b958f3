//! Buyer profile endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use domain::{ContactInfo, ShippingAddress};
use event_store::EventStore;
use serde::Serialize;

use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Checkout details remembered from the last settled order. Fields are
/// null until the first checkout completes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub contact_info: Option<ContactInfo>,
    pub shipping_address: Option<ShippingAddress>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// GET /users/profile
#[tracing::instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn profile<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profiles.get(&identity.user_id).await?;

    Ok(Json(ProfileResponse {
        id: identity.user_id.to_string(),
        name: identity.name,
        contact_info: profile.as_ref().and_then(|p| p.contact_info().cloned()),
        shipping_address: profile.as_ref().and_then(|p| p.shipping_address().cloned()),
        updated_at: profile.as_ref().and_then(|p| p.updated_at()),
    }))
}
