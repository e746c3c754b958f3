//! HTTP surface of the storefront.
//!
//! Cart, checkout, order and review endpoints over the event-sourced
//! domain, with bearer-token identity, structured logging (tracing) and
//! Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::{Extension, Router};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use auth::{Authenticator, Claims, RequireAuth};
pub use config::{Config, ConfigError, LogFormat};
pub use error::ApiError;
pub use state::{AppState, SharedGateway};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    authenticator: Authenticator,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/cart",
            get(routes::cart::get::<S>)
                .post(routes::cart::upsert::<S>)
                .delete(routes::cart::clear::<S>),
        )
        .route("/cart/{product_id}", delete(routes::cart::remove_line::<S>))
        .route("/payment/config", get(routes::payment::config::<S>))
        .route(
            "/payment/create-payment-intent",
            post(routes::payment::create_intent::<S>),
        )
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/myorders", get(routes::orders::my_orders::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/pay", put(routes::orders::pay::<S>))
        .route("/orders/{id}/deliver", put(routes::orders::deliver::<S>))
        .route(
            "/orders/{id}/checkout",
            get(routes::orders::checkout_status::<S>),
        )
        .route("/products", post(routes::products::create::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route(
            "/products/{id}/reviews",
            post(routes::products::add_review::<S>),
        )
        .route(
            "/products/{id}/reviews/{review_id}",
            delete(routes::products::remove_review::<S>),
        )
        .route("/users/profile", get(routes::users::profile::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(Extension(Arc::new(authenticator)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
