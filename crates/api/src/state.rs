//! Shared application state.

use std::sync::Arc;

use checkout::{CheckoutConfig, CheckoutOrchestrator, PaymentGateway};
use domain::{CartService, OrderService, ProductService, ProfileService};
use event_store::EventStore;
use projections::{BuyerOrdersView, Projection, ProjectionProcessor};

/// Gateway handle shared by every request.
pub type SharedGateway = Arc<dyn PaymentGateway>;

/// Services and read models reachable from every handler.
pub struct AppState<S: EventStore> {
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
    pub products: ProductService<S>,
    pub profiles: ProfileService<S>,
    pub checkout: CheckoutOrchestrator<S, SharedGateway>,
    pub buyer_orders: BuyerOrdersView,
    pub projection_processor: Arc<ProjectionProcessor<S>>,
}

impl<S: EventStore + Clone + 'static> AppState<S> {
    pub fn new(store: S, gateway: SharedGateway, checkout_config: CheckoutConfig) -> Self {
        let buyer_orders = BuyerOrdersView::new();

        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(Box::new(buyer_orders.clone()) as Box<dyn Projection>);

        Self {
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            products: ProductService::new(store.clone()),
            profiles: ProfileService::new(store.clone()),
            checkout: CheckoutOrchestrator::new(store, gateway, checkout_config),
            buyer_orders,
            projection_processor: Arc::new(processor),
        }
    }
}
