//! Storefront server entry point.

use std::error::Error;
use std::sync::Arc;

use checkout::{InMemoryPaymentGateway, StripeConfig, StripeGateway};
use event_store::{EventStore, InMemoryEventStore, PostgresEventStore};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use storefront_api::{AppState, Authenticator, Config, LogFormat, SharedGateway};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn payment_gateway(config: &Config) -> Result<SharedGateway, BoxError> {
    match &config.stripe_secret_key {
        Some(secret) => {
            let stripe = StripeGateway::new(
                StripeConfig::new(secret.clone(), config.stripe_publishable_key.clone())
                    .with_api_base(config.stripe_api_base.clone())
                    .with_timeout(config.gateway_timeout),
            )?;
            tracing::info!(api_base = %config.stripe_api_base, "using Stripe payment gateway");
            let gateway: SharedGateway = Arc::new(stripe);
            Ok(gateway)
        }
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set, using in-memory payment gateway");
            let gateway: SharedGateway = Arc::new(
                InMemoryPaymentGateway::new()
                    .with_publishable_key(config.stripe_publishable_key.clone()),
            );
            Ok(gateway)
        }
    }
}

async fn serve<S: EventStore + Clone + 'static>(
    store: S,
    config: Config,
    metrics_handle: PrometheusHandle,
) -> Result<(), BoxError> {
    let gateway = payment_gateway(&config)?;
    let state = Arc::new(AppState::new(store, gateway, config.checkout_config()));

    // Replay the log into the read models before taking traffic
    state.projection_processor.run_catch_up().await?;

    let app = storefront_api::create_app(
        state,
        Authenticator::new(&config.jwt_secret),
        metrics_handle,
    );

    let addr = config.addr();
    tracing::info!(%addr, "starting storefront server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    init_tracing(&config);
    tracing::debug!(?config, "configuration loaded");

    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    match config.database_url.clone() {
        Some(url) => {
            let store = PostgresEventStore::connect(&url).await?;
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL event store");
            serve(store, config, metrics_handle).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, events are kept in memory only");
            serve(InMemoryEventStore::new(), config, metrics_handle).await
        }
    }
}
