//! autoquote - used-car valuation bot
//!
//! Walks a user through make, model, year, mileage and a photo, then replies
//! with an estimated market price. Runs behind Telegram or a small HTTP API.

mod api;
mod catalog;
mod config;
mod gateway;
mod runtime;
mod state_machine;
mod store;
mod valuation;

use api::{create_router, AppState};
use catalog::Catalog;
use config::{Config, GatewayMode};
use gateway::{BroadcastSink, TelegramClient};
use runtime::RuntimeManager;
use std::net::SocketAddr;
use std::sync::Arc;
use store::InMemorySessionStore;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autoquote=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = Config::from_env()?;

    let catalog = match &config.catalog_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading catalog");
            Catalog::load(path)?
        }
        None => Catalog::builtin(),
    };
    tracing::info!(
        makes = catalog.makes().len(),
        session_ttl_secs = config.session_ttl.as_secs(),
        "Catalog ready"
    );
    let catalog = Arc::new(catalog);
    let store = Arc::new(InMemorySessionStore::new());

    match config.gateway {
        GatewayMode::Telegram {
            token,
            api_base,
            poll_timeout,
        } => {
            let client = Arc::new(TelegramClient::new(&api_base, &token, poll_timeout)?);
            let manager = Arc::new(RuntimeManager::new(
                catalog,
                store,
                client.clone(),
                config.session_ttl,
            ));
            let _reaper = manager.start_reaper();

            let cancel = CancellationToken::new();
            let poller = tokio::spawn(gateway::telegram::run_polling(
                client,
                manager,
                cancel.clone(),
            ));

            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutting down");
            cancel.cancel();
            poller.await?;
        }

        GatewayMode::Http { port } => {
            let replies = BroadcastSink::default();
            let manager = Arc::new(RuntimeManager::new(
                catalog,
                store,
                Arc::new(replies.clone()),
                config.session_ttl,
            ));
            let _reaper = manager.start_reaper();

            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);

            let app = create_router(AppState::new(manager, replies))
                .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors));

            // Start server
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            tracing::info!("autoquote HTTP gateway listening on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;
        }
    }

    Ok(())
}
