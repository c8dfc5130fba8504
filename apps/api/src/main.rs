mod config;
mod db;
mod deletion;
mod errors;
mod models;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::deletion::orchestrator::AccountDeleter;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::identity::IdentityAdminClient;
use crate::store::postgres::PgResourceStore;
use crate::store::{IdentityStore, ResourceStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ScreenHire API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    let store: Arc<dyn ResourceStore> = Arc::new(PgResourceStore::new(db));

    // The identity admin client needs the privileged service key. Without it
    // the API still serves, but account deletion reports service-unavailable.
    let identity: Option<Arc<dyn IdentityStore>> = match &config.identity_service_key {
        Some(key) => {
            info!("Identity admin client initialized");
            Some(Arc::new(IdentityAdminClient::new(
                config.identity_api_url.clone(),
                key.clone(),
            )))
        }
        None => {
            warn!("IDENTITY_SERVICE_KEY is not set; account deletion is disabled");
            None
        }
    };

    let deleter = Arc::new(AccountDeleter::new(store, identity));

    let state = AppState { deleter };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
