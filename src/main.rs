//! OpenSASE Storefront - cart and point-of-sale host

use std::sync::Arc;
use anyhow::Result;
use opensase_storefront::api::{self, AppState};
use opensase_storefront::config::Config;
use opensase_storefront::domain::aggregates::DraftDefaults;
use opensase_storefront::infrastructure::{change_feed, EdgeFunctionOrders, FileStore, MemoryStore, PgCatalog, PgIdentity, PgOrderProcedure, TracingSink};
use opensase_storefront::ports::{LocalStore, OrderPlacement};
use opensase_storefront::{CartSession, CheckoutPipeline, DraftManager, Notifier, PosSession};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;
    let db = PgPoolOptions::new().max_connections(10).connect(&config.database_url).await?;

    let notifier = Notifier::new(Arc::new(TracingSink));
    let store: Arc<dyn LocalStore> = match &config.cart_store_dir {
        Some(dir) => Arc::new(FileStore::new(dir.clone())),
        None => Arc::new(MemoryStore::default()),
    };
    let session = Arc::new(Mutex::new(PosSession {
        cart: CartSession::load(store, config.cart_key.clone(), notifier.clone()),
        drafts: DraftManager::new(DraftDefaults::default(), notifier.clone()).with_search_limit(config.search_limit),
    }));

    let catalog = Arc::new(PgCatalog::new(db.clone()));
    let identity = Arc::new(PgIdentity::new(db.clone(), config.pos_operator_id));
    let procedure: Arc<dyn OrderPlacement> = Arc::new(PgOrderProcedure::new(db));
    let storefront_orders: Arc<dyn OrderPlacement> = match &config.edge_function_url {
        Some(url) => Arc::new(EdgeFunctionOrders::new(url.clone(), config.edge_function_key.clone())),
        None => procedure.clone(),
    };
    let state = AppState {
        session: session.clone(),
        catalog: catalog.clone(),
        customers: catalog,
        cart_checkout: Arc::new(CheckoutPipeline::new(storefront_orders, identity.clone(), notifier.clone(), config.currency.clone())),
        pos_checkout: Arc::new(CheckoutPipeline::new(procedure, identity, notifier, config.currency.clone())),
    };

    if let Some(url) = &config.nats_url {
        match async_nats::connect(url.as_str()).await {
            Ok(client) => {
                let (subject, session) = (config.changes_subject.clone(), session.clone());
                tokio::spawn(async move {
                    if let Err(e) = change_feed::run(client, subject, session).await { tracing::error!(error = %e, "change feed stopped"); }
                });
            }
            Err(e) => tracing::warn!(error = %e, "NATS unavailable, search caches will not be invalidated"),
        }
    }

    let app = api::router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());
    tracing::info!("🚀 OpenSASE Storefront listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
