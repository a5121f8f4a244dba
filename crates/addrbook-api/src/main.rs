mod auth;
mod config;
mod error;
mod extract;
mod routes;

use std::sync::Arc;

use addrbook_core::services::AddressBookService;
use config::AppConfig;
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("addrbook_api=info".parse()?),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!("Starting addrbook-api with config: {:?}", config);

    let service = AddressBookService::open_path(
        &config.database_path,
        config.db_busy_timeout,
        config.search_limit,
    )
    .await?;

    let state = AppState::new(config, service);
    let bind_addr = state.config.bind_addr.clone();
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("addrbook-api listening on {}", bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
