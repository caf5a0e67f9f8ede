//! Gateway main entry point
//!
//! HTTP gateway for the drinks catalog. Verifies bearer tokens against the
//! identity provider's published keys and serves the catalog from SQLite.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth::{AuthGuard, JwksFetcher, KeyStore};
use drinks_service::{DrinkService, SqliteDrinkRepository};
use gateway_lib::{router, AppContext, GatewayConfig};

async fn run_server(config: GatewayConfig) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway=info,auth=info,drinks_service=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gateway v{}", config.version);

    // Storage
    let pool = db::create_pool(&config.db_config())
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    let repository = SqliteDrinkRepository::new(pool)
        .await
        .context("failed to prepare drink table")?;
    if config.reset_db {
        repository.reset().await.context("failed to reset database")?;
    }

    // Signing keys
    let jwks_url = config
        .jwks_url()
        .context("AUTH0_DOMAIN or JWKS_URL must be set")?;
    let fetcher = JwksFetcher::new(&jwks_url, config.jwks_timeout)?;
    let store = Arc::new(KeyStore::remote(fetcher, config.jwks_min_refresh_interval));
    if let Err(e) = store.refresh().await {
        // Keys are fetched again on the first protected request.
        tracing::warn!("Initial signing key fetch from {} failed: {}", jwks_url, e);
    }
    let _refresh = store.clone().spawn_refresh_task(config.jwks_refresh_interval);

    let guard = AuthGuard::new(store, config.jwt_config());
    let drinks = DrinkService::with_repository(Arc::new(repository));
    let addr = config.http_addr.clone();
    let app = router(AppContext::new(config, guard, drinks));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("gateway {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_help();
                std::process::exit(2);
            }
        }
    }

    let config = GatewayConfig::from_env()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_server(config))
}

fn print_help() {
    println!("Gateway Service - HTTP API for the drinks catalog");
    println!();
    println!("Usage:");
    println!("  gateway                  Run the HTTP server");
    println!("  gateway --help           Show this help");
    println!("  gateway --version        Show the version");
    println!();
    println!("Environment Variables:");
    println!("  GATEWAY_HTTP_ADDR        HTTP listen address (default: 127.0.0.1:5000)");
    println!("  AUTH0_DOMAIN             Identity provider domain (issuer and JWKS location)");
    println!("  API_AUDIENCE             Expected token audience (default: drinks)");
    println!("  JWT_ALGORITHM            Expected token algorithm (default: RS256)");
    println!("  JWKS_URL                 Override the JWKS location");
    println!("  JWKS_TIMEOUT_SECS        Key fetch timeout (default: 5)");
    println!("  JWKS_REFRESH_SECS        Background key refresh interval (default: 600)");
    println!("  JWKS_MIN_REFRESH_SECS    Minimum spacing of on-demand refreshes (default: 30)");
    println!("  DATABASE_URL             SQLite database (default: sqlite://database.db)");
    println!("  JWT_LEEWAY_SECS          Allowed clock skew for token expiry (default: 30)");
    println!("  DB_MAX_CONNECTIONS       Pool size (default: 5)");
    println!("  DB_CONNECT_TIMEOUT_SECS  Pool acquire timeout (default: 30)");
    println!("  DRINKS_RESET_DB          Drop and reseed the catalog on startup (default: false)");
    println!("  RUST_LOG                 Log filter");
}
