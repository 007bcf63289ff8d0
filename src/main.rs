//! Visit Counter - a retro hit counter served as PNG.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use visit_counter::{
    config::Config,
    server::{create_router, RouterConfig},
    RedbEventStore, ThemeRegistry, VisitCounter,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    info!("  Database: {}", config.db.display());
    info!("  Themes: {}", config.themes_dir.display());
    info!(
        "  Queue: capacity {}, request timeout {}ms, write timeout {}ms",
        config.queue_capacity, config.request_timeout_ms, config.write_timeout_ms
    );
    match &config.web_dir {
        Some(dir) => info!("  Web root: {}", dir.display()),
        None => info!("  Web root: disabled"),
    }

    // Tiles are required for every response, so a broken theme is fatal.
    let registry = match ThemeRegistry::load_all(&config.themes_dir) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Failed to load themes: {}", e);
            return ExitCode::FAILURE;
        }
    };
    for theme in registry.themes() {
        if let Some(tiles) = registry.get(theme) {
            let (width, height) = tiles.dimensions();
            info!("  Theme '{}': {}x{} tiles", theme, width, height);
        }
    }

    let store = match RedbEventStore::open(&config.db) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open database {}: {}", config.db.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let counter = Arc::new(VisitCounter::with_config(
        store,
        registry,
        config.counter_config(),
    ));

    let router = create_router(Arc::clone(&counter), build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("  Embed the counter with:");
    info!("    <img src=\"http://{}/c.png\">", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    let served = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    info!("Draining {} pending write(s)", counter.pending_writes());
    counter.shutdown().await;

    if let Err(e) = served {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Resolve once Ctrl-C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "visit_counter=debug,tower_http=debug"
    } else {
        "visit_counter=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    if let Some(ref dir) = config.web_dir {
        router_config = router_config.with_web_dir(dir.clone());
    }

    router_config
}
