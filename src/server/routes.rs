//! Router configuration for the visit counter.
//!
//! # Route Structure
//!
//! ```text
//! /c.png     - Record a visit, serve the counter image
//! /health    - Health check
//! /*         - Static web root (optional)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use visit_counter::server::routes::{create_router, RouterConfig};
//!
//! let counter = Arc::new(VisitCounter::new(store, registry));
//! let router = create_router(counter, RouterConfig::new().with_web_dir("./web"));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{counter_handler, health_handler, AppState};
use crate::counter::VisitCounter;
use crate::store::EventStore;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Directory of static files served for unmatched paths
    pub web_dir: Option<PathBuf>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration with defaults.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - No static web root
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            web_dir: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Serve static files from `dir` for paths no route matches.
    pub fn with_web_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.web_dir = Some(dir.into());
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// handler can see the peer address when no `X-Forwarded-For` is present.
pub fn create_router<S: EventStore>(counter: Arc<VisitCounter<S>>, config: RouterConfig) -> Router {
    let app_state = AppState::new(counter);
    let cors = build_cors_layer(&config);

    let mut router = Router::new()
        .route("/c.png", get(counter_handler::<S>))
        .route("/health", get(health_handler::<S>))
        .with_state(app_state);

    if let Some(dir) = &config.web_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    let router = router.layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
