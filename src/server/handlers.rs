//! HTTP request handlers for the visit counter.
//!
//! # Endpoints
//!
//! - `GET /c.png` - Record a visit and serve the counter image
//! - `GET /health` - Health check endpoint

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};
use url::{form_urlencoded, Url};

use crate::counter::VisitCounter;
use crate::error::RenderError;
use crate::render::{RenderOptions, DEFAULT_WIDTH};
use crate::store::EventStore;
use crate::theme::Theme;

/// Counter images must never be served from a cache.
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the visit counter.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: EventStore> {
    /// The counter service backing every request
    pub counter: Arc<VisitCounter<S>>,
}

impl<S: EventStore> AppState<S> {
    pub fn new(counter: Arc<VisitCounter<S>>) -> Self {
        Self { counter }
    }
}

impl<S: EventStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            counter: Arc::clone(&self.counter),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for `/c.png`.
///
/// Values are kept as strings: a malformed value falls back to its default
/// instead of failing the request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CounterQueryParams {
    /// Theme selector: "1" segment, "2" aomm
    pub t: Option<String>,

    /// Minimum number of digits
    pub w: Option<String>,

    /// Domain to count when no Referer header is sent
    pub d: Option<String>,
}

impl CounterQueryParams {
    /// Parse a raw query string. Never fails: unknown keys are ignored and the
    /// first value wins when a key repeats.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            let slot = match key.as_ref() {
                "t" => &mut params.t,
                "w" => &mut params.w,
                "d" => &mut params.d,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    /// Theme and width requested, with defaults for anything missing or invalid.
    pub fn render_options(&self) -> RenderOptions {
        let theme = self
            .t
            .as_deref()
            .and_then(Theme::from_param)
            .unwrap_or_default();
        let width = self
            .w
            .as_deref()
            .and_then(|w| w.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_WIDTH);
        RenderOptions::new(theme, width)
    }
}

/// Domain a visit is counted against.
///
/// Uses the host of the `Referer` header when present, otherwise the `d`
/// query parameter.
pub fn request_domain(headers: &HeaderMap, query: &CounterQueryParams) -> String {
    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|r| !r.is_empty());

    match referer {
        Some(referer) => referer_domain(referer),
        None => query.d.clone().unwrap_or_default(),
    }
}

/// Host part of a referer URL, or the raw value if it is not an absolute URL.
pub fn referer_domain(referer: &str) -> String {
    Url::parse(referer)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| referer.to_string())
}

/// Address of the visitor.
///
/// A present `X-Forwarded-For` header wins (its first entry); an unparseable
/// one yields `None` rather than falling back to the peer address.
pub fn source_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    match headers.get("x-forwarded-for") {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|xff| xff.split(',').next())
            .and_then(|first| first.trim().parse().ok()),
        None => peer.map(|addr| addr.ip()),
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "missing_tile")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    pub status: u16,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: status.as_u16(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Visits accepted but not yet persisted
    pub pending_writes: usize,

    /// Visits committed since startup
    pub written_visits: u64,

    /// Visits dropped since startup (full queue or failed write)
    pub dropped_visits: u64,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Every render failure is a server-side problem: tiles are loaded at
/// startup, so a missing one means the deployment is broken.
impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        let error_type = match &self {
            RenderError::UnknownTheme { .. } => "unknown_theme",
            RenderError::MissingTile { .. } => "missing_tile",
            RenderError::Encode(_) => "encode_error",
        };
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let message = self.to_string();

        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );

        let error_response = ErrorResponse::new(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle `GET /c.png`.
///
/// Records the visit (failures are logged and ignored), reads the current
/// count and returns it as a PNG. The count is read right after queueing, so
/// it normally does not include this request's own visit.
pub async fn counter_handler<S: EventStore>(
    State(state): State<AppState<S>>,
    request: Request,
) -> Result<Response, RenderError> {
    let query = CounterQueryParams::from_query(request.uri().query());
    let (domain, address) = {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let headers = request.headers();
        (request_domain(headers, &query), source_address(headers, peer))
    };

    info!(domain = %domain, source_address = ?address, "Received counter request");

    if let Err(e) = state.counter.add(address, &domain).await {
        // Not being able to record a visit is not worth failing the image.
        warn!(domain = %domain, error = %e, "Visit not recorded");
    }

    let count = state.counter.count(&domain).await;
    let png = state.counter.render_png(&query.render_options(), count)?;

    let mut response = (StatusCode::OK, png).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    headers.insert("x-visit-count", HeaderValue::from(count));

    Ok(response)
}

/// Handle `GET /health`.
pub async fn health_handler<S: EventStore>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    let stats = state.counter.queue_stats();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pending_writes: stats.pending,
        written_visits: stats.written,
        dropped_visits: stats.dropped,
    })
}

// =============================================================================
// Tests
// =============================================================================
