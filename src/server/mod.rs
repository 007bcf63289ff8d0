//! HTTP server layer for the visit counter.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                   GET /c.png   GET /health                      │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (referer, IP, options)   │  │ (CORS, tracing, web root)   │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    counter_handler, health_handler, referer_domain, request_domain, source_address, AppState,
    CounterQueryParams, ErrorResponse, HealthResponse,
};
pub use routes::{create_router, RouterConfig};
