//! # Visit Counter
//!
//! A retro hit counter for web pages, served as a PNG image.
//!
//! Each request to `/c.png` records one visit for the referring domain and
//! returns the domain's running count drawn with a theme of digit tiles.
//!
//! ## Features
//!
//! - **Sharded event store**: Visits are appended to one of ten shards in an
//!   embedded redb database, chosen by a stable hash of the domain
//! - **Asynchronous writes**: A bounded queue and a single worker keep
//!   persistence off the request path
//! - **Bounded latency**: Queueing and counting are capped so a slow store
//!   degrades to a zero count instead of a stalled image
//! - **Themes**: Digit tiles are loaded once at startup and composed per request
//!
//! ## Architecture
//!
//! - [`store`] - Visit events, sharding and the redb-backed event store
//! - [`queue`] - Bounded write queue and its background worker
//! - [`theme`] - Theme tile registry
//! - [`render`] - Digit composition and PNG encoding
//! - [`counter`] - The `add` / `count` / `render` service
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use visit_counter::{create_router, RedbEventStore, RouterConfig, ThemeRegistry, VisitCounter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RedbEventStore::open("./counter.db")?;
//!     let registry = Arc::new(ThemeRegistry::load_all("./themes")?);
//!     let counter = Arc::new(VisitCounter::new(store, registry));
//!
//!     let router = create_router(counter, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod counter;
pub mod error;
pub mod queue;
pub mod render;
pub mod server;
pub mod store;
pub mod theme;

// Re-export commonly used types
pub use config::Config;
pub use counter::{CounterConfig, VisitCounter};
pub use error::{RenderError, StorageError, ThemeError, ValidationError};
pub use queue::{Enqueued, QueueConfig, QueueStats, WriteQueue};
pub use render::{encode_png, RenderOptions, Renderer};
pub use server::{create_router, AppState, RouterConfig};
pub use store::{EventStore, QueryEvent, RedbEventStore, VisitEvent, SHARD_COUNT};
pub use theme::{Theme, ThemeRegistry, TileSet};
