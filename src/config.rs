//! Configuration management for the visit counter.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `VC_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `VC_HOST` - Server bind address (default: 127.0.0.1)
//! - `VC_PORT` - Server port (default: 8080)
//! - `VC_DB` - Database file location (default: ./counter.db)
//! - `VC_THEMES_DIR` - Directory holding theme tiles (default: ./themes)
//! - `VC_WEB_DIR` - Static web root (default: none)
//! - `VC_QUEUE_CAPACITY` - Write queue capacity (default: 100)
//! - `VC_REQUEST_TIMEOUT_MS` - Bound on enqueue wait and count (default: 100)
//! - `VC_WRITE_TIMEOUT_MS` - Bound on a single store write (default: 1000)
//! - `VC_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::counter::CounterConfig;
use crate::queue::{QueueConfig, DEFAULT_QUEUE_CAPACITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default database file.
pub const DEFAULT_DB_PATH: &str = "./counter.db";

/// Default themes directory.
pub const DEFAULT_THEMES_DIR: &str = "./themes";

/// Default bound on request-scoped operations, in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 100;

/// Default bound on a store write, in milliseconds.
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 1000;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Visit Counter - a retro hit counter served as PNG.
///
/// Records one visit per request for the referring domain and returns an
/// image of the domain's running count.
#[derive(Parser, Debug, Clone)]
#[command(name = "visit-counter")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "VC_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "VC_PORT")]
    pub port: u16,

    /// Directory of static files served at the root.
    #[arg(long, env = "VC_WEB_DIR")]
    pub web_dir: Option<PathBuf>,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Database file location. Created if it does not exist.
    #[arg(long, default_value = DEFAULT_DB_PATH, env = "VC_DB")]
    pub db: PathBuf,

    /// Directory containing one sub-directory of digit tiles per theme.
    #[arg(long, default_value = DEFAULT_THEMES_DIR, env = "VC_THEMES_DIR")]
    pub themes_dir: PathBuf,

    // =========================================================================
    // Write Queue Configuration
    // =========================================================================
    /// Maximum number of visits waiting to be written.
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY, env = "VC_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Upper bound in milliseconds on queueing a visit and on reading a count.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_MS, env = "VC_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// Upper bound in milliseconds on a single store write.
    #[arg(long, default_value_t = DEFAULT_WRITE_TIMEOUT_MS, env = "VC_WRITE_TIMEOUT_MS")]
    pub write_timeout_ms: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "VC_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.db.as_os_str().is_empty() {
            return Err("Database path is required. Set --db or VC_DB".to_string());
        }

        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".to_string());
        }

        if self.request_timeout_ms == 0 {
            return Err("request_timeout_ms must be greater than 0".to_string());
        }
        if self.write_timeout_ms == 0 {
            return Err("write_timeout_ms must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Bound on request-scoped operations.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Counter settings derived from the CLI.
    ///
    /// The request timeout bounds both the enqueue wait and the count.
    pub fn counter_config(&self) -> CounterConfig {
        CounterConfig {
            queue: QueueConfig {
                capacity: self.queue_capacity,
                enqueue_timeout: self.request_timeout(),
                write_timeout: Duration::from_millis(self.write_timeout_ms),
            },
            request_timeout: self.request_timeout(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
