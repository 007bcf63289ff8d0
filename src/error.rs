use thiserror::Error;

/// Errors raised when a visit is rejected before it reaches the write queue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The request carried no referring domain
    #[error("empty domain supplied")]
    EmptyDomain,

    /// The source address was absent or could not be parsed
    #[error("empty or unparseable source address supplied")]
    MissingAddress,
}

/// Errors from the persistent event store
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Count queries require a non-empty domain
    #[error("empty domain in query")]
    EmptyDomain,

    /// Error reported by the underlying database
    #[error("Database error: {0}")]
    Database(String),

    /// A visit event could not be serialized
    #[error("Failed to encode visit event: {0}")]
    Encode(String),

    /// A stored record could not be deserialized
    #[error("Failed to decode record {sequence} in shard {shard}: {message}")]
    Decode {
        shard: u64,
        sequence: u64,
        message: String,
    },

    /// The operation was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// The blocking task running the operation panicked or was aborted
    #[error("Store task failed: {0}")]
    TaskFailed(String),
}

impl StorageError {
    /// Wrap any redb error as a [`StorageError::Database`].
    pub(crate) fn database(err: impl Into<redb::Error>) -> Self {
        StorageError::Database(err.into().to_string())
    }
}

/// Errors that can occur when composing a counter image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The requested theme was never loaded into the registry
    #[error("Unknown theme: {theme}")]
    UnknownTheme { theme: String },

    /// No tile exists for a character of the formatted number
    #[error("No tile found for {theme}:{glyph}")]
    MissingTile { theme: String, glyph: char },

    /// PNG encoding of the composed canvas failed
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Errors loading theme tile sets at startup.
///
/// The server cannot run without complete tile sets, so every variant is
/// fatal to the process.
#[derive(Debug, Clone, Error)]
pub enum ThemeError {
    /// The theme's directory does not exist
    #[error("Theme directory not found: {path}")]
    MissingThemeDir { path: String },

    /// One of the ten digit images is missing
    #[error("Theme '{theme}' is missing digit {digit} ({path})")]
    MissingDigit {
        theme: String,
        digit: u8,
        path: String,
    },

    /// A digit image exists but could not be decoded
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },

    /// Tiles within a theme must share dimensions
    #[error(
        "Theme '{theme}' digit {digit} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        theme: String,
        digit: u8,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// A tile set must contain exactly one tile per decimal digit
    #[error("Theme '{theme}' has {count} tiles, expected 10")]
    WrongTileCount { theme: String, count: usize },
}
