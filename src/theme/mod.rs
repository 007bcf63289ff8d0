//! Digit tile themes.
//!
//! A theme is ten same-sized images, one per decimal digit. The
//! [`ThemeRegistry`] loads the configured themes from disk at startup and is
//! immutable afterwards; the renderer holds it behind an `Arc`.

mod registry;

pub use registry::{Theme, ThemeRegistry, TileSet, DIGIT_COUNT};
