//! Counter image composition.
//!
//! A number is formatted as a zero-padded decimal string and every character
//! is replaced by its digit tile, left to right, on a single row:
//!
//! ```text
//!   42, width 5  →  "00042"  →  ┌──┬──┬──┬──┬──┐
//!                               │0 │0 │0 │4 │2 │
//!                               └──┴──┴──┴──┴──┘
//! ```
//!
//! The width is a minimum: a number with more digits than `width` grows the
//! canvas rather than being truncated.

use std::sync::Arc;

use image::{imageops, RgbaImage};

use crate::error::RenderError;
use crate::theme::{Theme, ThemeRegistry};

/// Default minimum number of digits.
pub const DEFAULT_WIDTH: i64 = 5;

/// Largest accepted minimum number of digits.
pub const MAX_WIDTH: i64 = 100;

/// How a counter should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Tile theme
    pub theme: Theme,

    /// Minimum digit count; negative means default, above 100 is clamped
    pub width: i64,
}

impl RenderOptions {
    pub fn new(theme: Theme, width: i64) -> Self {
        Self { theme, width }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            width: DEFAULT_WIDTH,
        }
    }
}

/// Clamp a requested width into `[0, MAX_WIDTH]`, mapping negatives to the
/// default.
#[inline]
pub fn normalize_width(width: i64) -> usize {
    if width < 0 {
        DEFAULT_WIDTH as usize
    } else {
        width.min(MAX_WIDTH) as usize
    }
}

/// Format `number` left-padded with zeros to at least `width` digits.
pub fn format_digits(number: u64, width: i64) -> String {
    format!("{:0>width$}", number, width = normalize_width(width))
}

/// Composes digit tiles from a shared [`ThemeRegistry`].
#[derive(Debug, Clone)]
pub struct Renderer {
    registry: Arc<ThemeRegistry>,
}

impl Renderer {
    pub fn new(registry: Arc<ThemeRegistry>) -> Self {
        Self { registry }
    }

    /// The registry tiles are drawn from.
    pub fn registry(&self) -> &Arc<ThemeRegistry> {
        &self.registry
    }

    /// Render `number` as a row of digit tiles.
    ///
    /// # Errors
    ///
    /// - [`RenderError::UnknownTheme`] if the theme is not in the registry
    /// - [`RenderError::MissingTile`] if a character has no tile
    pub fn render(&self, options: &RenderOptions, number: u64) -> Result<RgbaImage, RenderError> {
        let theme = options.theme;
        let set = self
            .registry
            .get(theme)
            .ok_or_else(|| RenderError::UnknownTheme {
                theme: theme.name().to_string(),
            })?;

        let tiles = format_digits(number, options.width)
            .chars()
            .map(|glyph| {
                glyph
                    .to_digit(10)
                    .and_then(|digit| set.tile(digit as u8))
                    .ok_or_else(|| RenderError::MissingTile {
                        theme: theme.name().to_string(),
                        glyph,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (tile_width, tile_height) = set.dimensions();
        let mut canvas = RgbaImage::new(tile_width * tiles.len() as u32, tile_height);

        for (column, tile) in tiles.into_iter().enumerate() {
            let x = column as i64 * i64::from(tile_width);
            imageops::replace(&mut canvas, tile, x, 0);
        }

        Ok(canvas)
    }
}
