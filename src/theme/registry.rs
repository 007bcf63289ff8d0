//! Theme registry: loads digit tile sets once at startup.
//!
//! # Asset Layout
//!
//! ```text
//! <themes-dir>/
//!   segment/0.png … 9.png
//!   aomm/0.png … 9.png
//! ```
//!
//! Every tile in a theme must have the same dimensions. Any missing
//! directory, missing digit, undecodable image or size mismatch aborts the
//! load; the server cannot render without complete tile sets.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use image::{ImageReader, RgbaImage};
use tracing::debug;

use crate::error::ThemeError;

/// Number of tiles in a set, one per decimal digit.
pub const DIGIT_COUNT: usize = 10;

// =============================================================================
// Theme
// =============================================================================

/// The visual styles a counter can be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    /// Classic red 7-segment display
    #[default]
    Segment,

    /// Pixel font in the style of aomm.xyz
    Aomm,
}

impl Theme {
    /// Every theme the server ships with.
    pub const ALL: [Theme; 2] = [Theme::Segment, Theme::Aomm];

    /// Directory name of the theme's assets.
    pub fn name(&self) -> &'static str {
        match self {
            Theme::Segment => "segment",
            Theme::Aomm => "aomm",
        }
    }

    /// Look up a theme by its directory name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Map the numeric `t` query parameter ("1", "2") to a theme.
    pub fn from_param(param: &str) -> Option<Self> {
        match param {
            "1" => Some(Theme::Segment),
            "2" => Some(Theme::Aomm),
            _ => None,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Tile Set
// =============================================================================

/// Ten digit tiles of identical size, indexed by digit value.
#[derive(Debug, Clone)]
pub struct TileSet {
    tiles: Vec<RgbaImage>,
    width: u32,
    height: u32,
}

impl TileSet {
    /// Build a tile set, checking there are exactly ten tiles of one size.
    pub fn new(theme: &str, tiles: Vec<RgbaImage>) -> Result<Self, ThemeError> {
        if tiles.len() != DIGIT_COUNT {
            return Err(ThemeError::WrongTileCount {
                theme: theme.to_string(),
                count: tiles.len(),
            });
        }

        let (width, height) = tiles[0].dimensions();
        for (digit, tile) in tiles.iter().enumerate() {
            let (w, h) = tile.dimensions();
            if (w, h) != (width, height) {
                return Err(ThemeError::DimensionMismatch {
                    theme: theme.to_string(),
                    digit: digit as u8,
                    expected_width: width,
                    expected_height: height,
                    actual_width: w,
                    actual_height: h,
                });
            }
        }

        Ok(Self {
            tiles,
            width,
            height,
        })
    }

    /// Tile for a digit value, `None` if `digit > 9`.
    #[inline]
    pub fn tile(&self, digit: u8) -> Option<&RgbaImage> {
        self.tiles.get(digit as usize)
    }

    /// `(width, height)` shared by every tile.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Immutable map from [`Theme`] to its [`TileSet`].
///
/// Built once at startup and shared by reference; nothing mutates it after
/// construction.
#[derive(Debug, Clone, Default)]
pub struct ThemeRegistry {
    sets: HashMap<Theme, TileSet>,
}

impl ThemeRegistry {
    /// Load the given themes from `dir`.
    pub fn load(dir: impl AsRef<Path>, themes: &[Theme]) -> Result<Self, ThemeError> {
        let dir = dir.as_ref();
        let mut sets = HashMap::with_capacity(themes.len());

        for &theme in themes {
            let set = load_tile_set(dir, theme)?;
            let (w, h) = set.dimensions();
            debug!(theme = %theme, width = w, height = h, "Loaded theme tiles");
            sets.insert(theme, set);
        }

        Ok(Self { sets })
    }

    /// Load every theme in [`Theme::ALL`] from `dir`.
    pub fn load_all(dir: impl AsRef<Path>) -> Result<Self, ThemeError> {
        Self::load(dir, &Theme::ALL)
    }

    /// Build a registry from tile sets already in memory.
    pub fn from_tile_sets(sets: impl IntoIterator<Item = (Theme, TileSet)>) -> Self {
        Self {
            sets: sets.into_iter().collect(),
        }
    }

    /// Tile set for a theme, `None` if it was not loaded.
    #[inline]
    pub fn get(&self, theme: Theme) -> Option<&TileSet> {
        self.sets.get(&theme)
    }

    /// Themes present in the registry.
    pub fn themes(&self) -> Vec<Theme> {
        let mut themes: Vec<Theme> = self.sets.keys().copied().collect();
        themes.sort_by_key(|t| t.name());
        themes
    }
}

fn load_tile_set(dir: &Path, theme: Theme) -> Result<TileSet, ThemeError> {
    let theme_dir = dir.join(theme.name());
    if !theme_dir.is_dir() {
        return Err(ThemeError::MissingThemeDir {
            path: theme_dir.display().to_string(),
        });
    }

    let tiles = (0..DIGIT_COUNT as u8)
        .map(|digit| load_tile(&theme_dir, theme, digit))
        .collect::<Result<Vec<_>, _>>()?;

    TileSet::new(theme.name(), tiles)
}

fn load_tile(theme_dir: &Path, theme: Theme, digit: u8) -> Result<RgbaImage, ThemeError> {
    let path = theme_dir.join(format!("{}.png", digit));
    if !path.is_file() {
        return Err(ThemeError::MissingDigit {
            theme: theme.name().to_string(),
            digit,
            path: path.display().to_string(),
        });
    }

    let decode_err = |message: String| ThemeError::Decode {
        path: path.display().to_string(),
        message,
    };

    let img = ImageReader::open(&path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| decode_err(e.to_string()))?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;

    Ok(img.to_rgba8())
}

// =============================================================================
// Tests
// =============================================================================
