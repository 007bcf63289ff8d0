//! Counter rendering.
//!
//! - [`Renderer`]: turns a number into a row of digit tiles
//! - [`RenderOptions`]: theme and minimum digit width
//! - [`encode_png`]: serializes the composed canvas for HTTP responses

mod compose;
mod encoder;

pub use compose::{
    format_digits, normalize_width, RenderOptions, Renderer, DEFAULT_WIDTH, MAX_WIDTH,
};
pub use encoder::encode_png;
