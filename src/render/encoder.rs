//! PNG encoding of composed counter images.

use bytes::Bytes;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::error::RenderError;

/// Encode an RGBA canvas as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Bytes, RenderError> {
    let mut output = Vec::new();
    PngEncoder::new(&mut output)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| RenderError::Encode(e.to_string()))?;

    Ok(Bytes::from(output))
}
