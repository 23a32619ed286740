use std::sync::Arc;

use anyhow::Context;

use crate::foundation::core::premultiply_rgba8_in_place;
use crate::foundation::error::{KomaError, KomaResult};

/// Largest raster side accepted for SVG sources.
const MAX_SVG_DIM: u32 = 16_384;

/// A decoded picture ready for drawing: premultiplied RGBA8, tightly packed.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Premultiplied RGBA8 pixels, row-major.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl DecodedImage {
    /// Wrap a premultiplied buffer, checking its length.
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> KomaResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if rgba8_premul.len() != expected {
            return Err(KomaError::validation(format!(
                "image buffer has {} bytes, expected {expected} for {width}x{height}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }
}

/// Decode raster or SVG bytes into premultiplied RGBA8.
///
/// SVG documents are rasterized at `svg_scale` times their intrinsic size.
pub fn decode_image(bytes: &[u8], svg_scale: f32) -> KomaResult<DecodedImage> {
    if looks_like_svg(bytes) {
        return decode_svg(bytes, svg_scale);
    }

    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(KomaError::validation("decoded image has zero size"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(DecodedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn decode_svg(bytes: &[u8], svg_scale: f32) -> KomaResult<DecodedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;

    let scale = if svg_scale.is_finite() && svg_scale > 0.0 {
        svg_scale
    } else {
        1.0
    };
    let to_px = |v: f32| -> KomaResult<u32> {
        let px = (v * scale).ceil();
        if !px.is_finite() || px <= 0.0 {
            return Err(KomaError::validation("svg has invalid width/height"));
        }
        let px = px as u32;
        if px > MAX_SVG_DIM {
            return Err(KomaError::validation(format!(
                "svg raster side {px} exceeds {MAX_SVG_DIM}"
            )));
        }
        Ok(px.max(1))
    };
    let size = tree.size();
    let width = to_px(size.width())?;
    let height = to_px(size.height())?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| KomaError::render("failed to allocate svg pixmap"))?;
    let sx = width as f32 / size.width();
    let sy = height as f32 / size.height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    // tiny-skia pixmaps are already premultiplied RGBA8.
    DecodedImage::from_premul(width, height, pixmap.take())
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
