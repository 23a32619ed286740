use image::ImageEncoder as _;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};

use crate::foundation::error::{KomaError, KomaResult};
use crate::render::cpu::Bitmap;

/// Encode a rendered page as straight-alpha RGBA PNG.
///
/// PNG is lossless; `quality >= 0.9` only buys the slower, tighter compression level.
pub fn encode_png(bitmap: &Bitmap, quality: f64) -> KomaResult<Vec<u8>> {
    check_len(bitmap)?;
    let rgba = bitmap.to_straight_rgba8();
    let compression = if quality >= 0.9 {
        CompressionType::Best
    } else {
        CompressionType::Default
    };
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, compression, FilterType::Adaptive)
        .write_image(
            &rgba,
            bitmap.width,
            bitmap.height,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| KomaError::encode(format!("png encode failed: {e}")))?;
    Ok(out)
}

pub(crate) fn check_len(bitmap: &Bitmap) -> KomaResult<()> {
    let expected = (bitmap.width as usize)
        .saturating_mul(bitmap.height as usize)
        .saturating_mul(4);
    if bitmap.width == 0 || bitmap.height == 0 || bitmap.data.len() != expected {
        return Err(KomaError::encode(format!(
            "bitmap {}x{} has {} bytes, expected {expected}",
            bitmap.width,
            bitmap.height,
            bitmap.data.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/export/png.rs"]
mod tests;
