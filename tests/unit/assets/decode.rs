use super::*;
use std::io::Cursor;

fn png_bytes(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[test]
fn png_is_decoded_and_premultiplied() {
    let img = decode_image(&png_bytes(2, 3, [200, 100, 0, 128]), 1.0).unwrap();
    assert_eq!((img.width, img.height), (2, 3));
    assert_eq!(img.rgba8_premul.len(), 2 * 3 * 4);
    assert_eq!(&img.rgba8_premul[..4], &[100, 50, 0, 128]);
}

#[test]
fn svg_is_rasterized_at_scale() {
    let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="20">
        <rect width="10" height="20" fill="#ff0000"/></svg>"##;
    let img = decode_image(svg, 2.0).unwrap();
    assert_eq!((img.width, img.height), (20, 40));
    let mid = ((20 * 20 + 10) * 4) as usize;
    assert_eq!(&img.rgba8_premul[mid..mid + 4], &[255, 0, 0, 255]);
}

#[test]
fn garbage_is_an_error() {
    assert!(decode_image(b"definitely not an image", 1.0).is_err());
}

#[test]
fn from_premul_checks_length() {
    assert!(DecodedImage::from_premul(2, 2, vec![0; 16]).is_ok());
    assert!(DecodedImage::from_premul(2, 2, vec![0; 15]).is_err());
}
