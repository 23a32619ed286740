use super::*;

#[test]
fn png_round_trips_straight_pixels() {
    let bmp = Bitmap {
        width: 2,
        height: 1,
        data: vec![255, 0, 0, 255, 64, 0, 0, 128],
        premultiplied: true,
    };
    let bytes = encode_png(&bmp, 1.0).unwrap();
    assert_eq!(&bytes[..4], b"\x89PNG");
    let img = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (2, 1));
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
    let half = img.get_pixel(1, 0).0;
    assert_eq!(half[3], 128);
    assert!((i16::from(half[0]) - 128).abs() <= 1);
}

#[test]
fn mismatched_buffer_is_an_encode_error() {
    let bmp = Bitmap {
        width: 4,
        height: 4,
        data: vec![0; 8],
        premultiplied: false,
    };
    assert!(matches!(encode_png(&bmp, 0.5), Err(KomaError::Encode(_))));
}
