use super::*;

fn solid(w: u32, h: u32, rgba: [u8; 4]) -> Bitmap {
    Bitmap {
        width: w,
        height: h,
        data: rgba.repeat((w * h) as usize),
        premultiplied: true,
    }
}

fn num(o: &Object) -> f64 {
    match o {
        Object::Integer(i) => *i as f64,
        Object::Real(r) => f64::from(*r),
        other => panic!("not a number: {other:?}"),
    }
}

#[test]
fn quality_maps_onto_jpeg_range() {
    assert_eq!(jpeg_quality(0.0), 1);
    assert_eq!(jpeg_quality(0.5), 50);
    assert_eq!(jpeg_quality(0.95), 95);
    assert_eq!(jpeg_quality(3.0), 100);
    assert_eq!(jpeg_quality(f64::NAN), 100);
}

#[test]
fn jpeg_composites_transparency_over_white() {
    let jpeg = encode_jpeg(&solid(8, 8, [0, 0, 0, 0]), 90).unwrap();
    let img = image::load_from_memory(&jpeg).unwrap().to_rgb8();
    let px = img.get_pixel(4, 4).0;
    assert!(px.iter().all(|&c| c > 245), "{px:?}");
}

#[test]
fn builds_one_page_per_bitmap_with_metadata() {
    let mut b = PdfBuilder::new(120.0, 160.0, 0.9);
    b.push_page(&solid(12, 16, [255, 0, 0, 255])).unwrap();
    b.push_page(&solid(12, 16, [0, 0, 255, 255])).unwrap();
    assert_eq!(b.page_count(), 2);
    let meta = PdfMetadata::default().with_title("Chapter 1");
    let bytes = b.finish(&meta).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));

    let doc = Document::load_mem(&bytes).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 2);
    for page_id in pages.values() {
        let page = doc.get_dictionary(*page_id).unwrap();
        let media = page.get(b"MediaBox").unwrap().as_array().unwrap();
        let dims: Vec<f64> = media.iter().map(num).collect();
        assert_eq!(dims, vec![0.0, 0.0, 120.0, 160.0]);
    }

    let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = doc.get_dictionary(info_id).unwrap();
    assert_eq!(info.get(b"Title").unwrap().as_str().unwrap(), b"Chapter 1");
    assert!(info.get(b"CreationDate").is_ok());
    assert!(info.get(b"Keywords").is_ok());
}

#[test]
fn empty_document_is_rejected() {
    let b = PdfBuilder::new(10.0, 10.0, 1.0);
    assert!(matches!(
        b.finish(&PdfMetadata::default()),
        Err(KomaError::Encode(_))
    ));
}
