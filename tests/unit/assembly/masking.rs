use super::*;
use crate::assets::loader::{ImageFetcher, ImageLoadOpts};
use std::io::Cursor;
use std::time::Duration;

fn panel() -> Element {
    Element::panel("p", 100.0, 100.0, 200.0, 100.0, 10)
}

fn service() -> MaskingService {
    MaskingService::new(MaskingOpts::default().with_cache_capacity(2))
}

struct RedFetcher;

impl ImageFetcher for RedFetcher {
    fn fetch(&self, _url: &str, _timeout: Duration) -> anyhow::Result<Vec<u8>> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

#[test]
fn rectangular_mask_respects_padding() {
    let mut s = service();
    let opts = MaskOptions::default().with_padding(Edges {
        top: 5.0,
        right: 10.0,
        bottom: 15.0,
        left: 20.0,
    });
    let clip = s.build_mask(&panel(), &opts).unwrap();
    assert_eq!(clip.path.bounding_box(), Rect::new(20.0, 5.0, 190.0, 85.0));
    assert_eq!(clip.opacity, 1.0);
}

#[test]
fn custom_mask_falls_back_to_rectangle() {
    let mut s = service();
    let custom = MaskOptions {
        mask_type: MaskType::Custom,
        ..MaskOptions::default()
    };
    let a = s.build_mask(&panel(), &custom).unwrap();
    let b = s.build_mask(&panel(), &MaskOptions::default()).unwrap();
    assert_eq!(a.path.bounding_box(), b.path.bounding_box());
    assert!(a.path.contains(kurbo::Point::new(0.5, 0.5)));
}

#[test]
fn rounded_mask_cuts_corners() {
    let mut s = service();
    let clip = s.build_mask(&panel(), &MaskOptions::rounded(20.0)).unwrap();
    assert!(!clip.path.contains(kurbo::Point::new(1.0, 1.0)));
    assert!(clip.path.contains(kurbo::Point::new(100.0, 50.0)));
}

#[test]
fn cache_hits_on_same_geometry_and_is_bounded() {
    let mut s = service();
    let opts = MaskOptions::default();
    s.build_mask(&panel(), &opts).unwrap();
    s.build_mask(&panel(), &opts).unwrap();
    assert_eq!(s.cache_len(), 1);

    let mut resized = panel();
    resized.transform.width = 250.0;
    s.build_mask(&resized, &opts).unwrap();
    let mut again = panel();
    again.transform.height = 50.0;
    s.build_mask(&again, &opts).unwrap();
    assert_eq!(s.cache_len(), 2);

    s.clear_cache();
    assert_eq!(s.cache_len(), 0);
}

#[test]
fn non_panel_is_rejected() {
    let mut s = service();
    let img = Element::image("i", "a.png", 0.0, 0.0, 1.0, 1.0, 0);
    assert!(s.build_mask(&img, &MaskOptions::default()).is_err());
}

#[test]
fn container_translates_children_into_panel_space() {
    let mut s = service();
    let images = vec![
        Element::image("i1", "a.png", 120.0, 90.0, 50.0, 60.0, 5),
        Element::text("t", "ignored", 0.0, 0.0, 1.0, 1.0, 0),
    ];
    let c = s
        .build_masked_container(&panel(), &images, &MaskOptions::default())
        .unwrap();
    assert_eq!((c.x, c.y, c.z_index), (100.0, 100.0, 9));
    assert_eq!(c.children.len(), 1);
    let sprite = &c.children[0];
    assert_eq!((sprite.x, sprite.y), (20.0, -10.0));
    assert_eq!(sprite.url, "a.png");
    assert!(c.clip.is_some());
    assert!(!c.is_attached());
}

#[test]
fn update_rebuilds_and_keeps_attachment() {
    let mut s = service();
    let mut c = s
        .build_masked_container(&panel(), &[], &MaskOptions::default())
        .unwrap();
    c.attach("page-1");
    let mut moved = panel();
    moved.transform.x = 0.0;
    let images = vec![Element::image("i", "a.png", 10.0, 100.0, 5.0, 5.0, 1)];
    s.update_masked_container(&mut c, &moved, &images, &MaskOptions::default())
        .unwrap();
    assert_eq!(c.x, 0.0);
    assert_eq!(c.children.len(), 1);
    assert_eq!(c.parent.as_deref(), Some("page-1"));
}

#[test]
fn failed_update_leaves_container_attached() {
    let mut s = service();
    let mut c = s
        .build_masked_container(&panel(), &[], &MaskOptions::default())
        .unwrap();
    c.attach("page-1");
    let before = c.clone();
    let not_a_panel = Element::text("t", "hi", 0.0, 0.0, 10.0, 10.0, 1);
    assert!(
        s.update_masked_container(&mut c, &not_a_panel, &[], &MaskOptions::default())
            .is_err()
    );
    assert!(c.is_attached());
    assert_eq!(c, before);
}

#[test]
fn remove_releases_everything() {
    let mut s = service();
    let images = vec![Element::image("i", "a.png", 100.0, 100.0, 5.0, 5.0, 1)];
    let mut c = s
        .build_masked_container(&panel(), &images, &MaskOptions::default())
        .unwrap();
    c.attach("page");
    s.remove_masked_container(&mut c);
    assert!(c.clip.is_none());
    assert!(c.children.is_empty());
    assert!(!c.is_attached());
}

#[test]
fn rasterized_preview_is_clipped() {
    let mut s = service();
    let p = Element::panel("p", 100.0, 100.0, 50.0, 40.0, 10);
    let images = vec![Element::image("i", "red.png", 100.0, 100.0, 50.0, 40.0, 5)];
    let c = s
        .build_masked_container(&p, &images, &MaskOptions::rounded(10.0))
        .unwrap();
    let loader = Arc::new(ImageLoader::new(
        Arc::new(RedFetcher),
        ImageLoadOpts::default().with_attempts(1),
    ));
    let bmp = c.rasterize(loader, 1).unwrap();
    assert_eq!((bmp.width, bmp.height), (50, 40));
    let centre = bmp.pixel(25, 20).unwrap();
    assert!(centre[0] > 240 && centre[1] < 16 && centre[3] > 240, "{centre:?}");
    assert!(bmp.pixel(0, 0).unwrap()[3] < 32);
}
