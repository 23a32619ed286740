use super::*;
use crate::assets::loader::{ImageFetcher, ImageLoadOpts};
use crate::source::pages::InMemoryPageSource;
use std::time::Duration;

struct NoFetch;

impl ImageFetcher for NoFetch {
    fn fetch(&self, url: &str, _timeout: Duration) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("offline: {url}")
    }
}

fn loader() -> Arc<ImageLoader> {
    Arc::new(ImageLoader::new(
        Arc::new(NoFetch),
        ImageLoadOpts::default().with_attempts(1),
    ))
}

fn small(project: &str) -> ExportRequest {
    ExportRequest::new(project)
        .with_resolution(1)
        .with_renderer(RendererOpts::default().with_page_size(40, 60))
}

fn source() -> InMemoryPageSource {
    InMemoryPageSource::new().with_project(
        "proj",
        vec![Page::new("b", 2), Page::new("a", 1), Page::new("c", 3)],
    )
}

#[test]
fn selection_keeps_requested_order() {
    let pages = vec![Page::new("a", 1), Page::new("b", 2)];
    let ids = vec!["b".to_owned(), "a".to_owned()];
    let out = select_pages(pages.clone(), Some(ids.as_slice())).unwrap();
    assert_eq!(out[0].id, "b");
    assert_eq!(select_pages(pages.clone(), None).unwrap().len(), 2);

    let err = select_pages(pages.clone(), Some(["zz".to_owned()].as_slice())).unwrap_err();
    assert_eq!(err.code, ErrorCode::ExportError);
    let err = select_pages(pages, Some(&[] as &[String])).unwrap_err();
    assert_eq!(err.code, ErrorCode::ExportError);
}

#[test]
fn invalid_requests_are_export_errors() {
    let src = source();
    let err = export_pages(&src, loader(), &small("proj").with_quality(1.5), &mut |_| {})
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ExportError);
    let err = export_pages(&src, loader(), &small("proj").with_resolution(0), &mut |_| {})
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ExportError);
}

#[test]
fn unknown_project_is_a_fetch_error() {
    let err = export_pages(&source(), loader(), &small("nope"), &mut |_| {}).unwrap_err();
    assert_eq!(err.code, ErrorCode::FetchError);
    assert_eq!(err.code.as_str(), "FETCH_ERROR");
}

#[test]
fn single_png_page_is_png() {
    let req = small("proj")
        .with_format(ExportFormat::Png)
        .with_page_ids(["a"]);
    let out = export_pages(&source(), loader(), &req, &mut |_| {}).unwrap();
    assert_eq!(out.mime, "image/png");
    assert_eq!(out.format, ExportFormat::Png);
    let img = image::load_from_memory(&out.bytes).unwrap();
    assert_eq!((img.width(), img.height()), (40, 60));
}

#[test]
fn png_with_several_pages_falls_back_to_pdf() {
    let req = small("proj").with_format(ExportFormat::Png);
    let mut progress = Vec::new();
    let out = export_pages(&source(), loader(), &req, &mut |f| progress.push(f)).unwrap();
    assert_eq!(out.mime, "application/pdf");
    assert_eq!(out.page_count, 3);
    assert_eq!(progress.len(), 3);
    assert!(progress.windows(2).all(|w| w[0] < w[1]));
    assert!((progress[0] - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(progress.last().copied(), Some(1.0));
}
