use std::sync::Arc;

use crate::assets::loader::ImageLoader;
use crate::export::pdf::{PdfBuilder, PdfMetadata};
use crate::export::png::encode_png;
use crate::foundation::error::{ErrorCode, ExportError};
use crate::render::cpu::{PageRenderer, RendererOpts};
use crate::scene::model::Page;
use crate::source::pages::PageSource;

/// Requested output container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Single raster; only honoured when exactly one page is selected.
    Png,
    /// Multi-page document of full-bleed JPEG pages.
    #[default]
    Pdf,
}

impl ExportFormat {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }
}

/// What to export and how.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportRequest {
    /// Project whose pages are fetched.
    pub project_id: String,
    /// Requested format.
    pub format: ExportFormat,
    /// Encoder quality in `0..=1`.
    pub quality: f64,
    /// Integer oversampling factor.
    pub resolution: u32,
    /// Pages to export, in output order; `None` exports every page by page number.
    pub page_ids: Option<Vec<String>>,
    /// PDF `Info` dictionary.
    pub metadata: PdfMetadata,
    /// Page size, colours and text settings. `scale` is replaced by `resolution`.
    pub renderer: RendererOpts,
}

impl ExportRequest {
    /// PDF of every page at quality 0.95 and 3x resolution.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            format: ExportFormat::Pdf,
            quality: 0.95,
            resolution: 3,
            page_ids: None,
            metadata: PdfMetadata::default(),
            renderer: RendererOpts::default(),
        }
    }

    /// Builder-style format.
    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Builder-style quality.
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality;
        self
    }

    /// Builder-style resolution.
    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    /// Restrict the export to `ids`, in that order.
    pub fn with_page_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.page_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Builder-style PDF metadata.
    pub fn with_metadata(mut self, metadata: PdfMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builder-style renderer options.
    pub fn with_renderer(mut self, renderer: RendererOpts) -> Self {
        self.renderer = renderer;
        self
    }

    fn validate(&self) -> Result<(), ExportError> {
        if !(self.quality.is_finite() && (0.0..=1.0).contains(&self.quality)) {
            return Err(ExportError::new(
                ErrorCode::ExportError,
                format!("quality {} is outside 0..=1", self.quality),
            ));
        }
        if self.resolution == 0 {
            return Err(ExportError::new(
                ErrorCode::ExportError,
                "resolution must be a positive integer",
            ));
        }
        Ok(())
    }
}

/// Encoded export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOutput {
    /// File bytes.
    pub bytes: Vec<u8>,
    /// Format actually produced.
    pub format: ExportFormat,
    /// MIME type of `bytes`.
    pub mime: &'static str,
    /// Number of pages rendered.
    pub page_count: usize,
}

fn select_pages(pages: Vec<Page>, ids: Option<&[String]>) -> Result<Vec<Page>, ExportError> {
    let selected = match ids {
        None => pages,
        Some(ids) => {
            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                let page = pages.iter().find(|p| &p.id == id).ok_or_else(|| {
                    ExportError::new(ErrorCode::ExportError, format!("unknown page '{id}'"))
                })?;
                out.push(page.clone());
            }
            out
        }
    };
    if selected.is_empty() {
        return Err(ExportError::new(
            ErrorCode::ExportError,
            "no pages selected for export",
        ));
    }
    Ok(selected)
}

/// Fetch, render and encode a project's pages.
///
/// A PNG request with exactly one selected page yields PNG bytes; anything else yields a PDF
/// with one page per selected page. `on_progress` receives the overall fraction
/// `(pages_done + current_page_fraction) / pages_total`.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(project_id = %request.project_id, format = request.format.as_str())
)]
pub fn export_pages(
    source: &dyn PageSource,
    loader: Arc<ImageLoader>,
    request: &ExportRequest,
    on_progress: &mut dyn FnMut(f64),
) -> Result<ExportOutput, ExportError> {
    request.validate()?;
    let pages = source.fetch_all_pages(&request.project_id)?;
    let pages = select_pages(pages, request.page_ids.as_deref())?;
    let total = pages.len();
    tracing::info!(pages = total, resolution = request.resolution, "export started");

    let opts = request.renderer.clone().with_scale(request.resolution);
    let (page_w, page_h) = (f64::from(opts.page_width), f64::from(opts.page_height));
    let mut renderer = PageRenderer::new(loader, opts);

    let output = if request.format == ExportFormat::Png && total == 1 {
        let bitmap = renderer.render_page(&pages[0], on_progress)?;
        ExportOutput {
            bytes: encode_png(&bitmap, request.quality)?,
            format: ExportFormat::Png,
            mime: "image/png",
            page_count: 1,
        }
    } else {
        let mut pdf = PdfBuilder::new(page_w, page_h, request.quality);
        for (done, page) in pages.iter().enumerate() {
            let bitmap = renderer.render_page(page, &mut |f| {
                on_progress((done as f64 + f) / total as f64);
            })?;
            pdf.push_page(&bitmap)?;
        }
        ExportOutput {
            bytes: pdf.finish(&request.metadata)?,
            format: ExportFormat::Pdf,
            mime: "application/pdf",
            page_count: total,
        }
    };

    tracing::info!(
        pages = output.page_count,
        bytes = output.bytes.len(),
        mime = output.mime,
        "export finished"
    );
    Ok(output)
}

#[cfg(test)]
#[path = "../../tests/unit/export/pipeline.rs"]
mod tests;
