use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::export::png::check_len;
use crate::foundation::error::{KomaError, KomaResult};
use crate::render::cpu::Bitmap;

/// Document information written into the PDF `Info` dictionary.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PdfMetadata {
    /// Document title.
    pub title: String,
    /// Subject line.
    pub subject: String,
    /// Author.
    pub author: String,
    /// Creating application.
    pub creator: String,
    /// Producing library.
    pub producer: String,
    /// Keywords, joined with `", "`.
    pub keywords: Vec<String>,
    /// Creation time; `None` stamps the time of encoding.
    pub created_at: Option<DateTime<Utc>>,
}

impl Default for PdfMetadata {
    fn default() -> Self {
        Self {
            title: "Manga Export".to_owned(),
            subject: "Manga pages".to_owned(),
            author: "koma".to_owned(),
            creator: "koma".to_owned(),
            producer: concat!("koma ", env!("CARGO_PKG_VERSION")).to_owned(),
            keywords: vec!["manga".to_owned(), "comic".to_owned()],
            created_at: None,
        }
    }
}

impl PdfMetadata {
    /// Builder-style title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder-style author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }
}

/// Map an export quality in `0..=1` onto a JPEG quality in `1..=100`.
pub fn jpeg_quality(quality: f64) -> u8 {
    if !quality.is_finite() {
        return 100;
    }
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// JPEG bytes for a bitmap. Transparency is composited over white.
pub fn encode_jpeg(bitmap: &Bitmap, quality: u8) -> KomaResult<Vec<u8>> {
    check_len(bitmap)?;
    let mut rgb = Vec::with_capacity(bitmap.data.len() / 4 * 3);
    for px in bitmap.data.chunks_exact(4) {
        let a = px[3];
        for &c in &px[..3] {
            let c = if bitmap.premultiplied {
                c.saturating_add(255 - a)
            } else {
                let c = u16::from(c) * u16::from(a) + 255 * u16::from(255 - a);
                ((c + 127) / 255) as u8
            };
            rgb.push(c);
        }
    }
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode(
            &rgb,
            bitmap.width,
            bitmap.height,
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| KomaError::encode(format!("jpeg encode failed: {e}")))?;
    Ok(out)
}

/// Incremental multi-page PDF writer: every page is one full-bleed JPEG on a fixed media box.
///
/// Pages are JPEG-encoded as they are pushed so only one raster is alive at a time.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    page_width: f64,
    page_height: f64,
    jpeg_quality: u8,
}

impl std::fmt::Debug for PdfBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfBuilder")
            .field("pages", &self.kids.len())
            .field("page_width", &self.page_width)
            .field("page_height", &self.page_height)
            .field("jpeg_quality", &self.jpeg_quality)
            .finish()
    }
}

impl PdfBuilder {
    /// Empty document whose pages measure `page_width x page_height` points.
    pub fn new(page_width: f64, page_height: f64, quality: f64) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            page_width,
            page_height,
            jpeg_quality: jpeg_quality(quality),
        }
    }

    /// Pages pushed so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append `bitmap` stretched over a whole page.
    pub fn push_page(&mut self, bitmap: &Bitmap) -> KomaResult<()> {
        let jpeg = encode_jpeg(bitmap, self.jpeg_quality)?;
        let image_id = self.doc.add_object(
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => bitmap.width as i64,
                    "Height" => bitmap.height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                jpeg,
            )
            .with_compression(false),
        );

        let (w, h) = (self.page_width as f32, self.page_height as f32);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![w.into(), 0.into(), 0.into(), h.into(), 0.into(), 0.into()],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content
            .encode()
            .map_err(|e| KomaError::encode(format!("pdf content encode failed: {e}")))?;
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content_bytes));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), w.into(), h.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    /// Write the page tree, catalog and `Info` dictionary and serialize the document.
    pub fn finish(mut self, metadata: &PdfMetadata) -> KomaResult<Vec<u8>> {
        if self.kids.is_empty() {
            return Err(KomaError::encode("pdf has no pages"));
        }
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => count,
                "Kids" => std::mem::take(&mut self.kids),
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let created = metadata.created_at.unwrap_or_else(Utc::now);
        let date = created.format("D:%Y%m%d%H%M%SZ").to_string();
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal(metadata.title.as_str()),
            "Subject" => Object::string_literal(metadata.subject.as_str()),
            "Author" => Object::string_literal(metadata.author.as_str()),
            "Creator" => Object::string_literal(metadata.creator.as_str()),
            "Producer" => Object::string_literal(metadata.producer.as_str()),
            "Keywords" => Object::string_literal(metadata.keywords.join(", ")),
            "CreationDate" => Object::string_literal(date.as_str()),
        });
        self.doc.trailer.set("Info", info_id);

        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| KomaError::encode(format!("pdf write failed: {e}")))?;
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/pdf.rs"]
mod tests;
