//! koma assembles manga pages and exports them at print resolution.
//!
//! The crate has two halves:
//!
//! - Assembly: drop images onto panels ([`EditorSession`], [`DragDropCoordinator`]), track
//!   which images belong to which panel ([`AssociationStore`], [`detect_under`]) and clip them
//!   to the panel outline ([`MaskingService`]).
//! - Export: fetch a project's pages ([`PageSource`]), rasterize them on the CPU
//!   ([`PageRenderer`]) and encode PNG or multi-page PDF output ([`export_pages`]).
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub(crate) mod assembly;
pub(crate) mod assets;
pub(crate) mod export;
pub(crate) mod foundation;
pub(crate) mod render;
pub(crate) mod scene;
pub(crate) mod source;

pub use crate::foundation::color::Color;
pub use crate::foundation::core::{
    Affine, BezPath, Edges, Point, Rect, Vec2, premul_rgba8, premultiply_rgba8_in_place,
    rect_contains_inclusive, rect_xywh, unpremultiply_rgba8_in_place,
};
pub use crate::foundation::error::{
    BoxError, ErrorCode, ExportError, ImageLoadError, KomaError, KomaResult,
};

pub use crate::scene::markup::strip_to_plain_text;
pub use crate::scene::model::{
    BubbleType, DialogueContent, DialogueStyle, Element, ElementKind, ElementType, ImageContent,
    ImageMetadata, Page, PanelContent, PanelShape, PanelStyle, SourceType, TextAlign, TextContent,
    TextStyle, Transform,
};

pub use crate::assembly::association::{
    AssociationStore, AssociationType, Clock, PanelContentAssociation, SystemClock,
};
pub use crate::assembly::drag_drop::{
    CANVAS_DROP_Z, DragDropCoordinator, DragPayload, DropZone, DropZoneKind, PANEL_DROP_INSET,
    PANEL_DROP_Z_OFFSET,
};
pub use crate::assembly::geometry::{
    ImagePanelIntersection, SIGNIFICANT_COVERAGE_PERCENT, detect_under, intersect,
    intersect_rects, significant_image_ids,
};
pub use crate::assembly::masking::{
    ClipShape, MaskOptions, MaskType, MaskedContainer, MaskingOpts, MaskingService, Sprite,
};
pub use crate::assembly::session::EditorSession;

pub use crate::assets::decode::{DecodedImage, decode_image};
#[cfg(feature = "http")]
pub use crate::assets::loader::HttpFetcher;
pub use crate::assets::loader::{
    DefaultFetcher, FsFetcher, ImageFetcher, ImageLoadOpts, ImageLoader, decode_data_url,
};

pub use crate::render::bubble::{
    BubbleGeometry, bubble_geometry, ellipse_edge, shout_path, speech_path, tail_direction,
    thought_paths,
};
pub use crate::render::cpu::{Bitmap, PageRenderer, RendererOpts, cover_fit, panel_shape_path};
pub use crate::render::text::{
    BUBBLE_LINE_HEIGHT, TEXT_LINE_HEIGHT, TextBrush, TextEngine, wrap_words,
};

pub use crate::export::pdf::{PdfBuilder, PdfMetadata, encode_jpeg, jpeg_quality};
pub use crate::export::pipeline::{ExportFormat, ExportOutput, ExportRequest, export_pages};
pub use crate::export::png::encode_png;

pub use crate::source::pages::{InMemoryPageSource, JsonPageSource, PageSource, ProjectFile};
