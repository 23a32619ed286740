use chrono::{DateTime, Utc};

use crate::foundation::color::{self, Color};
use crate::foundation::core::{Rect, rect_xywh};
use crate::foundation::error::{KomaError, KomaResult};

/// Position, size and stacking of an element in logical page units.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
    /// Rotation in degrees around the element origin.
    #[serde(default)]
    pub rotation: f64,
    /// Opacity in `0..=1`.
    #[serde(default = "one")]
    pub opacity: f64,
    /// Stacking order; larger paints later in the interactive editor.
    #[serde(default)]
    pub z_index: i32,
}

fn one() -> f64 {
    1.0
}

impl Transform {
    /// Unrotated bounding box.
    pub fn bounds(&self) -> Rect {
        rect_xywh(self.x, self.y, self.width, self.height)
    }
}

/// A page element: shared transform plus a typed payload.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Element {
    /// Identifier, unique within its page.
    pub id: String,
    /// Geometry and stacking.
    #[serde(flatten)]
    pub transform: Transform,
    /// Per-type content and style.
    #[serde(flatten)]
    pub kind: ElementKind,
}

/// Element payload, tagged by `type` in JSON.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    /// A drawn frame on the page.
    Panel(PanelContent),
    /// A placed picture.
    Image(ImageContent),
    /// A speech/thought/shout bubble.
    Dialogue(DialogueContent),
    /// Free-standing text.
    Text(TextContent),
}

/// Discriminant of [`ElementKind`], handy for filtering and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// [`ElementKind::Panel`].
    Panel,
    /// [`ElementKind::Image`].
    Image,
    /// [`ElementKind::Dialogue`].
    Dialogue,
    /// [`ElementKind::Text`].
    Text,
}

impl ElementType {
    /// Lowercase name as used in JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Panel => "panel",
            Self::Image => "image",
            Self::Dialogue => "dialogue",
            Self::Text => "text",
        }
    }
}

impl Element {
    /// Build a panel with default style.
    pub fn panel(id: impl Into<String>, x: f64, y: f64, width: f64, height: f64, z: i32) -> Self {
        Self::with_kind(
            id,
            x,
            y,
            width,
            height,
            z,
            ElementKind::Panel(PanelContent::default()),
        )
    }

    /// Build an image element pointing at `url`, sized to `width x height`.
    pub fn image(
        id: impl Into<String>,
        url: impl Into<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        z: i32,
    ) -> Self {
        let content = ImageContent {
            url: url.into(),
            original_width: width,
            original_height: height,
            alt: String::new(),
            metadata: ImageMetadata::default(),
        };
        Self::with_kind(id, x, y, width, height, z, ElementKind::Image(content))
    }

    /// Build a dialogue bubble with the given text and bubble type.
    #[allow(clippy::too_many_arguments)]
    pub fn dialogue(
        id: impl Into<String>,
        text: impl Into<String>,
        bubble: BubbleType,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        z: i32,
    ) -> Self {
        let content = DialogueContent {
            text: text.into(),
            dialogue_style: DialogueStyle {
                bubble_type: bubble,
                ..DialogueStyle::default()
            },
        };
        Self::with_kind(id, x, y, width, height, z, ElementKind::Dialogue(content))
    }

    /// Build a free text element.
    pub fn text(
        id: impl Into<String>,
        content: impl Into<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        z: i32,
    ) -> Self {
        let content = TextContent {
            content: content.into(),
            text_style: TextStyle::default(),
        };
        Self::with_kind(id, x, y, width, height, z, ElementKind::Text(content))
    }

    fn with_kind(
        id: impl Into<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        z: i32,
        kind: ElementKind,
    ) -> Self {
        Self {
            id: id.into(),
            transform: Transform {
                x,
                y,
                width,
                height,
                rotation: 0.0,
                opacity: 1.0,
                z_index: z,
            },
            kind,
        }
    }

    /// Element discriminant.
    pub fn element_type(&self) -> ElementType {
        match self.kind {
            ElementKind::Panel(_) => ElementType::Panel,
            ElementKind::Image(_) => ElementType::Image,
            ElementKind::Dialogue(_) => ElementType::Dialogue,
            ElementKind::Text(_) => ElementType::Text,
        }
    }

    /// Unrotated bounding box.
    pub fn bounds(&self) -> Rect {
        self.transform.bounds()
    }

    /// Stacking order.
    pub fn z_index(&self) -> i32 {
        self.transform.z_index
    }

    /// `true` for panels.
    pub fn is_panel(&self) -> bool {
        matches!(self.kind, ElementKind::Panel(_))
    }

    /// `true` for images.
    pub fn is_image(&self) -> bool {
        matches!(self.kind, ElementKind::Image(_))
    }

    /// Panel payload, if this is a panel.
    pub fn as_panel(&self) -> Option<&PanelContent> {
        match &self.kind {
            ElementKind::Panel(p) => Some(p),
            _ => None,
        }
    }

    /// Image payload, if this is an image.
    pub fn as_image(&self) -> Option<&ImageContent> {
        match &self.kind {
            ElementKind::Image(i) => Some(i),
            _ => None,
        }
    }

    /// Builder-style panel image URL setter; no-op for other element types.
    pub fn with_panel_image(mut self, url: impl Into<String>) -> Self {
        if let ElementKind::Panel(p) = &mut self.kind {
            p.image_url = Some(url.into());
        }
        self
    }

    /// Validate geometry so downstream math stays finite.
    pub fn validate(&self) -> KomaResult<()> {
        let t = &self.transform;
        if self.id.is_empty() {
            return Err(KomaError::validation("element id must be non-empty"));
        }
        for (name, v) in [
            ("x", t.x),
            ("y", t.y),
            ("width", t.width),
            ("height", t.height),
            ("rotation", t.rotation),
            ("opacity", t.opacity),
        ] {
            if !v.is_finite() {
                return Err(KomaError::validation(format!(
                    "element '{}' has non-finite {name}",
                    self.id
                )));
            }
        }
        if t.width < 0.0 || t.height < 0.0 {
            return Err(KomaError::validation(format!(
                "element '{}' has negative size",
                self.id
            )));
        }
        Ok(())
    }
}

/// Panel outline shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PanelShape {
    /// Axis-aligned rectangle.
    #[default]
    Rectangle,
    /// Ellipse inscribed in the panel bounds.
    Circle,
    /// Any other declared shape; rendered as a rectangle.
    Custom(String),
}

impl From<String> for PanelShape {
    fn from(s: String) -> Self {
        match s.as_str() {
            "rectangle" | "rect" => Self::Rectangle,
            "circle" | "ellipse" => Self::Circle,
            _ => Self::Custom(s),
        }
    }
}

impl From<PanelShape> for String {
    fn from(s: PanelShape) -> Self {
        match s {
            PanelShape::Rectangle => "rectangle".to_owned(),
            PanelShape::Circle => "circle".to_owned(),
            PanelShape::Custom(s) => s,
        }
    }
}

/// Panel style with defaults resolved at deserialization.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelStyle {
    /// Outline shape.
    pub shape: PanelShape,
    /// Optional fill painted under any attached image.
    #[serde(deserialize_with = "color::none_if_invalid")]
    pub fill_color: Option<Color>,
    /// Fill alpha multiplier.
    pub fill_alpha: f64,
    /// Declared outline width (the exporter always strokes at its configured width).
    pub border_width: f64,
    /// Declared outline color (the exporter always strokes black).
    #[serde(deserialize_with = "color::black_if_invalid")]
    pub border_color: Color,
}

impl Default for PanelStyle {
    fn default() -> Self {
        Self {
            shape: PanelShape::Rectangle,
            fill_color: None,
            fill_alpha: 1.0,
            border_width: 6.0,
            border_color: Color::BLACK,
        }
    }
}

/// Panel payload.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelContent {
    /// Style record.
    #[serde(default)]
    pub panel_style: PanelStyle,
    /// Attached image: http(s), `data:`, `file://` URL or a path relative to the assets root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Where an image came from in the studio.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Character generator output.
    Character,
    /// Decor generator output.
    Decor,
    /// Scene generator output.
    Scene,
    /// User upload.
    #[default]
    Upload,
}

/// Provenance of an image element.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageMetadata {
    /// Producing generator or upload.
    pub source_type: SourceType,
    /// Identifier of the source record.
    pub source_id: Option<String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub modified_at: Option<DateTime<Utc>>,
}

/// Image payload.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    /// Pixel source.
    pub url: String,
    /// Intrinsic width of the source picture.
    #[serde(default)]
    pub original_width: f64,
    /// Intrinsic height of the source picture.
    #[serde(default)]
    pub original_height: f64,
    /// Alternative text.
    #[serde(default)]
    pub alt: String,
    /// Provenance.
    #[serde(default)]
    pub metadata: ImageMetadata,
}

/// Bubble silhouette.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BubbleType {
    /// Ellipse with a triangular tail.
    #[default]
    Speech,
    /// Ellipse with trailing circles.
    Thought,
    /// Spiky star; text is uppercased.
    Shout,
}

/// Dialogue bubble style with defaults resolved at deserialization.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DialogueStyle {
    /// Silhouette.
    pub bubble_type: BubbleType,
    /// Bubble fill.
    #[serde(deserialize_with = "color::white_if_invalid")]
    pub background_color: Color,
    /// Bubble stroke color.
    #[serde(deserialize_with = "color::black_if_invalid")]
    pub outline_color: Color,
    /// Bubble stroke width.
    pub outline_width: f64,
    /// Tail direction in degrees; 0 points straight down, positive turns clockwise.
    pub tail_angle: f64,
    /// Tail length measured from the ellipse edge.
    pub tail_length: f64,
    /// Tail base width.
    pub tail_thickness: f64,
    /// Text size.
    pub font_size: f64,
    /// Text color.
    #[serde(deserialize_with = "color::black_if_invalid")]
    pub font_color: Color,
    /// CSS-style font family list.
    pub font_family: String,
}

impl Default for DialogueStyle {
    fn default() -> Self {
        Self {
            bubble_type: BubbleType::Speech,
            background_color: Color::WHITE,
            outline_color: Color::BLACK,
            outline_width: 2.0,
            tail_angle: 0.0,
            tail_length: 30.0,
            tail_thickness: 20.0,
            font_size: 16.0,
            font_color: Color::BLACK,
            font_family: "sans-serif".to_owned(),
        }
    }
}

/// Dialogue payload.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueContent {
    /// Text, possibly with markup.
    #[serde(default)]
    pub text: String,
    /// Style record.
    #[serde(default)]
    pub dialogue_style: DialogueStyle,
}

/// Horizontal text alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Flush left.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Flush right.
    Right,
}

/// Free text style with defaults resolved at deserialization.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    /// Text size.
    pub font_size: f64,
    /// CSS-style font family list.
    pub font_family: String,
    /// Text color.
    #[serde(deserialize_with = "color::black_if_invalid")]
    pub color: Color,
    /// Alignment within the element width.
    pub align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            font_family: "sans-serif".to_owned(),
            color: Color::BLACK,
            align: TextAlign::Left,
        }
    }
}

/// Free text payload.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    /// Text, possibly with markup.
    #[serde(default)]
    pub content: String,
    /// Style record.
    #[serde(default)]
    pub text_style: TextStyle,
}

/// One manga page and its scene graph.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Page identifier.
    pub id: String,
    /// 1-based page number.
    pub page_number: u32,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Last modification time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Elements in insertion order.
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Page {
    /// Empty page.
    pub fn new(id: impl Into<String>, page_number: u32) -> Self {
        Self {
            id: id.into(),
            page_number,
            title: String::new(),
            updated_at: None,
            elements: Vec::new(),
        }
    }

    /// Builder-style element append.
    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// Look up an element by id.
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Validate every element and id uniqueness.
    pub fn validate(&self) -> KomaResult<()> {
        let mut seen = std::collections::HashSet::new();
        for e in &self.elements {
            e.validate()?;
            if !seen.insert(e.id.as_str()) {
                return Err(KomaError::validation(format!(
                    "page '{}' has duplicate element id '{}'",
                    self.id, e.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
