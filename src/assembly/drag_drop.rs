use chrono::Utc;

use crate::foundation::core::{Rect, rect_contains_inclusive};
use crate::scene::model::{Element, ElementKind, ImageMetadata, SourceType};

/// Inset from the panel origin for images dropped onto a panel.
pub const PANEL_DROP_INSET: f64 = 10.0;
/// Stacking offset below the target panel for images dropped onto it.
pub const PANEL_DROP_Z_OFFSET: i32 = 5;
/// Stacking order for images dropped onto the bare canvas.
pub const CANVAS_DROP_Z: i32 = 20;

/// Source picture being dragged from a library into the page.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    /// Id of the originating library record.
    pub source_id: String,
    /// Pixel source of the picture.
    pub image_url: String,
    /// Intrinsic width.
    pub original_width: f64,
    /// Intrinsic height.
    pub original_height: f64,
    /// Display name, carried into the new element's alt text.
    #[serde(default)]
    pub name: String,
    /// Producing generator.
    #[serde(default)]
    pub source_type: SourceType,
}

impl DragPayload {
    /// Payload with an upload source type and no name.
    pub fn new(
        source_id: impl Into<String>,
        image_url: impl Into<String>,
        original_width: f64,
        original_height: f64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            image_url: image_url.into(),
            original_width,
            original_height,
            name: String::new(),
            source_type: SourceType::Upload,
        }
    }

    /// Builder-style display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder-style source type.
    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }
}

/// What a drop zone represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropZoneKind {
    /// A panel's bounds.
    Panel,
    /// A generic canvas area.
    Canvas,
}

/// A hit-test rectangle registered with the coordinator.
#[derive(Clone, Debug, PartialEq)]
pub struct DropZone {
    /// Zone id; panel zones use the panel id.
    pub id: String,
    /// Panel or canvas.
    pub kind: DropZoneKind,
    /// Page-space rectangle.
    pub bounds: Rect,
    /// Snapshot of the panel for panel zones.
    pub panel: Option<Element>,
}

impl DropZone {
    /// Zone covering a panel element.
    pub fn for_panel(panel: &Element) -> Self {
        Self {
            id: panel.id.clone(),
            kind: DropZoneKind::Panel,
            bounds: panel.bounds(),
            panel: Some(panel.clone()),
        }
    }

    /// Generic canvas zone.
    pub fn canvas(id: impl Into<String>, bounds: Rect) -> Self {
        Self {
            id: id.into(),
            kind: DropZoneKind::Canvas,
            bounds,
            panel: None,
        }
    }

    fn area(&self) -> f64 {
        self.bounds.width().max(0.0) * self.bounds.height().max(0.0)
    }
}

/// Drag state and drop-zone table for one editor session.
#[derive(Debug, Default)]
pub struct DragDropCoordinator {
    payload: Option<DragPayload>,
    zones: Vec<DropZone>,
}

impl DragDropCoordinator {
    /// Idle coordinator with no zones.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a drag, replacing any drag in progress.
    pub fn start_drag(&mut self, payload: DragPayload) {
        tracing::debug!(source_id = %payload.source_id, "drag started");
        self.payload = Some(payload);
    }

    /// `true` between [`start_drag`](Self::start_drag) and [`end_drag`](Self::end_drag).
    pub fn is_dragging(&self) -> bool {
        self.payload.is_some()
    }

    /// Payload of the drag in progress.
    pub fn payload(&self) -> Option<&DragPayload> {
        self.payload.as_ref()
    }

    /// Finish the drag and forget the payload.
    pub fn end_drag(&mut self) {
        self.payload = None;
    }

    /// Register a zone; an existing zone with the same id is replaced in place.
    pub fn register_drop_zone(&mut self, zone: DropZone) {
        match self.zones.iter_mut().find(|z| z.id == zone.id) {
            Some(slot) => *slot = zone,
            None => self.zones.push(zone),
        }
    }

    /// Forget the zone with `id`.
    pub fn unregister_drop_zone(&mut self, id: &str) {
        self.zones.retain(|z| z.id != id);
    }

    /// Forget every zone.
    pub fn clear_drop_zones(&mut self) {
        self.zones.clear();
    }

    /// Replace the table with one zone per panel in `elements`, in element order.
    pub fn register_panel_zones(&mut self, elements: &[Element]) {
        self.zones = elements
            .iter()
            .filter(|e| e.is_panel())
            .map(DropZone::for_panel)
            .collect();
    }

    /// Registered zones in registration order.
    pub fn drop_zones(&self) -> &[DropZone] {
        &self.zones
    }

    /// Zone containing `(x, y)`, edges inclusive.
    ///
    /// Overlaps resolve to the smallest zone by area, then to the earliest registered.
    pub fn find_drop_zone_at(&self, x: f64, y: f64) -> Option<&DropZone> {
        let mut best: Option<&DropZone> = None;
        for zone in self
            .zones
            .iter()
            .filter(|z| rect_contains_inclusive(z.bounds, x, y))
        {
            match best {
                Some(b) if b.area() <= zone.area() => {}
                _ => best = Some(zone),
            }
        }
        best
    }

    /// Build the image element produced by dropping the current payload at `(x, y)`.
    ///
    /// Returns `None` when no drag is active. The element is not inserted anywhere and no
    /// associations are touched; callers run detection themselves.
    pub fn handle_drop(&self, x: f64, y: f64) -> Option<Element> {
        let payload = self.payload.as_ref()?;
        let panel = self
            .find_drop_zone_at(x, y)
            .filter(|z| z.kind == DropZoneKind::Panel)
            .and_then(|z| z.panel.as_ref());

        let (ox, oy) = (payload.original_width, payload.original_height);
        let (ex, ey, w, h, z) = match panel {
            Some(p) => {
                let t = &p.transform;
                (
                    t.x + PANEL_DROP_INSET,
                    t.y + PANEL_DROP_INSET,
                    ox.min(t.width - 2.0 * PANEL_DROP_INSET).max(0.0),
                    oy.min(t.height - 2.0 * PANEL_DROP_INSET).max(0.0),
                    t.z_index - PANEL_DROP_Z_OFFSET,
                )
            }
            None => (x - ox / 2.0, y - oy / 2.0, ox, oy, CANVAS_DROP_Z),
        };

        let id = format!("image-{}", uuid::Uuid::new_v4());
        let mut element = Element::image(id, payload.image_url.clone(), ex, ey, w, h, z);
        if let ElementKind::Image(img) = &mut element.kind {
            let now = Utc::now();
            img.original_width = ox;
            img.original_height = oy;
            img.alt = payload.name.clone();
            img.metadata = ImageMetadata {
                source_type: payload.source_type,
                source_id: Some(payload.source_id.clone()),
                created_at: Some(now),
                modified_at: Some(now),
            };
        }
        tracing::debug!(
            element_id = %element.id,
            on_panel = panel.is_some(),
            "drop produced image element"
        );
        Some(element)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assembly/drag_drop.rs"]
mod tests;
