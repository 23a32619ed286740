use crate::foundation::core::Rect;
use crate::scene::model::Element;

/// Coverage above which an image counts as belonging to a panel.
pub const SIGNIFICANT_COVERAGE_PERCENT: f64 = 10.0;

/// Overlap between a panel and an image underneath it.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePanelIntersection {
    /// Panel id.
    pub panel_id: String,
    /// Image id.
    pub image_id: String,
    /// Overlapping rectangle in page space.
    pub bounds: Rect,
    /// Overlap area as a percentage of the image area.
    pub coverage_percentage: f64,
    /// `coverage_percentage > 10`.
    pub is_significant: bool,
}

/// Intersect two axis-aligned rectangles; edge-touching counts as no overlap.
///
/// Returns the overlap rectangle and its coverage of `image` in percent.
pub fn intersect_rects(panel: Rect, image: Rect) -> Option<(Rect, f64)> {
    let left = panel.x0.max(image.x0);
    let top = panel.y0.max(image.y0);
    let right = panel.x1.min(image.x1);
    let bottom = panel.y1.min(image.y1);
    if left >= right || top >= bottom {
        return None;
    }

    let image_area = image.width() * image.height();
    if image_area <= 0.0 {
        return None;
    }
    let overlap = Rect::new(left, top, right, bottom);
    let coverage = overlap.width() * overlap.height() / image_area * 100.0;
    Some((overlap, coverage))
}

/// Compute the overlap between a panel and an image element.
///
/// Rotation is ignored: both elements are treated as their unrotated bounding boxes.
pub fn intersect(panel: &Element, image: &Element) -> Option<ImagePanelIntersection> {
    let (bounds, coverage) = intersect_rects(panel.bounds(), image.bounds())?;
    Some(ImagePanelIntersection {
        panel_id: panel.id.clone(),
        image_id: image.id.clone(),
        bounds,
        coverage_percentage: coverage,
        is_significant: coverage > SIGNIFICANT_COVERAGE_PERCENT,
    })
}

/// Find every image painted below `panel_id` that overlaps it, in element order.
///
/// An unknown panel id yields an empty list.
pub fn detect_under(panel_id: &str, elements: &[Element]) -> Vec<ImagePanelIntersection> {
    let Some(panel) = elements.iter().find(|e| e.id == panel_id && e.is_panel()) else {
        tracing::warn!(panel_id, "panel not found while detecting images underneath");
        return Vec::new();
    };

    elements
        .iter()
        .filter(|e| e.is_image() && e.z_index() < panel.z_index())
        .filter_map(|img| intersect(panel, img))
        .collect()
}

/// Ids of the images that significantly overlap `panel_id` from below.
pub fn significant_image_ids(panel_id: &str, elements: &[Element]) -> Vec<String> {
    detect_under(panel_id, elements)
        .into_iter()
        .filter(|i| i.is_significant)
        .map(|i| i.image_id)
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/assembly/geometry.rs"]
mod tests;
