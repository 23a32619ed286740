use std::num::NonZeroUsize;
use std::sync::Arc;

use kurbo::{RoundedRect, Shape};
use lru::LruCache;

use crate::assets::loader::ImageLoader;
use crate::foundation::core::{BezPath, Edges, Rect};
use crate::foundation::error::{KomaError, KomaResult};
use crate::render::cpu::{Bitmap, PageRenderer, RendererOpts};
use crate::scene::model::Element;

const PATH_TOLERANCE: f64 = 0.1;

/// Clip geometry family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskType {
    /// Plain rectangle.
    #[default]
    Rectangular,
    /// Rectangle with rounded corners.
    Rounded,
    /// Reserved; currently produces the rectangular shape.
    Custom,
}

/// Mask parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaskOptions {
    /// Geometry family.
    pub mask_type: MaskType,
    /// Inset from each panel edge.
    pub padding: Edges,
    /// Corner radius for [`MaskType::Rounded`].
    pub corner_radius: f64,
    /// Opacity applied to the clipped content.
    pub opacity: f64,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            mask_type: MaskType::Rectangular,
            padding: Edges::default(),
            corner_radius: 8.0,
            opacity: 1.0,
        }
    }
}

impl MaskOptions {
    /// Rounded mask with `radius`.
    pub fn rounded(radius: f64) -> Self {
        Self {
            mask_type: MaskType::Rounded,
            corner_radius: radius,
            ..Self::default()
        }
    }

    /// Builder-style padding.
    pub fn with_padding(mut self, padding: Edges) -> Self {
        self.padding = padding;
        self
    }

    /// Builder-style opacity.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

/// A clip outline in panel-local space.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipShape {
    /// Closed outline; content outside it is hidden.
    pub path: BezPath,
    /// Opacity applied to the clipped content.
    pub opacity: f64,
}

/// An image placed inside a masked container, in panel-local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    /// Source image element id.
    pub image_id: String,
    /// Pixel source.
    pub url: String,
    /// Left edge relative to the panel.
    pub x: f64,
    /// Top edge relative to the panel.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Images clipped to a panel, positioned at the panel origin just below the panel itself.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskedContainer {
    /// Owning panel.
    pub panel_id: String,
    /// Page-space left edge (panel x).
    pub x: f64,
    /// Page-space top edge (panel y).
    pub y: f64,
    /// Panel width.
    pub width: f64,
    /// Panel height.
    pub height: f64,
    /// `panel.z_index - 1`.
    pub z_index: i32,
    /// Active clip; `None` once released.
    pub clip: Option<ClipShape>,
    /// Children in the order the images were given.
    pub children: Vec<Sprite>,
    /// Layer the container is attached to, if any.
    pub parent: Option<String>,
}

impl MaskedContainer {
    /// Attach to a named layer.
    pub fn attach(&mut self, parent: impl Into<String>) {
        self.parent = Some(parent.into());
    }

    /// `true` while attached to a layer.
    pub fn is_attached(&self) -> bool {
        self.parent.is_some()
    }

    /// Render the live preview: children clipped to the mask, transparent elsewhere.
    pub fn rasterize(&self, loader: Arc<ImageLoader>, scale: u32) -> KomaResult<Bitmap> {
        let mut renderer = PageRenderer::new(loader, RendererOpts::default().with_scale(scale));
        renderer.render_masked_container(self)
    }
}

/// Masking configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaskingOpts {
    /// Maximum number of cached clip shapes.
    pub cache_capacity: usize,
}

impl Default for MaskingOpts {
    fn default() -> Self {
        let cache_capacity = std::env::var("KOMA_MASK_CACHE_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(256);
        Self { cache_capacity }
    }
}

impl MaskingOpts {
    /// Override the cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MaskKey {
    panel_id: String,
    width: u64,
    height: u64,
    mask_type: MaskType,
    corner_radius: u64,
    padding: [u64; 4],
    opacity: u64,
}

impl MaskKey {
    fn new(panel: &Element, options: &MaskOptions) -> Self {
        let p = &options.padding;
        Self {
            panel_id: panel.id.clone(),
            width: panel.transform.width.to_bits(),
            height: panel.transform.height.to_bits(),
            mask_type: options.mask_type,
            corner_radius: options.corner_radius.to_bits(),
            padding: [p.top.to_bits(), p.right.to_bits(), p.bottom.to_bits(), p.left.to_bits()],
            opacity: options.opacity.to_bits(),
        }
    }
}

/// Builds panel clip shapes and masked containers, caching shapes in a bounded LRU.
pub struct MaskingService {
    cache: LruCache<MaskKey, ClipShape>,
}

impl Default for MaskingService {
    fn default() -> Self {
        Self::new(MaskingOpts::default())
    }
}

impl std::fmt::Debug for MaskingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskingService")
            .field("cached", &self.cache.len())
            .field("capacity", &self.cache.cap())
            .finish()
    }
}

impl MaskingService {
    /// Service with an empty cache.
    pub fn new(opts: MaskingOpts) -> Self {
        let cap = NonZeroUsize::new(opts.cache_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(cap),
        }
    }

    /// Clip shape for `panel`, served from cache when geometry and options are unchanged.
    pub fn build_mask(&mut self, panel: &Element, options: &MaskOptions) -> KomaResult<ClipShape> {
        if !panel.is_panel() {
            return Err(KomaError::validation(format!(
                "element '{}' is not a panel",
                panel.id
            )));
        }
        let key = MaskKey::new(panel, options);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(panel_id = %panel.id, "mask cache hit");
            return Ok(hit.clone());
        }

        let t = &panel.transform;
        let p = &options.padding;
        let x0 = p.left.max(0.0);
        let y0 = p.top.max(0.0);
        let x1 = (t.width - p.right.max(0.0)).max(x0);
        let y1 = (t.height - p.bottom.max(0.0)).max(y0);
        let rect = Rect::new(x0, y0, x1, y1);

        let path = match options.mask_type {
            MaskType::Rounded => {
                let max_r = rect.width().min(rect.height()) / 2.0;
                let r = options.corner_radius.clamp(0.0, max_r.max(0.0));
                RoundedRect::from_rect(rect, r).to_path(PATH_TOLERANCE)
            }
            MaskType::Rectangular | MaskType::Custom => rect.to_path(PATH_TOLERANCE),
        };
        let shape = ClipShape {
            path,
            opacity: options.opacity.clamp(0.0, 1.0),
        };
        tracing::debug!(panel_id = %panel.id, "mask cache miss");
        self.cache.put(key, shape.clone());
        Ok(shape)
    }

    /// Container at the panel origin holding one sprite per image element, clipped to the mask.
    ///
    /// Non-image elements in `images` are ignored.
    pub fn build_masked_container(
        &mut self,
        panel: &Element,
        images: &[Element],
        options: &MaskOptions,
    ) -> KomaResult<MaskedContainer> {
        let clip = self.build_mask(panel, options)?;
        let t = &panel.transform;
        let children = images
            .iter()
            .filter_map(|e| {
                let img = e.as_image()?;
                Some(Sprite {
                    image_id: e.id.clone(),
                    url: img.url.clone(),
                    x: e.transform.x - t.x,
                    y: e.transform.y - t.y,
                    width: e.transform.width,
                    height: e.transform.height,
                })
            })
            .collect();
        Ok(MaskedContainer {
            panel_id: panel.id.clone(),
            x: t.x,
            y: t.y,
            width: t.width,
            height: t.height,
            z_index: t.z_index - 1,
            clip: Some(clip),
            children,
            parent: None,
        })
    }

    /// Rebuild `container` from scratch for the current panel and images; attachment is kept.
    ///
    /// On error `container` is left untouched.
    pub fn update_masked_container(
        &mut self,
        container: &mut MaskedContainer,
        panel: &Element,
        images: &[Element],
        options: &MaskOptions,
    ) -> KomaResult<()> {
        let mut fresh = self.build_masked_container(panel, images, options)?;
        fresh.parent = container.parent.take();
        *container = fresh;
        Ok(())
    }

    /// Release the clip and children and detach the container.
    pub fn remove_masked_container(&mut self, container: &mut MaskedContainer) {
        container.clip = None;
        container.children.clear();
        container.parent = None;
    }

    /// Drop every cached shape.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Number of cached shapes.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assembly/masking.rs"]
mod tests;
