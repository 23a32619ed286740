use std::collections::HashMap;
use std::sync::Arc;

use kurbo::{Ellipse, Shape, Stroke, StrokeOpts};

use crate::assembly::masking::MaskedContainer;
use crate::assets::decode::DecodedImage;
use crate::assets::loader::ImageLoader;
use crate::foundation::color::Color;
use crate::foundation::core::{Affine, BezPath, Rect, unpremultiply_rgba8_in_place};
use crate::foundation::error::{KomaError, KomaResult};
use crate::render::bubble::bubble_geometry;
use crate::render::text::{BUBBLE_LINE_HEIGHT, TEXT_LINE_HEIGHT, TextEngine};
use crate::scene::markup::strip_to_plain_text;
use crate::scene::model::{
    BubbleType, DialogueContent, Element, ElementKind, Page, PanelContent, PanelShape, TextAlign,
    TextContent,
};

const STROKE_TOLERANCE: f64 = 0.1;
const PLACEHOLDER_FILL: Color = Color::rgb(224, 224, 224);
const PLACEHOLDER_TEXT_COLOR: Color = Color::rgb(110, 110, 110);
const HALO_COLOR: Color = Color::rgba(255, 255, 255, 200);

/// Renderer configuration. Defaults match a 1200x1600 page exported at 3x.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererOpts {
    /// Logical page width.
    pub page_width: u32,
    /// Logical page height.
    pub page_height: u32,
    /// Integer oversampling factor.
    pub scale: u32,
    /// Page background.
    pub background: Color,
    /// Panel outline width in logical units. Outlines are always black.
    pub panel_outline_width: f64,
    /// Smallest font size used for bubble text.
    pub min_bubble_font_size: f64,
    /// Fraction of the bubble width available to its text.
    pub bubble_text_width_ratio: f64,
    /// Text shown on panels whose image failed to load.
    pub placeholder_text: String,
    /// Font preferred over system fonts when present.
    pub font_bytes: Option<Arc<Vec<u8>>>,
}

impl Default for RendererOpts {
    fn default() -> Self {
        Self {
            page_width: 1200,
            page_height: 1600,
            scale: 3,
            background: Color::WHITE,
            panel_outline_width: 6.0,
            min_bubble_font_size: 12.0,
            bubble_text_width_ratio: 0.8,
            placeholder_text: "Image unavailable".to_owned(),
            font_bytes: None,
        }
    }
}

impl RendererOpts {
    /// Override the logical page size.
    pub fn with_page_size(mut self, width: u32, height: u32) -> Self {
        self.page_width = width;
        self.page_height = height;
        self
    }

    /// Override the oversampling factor.
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    /// Override the page background.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Prefer `font_bytes` for all text.
    pub fn with_font_bytes(mut self, font_bytes: Arc<Vec<u8>>) -> Self {
        self.font_bytes = Some(font_bytes);
        self
    }

    fn pixel_size(&self, width: f64, height: f64) -> KomaResult<(u16, u16)> {
        if self.scale == 0 {
            return Err(KomaError::validation("render scale must be >= 1"));
        }
        let to_px = |v: f64| -> KomaResult<u16> {
            let px = (v * f64::from(self.scale)).ceil();
            if !px.is_finite() || px < 1.0 || px > f64::from(u16::MAX) {
                return Err(KomaError::validation(format!(
                    "raster side {px} is outside 1..={}",
                    u16::MAX
                )));
            }
            Ok(px as u16)
        };
        Ok((to_px(width)?, to_px(height)?))
    }
}

/// A rendered raster, RGBA8 row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Pixel data, `width * height * 4` bytes.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied by alpha.
    pub premultiplied: bool,
}

impl Bitmap {
    /// RGBA8 at `(x, y)`, or `None` outside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Straight-alpha copy of the pixels.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if self.premultiplied {
            unpremultiply_rgba8_in_place(&mut out);
        }
        out
    }
}

#[derive(Clone)]
struct ImagePaint {
    paint: vello_cpu::Image,
    w: u32,
    h: u32,
}

/// Rasterizes pages onto a reused CPU render context.
///
/// Elements are drawn in three passes: panels, then dialogue bubbles, then free text. Image
/// elements are not drawn; their pixels reach the page through panel images. A failure while
/// drawing one element is logged and skipped.
pub struct PageRenderer {
    opts: RendererOpts,
    loader: Arc<ImageLoader>,
    ctx: Option<vello_cpu::RenderContext>,
    text: TextEngine,
    image_cache: HashMap<String, ImagePaint>,
}

impl std::fmt::Debug for PageRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRenderer")
            .field("opts", &self.opts)
            .field("cached_images", &self.image_cache.len())
            .finish()
    }
}

impl PageRenderer {
    /// Renderer pulling panel images through `loader`.
    pub fn new(loader: Arc<ImageLoader>, opts: RendererOpts) -> Self {
        let mut text = TextEngine::new();
        if let Some(bytes) = &opts.font_bytes
            && let Err(e) = text.register_font(bytes)
        {
            tracing::warn!(error = %e, "ignoring unusable font bytes");
        }
        Self {
            opts,
            loader,
            ctx: None,
            text,
            image_cache: HashMap::new(),
        }
    }

    /// Active options.
    pub fn opts(&self) -> &RendererOpts {
        &self.opts
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> KomaResult<R>,
    ) -> KomaResult<R> {
        let mut ctx = match self.ctx.take() {
            None => vello_cpu::RenderContext::new(width, height),
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            Some(_) => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(self, &mut ctx);
        self.ctx = Some(ctx);
        out
    }

    /// Render `page` to a bitmap of `page_width * scale` by `page_height * scale` pixels.
    ///
    /// `on_progress` receives `processed / total` after every drawn element, or `1.0` once when
    /// the page has nothing to draw.
    #[tracing::instrument(level = "debug", skip_all, fields(page_id = %page.id))]
    pub fn render_page(
        &mut self,
        page: &Page,
        on_progress: &mut dyn FnMut(f64),
    ) -> KomaResult<Bitmap> {
        let page_w = f64::from(self.opts.page_width);
        let page_h = f64::from(self.opts.page_height);
        let (width, height) = self.opts.pixel_size(page_w, page_h)?;
        let scale = Affine::scale(f64::from(self.opts.scale));

        // Pixmaps only live for one page; the loader keeps the decoded images.
        self.image_cache.clear();

        let panels: Vec<&Element> = page.elements.iter().filter(|e| e.is_panel()).collect();
        let bubbles: Vec<&Element> = page
            .elements
            .iter()
            .filter(|e| matches!(e.kind, ElementKind::Dialogue(_)))
            .collect();
        let texts: Vec<&Element> = page
            .elements
            .iter()
            .filter(|e| matches!(e.kind, ElementKind::Text(_)))
            .collect();

        self.loader.prefetch(
            panels
                .iter()
                .filter_map(|p| p.as_panel().and_then(|c| c.image_url.as_deref())),
        );

        let total = panels.len() + bubbles.len() + texts.len();
        if total == 0 {
            on_progress(1.0);
        }

        self.with_ctx_mut(width, height, |this, ctx| {
            ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_transform(affine_to_cpu(scale));
            set_color(ctx, this.opts.background);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, page_w, page_h));

            let mut processed = 0usize;
            for element in panels.iter().chain(&bubbles).chain(&texts) {
                if let Err(e) = this.draw_element(ctx, element, scale) {
                    tracing::warn!(
                        element_id = %element.id,
                        element_type = element.element_type().as_str(),
                        error = %e,
                        "element render failed; continuing"
                    );
                }
                processed += 1;
                on_progress(processed as f64 / total as f64);
            }

            ctx.flush();
            let mut pixmap = vello_cpu::Pixmap::new(width, height);
            ctx.render_to_pixmap(&mut pixmap);
            Ok(Bitmap {
                width: u32::from(width),
                height: u32::from(height),
                data: pixmap.data_as_u8_slice().to_vec(),
                premultiplied: true,
            })
        })
    }

    /// Rasterize a masked container: each child stretched to its rect, clipped to the mask.
    ///
    /// The bitmap covers the container's panel-local box at this renderer's scale and starts
    /// transparent. Children whose image fails to load are skipped.
    pub fn render_masked_container(&mut self, container: &MaskedContainer) -> KomaResult<Bitmap> {
        let (width, height) = self.opts.pixel_size(container.width, container.height)?;
        let scale = Affine::scale(f64::from(self.opts.scale));
        let local_box = Rect::new(0.0, 0.0, container.width, container.height);
        let (clip, opacity) = match &container.clip {
            Some(c) => (c.path.clone(), c.opacity),
            None => (local_box.to_path(STROKE_TOLERANCE), 1.0),
        };

        self.image_cache.clear();
        self.loader
            .prefetch(container.children.iter().map(|s| s.url.as_str()));

        self.with_ctx_mut(width, height, |this, ctx| {
            ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
            ctx.set_transform(affine_to_cpu(scale));
            let layered = opacity < 1.0;
            if layered {
                ctx.push_opacity_layer(opacity.clamp(0.0, 1.0) as f32);
            }
            let cpu_clip = bezpath_to_cpu(&clip);
            for sprite in &container.children {
                let paint = match this
                    .loader
                    .load(&sprite.url)
                    .map_err(KomaError::from)
                    .and_then(|img| this.image_paint(&sprite.url, &img))
                {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(image_id = %sprite.image_id, error = %e, "skipping sprite");
                        continue;
                    }
                };
                if sprite.width <= 0.0 || sprite.height <= 0.0 {
                    continue;
                }
                let fit = Affine::translate((sprite.x, sprite.y))
                    * Affine::scale_non_uniform(
                        sprite.width / f64::from(paint.w),
                        sprite.height / f64::from(paint.h),
                    );
                ctx.set_paint(paint.paint);
                ctx.set_paint_transform(affine_to_cpu(fit));
                ctx.fill_path(&cpu_clip);
            }
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            if layered {
                ctx.pop_layer();
            }

            ctx.flush();
            let mut pixmap = vello_cpu::Pixmap::new(width, height);
            ctx.render_to_pixmap(&mut pixmap);
            Ok(Bitmap {
                width: u32::from(width),
                height: u32::from(height),
                data: pixmap.data_as_u8_slice().to_vec(),
                premultiplied: true,
            })
        })
    }

    fn draw_element(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        element: &Element,
        page_transform: Affine,
    ) -> KomaResult<()> {
        element
            .validate()
            .map_err(|e| KomaError::render(e.to_string()))?;
        let t = &element.transform;
        let local = page_transform
            * Affine::translate((t.x, t.y))
            * Affine::rotate(t.rotation.to_radians());
        let opacity = t.opacity.clamp(0.0, 1.0);

        ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_transform(affine_to_cpu(local));
        let layered = opacity < 1.0;
        if layered {
            ctx.push_opacity_layer(opacity as f32);
        }

        let out = match &element.kind {
            ElementKind::Panel(p) => self.draw_panel(ctx, element, p),
            ElementKind::Dialogue(d) => self.draw_bubble(ctx, element, d),
            ElementKind::Text(c) => self.draw_text(ctx, element, c),
            ElementKind::Image(_) => Ok(()),
        };

        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        if layered {
            ctx.pop_layer();
        }
        out
    }

    fn draw_panel(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        element: &Element,
        panel: &PanelContent,
    ) -> KomaResult<()> {
        let (w, h) = (element.transform.width, element.transform.height);
        let shape = panel_shape_path(&panel.panel_style.shape, w, h);
        let cpu_shape = bezpath_to_cpu(&shape);

        if let Some(fill) = panel.panel_style.fill_color {
            set_color(ctx, fill.with_alpha_mul(panel.panel_style.fill_alpha));
            ctx.fill_path(&cpu_shape);
        }

        if let Some(url) = panel.image_url.as_deref().filter(|u| !u.trim().is_empty()) {
            let loaded = self
                .loader
                .load(url)
                .map_err(KomaError::from)
                .and_then(|img| self.image_paint(url, &img));
            match loaded {
                Ok(p) if w > 0.0 && h > 0.0 => {
                    ctx.set_paint(p.paint);
                    ctx.set_paint_transform(affine_to_cpu(cover_fit(w, h, p.w, p.h)));
                    ctx.fill_path(&cpu_shape);
                    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        element_id = %element.id,
                        url,
                        error = %e,
                        "panel image unavailable; drawing placeholder"
                    );
                    self.draw_placeholder(ctx, &cpu_shape, w, h);
                }
            }
        }

        // Outline color is fixed to black regardless of the declared border color.
        let outline = kurbo::stroke(
            shape.iter(),
            &Stroke::new(self.opts.panel_outline_width),
            &StrokeOpts::default(),
            STROKE_TOLERANCE,
        );
        set_color(ctx, Color::BLACK);
        ctx.fill_path(&bezpath_to_cpu(&outline));
        Ok(())
    }

    fn draw_placeholder(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        shape: &vello_cpu::kurbo::BezPath,
        w: f64,
        h: f64,
    ) {
        set_color(ctx, PLACEHOLDER_FILL);
        ctx.fill_path(shape);

        let label = self.opts.placeholder_text.clone();
        let size = (h / 6.0).clamp(8.0, 24.0);
        let line_h = size * TEXT_LINE_HEIGHT;
        let lw = self.text.measure(&label, "sans-serif", size);
        self.text.draw_line(
            ctx,
            &label,
            "sans-serif",
            size,
            PLACEHOLDER_TEXT_COLOR,
            (w - lw) / 2.0,
            (h - line_h) / 2.0,
            line_h,
        );
    }

    fn draw_bubble(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        element: &Element,
        dialogue: &DialogueContent,
    ) -> KomaResult<()> {
        let style = &dialogue.dialogue_style;
        let (w, h) = (element.transform.width, element.transform.height);
        let geometry = bubble_geometry(style.bubble_type, w, h, style);
        let shapes: Vec<&BezPath> = std::iter::once(&geometry.body)
            .chain(geometry.extras.iter())
            .collect();

        set_color(ctx, style.background_color);
        for shape in &shapes {
            ctx.fill_path(&bezpath_to_cpu(shape));
        }
        if style.outline_width > 0.0 {
            set_color(ctx, style.outline_color);
            let stroke = Stroke::new(style.outline_width);
            for shape in &shapes {
                let outline = kurbo::stroke(
                    shape.iter(),
                    &stroke,
                    &StrokeOpts::default(),
                    STROKE_TOLERANCE,
                );
                ctx.fill_path(&bezpath_to_cpu(&outline));
            }
        }

        let mut text = strip_to_plain_text(&dialogue.text);
        if style.bubble_type == BubbleType::Shout {
            text = text.to_uppercase();
        }
        if text.is_empty() {
            return Ok(());
        }
        let size = style.font_size.max(self.opts.min_bubble_font_size);
        let family = style.font_family.as_str();
        let max_w = w * self.opts.bubble_text_width_ratio;
        let lines = self.text.wrap(&text, family, size, max_w);
        let line_h = size * BUBBLE_LINE_HEIGHT;
        let top = (h - line_h * lines.len() as f64) / 2.0;
        for (i, line) in lines.iter().enumerate() {
            let lw = self.text.measure(line, family, size);
            self.text.draw_line_with_halo(
                ctx,
                line,
                family,
                size,
                style.font_color,
                HALO_COLOR,
                (w - lw) / 2.0,
                top + line_h * i as f64,
                line_h,
            );
        }
        Ok(())
    }

    fn draw_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        element: &Element,
        content: &TextContent,
    ) -> KomaResult<()> {
        let style = &content.text_style;
        if !(style.font_size.is_finite() && style.font_size > 0.0) {
            return Err(KomaError::render(format!(
                "font size {} is not positive",
                style.font_size
            )));
        }
        let text = strip_to_plain_text(&content.content);
        let w = element.transform.width;
        let family = style.font_family.as_str();
        let lines = self.text.wrap(&text, family, style.font_size, w);
        let line_h = style.font_size * TEXT_LINE_HEIGHT;
        for (i, line) in lines.iter().enumerate() {
            let x = match style.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => (w - self.text.measure(line, family, style.font_size)) / 2.0,
                TextAlign::Right => w - self.text.measure(line, family, style.font_size),
            };
            self.text.draw_line(
                ctx,
                line,
                family,
                style.font_size,
                style.color,
                x,
                line_h * i as f64,
                line_h,
            );
        }
        Ok(())
    }

    fn image_paint(&mut self, url: &str, img: &DecodedImage) -> KomaResult<ImagePaint> {
        if let Some(p) = self.image_cache.get(url) {
            return Ok(p.clone());
        }
        let pixmap = pixmap_from_premul_bytes(&img.rgba8_premul, img.width, img.height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler {
                quality: vello_cpu::peniko::ImageQuality::High,
                ..vello_cpu::peniko::ImageSampler::default()
            },
        };
        let out = ImagePaint {
            paint,
            w: img.width,
            h: img.height,
        };
        self.image_cache.insert(url.to_owned(), out.clone());
        Ok(out)
    }
}

/// Local-space outline for a panel shape; anything but a circle is a rectangle.
pub fn panel_shape_path(shape: &PanelShape, width: f64, height: f64) -> BezPath {
    match shape {
        PanelShape::Circle => Ellipse::new(
            (width / 2.0, height / 2.0),
            (width / 2.0, height / 2.0),
            0.0,
        )
        .to_path(STROKE_TOLERANCE),
        PanelShape::Rectangle | PanelShape::Custom(_) => {
            Rect::new(0.0, 0.0, width, height).to_path(STROKE_TOLERANCE)
        }
    }
}

/// Image-to-box transform that covers `width x height` and centres the overflow.
pub fn cover_fit(width: f64, height: f64, image_w: u32, image_h: u32) -> Affine {
    let (iw, ih) = (f64::from(image_w.max(1)), f64::from(image_h.max(1)));
    let s = (width / iw).max(height / ih);
    let dx = (width - iw * s) / 2.0;
    let dy = (height - ih * s) / 2.0;
    Affine::translate((dx, dy)) * Affine::scale(s)
}

fn set_color(ctx: &mut vello_cpu::RenderContext, c: Color) {
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(bytes: &[u8], width: u32, height: u32) -> KomaResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| KomaError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| KomaError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(KomaError::render("pixmap byte len mismatch"));
    }
    let pixels: Vec<vello_cpu::peniko::color::PremulRgba8> = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
