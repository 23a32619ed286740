use std::borrow::Cow;
use std::collections::HashMap;

use crate::foundation::color::Color;
use crate::foundation::error::{KomaError, KomaResult};

/// Line height multiplier for free text.
pub const TEXT_LINE_HEIGHT: f64 = 1.2;
/// Line height multiplier for bubble text.
pub const BUBBLE_LINE_HEIGHT: f64 = 1.3;

/// Offsets (logical units) at which the halo copy of bubble text is stamped.
const HALO_OFFSETS: [(f64, f64); 8] = [
    (-1.5, 0.0),
    (1.5, 0.0),
    (0.0, -1.5),
    (0.0, 1.5),
    (-1.0, -1.0),
    (1.0, -1.0),
    (-1.0, 1.0),
    (1.0, 1.0),
];

/// Straight RGBA8 brush carried through Parley layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextBrush {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl From<Color> for TextBrush {
    fn from(c: Color) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Greedily wrap `text` into lines no wider than `max_width`.
///
/// Words are split on whitespace; a word that alone exceeds `max_width` gets its own line.
/// Explicit `\n` starts a new paragraph. The result depends only on the text, `max_width` and
/// the widths reported by `measure`.
pub fn wrap_words(text: &str, max_width: f64, mut measure: impl FnMut(&str) -> f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if measure(&candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// Parley-backed text shaping plus glyph submission to the CPU rasterizer.
pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    fonts: HashMap<(u64, u32), vello_cpu::peniko::FontData>,
    preferred_family: Option<String>,
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEngine")
            .field("preferred_family", &self.preferred_family)
            .field("cached_fonts", &self.fonts.len())
            .finish()
    }
}

impl TextEngine {
    /// Engine with fresh Parley contexts and system fonts.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            fonts: HashMap::new(),
            preferred_family: None,
        }
    }

    /// Register font bytes and put their family in front of every font stack.
    pub fn register_font(&mut self, font_bytes: &[u8]) -> KomaResult<String> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            KomaError::validation("no font families registered from font bytes")
        })?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| KomaError::validation("registered font family has no name"))?
            .to_string();
        self.preferred_family = Some(family_name.clone());
        Ok(family_name)
    }

    fn font_stack(&self, family: &str) -> String {
        match &self.preferred_family {
            Some(pref) => format!("\"{pref}\", {family}"),
            None => family.to_owned(),
        }
    }

    fn layout(
        &mut self,
        text: &str,
        family: &str,
        size: f64,
        brush: TextBrush,
    ) -> parley::Layout<TextBrush> {
        let stack = self.font_stack(family);
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(stack)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size as f32));
        builder.push_default(parley::style::StyleProperty::Brush(brush));
        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }

    /// Advance width of `text` on a single line.
    pub fn measure(&mut self, text: &str, family: &str, size: f64) -> f64 {
        if text.is_empty() || !(size.is_finite() && size > 0.0) {
            return 0.0;
        }
        f64::from(self.layout(text, family, size, TextBrush::default()).width())
    }

    /// Wrap `text` to `max_width` using shaped advance widths.
    pub fn wrap(&mut self, text: &str, family: &str, size: f64, max_width: f64) -> Vec<String> {
        wrap_words(text, max_width, |s| self.measure(s, family, size))
    }

    /// Draw one line with its left edge at `x`, vertically centred in the band
    /// `top..top + line_height`. Returns the drawn advance width.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_line(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        family: &str,
        size: f64,
        color: Color,
        x: f64,
        top: f64,
        line_height: f64,
    ) -> f64 {
        if text.is_empty() || !(size.is_finite() && size > 0.0) {
            return 0.0;
        }
        let layout = self.layout(text, family, size, TextBrush::from(color));
        let dy = top + (line_height - f64::from(layout.height())) / 2.0;

        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let brush = glyph_run.style().brush;
                let run = glyph_run.run();
                let font_ref = run.font();
                let font = self.cpu_font(font_ref.data.id(), font_ref.index, font_ref.data.data());
                let mut gx = glyph_run.offset();
                let gy = glyph_run.baseline();
                let glyphs: Vec<vello_cpu::Glyph> = glyph_run
                    .glyphs()
                    .map(|g| {
                        let glyph = vello_cpu::Glyph {
                            id: g.id,
                            x: (x as f32) + gx + g.x,
                            y: (dy as f32) + gy - g.y,
                        };
                        gx += g.advance;
                        glyph
                    })
                    .collect();
                if glyphs.is_empty() {
                    continue;
                }
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                ctx.glyph_run(&font)
                    .font_size(run.font_size())
                    .fill_glyphs(glyphs.into_iter());
            }
        }
        f64::from(layout.width())
    }

    /// Draw `text` in `halo` at small offsets around `(x, top)`, then in `color` on top.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_line_with_halo(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        family: &str,
        size: f64,
        color: Color,
        halo: Color,
        x: f64,
        top: f64,
        line_height: f64,
    ) -> f64 {
        for (ox, oy) in HALO_OFFSETS {
            self.draw_line(ctx, text, family, size, halo, x + ox, top + oy, line_height);
        }
        self.draw_line(ctx, text, family, size, color, x, top, line_height)
    }

    fn cpu_font(&mut self, blob_id: u64, index: u32, bytes: &[u8]) -> vello_cpu::peniko::FontData {
        self.fonts
            .entry((blob_id, index))
            .or_insert_with(|| {
                vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(bytes.to_vec()),
                    index,
                )
            })
            .clone()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
