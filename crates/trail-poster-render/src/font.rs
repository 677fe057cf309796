//! TTF-backed glyph metrics and outline rasterization
//!
//! Wraps `ttf-parser` so the layout engine can measure per-glyph advances and
//! the compositor can fill real glyph outlines. The face is parsed on demand
//! from owned bytes; parsing is validated once at construction.

use crate::typography::{GlyphMetrics, TextRenderer, TextSpan, measure_spaced};
use crate::{RenderError, Result};
use std::path::Path;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

/// A loaded TTF/OTF font face.
pub struct Font {
    data: Vec<u8>,
}

impl Font {
    /// Validate and wrap raw font bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Face::parse(&data, 0).map_err(|e| RenderError::Font(e.to_string()))?;
        Ok(Self { data })
    }

    /// Load a font face from a file on disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    fn face(&self) -> Result<Face<'_>> {
        Face::parse(&self.data, 0).map_err(|e| RenderError::Font(e.to_string()))
    }
}

impl GlyphMetrics for Font {
    fn advance(&self, ch: char, font_size: f32) -> f32 {
        let Ok(face) = self.face() else {
            return 0.0;
        };
        let units_per_em = face.units_per_em() as f32;
        // Unmapped characters measure as the .notdef glyph
        let glyph = face.glyph_index(ch).unwrap_or(GlyphId(0));
        let advance = face.glyph_hor_advance(glyph).unwrap_or(0);
        advance as f32 / units_per_em * font_size
    }
}

impl TextRenderer for Font {
    /// Draw one span glyph-by-glyph: each glyph advances by its own width
    /// plus the letter spacing, centered on the span's total spaced width.
    fn draw_span(&self, pixmap: &mut Pixmap, span: &TextSpan) -> Result<()> {
        let face = self.face()?;
        let units_per_em = face.units_per_em() as f32;
        let scale = span.font_size / units_per_em;

        // Middle baseline: shift down by half the capital height
        let cap_height = face
            .capital_height()
            .map(|h| h as f32)
            .unwrap_or(units_per_em * 0.7);
        let baseline = span.y + cap_height * scale / 2.0;

        let total = measure_spaced(self, &span.text, span.font_size, span.letter_spacing);
        let mut x = span.center_x - total / 2.0;

        let mut builder = PathBuilder::new();
        for ch in span.text.chars() {
            if let Some(glyph) = face.glyph_index(ch) {
                let mut sink = GlyphSink {
                    builder: &mut builder,
                    scale,
                    dx: x,
                    dy: baseline,
                };
                let _ = face.outline_glyph(glyph, &mut sink);
            }
            x += self.advance(ch, span.font_size) + span.letter_spacing;
        }

        if let Some(path) = builder.finish() {
            let mut paint = Paint::default();
            paint.set_color_rgba8(span.color[0], span.color[1], span.color[2], 255);
            paint.anti_alias = true;
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
        Ok(())
    }
}

/// Feeds glyph outlines into a tiny-skia path, flipping the y axis from
/// font units (y up) to raster coordinates (y down).
struct GlyphSink<'a> {
    builder: &'a mut PathBuilder,
    scale: f32,
    dx: f32,
    dy: f32,
}

impl GlyphSink<'_> {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.dx + x * self.scale, self.dy - y * self.scale)
    }
}

impl OutlineBuilder for GlyphSink<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
