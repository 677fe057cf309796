//! Print-size layout arithmetic and final poster compositing
//!
//! The poster is a fixed-proportion composition: the map raster sits in the
//! top 80% of the canvas behind an 8% border, and the text band fills the
//! rest. The map may be rendered smaller than its target rectangle (the
//! renderer has a hard texture ceiling) and is upscaled while compositing;
//! the final output always has exactly the requested print dimensions.

use crate::typography::{TextRenderer, layout_text};
use crate::{RenderError, Result};
use tiny_skia::{Color, FilterQuality, Pixmap, PixmapPaint, Transform};
use trail_poster_lib::catalog::{PosterConfig, PosterDesign};

/// Hard ceiling of the underlying map renderer, per axis.
pub const MAX_MAP_RENDER_DIM: u32 = 4096;

/// All derived pixel geometry for one print size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PosterLayout {
    pub print_width: u32,
    pub print_height: u32,
    /// Border around the map region: 8% of the print width, all sides
    pub padding: u32,
    /// Size the map occupies on the final canvas
    pub target_map_width: u32,
    pub target_map_height: u32,
    /// Size the map is actually rendered at (capped at the ceiling)
    pub render_map_width: u32,
    pub render_map_height: u32,
    /// The text band: from the map's bottom edge to the canvas bottom
    pub text_top: u32,
    pub text_height: u32,
}

impl PosterLayout {
    pub fn for_print_size(print_width: u32, print_height: u32) -> Self {
        let padding = (print_width as f64 * 0.08).round() as u32;
        let map_area_height = (print_height as f64 * 0.80).round() as u32;
        let target_map_width = print_width.saturating_sub(2 * padding).max(1);
        let target_map_height = map_area_height.saturating_sub(2 * padding).max(1);

        // Uniform downscale so the longer axis lands exactly on the ceiling
        let longest = target_map_width.max(target_map_height);
        let scale = (MAX_MAP_RENDER_DIM as f64 / longest as f64).min(1.0);
        let render_map_width = (target_map_width as f64 * scale).round() as u32;
        let render_map_height = (target_map_height as f64 * scale).round() as u32;

        let text_top = padding + target_map_height;
        let text_height = print_height.saturating_sub(text_top);

        Self {
            print_width,
            print_height,
            padding,
            target_map_width,
            target_map_height,
            render_map_width,
            render_map_height,
            text_top,
            text_height,
        }
    }
}

/// Composite the rendered map and the typography layer onto an opaque white
/// canvas of exactly the print dimensions.
pub fn compose<R: TextRenderer + ?Sized>(
    layout: &PosterLayout,
    map: &Pixmap,
    config: &PosterConfig,
    design: &PosterDesign,
    text: &R,
) -> Result<Pixmap> {
    let mut canvas = Pixmap::new(layout.print_width, layout.print_height).ok_or_else(|| {
        RenderError::Render(format!(
            "invalid print size {}x{}",
            layout.print_width, layout.print_height
        ))
    })?;
    canvas.fill(Color::WHITE);

    // Upscale back to the target rectangle when the render was capped
    let sx = layout.target_map_width as f32 / map.width() as f32;
    let sy = layout.target_map_height as f32 / map.height() as f32;
    let transform =
        Transform::from_scale(sx, sy).post_translate(layout.padding as f32, layout.padding as f32);
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    canvas.draw_pixmap(0, 0, map.as_ref(), &paint, transform, None);

    let spans = layout_text(
        text,
        config,
        design,
        layout.print_width,
        layout.text_top as f32,
        layout.text_height as f32,
    )?;
    for span in &spans {
        text.draw_span(&mut canvas, span)?;
    }

    Ok(canvas)
}

/// Encode the flattened canvas as PNG bytes.
pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>> {
    pixmap
        .encode_png()
        .map_err(|e| RenderError::Encode(e.to_string()))
}
