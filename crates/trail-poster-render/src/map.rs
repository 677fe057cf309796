//! The map raster: terrain layers plus the trail strokes
//!
//! Layer order, bottom to top: background fill, two hillshade passes at
//! different exaggeration/illumination settings for a double-lit relief
//! effect, contour lines, trail glow, trail line. Stroke widths and the glow
//! radius scale linearly with `render_width / 400` so the relative visual
//! weight is resolution independent.

use crate::dem::TileSource;
use crate::relief::{self, ContourStyle, HillshadePass};
use crate::viewport::Viewport;
use crate::{RenderError, Result};
use tiny_skia::{Color, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};
use trail_poster_lib::catalog::{PosterDesign, parse_hex_color};
use trail_poster_lib::track::{TrailBounds, TrailGeometry};

/// Render the map region at exactly `width` x `height` pixels.
///
/// The view is fitted to `bounds` with the design's padding scaled to the
/// render width. Each call builds its own viewport, grid and canvas; nothing
/// is shared between renders.
pub async fn render_map<S: TileSource>(
    tiles: &S,
    design: &PosterDesign,
    geometry: &TrailGeometry,
    bounds: &TrailBounds,
    trail_color: [u8; 3],
    width: u32,
    height: u32,
) -> Result<Pixmap> {
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| RenderError::Render(format!("invalid map size {width}x{height}")))?;

    let print_scale = width as f32 / design.design_ref_width;
    let padding = design.map_padding_px * print_scale;
    let viewport = Viewport::fit(bounds, width, height, padding);

    let background = parse_hex_color(design.background_color)?;
    pixmap.fill(Color::from_rgba8(background[0], background[1], background[2], 255));

    let grid = relief::build_grid(tiles, &viewport).await?;
    relief::apply_hillshade(
        &mut pixmap,
        &grid,
        &HillshadePass {
            exaggeration: design.hillshade_exaggeration_primary,
            azimuth_deg: 315.0,
            shadow: [0x2a, 0x2a, 0x2a],
            highlight: [0xff, 0xff, 0xff],
        },
    );
    relief::apply_hillshade(
        &mut pixmap,
        &grid,
        &HillshadePass {
            exaggeration: design.hillshade_exaggeration_secondary,
            azimuth_deg: 135.0,
            shadow: [0x3a, 0x3a, 0x3a],
            highlight: [0xfa, 0xfa, 0xfa],
        },
    );
    relief::draw_contours(&mut pixmap, &grid, &ContourStyle::default());

    draw_trail(&mut pixmap, &viewport, geometry, design, trail_color, print_scale);

    Ok(pixmap)
}

/// Project the trail into view coordinates as one polyline path.
fn trail_path(viewport: &Viewport, geometry: &TrailGeometry) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for (i, coord) in geometry.coordinates.iter().enumerate() {
        let (x, y) = viewport.project(coord.lng, coord.lat);
        if i == 0 {
            builder.move_to(x, y);
        } else {
            builder.line_to(x, y);
        }
    }
    builder.finish()
}

/// Stroke the glow and the trail line, widths scaled by `print_scale`.
fn draw_trail(
    pixmap: &mut Pixmap,
    viewport: &Viewport,
    geometry: &TrailGeometry,
    design: &PosterDesign,
    trail_color: [u8; 3],
    print_scale: f32,
) {
    let Some(path) = trail_path(viewport, geometry) else {
        return;
    };

    let stroke = |width: f32| Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    let paint = |opacity: f32| {
        let mut paint = Paint::default();
        let alpha = (opacity * 255.0).round() as u8;
        paint.set_color_rgba8(trail_color[0], trail_color[1], trail_color[2], alpha);
        paint.anti_alias = true;
        paint
    };

    // Wide, soft, low-opacity glow under the line. The blur radius is
    // approximated by concentric strokes stepping down in width.
    let glow_width = design.glow_width * print_scale * 0.5;
    let glow_blur = design.glow_blur * print_scale * 0.5;
    let glow_paint = paint(design.glow_opacity / 3.0);
    for step in [2.0, 1.0, 0.0] {
        pixmap.stroke_path(
            &path,
            &glow_paint,
            &stroke(glow_width + glow_blur * step),
            Transform::identity(),
            None,
        );
    }

    pixmap.stroke_path(
        &path,
        &paint(design.trail_opacity),
        &stroke(design.trail_width * print_scale * 0.5),
        Transform::identity(),
        None,
    );
}
