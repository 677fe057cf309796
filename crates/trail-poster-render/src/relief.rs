//! Terrain relief rendering: elevation grid, hillshade passes, contours
//!
//! The grid is sampled per output pixel from the fetched DEM tiles, then
//! shaded twice (a strong north-west light and a soft south-east
//! counter-light) and overlaid with constant-interval contour lines.

use crate::dem::TileSource;
use crate::viewport::Viewport;
use crate::{RenderError, Result};
use std::collections::{BTreeMap, HashMap};
use tiny_skia::{
    LineCap, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Stroke, Transform,
};
use trail_poster_lib::geodesy::lnglat_to_tile;

/// Illumination altitude shared by both hillshade passes.
const HILLSHADE_ALTITUDE_DEG: f64 = 45.0;

/// Per-pixel elevations covering one viewport.
#[derive(Clone, Debug)]
pub struct ElevationGrid {
    width: u32,
    height: u32,
    data: Vec<f32>,
    /// Ground size of one pixel, for slope computation
    meters_per_pixel: f64,
}

impl ElevationGrid {
    pub fn new(width: u32, height: u32, data: Vec<f32>, meters_per_pixel: f64) -> Self {
        debug_assert_eq!(data.len(), (width * height) as usize);
        Self {
            width,
            height,
            data,
            meters_per_pixel,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }

    /// Neighbor access that clamps at the grid edges.
    #[inline]
    fn get_clamped(&self, x: i64, y: i64) -> f32 {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.get(x, y)
    }
}

/// Sample an elevation grid for the viewport from a tile source.
///
/// Tiles are fetched once for the covering range, then every output pixel is
/// resolved through its containing tile. Any tile failure fails the build.
pub async fn build_grid<S: TileSource>(source: &S, viewport: &Viewport) -> Result<ElevationGrid> {
    let zoom = viewport.tile_zoom(256);
    let (x0, y0, x1, y1) = viewport.tile_range(zoom);

    let mut tiles = HashMap::new();
    for ty in y0..=y1 {
        for tx in x0..=x1 {
            let tile = source.fetch(tx, ty, zoom).await?;
            tiles.insert((tx, ty), tile);
        }
    }
    tracing::debug!(zoom, tiles = tiles.len(), "elevation tiles assembled");

    let (width, height) = (viewport.width(), viewport.height());
    let mut data = Vec::with_capacity((width * height) as usize);
    for py in 0..height {
        for px in 0..width {
            let (lat, lng) = viewport.unproject(px as f64 + 0.5, py as f64 + 0.5);
            let (fx, fy) = lnglat_to_tile(lng, lat, zoom);
            let tx = (fx.floor().max(0.0) as u32).clamp(x0, x1);
            let ty = (fy.floor().max(0.0) as u32).clamp(y0, y1);
            let tile = tiles
                .get(&(tx, ty))
                .ok_or_else(|| RenderError::Render(format!("missing tile {tx}/{ty}/{zoom}")))?;
            data.push(tile.sample(fx - tx as f64, fy - ty as f64));
        }
    }

    Ok(ElevationGrid::new(
        width,
        height,
        data,
        viewport.meters_per_pixel(),
    ))
}

/// One shaded-relief pass.
#[derive(Clone, Copy, Debug)]
pub struct HillshadePass {
    /// Slope multiplier; 1.0 renders terrain at natural steepness
    pub exaggeration: f64,
    /// Compass direction the light comes from, in degrees
    pub azimuth_deg: f64,
    pub shadow: [u8; 3],
    pub highlight: [u8; 3],
}

/// Shade the pixmap in place from the grid's slopes.
///
/// Flat terrain is left untouched; slopes facing away from the light blend
/// toward the shadow color and slopes facing it toward the highlight color.
pub fn apply_hillshade(pixmap: &mut Pixmap, grid: &ElevationGrid, pass: &HillshadePass) {
    let zenith = (90.0 - HILLSHADE_ALTITUDE_DEG).to_radians();
    let azimuth = (360.0 - pass.azimuth_deg + 90.0).to_radians();
    let flat = zenith.cos();
    let cell = grid.meters_per_pixel.max(1e-6);
    let width = grid.width;

    for (i, pixel) in pixmap.pixels_mut().iter_mut().enumerate() {
        let x = (i as u32 % width) as i64;
        let y = (i as u32 / width) as i64;

        // Horn's method over the 8 neighbors
        let a = grid.get_clamped(x - 1, y - 1) as f64;
        let b = grid.get_clamped(x, y - 1) as f64;
        let c = grid.get_clamped(x + 1, y - 1) as f64;
        let d = grid.get_clamped(x - 1, y) as f64;
        let f = grid.get_clamped(x + 1, y) as f64;
        let g = grid.get_clamped(x - 1, y + 1) as f64;
        let h = grid.get_clamped(x, y + 1) as f64;
        let j = grid.get_clamped(x + 1, y + 1) as f64;

        let dzdx = ((c + 2.0 * f + j) - (a + 2.0 * d + g)) / (8.0 * cell);
        let dzdy = ((g + 2.0 * h + j) - (a + 2.0 * b + c)) / (8.0 * cell);

        let slope = (pass.exaggeration * (dzdx * dzdx + dzdy * dzdy).sqrt()).atan();
        let aspect = dzdy.atan2(-dzdx);
        let shade =
            (zenith.cos() * slope.cos() + zenith.sin() * slope.sin() * (azimuth - aspect).cos())
                .clamp(0.0, 1.0);

        let deviation = shade - flat;
        let (tint, alpha) = if deviation < 0.0 {
            (pass.shadow, (-deviation).min(1.0) as f32)
        } else {
            (pass.highlight, deviation.min(1.0) as f32)
        };
        if alpha <= f32::EPSILON {
            continue;
        }

        let blend = |base: u8, over: u8| -> u8 {
            (base as f32 * (1.0 - alpha) + over as f32 * alpha).round() as u8
        };
        let r = blend(pixel.red(), tint[0]);
        let g2 = blend(pixel.green(), tint[1]);
        let b2 = blend(pixel.blue(), tint[2]);
        if let Some(shaded) = PremultipliedColorU8::from_rgba(r, g2, b2, 255) {
            *pixel = shaded;
        }
    }
}

/// Contour line styling.
#[derive(Clone, Copy, Debug)]
pub struct ContourStyle {
    pub interval_m: f64,
    pub color: [u8; 3],
    pub opacity: f32,
}

impl Default for ContourStyle {
    fn default() -> Self {
        Self {
            interval_m: 10.0,
            color: [0xc0, 0xc0, 0xc0],
            opacity: 0.4,
        }
    }
}

/// One contour line segment, tagged with its cyclic index (1..=10).
type ContourSegment = (i64, (f32, f32), (f32, f32));

/// Stroke width for a contour index: every 5th line is emphasized and every
/// 10th more so.
fn contour_width(index: i64) -> f32 {
    match index {
        5 => 0.8,
        10 => 1.0,
        _ => 0.4,
    }
}

/// Marching squares over the grid: emit a segment wherever a contour level
/// crosses a cell, with linear interpolation along the cell edges.
pub(crate) fn contour_segments(grid: &ElevationGrid, interval_m: f64) -> Vec<ContourSegment> {
    let mut segments = Vec::new();

    for y in 0..grid.height.saturating_sub(1) {
        for x in 0..grid.width.saturating_sub(1) {
            let tl = grid.get(x, y) as f64;
            let tr = grid.get(x + 1, y) as f64;
            let br = grid.get(x + 1, y + 1) as f64;
            let bl = grid.get(x, y + 1) as f64;

            let lo = tl.min(tr).min(br).min(bl);
            let hi = tl.max(tr).max(br).max(bl);
            let first = (lo / interval_m).ceil() as i64;
            let last = (hi / interval_m).floor() as i64;

            for k in first..=last {
                let level = k as f64 * interval_m;
                let index = match k.rem_euclid(10) {
                    0 => 10,
                    n => n,
                };

                // Cell-local coordinates, +0.5 to land on pixel centers
                let fx = x as f32 + 0.5;
                let fy = y as f32 + 0.5;
                let interp = |a: f64, b: f64| -> f32 {
                    if (b - a).abs() < 1e-12 {
                        0.5
                    } else {
                        ((level - a) / (b - a)) as f32
                    }
                };
                let top = (fx + interp(tl, tr), fy);
                let right = (fx + 1.0, fy + interp(tr, br));
                let bottom = (fx + interp(bl, br), fy + 1.0);
                let left = (fx, fy + interp(tl, bl));

                let case = ((tl >= level) as u8) << 3
                    | ((tr >= level) as u8) << 2
                    | ((br >= level) as u8) << 1
                    | ((bl >= level) as u8);

                match case {
                    1 | 14 => segments.push((index, left, bottom)),
                    2 | 13 => segments.push((index, bottom, right)),
                    3 | 12 => segments.push((index, left, right)),
                    4 | 11 => segments.push((index, top, right)),
                    6 | 9 => segments.push((index, top, bottom)),
                    7 | 8 => segments.push((index, top, left)),
                    5 => {
                        segments.push((index, top, left));
                        segments.push((index, bottom, right));
                    }
                    10 => {
                        segments.push((index, top, right));
                        segments.push((index, left, bottom));
                    }
                    _ => {}
                }
            }
        }
    }

    segments
}

/// Stroke all contour lines onto the pixmap.
pub fn draw_contours(pixmap: &mut Pixmap, grid: &ElevationGrid, style: &ContourStyle) {
    let segments = contour_segments(grid, style.interval_m);

    // Bucket by stroke width so each class is one stroked path. Ordered so
    // repeated renders stroke the classes identically.
    let mut builders: BTreeMap<u8, PathBuilder> = BTreeMap::new();
    for (index, from, to) in segments {
        let class = match index {
            5 => 5,
            10 => 10,
            _ => 0,
        };
        let builder = builders.entry(class).or_insert_with(PathBuilder::new);
        builder.move_to(from.0, from.1);
        builder.line_to(to.0, to.1);
    }

    let mut paint = Paint::default();
    let alpha = (style.opacity * 255.0).round() as u8;
    paint.set_color_rgba8(style.color[0], style.color[1], style.color[2], alpha);
    paint.anti_alias = true;

    for (class, builder) in builders {
        if let Some(path) = builder.finish() {
            let stroke = Stroke {
                width: contour_width(class as i64),
                line_cap: LineCap::Round,
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }
}
