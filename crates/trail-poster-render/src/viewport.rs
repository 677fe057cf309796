//! Deterministic fit-bounds framing
//!
//! A [`Viewport`] maps trail coordinates to pixels the way an interactive
//! map's `fitBounds` would, but computed up front: the bounds plus padding
//! are fitted instantly, with no animation loop involved, so the same inputs
//! always frame the same view.

use crate::dem::DEM_MAX_ZOOM;
use geo::Point;
use trail_poster_lib::geodesy::{
    EARTH_MERCATOR_MAX, EARTH_MERCATOR_MIN, lnglat_to_tile, mercator_to_wgs84, wgs84_to_mercator,
};
use trail_poster_lib::track::TrailBounds;

/// Minimum mercator extent so a single-point trail still frames sensibly.
const MIN_SPAN_METERS: f64 = 400.0;

/// A fixed pixel window onto Web Mercator space.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    width: u32,
    height: u32,
    center: Point<f64>,
    /// Pixels per mercator meter
    scale: f64,
}

impl Viewport {
    /// Fit `bounds` into a `width` x `height` canvas, keeping `padding_px`
    /// clear on every side.
    pub fn fit(bounds: &TrailBounds, width: u32, height: u32, padding_px: f32) -> Self {
        let min = wgs84_to_mercator(bounds.min_lat, bounds.min_lng);
        let max = wgs84_to_mercator(bounds.max_lat, bounds.max_lng);

        let span_x = (max.x() - min.x()).max(MIN_SPAN_METERS);
        let span_y = (max.y() - min.y()).max(MIN_SPAN_METERS);
        let avail_x = (width as f64 - 2.0 * padding_px as f64).max(1.0);
        let avail_y = (height as f64 - 2.0 * padding_px as f64).max(1.0);
        let scale = (avail_x / span_x).min(avail_y / span_y);

        Self {
            width,
            height,
            center: Point::new((min.x() + max.x()) / 2.0, (min.y() + max.y()) / 2.0),
            scale,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Canvas position of a WGS84 coordinate.
    pub fn project(&self, lng: f64, lat: f64) -> (f32, f32) {
        let m = wgs84_to_mercator(lat, lng);
        let x = (m.x() - self.center.x()) * self.scale + self.width as f64 / 2.0;
        let y = (self.center.y() - m.y()) * self.scale + self.height as f64 / 2.0;
        (x as f32, y as f32)
    }

    /// WGS84 coordinate under a canvas position.
    pub fn unproject(&self, px: f64, py: f64) -> (f64, f64) {
        let x = self.center.x() + (px - self.width as f64 / 2.0) / self.scale;
        let y = self.center.y() - (py - self.height as f64 / 2.0) / self.scale;
        mercator_to_wgs84(x, y)
    }

    /// Ground resolution of one pixel at the viewport center, in meters.
    pub fn meters_per_pixel(&self) -> f64 {
        1.0 / self.scale
    }

    /// Tile zoom whose native resolution meets or exceeds this viewport's.
    pub fn tile_zoom(&self, tile_size: u32) -> u8 {
        let world_px = (EARTH_MERCATOR_MAX - EARTH_MERCATOR_MIN) * self.scale;
        let zoom = (world_px / tile_size as f64).log2().ceil();
        zoom.clamp(0.0, DEM_MAX_ZOOM as f64) as u8
    }

    /// Inclusive tile range covering the viewport at zoom `z`.
    pub fn tile_range(&self, z: u8) -> (u32, u32, u32, u32) {
        let (lat_nw, lng_nw) = self.unproject(0.0, 0.0);
        let (lat_se, lng_se) = self.unproject(self.width as f64, self.height as f64);
        let (x0, y0) = lnglat_to_tile(lng_nw, lat_nw, z);
        let (x1, y1) = lnglat_to_tile(lng_se, lat_se, z);
        let max_tile = (1u32 << z) - 1;
        (
            (x0.floor().max(0.0) as u32).min(max_tile),
            (y0.floor().max(0.0) as u32).min(max_tile),
            (x1.floor().max(0.0) as u32).min(max_tile),
            (y1.floor().max(0.0) as u32).min(max_tile),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> TrailBounds {
        TrailBounds {
            min_lng: -122.45,
            max_lng: -122.38,
            min_lat: 37.75,
            max_lat: 37.80,
        }
    }

    #[test]
    fn test_fit_keeps_bounds_inside_padding() {
        let vp = Viewport::fit(&bounds(), 800, 600, 36.0);
        let corners = [
            (-122.45, 37.75),
            (-122.45, 37.80),
            (-122.38, 37.75),
            (-122.38, 37.80),
        ];
        for (lng, lat) in corners {
            let (x, y) = vp.project(lng, lat);
            assert!(x >= 35.9 && x <= 800.0 - 35.9, "x = {x}");
            assert!(y >= 35.9 && y <= 600.0 - 35.9, "y = {y}");
        }
    }

    #[test]
    fn test_fit_centers_bounds() {
        let vp = Viewport::fit(&bounds(), 800, 600, 0.0);
        let (cx, cy) = vp.project(
            (-122.45 + -122.38) / 2.0,
            // Mercator center is not the latitude midpoint, so recover it
            mercator_to_wgs84(
                0.0,
                (wgs84_to_mercator(37.75, 0.0).y() + wgs84_to_mercator(37.80, 0.0).y()) / 2.0,
            )
            .0,
        );
        assert!((cx - 400.0).abs() < 0.5);
        assert!((cy - 300.0).abs() < 0.5);
    }

    #[test]
    fn test_project_unproject_roundtrip() {
        let vp = Viewport::fit(&bounds(), 800, 600, 36.0);
        let (lat, lng) = vp.unproject(123.0, 456.0);
        let (x, y) = vp.project(lng, lat);
        assert!((x - 123.0).abs() < 0.01);
        assert!((y - 456.0).abs() < 0.01);
    }

    #[test]
    fn test_degenerate_bounds_still_frame() {
        let point = TrailBounds {
            min_lng: -122.4,
            max_lng: -122.4,
            min_lat: 37.77,
            max_lat: 37.77,
        };
        let vp = Viewport::fit(&point, 400, 400, 36.0);
        let (x, y) = vp.project(-122.4, 37.77);
        assert!((x - 200.0).abs() < 1.0);
        assert!((y - 200.0).abs() < 1.0);
        assert!(vp.meters_per_pixel().is_finite());
    }

    #[test]
    fn test_tile_zoom_clamped_to_dem_max() {
        // A tiny span at high pixel density demands more than the DEM serves
        let tiny = TrailBounds {
            min_lng: -122.4001,
            max_lng: -122.4,
            min_lat: 37.77,
            max_lat: 37.7701,
        };
        let vp = Viewport::fit(&tiny, 4096, 4096, 0.0);
        assert_eq!(vp.tile_zoom(256), DEM_MAX_ZOOM);
    }

    #[test]
    fn test_tile_range_ordered_and_in_bounds() {
        let vp = Viewport::fit(&bounds(), 800, 600, 36.0);
        let z = vp.tile_zoom(256);
        let (x0, y0, x1, y1) = vp.tile_range(z);
        assert!(x0 <= x1);
        assert!(y0 <= y1);
        assert!(x1 < (1u32 << z));
        assert!(y1 < (1u32 << z));
    }
}
