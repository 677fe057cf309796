//! Elevation tile sources
//!
//! Terrain data arrives as raster "terrain-RGB" tiles: each pixel encodes an
//! elevation in meters as `-10000 + (R*65536 + G*256 + B) * 0.1`. The
//! [`TileSource`] trait abstracts where tiles come from so the renderer can
//! run against a live tile server or a deterministic synthetic terrain.

use crate::{RenderError, Result};
use tiny_skia::Pixmap;
use trail_poster_lib::geodesy::{tile_x_to_lng, tile_y_to_lat};

/// Highest zoom level served by the elevation tileset.
pub const DEM_MAX_ZOOM: u8 = 14;

/// Default terrain-RGB tile endpoint. `{z}`, `{x}` and `{y}` are replaced.
pub const DEFAULT_TILE_URL: &str =
    "https://wms.wheregroup.com/dem_tileserver/raster_dem/{z}/{x}/{y}.png";

/// One decoded elevation tile: row-major meters.
#[derive(Clone, Debug)]
pub struct DemTile {
    width: u32,
    height: u32,
    elevations: Vec<f32>,
}

impl DemTile {
    /// Decode a terrain-RGB PNG tile into elevations.
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self> {
        let pixmap = Pixmap::decode_png(bytes)
            .map_err(|e| RenderError::Render(format!("tile decode: {e}")))?;
        let elevations = pixmap
            .pixels()
            .iter()
            .map(|p| decode_elevation(p.red(), p.green(), p.blue()))
            .collect();
        Ok(Self {
            width: pixmap.width(),
            height: pixmap.height(),
            elevations,
        })
    }

    /// Build a tile from raw elevations (synthetic terrain, tests).
    pub fn from_elevations(width: u32, height: u32, elevations: Vec<f32>) -> Self {
        debug_assert_eq!(elevations.len(), (width * height) as usize);
        Self {
            width,
            height,
            elevations,
        }
    }

    /// Sample the elevation at a fractional position within the tile,
    /// `fx`/`fy` in `[0, 1)` from the north-west corner.
    pub fn sample(&self, fx: f64, fy: f64) -> f32 {
        let px = ((fx * self.width as f64) as u32).min(self.width - 1);
        let py = ((fy * self.height as f64) as u32).min(self.height - 1);
        self.elevations[(py * self.width + px) as usize]
    }
}

/// Standard terrain-RGB elevation encoding.
#[inline]
pub fn decode_elevation(r: u8, g: u8, b: u8) -> f32 {
    let value = (r as u32) * 65536 + (g as u32) * 256 + (b as u32);
    -10000.0 + value as f32 * 0.1
}

/// Where elevation tiles come from.
#[allow(async_fn_in_trait)]
pub trait TileSource: Send + Sync {
    async fn fetch(&self, x: u32, y: u32, z: u8) -> Result<DemTile>;
}

/// Fetches terrain-RGB tiles over HTTP.
pub struct HttpTileSource {
    client: reqwest::Client,
    url_template: String,
}

impl HttpTileSource {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url_template: url_template.into(),
        }
    }

    fn tile_url(&self, x: u32, y: u32, z: u8) -> String {
        self.url_template
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

impl Default for HttpTileSource {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_URL)
    }
}

impl TileSource for HttpTileSource {
    async fn fetch(&self, x: u32, y: u32, z: u8) -> Result<DemTile> {
        let url = self.tile_url(x, y, z);
        tracing::debug!(%url, "fetching elevation tile");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RenderError::Render(format!("tile fetch {url}: {e}")))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RenderError::Render(format!("tile read {url}: {e}")))?;
        DemTile::from_png_bytes(&bytes)
    }
}

/// Deterministic parametric terrain for offline renders and tests.
///
/// Elevation is a smooth function of longitude/latitude only, so adjacent
/// tiles always agree at their shared edges and repeated fetches are
/// identical.
#[derive(Clone, Copy, Debug)]
pub struct SyntheticTileSource {
    tile_size: u32,
}

impl SyntheticTileSource {
    pub fn new() -> Self {
        Self { tile_size: 256 }
    }
}

impl Default for SyntheticTileSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSource for SyntheticTileSource {
    async fn fetch(&self, x: u32, y: u32, z: u8) -> Result<DemTile> {
        let size = self.tile_size;
        let west = tile_x_to_lng(x, z);
        let east = tile_x_to_lng(x + 1, z);
        let north = tile_y_to_lat(y, z);
        let south = tile_y_to_lat(y + 1, z);

        let mut elevations = Vec::with_capacity((size * size) as usize);
        for py in 0..size {
            let lat = north + (south - north) * (py as f64 + 0.5) / size as f64;
            for px in 0..size {
                let lng = west + (east - west) * (px as f64 + 0.5) / size as f64;
                elevations.push(synthetic_elevation(lng, lat));
            }
        }
        Ok(DemTile::from_elevations(size, size, elevations))
    }
}

/// Two-octave sinusoidal terrain, hilly at trail scale.
fn synthetic_elevation(lng: f64, lat: f64) -> f32 {
    let broad = (lng.to_radians() * 2300.0).sin() * (lat.to_radians() * 2700.0).cos();
    let detail = (lng.to_radians() * 9100.0).sin() * (lat.to_radians() * 8300.0).sin();
    (420.0 + 260.0 * broad + 70.0 * detail) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_elevation() {
        // Sea level: value 100000 -> -10000 + 10000.0 = 0
        assert!((decode_elevation(1, 134, 160) - 0.0).abs() < 0.2);
        // All zero is the encoding floor
        assert!((decode_elevation(0, 0, 0) - (-10000.0)).abs() < 1e-3);
        // One blue step is a tenth of a meter
        let a = decode_elevation(1, 134, 160);
        let b = decode_elevation(1, 134, 161);
        assert!((b - a - 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_tile_sample_clamps_edges() {
        let tile = DemTile::from_elevations(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(tile.sample(0.0, 0.0), 1.0);
        assert_eq!(tile.sample(0.999, 0.0), 2.0);
        assert_eq!(tile.sample(0.0, 0.999), 3.0);
        // Exactly 1.0 stays inside the tile
        assert_eq!(tile.sample(1.0, 1.0), 4.0);
    }

    #[test]
    fn test_tile_url_template() {
        let source = HttpTileSource::new("https://tiles.example/{z}/{x}/{y}.png");
        assert_eq!(source.tile_url(654, 1582, 12), "https://tiles.example/12/654/1582.png");
    }

    #[tokio::test]
    async fn test_synthetic_tiles_deterministic() {
        let source = SyntheticTileSource::new();
        let a = source.fetch(654, 1582, 12).await.unwrap();
        let b = source.fetch(654, 1582, 12).await.unwrap();
        assert_eq!(a.elevations, b.elevations);
    }

    #[tokio::test]
    async fn test_synthetic_tiles_agree_at_shared_edge() {
        let source = SyntheticTileSource::new();
        let left = source.fetch(654, 1582, 12).await.unwrap();
        let right = source.fetch(655, 1582, 12).await.unwrap();
        // Sampling just either side of the shared edge stays continuous
        let a = left.sample(0.999, 0.5);
        let b = right.sample(0.0, 0.5);
        assert!((a - b).abs() < 25.0, "edge jump {a} vs {b}");
    }
}
