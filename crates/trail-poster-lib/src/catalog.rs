//! Poster configuration, design constants and the static size catalog
//!
//! All values here are immutable reference data: constructed once at startup
//! and passed explicitly into the components that need them. The renderer
//! never reaches for ambient globals.

use crate::track::TrailStats;
use crate::{DataError, Result};
use serde::{Deserialize, Serialize};

/// User-editable poster text and styling. Holds no derived data; the
/// pipeline receives it by value when a poster is rendered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterConfig {
    pub title: String,
    /// ISO calendar date (`YYYY-MM-DD`) or empty
    pub date: String,
    pub location: String,
    /// Display string for the distance stat, e.g. `"7.4"`
    pub distance: String,
    /// Display string for the elevation stat, e.g. `"1,234"`
    pub elevation: String,
    /// Trail stroke color as `#rrggbb`
    pub trail_color: String,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            title: "Mountain Peak Trail".to_string(),
            date: "2026-01-15".to_string(),
            location: "California, USA".to_string(),
            distance: String::new(),
            elevation: String::new(),
            trail_color: PosterDesign::default().trail_default_color.to_string(),
        }
    }
}

impl PosterConfig {
    /// Seed the editable fields from parsed trail stats and the uploaded
    /// file name. Elevation is shown only when there was any gain; the
    /// title becomes the cleaned file stem when one is available.
    pub fn seed(&mut self, stats: &TrailStats, file_name: Option<&str>) {
        self.distance = format!("{}", stats.distance_miles);
        self.elevation = if stats.elevation_gain_ft > 0 {
            group_thousands(stats.elevation_gain_ft)
        } else {
            String::new()
        };
        if let Some(name) = file_name {
            let cleaned = name
                .trim_end_matches(".gpx")
                .replace(['-', '_'], " ")
                .trim()
                .to_string();
            if !cleaned.is_empty() {
                self.title = cleaned;
            }
        }
    }

    /// Decode the configured trail color into RGB components.
    pub fn trail_color_rgb(&self) -> Result<[u8; 3]> {
        parse_hex_color(&self.trail_color)
    }
}

/// Parse a `#rrggbb` hex color.
pub fn parse_hex_color(hex: &str) -> Result<[u8; 3]> {
    let digits = hex
        .strip_prefix('#')
        .filter(|d| d.len() == 6)
        .ok_or_else(|| DataError::InvalidColor(hex.to_string()))?;
    let component = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| DataError::InvalidColor(hex.to_string()))
    };
    Ok([component(0..2)?, component(2..4)?, component(4..6)?])
}

/// Format an integer with `,` thousands separators (`1234` → `"1,234"`).
fn group_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// One entry of the fixed print-size catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PosterSizeOption {
    pub key: &'static str,
    pub label: &'static str,
    pub subtitle: &'static str,
    pub price_cents: u32,
    /// Print raster width in pixels
    pub print_width: u32,
    /// Print raster height in pixels
    pub print_height: u32,
    /// Print vendor's variant identifier for this size
    pub vendor_variant_id: u32,
}

/// The static size catalog. Three sizes, never loaded from anywhere.
#[derive(Clone, Debug)]
pub struct SizeCatalog {
    sizes: Vec<PosterSizeOption>,
}

impl SizeCatalog {
    pub fn builtin() -> Self {
        Self {
            sizes: vec![
                PosterSizeOption {
                    key: "12x18",
                    label: "12\" × 18\"",
                    subtitle: "Perfect for desks",
                    price_cents: 2900,
                    print_width: 2400,
                    print_height: 3600,
                    vendor_variant_id: 3876,
                },
                PosterSizeOption {
                    key: "18x24",
                    label: "18\" × 24\"",
                    subtitle: "Most popular",
                    price_cents: 3900,
                    print_width: 3600,
                    print_height: 4800,
                    vendor_variant_id: 1,
                },
                PosterSizeOption {
                    key: "24x36",
                    label: "24\" × 36\"",
                    subtitle: "Statement piece",
                    price_cents: 4900,
                    print_width: 4800,
                    print_height: 7200,
                    vendor_variant_id: 2,
                },
            ],
        }
    }

    pub fn sizes(&self) -> &[PosterSizeOption] {
        &self.sizes
    }

    pub fn find(&self, key: &str) -> Result<&PosterSizeOption> {
        self.sizes
            .iter()
            .find(|s| s.key == key)
            .ok_or_else(|| DataError::UnknownSize(key.to_string()))
    }
}

impl Default for SizeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A named entry of the trail color palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrailColor {
    pub name: &'static str,
    pub hex: &'static str,
}

/// Selectable trail colors, in display order.
pub const TRAIL_COLORS: [TrailColor; 8] = [
    TrailColor { name: "Gold", hex: "#d4a035" },
    TrailColor { name: "Copper", hex: "#c4704b" },
    TrailColor { name: "Forest", hex: "#2d6a4f" },
    TrailColor { name: "Ocean", hex: "#2563eb" },
    TrailColor { name: "Crimson", hex: "#dc2626" },
    TrailColor { name: "Slate", hex: "#64748b" },
    TrailColor { name: "White", hex: "#ffffff" },
    TrailColor { name: "Black", hex: "#1a1a1a" },
];

/// Fixed design constants for the poster artwork.
///
/// Pixel values are expressed at the 400 px design reference width and scaled
/// linearly by the renderer, so relative visual weight is resolution
/// independent.
#[derive(Clone, Debug)]
pub struct PosterDesign {
    /// First hillshade pass: strong relief, north-west illumination
    pub hillshade_exaggeration_primary: f64,
    /// Second hillshade pass: soft counter-light from the south-east
    pub hillshade_exaggeration_secondary: f64,
    pub trail_default_color: &'static str,
    pub trail_width: f32,
    pub trail_opacity: f32,
    pub glow_width: f32,
    pub glow_opacity: f32,
    pub glow_blur: f32,
    /// Fit-bounds padding in pixels at the design reference width
    pub map_padding_px: f32,
    /// Reference width all pixel constants are designed against
    pub design_ref_width: f32,
    pub background_color: &'static str,
    pub title_color: &'static str,
    pub location_color: &'static str,
    pub stats_color: &'static str,
}

impl Default for PosterDesign {
    fn default() -> Self {
        Self {
            hillshade_exaggeration_primary: 1.0,
            hillshade_exaggeration_secondary: 0.5,
            trail_default_color: "#d4a035",
            trail_width: 2.0,
            trail_opacity: 0.75,
            glow_width: 6.0,
            glow_opacity: 0.15,
            glow_blur: 4.0,
            map_padding_px: 36.0,
            design_ref_width: 400.0,
            background_color: "#f5f5f5",
            title_color: "#1a1a1a",
            location_color: "#6b7280",
            stats_color: "#9ca3af",
        }
    }
}
