//! Pure distance and projection math over coordinate pairs
//!
//! Everything here is side-effect free. NaN inputs propagate NaN; there are
//! no error cases.

use geo::Point;

/// Mean Earth radius in miles, the reference value for trail distances
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Conversion factor from meters (GPX elevation unit) to feet
pub const METERS_TO_FEET: f64 = 3.28084;

/// Web Mercator bounds in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;
pub const EARTH_MERCATOR_MIN: f64 = -20037508.34;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Precomputed constant: EARTH_MERCATOR_MAX / 180.0
const LON_TO_X_FACTOR: f64 = EARTH_MERCATOR_MAX / 180.0;

/// Precomputed constant: EARTH_MERCATOR_MAX / PI
const Y_FACTOR: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;

/// Great-circle distance between two WGS84 coordinates, in miles
///
/// # Arguments
/// * `lat1`, `lng1` - First point in degrees
/// * `lat2`, `lng2` - Second point in degrees
#[inline]
pub fn haversine_miles(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin() * (d_lat / 2.0).sin()
        + lat1.to_radians().cos()
            * lat2.to_radians().cos()
            * (d_lng / 2.0).sin()
            * (d_lng / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_MILES * c
}

/// Convert WGS84 (lat, lng) to Web Mercator (x, y) in meters
///
/// Latitude is clamped to the valid Web Mercator range.
#[inline(always)]
pub fn wgs84_to_mercator(lat: f64, lng: f64) -> Point<f64> {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = lng * LON_TO_X_FACTOR;
    let lat_rad = lat.to_radians();
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR;
    Point::new(x, y)
}

/// Convert Web Mercator (x, y) in meters to WGS84 (lat, lng)
#[inline(always)]
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lng = x / LON_TO_X_FACTOR;
    let lat = (std::f64::consts::PI / 2.0 - 2.0 * ((-y / Y_FACTOR).exp()).atan()).to_degrees();
    (lat, lng)
}

/// Fractional slippy-map tile coordinates of a WGS84 position at zoom `z`
#[inline]
pub fn lnglat_to_tile(lng: f64, lat: f64, z: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(z as i32);
    let x = (lng + 180.0) / 360.0 * n;
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n;
    (x, y)
}

/// Longitude of the west edge of tile column `x` at zoom `z`
#[inline]
pub fn tile_x_to_lng(x: u32, z: u8) -> f64 {
    let n = 2.0_f64.powi(z as i32);
    (x as f64 / n) * 360.0 - 180.0
}

/// Latitude of the north edge of tile row `y` at zoom `z`
#[inline]
pub fn tile_y_to_lat(y: u32, z: u8) -> f64 {
    let n = 2.0_f64.powi(z as i32);
    let lat_rad = std::f64::consts::PI * (1.0 - 2.0 * y as f64 / n);
    lat_rad.sinh().atan().to_degrees()
}
