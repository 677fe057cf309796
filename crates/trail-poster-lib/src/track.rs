//! GPX track parsing and derived trail data
//!
//! The parser scans raw GPX text for `trkpt` elements and turns them into an
//! ordered geometry plus summary statistics and a bounding box. It is
//! deliberately lenient: points are only dropped when both coordinates are
//! missing, and an input that yields no usable points at all degrades to the
//! deterministic sample trail instead of failing.

use crate::geodesy::{METERS_TO_FEET, haversine_miles};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One GPS fix as read from a `trkpt` element. Ephemeral parser output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lng: f64,
    pub ele: Option<f64>,
}

/// A single `[lng, lat]` or `[lng, lat, ele]` coordinate of the trail path.
///
/// Serializes positionally so persisted geometry stays a plain JSON array.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailCoord {
    pub lng: f64,
    pub lat: f64,
    pub ele: Option<f64>,
}

impl Serialize for TrailCoord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.ele.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.lng)?;
        seq.serialize_element(&self.lat)?;
        if let Some(ele) = self.ele {
            seq.serialize_element(&ele)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for TrailCoord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = Vec::<f64>::deserialize(deserializer)?;
        if parts.len() < 2 {
            return Err(D::Error::invalid_length(
                parts.len(),
                &"[lng, lat] or [lng, lat, ele]",
            ));
        }
        Ok(TrailCoord {
            lng: parts[0],
            lat: parts[1],
            ele: parts.get(2).copied(),
        })
    }
}

/// Ordered, immutable coordinate sequence describing one continuous path.
///
/// Point order is preserved exactly as parsed; after fallback generation the
/// sequence is never empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrailGeometry {
    pub coordinates: Vec<TrailCoord>,
}

/// Axis-aligned bounding box of all trail points.
///
/// Degenerate (single-point) bounds are legal: `min == max` on both axes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailBounds {
    pub min_lng: f64,
    pub max_lng: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// Summary statistics derived from the point sequence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailStats {
    /// Sum of great-circle segment lengths, rounded to 1 decimal mile
    pub distance_miles: f64,
    /// Sum of positive elevation deltas, rounded to the nearest foot
    pub elevation_gain_ft: u32,
}

/// Whether the trail came from real input or the synthetic fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The input contained usable track points
    Parsed,
    /// The input yielded nothing usable and the sample trail was substituted
    FellBackToSample,
}

/// Everything the parser produces for one uploaded file (or the fallback).
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedTrail {
    pub geometry: TrailGeometry,
    pub stats: TrailStats,
    pub bounds: TrailBounds,
    pub outcome: ParseOutcome,
}

impl ParsedTrail {
    /// Rebuild a trail from previously persisted geometry and bounds,
    /// recomputing the derived statistics from the coordinates.
    pub fn from_geometry(geometry: TrailGeometry, bounds: TrailBounds) -> Self {
        let points: Vec<TrackPoint> = geometry
            .coordinates
            .iter()
            .map(|c| TrackPoint {
                lat: c.lat,
                lng: c.lng,
                ele: c.ele,
            })
            .collect();
        if points.is_empty() {
            return sample_trail();
        }
        let mut trail = build_trail(points, ParseOutcome::Parsed);
        trail.bounds = bounds;
        trail
    }
}

/// Parse raw GPX text into a trail.
///
/// Never fails: malformed structure that yields zero points falls back to
/// [`sample_trail`], reported via [`ParseOutcome::FellBackToSample`].
pub fn parse_gpx(text: &str) -> ParsedTrail {
    let points = extract_points(text);
    if points.is_empty() {
        tracing::warn!("no usable track points in input, substituting the sample trail");
        return sample_trail();
    }
    build_trail(points, ParseOutcome::Parsed)
}

/// Deterministic synthetic trail used when no upload exists.
///
/// 100 points along a spiral-like parametric path anchored near San
/// Francisco. Pure and reproducible: every call returns identical data, so
/// independent callers stay consistent.
pub fn sample_trail() -> ParsedTrail {
    const BASE_LAT: f64 = 37.7749;
    const BASE_LNG: f64 = -122.4194;
    const STEP_DEGREES: f64 = 0.0008;

    let mut points = Vec::with_capacity(100);
    let mut lat = BASE_LAT;
    let mut lng = BASE_LNG;
    for i in 0..100 {
        let t = i as f64;
        let angle = t / 100.0 * std::f64::consts::TAU + (t * 0.3).sin() * 0.5;
        lat += angle.cos() * STEP_DEGREES;
        lng += angle.sin() * STEP_DEGREES;
        points.push(TrackPoint {
            lat,
            lng,
            ele: Some(200.0 + (t * 0.1).sin() * 50.0),
        });
    }
    build_trail(points, ParseOutcome::FellBackToSample)
}

/// Scan the document for `trkpt` elements, wherever they are nested.
///
/// A point is skipped only when both coordinates are absent or unparseable;
/// a bad `ele` child degrades that point's elevation to unknown. A hard XML
/// error ends the scan, keeping whatever was collected so far.
fn extract_points(xml: &str) -> Vec<TrackPoint> {
    let mut reader = Reader::from_str(xml);
    let mut points = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"trkpt" => {
                let (lat, lng) = coord_attrs(&e);
                let ele = read_elevation(&mut reader);
                if lat == 0.0 && lng == 0.0 {
                    continue;
                }
                points.push(TrackPoint { lat, lng, ele });
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"trkpt" => {
                let (lat, lng) = coord_attrs(&e);
                if lat == 0.0 && lng == 0.0 {
                    continue;
                }
                points.push(TrackPoint { lat, lng, ele: None });
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                tracing::debug!("stopping GPX scan on malformed XML: {err}");
                break;
            }
            _ => {}
        }
    }

    points
}

/// Read `lat`/`lon` attributes, treating missing or unparseable values as 0.
fn coord_attrs(e: &BytesStart<'_>) -> (f64, f64) {
    let mut lat = 0.0;
    let mut lng = 0.0;
    for attr in e.attributes().flatten() {
        let value = std::str::from_utf8(&attr.value).unwrap_or_default();
        let parsed = value.parse::<f64>().ok().filter(|v| v.is_finite());
        match attr.key.local_name().as_ref() {
            b"lat" => lat = parsed.unwrap_or(0.0),
            b"lon" => lng = parsed.unwrap_or(0.0),
            _ => {}
        }
    }
    (lat, lng)
}

/// Consume events up to the closing `trkpt`, capturing the first `ele` child.
fn read_elevation(reader: &mut Reader<&[u8]>) -> Option<f64> {
    let mut ele = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"ele" => {
                if let Ok(text) = reader.read_text(e.name()) {
                    if ele.is_none() {
                        ele = text.trim().parse::<f64>().ok();
                    }
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trkpt" => break,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    ele
}

/// Compute stats, bounds and geometry in a single pass over the points.
fn build_trail(points: Vec<TrackPoint>, outcome: ParseOutcome) -> ParsedTrail {
    debug_assert!(!points.is_empty());

    let mut min_lng = f64::INFINITY;
    let mut max_lng = f64::NEG_INFINITY;
    let mut min_lat = f64::INFINITY;
    let mut max_lat = f64::NEG_INFINITY;
    let mut distance = 0.0;
    let mut gain_ft = 0.0;

    let mut prev: Option<&TrackPoint> = None;
    for point in &points {
        min_lng = min_lng.min(point.lng);
        max_lng = max_lng.max(point.lng);
        min_lat = min_lat.min(point.lat);
        max_lat = max_lat.max(point.lat);

        if let Some(prev) = prev {
            distance += haversine_miles(prev.lat, prev.lng, point.lat, point.lng);
            if let (Some(prev_ele), Some(ele)) = (prev.ele, point.ele) {
                if ele > prev_ele {
                    gain_ft += (ele - prev_ele) * METERS_TO_FEET;
                }
            }
        }
        prev = Some(point);
    }

    let coordinates = points
        .iter()
        .map(|p| TrailCoord {
            lng: p.lng,
            lat: p.lat,
            ele: p.ele,
        })
        .collect();

    ParsedTrail {
        geometry: TrailGeometry { coordinates },
        stats: TrailStats {
            distance_miles: (distance * 10.0).round() / 10.0,
            elevation_gain_ft: gain_ft.round() as u32,
        },
        bounds: TrailBounds {
            min_lng,
            max_lng,
            min_lat,
            max_lat,
        },
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpx_from_points(points: &[(f64, f64, Option<f64>)]) -> String {
        let mut xml = String::from("<?xml version=\"1.0\"?><gpx><trk><trkseg>");
        for (lat, lng, ele) in points {
            match ele {
                Some(e) => xml.push_str(&format!(
                    "<trkpt lat=\"{lat}\" lon=\"{lng}\"><ele>{e}</ele></trkpt>"
                )),
                None => xml.push_str(&format!("<trkpt lat=\"{lat}\" lon=\"{lng}\"/>")),
            }
        }
        xml.push_str("</trkseg></trk></gpx>");
        xml
    }

    #[test]
    fn test_three_point_scenario() {
        let xml = gpx_from_points(&[
            (37.0, -122.0, Some(100.0)),
            (37.01, -122.0, Some(150.0)),
            (37.0, -122.01, Some(120.0)),
        ]);
        let trail = parse_gpx(&xml);

        // Only the first delta is positive: round(50 * 3.28084) = 164 ft
        assert_eq!(trail.stats.elevation_gain_ft, 164);

        let expected = haversine_miles(37.0, -122.0, 37.01, -122.0)
            + haversine_miles(37.01, -122.0, 37.0, -122.01);
        assert!((trail.stats.distance_miles - (expected * 10.0).round() / 10.0).abs() < 1e-9);
        assert_eq!(trail.outcome, ParseOutcome::Parsed);
    }

    #[test]
    fn test_bounds_invariants() {
        let xml = gpx_from_points(&[
            (37.0, -122.0, None),
            (36.5, -121.0, None),
            (37.5, -123.0, None),
        ]);
        let trail = parse_gpx(&xml);
        assert!(trail.bounds.min_lng <= trail.bounds.max_lng);
        assert!(trail.bounds.min_lat <= trail.bounds.max_lat);
        assert_eq!(trail.bounds.min_lng, -123.0);
        assert_eq!(trail.bounds.max_lat, 37.5);
    }

    #[test]
    fn test_single_point_degenerate_bounds() {
        let xml = gpx_from_points(&[(37.0, -122.0, Some(10.0))]);
        let trail = parse_gpx(&xml);
        assert_eq!(trail.bounds.min_lng, trail.bounds.max_lng);
        assert_eq!(trail.bounds.min_lat, trail.bounds.max_lat);
        assert_eq!(trail.stats.distance_miles, 0.0);
        assert_eq!(trail.stats.elevation_gain_ft, 0);
    }

    #[test]
    fn test_gain_zero_for_flat_descending_and_unknown() {
        let flat = gpx_from_points(&[(37.0, -122.0, Some(100.0)), (37.01, -122.0, Some(100.0))]);
        assert_eq!(parse_gpx(&flat).stats.elevation_gain_ft, 0);

        let descending = gpx_from_points(&[
            (37.0, -122.0, Some(300.0)),
            (37.01, -122.0, Some(200.0)),
            (37.02, -122.0, Some(100.0)),
        ]);
        assert_eq!(parse_gpx(&descending).stats.elevation_gain_ft, 0);

        let unknown = gpx_from_points(&[(37.0, -122.0, None), (37.01, -122.0, None)]);
        assert_eq!(parse_gpx(&unknown).stats.elevation_gain_ft, 0);
    }

    #[test]
    fn test_unknown_elevation_breaks_delta_chain() {
        // 100 -> unknown -> 150: no consecutive known pair climbs
        let xml = gpx_from_points(&[
            (37.0, -122.0, Some(100.0)),
            (37.01, -122.0, None),
            (37.02, -122.0, Some(150.0)),
        ]);
        assert_eq!(parse_gpx(&xml).stats.elevation_gain_ft, 0);
    }

    #[test]
    fn test_order_preserved_and_elevation_per_point() {
        let xml = gpx_from_points(&[
            (37.02, -122.0, Some(10.0)),
            (37.0, -122.0, None),
            (37.01, -122.0, Some(20.0)),
        ]);
        let coords = parse_gpx(&xml).geometry.coordinates;
        assert_eq!(coords.len(), 3);
        assert_eq!(coords[0].lat, 37.02);
        assert_eq!(coords[1].lat, 37.0);
        assert_eq!(coords[1].ele, None);
        assert_eq!(coords[2].ele, Some(20.0));
    }

    #[test]
    fn test_zero_coordinate_points_skipped() {
        let xml = "<gpx><trk><trkseg>\
            <trkpt lat=\"37.0\" lon=\"-122.0\"/>\
            <trkpt lat=\"abc\" lon=\"\"/>\
            <trkpt/>\
            <trkpt lat=\"37.01\" lon=\"-122.0\"/>\
            </trkseg></trk></gpx>";
        let trail = parse_gpx(xml);
        assert_eq!(trail.geometry.coordinates.len(), 2);
        assert_eq!(trail.outcome, ParseOutcome::Parsed);
    }

    #[test]
    fn test_bad_elevation_keeps_point() {
        let xml = "<gpx><trkpt lat=\"37.0\" lon=\"-122.0\"><ele>not-a-number</ele></trkpt></gpx>";
        let trail = parse_gpx(xml);
        assert_eq!(trail.geometry.coordinates.len(), 1);
        assert_eq!(trail.geometry.coordinates[0].ele, None);
    }

    #[test]
    fn test_fallback_equivalence() {
        // Empty and garbage inputs both produce exactly the sample trail
        let sample = sample_trail();
        for input in ["", "<gpx></gpx>", "not xml at all", "<gpx><trk></trk>"] {
            let trail = parse_gpx(input);
            assert_eq!(trail.outcome, ParseOutcome::FellBackToSample);
            assert_eq!(trail.geometry, sample.geometry);
            assert_eq!(trail.stats, sample.stats);
            assert_eq!(trail.bounds, sample.bounds);
        }
    }

    #[test]
    fn test_sample_trail_deterministic() {
        let a = sample_trail();
        let b = sample_trail();
        assert_eq!(a, b);
        assert_eq!(a.geometry.coordinates.len(), 100);
        assert!(a.geometry.coordinates.iter().all(|c| c.ele.is_some()));
    }

    #[test]
    fn test_distance_non_negative_and_rounded() {
        let trail = sample_trail();
        assert!(trail.stats.distance_miles >= 0.0);
        let scaled = trail.stats.distance_miles * 10.0;
        assert!((scaled - scaled.round()).abs() < 1e-9);
    }

    #[test]
    fn test_from_geometry_recomputes_stats() {
        let parsed = parse_gpx(&gpx_from_points(&[
            (37.0, -122.0, Some(100.0)),
            (37.01, -122.0, Some(150.0)),
            (37.0, -122.01, Some(120.0)),
        ]));
        let rebuilt = ParsedTrail::from_geometry(parsed.geometry.clone(), parsed.bounds);
        assert_eq!(rebuilt.stats, parsed.stats);
        assert_eq!(rebuilt.bounds, parsed.bounds);
    }

    #[test]
    fn test_from_geometry_empty_falls_back() {
        let rebuilt = ParsedTrail::from_geometry(
            TrailGeometry {
                coordinates: Vec::new(),
            },
            TrailBounds {
                min_lng: 0.0,
                max_lng: 0.0,
                min_lat: 0.0,
                max_lat: 0.0,
            },
        );
        assert_eq!(rebuilt.outcome, ParseOutcome::FellBackToSample);
    }

    #[test]
    fn test_coord_serde_positional() {
        let with_ele = TrailCoord {
            lng: -122.0,
            lat: 37.0,
            ele: Some(12.5),
        };
        let json = serde_json::to_string(&with_ele).unwrap();
        assert_eq!(json, "[-122.0,37.0,12.5]");

        let without: TrailCoord = serde_json::from_str("[-122.0,37.0]").unwrap();
        assert_eq!(without.ele, None);

        let bad = serde_json::from_str::<TrailCoord>("[1.0]");
        assert!(bad.is_err());
    }

    #[test]
    fn test_geometry_roundtrip() {
        let trail = sample_trail();
        let json = serde_json::to_string(&trail.geometry).unwrap();
        let back: TrailGeometry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trail.geometry);
    }
}
