//! Trail Poster Core - Track Data and Poster Configuration
//!
//! This library turns raw GPX track text into the normalized trail data the
//! poster renderer consumes, and holds the immutable configuration values
//! (design constants, size catalog, color palette) shared by the rest of the
//! workspace.
//!
//! # Architecture
//!
//! - **[`track`]**: GPX track-point extraction, derived statistics, bounding
//!   box and the deterministic synthetic fallback trail
//! - **[`geodesy`]**: pure distance/projection math over point sequences
//! - **[`catalog`]**: poster configuration, design constants and the static
//!   print-size catalog
//!
//! Parsing never fails: input that yields no usable track points degrades to
//! the synthetic trail, and [`track::ParseOutcome`] tells callers which one
//! they got.

pub mod catalog;
pub mod geodesy;
pub mod track;

pub use catalog::{PosterConfig, PosterDesign, PosterSizeOption, SizeCatalog, TrailColor};
pub use track::{ParseOutcome, ParsedTrail, TrailBounds, TrailGeometry, TrailStats};

/// Error types for the core data crate
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("invalid hex color: {0:?}")]
    InvalidColor(String),

    #[error("unknown poster size: {0:?}")]
    UnknownSize(String),
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that the main entry points are accessible
        let _: fn(&str) -> ParsedTrail = track::parse_gpx;
        let _: fn() -> ParsedTrail = track::sample_trail;
        let _: fn() -> SizeCatalog = SizeCatalog::builtin;
    }
}
