//! Trail Poster Renderer - From Trail Data to Print-Ready Pixels
//!
//! This crate produces the finished poster raster: a terrain map with the
//! trail drawn over it, composed with a letter-spaced typography layer and
//! encoded as PNG at arbitrary output resolutions.
//!
//! # Architecture
//!
//! - **[`typography`]**: line-wrapped, letter-spaced text layout
//! - **[`font`]**: TTF glyph metrics and outline rasterization
//! - **[`dem`]**: elevation tile sources (HTTP terrain-RGB or synthetic)
//! - **[`viewport`]**: deterministic fit-bounds framing in Web Mercator
//! - **[`relief`]**: elevation grid, hillshade passes and contour lines
//! - **[`map`]**: the layered map raster (terrain + trail strokes)
//! - **[`compose`]**: print layout arithmetic and final compositing
//! - **[`pipeline`]**: the orchestrator tying all of the above together
//!
//! Rendering is cooperative async: the caller is suspended while tiles are
//! fetched, with a hard timeout guarding the whole render. All render-scoped
//! buffers are owned by the render future and dropped on every exit path.

pub mod compose;
pub mod dem;
pub mod font;
pub mod map;
pub mod pipeline;
pub mod relief;
pub mod typography;
pub mod viewport;

pub use compose::{MAX_MAP_RENDER_DIM, PosterLayout};
pub use dem::{DemTile, HttpTileSource, SyntheticTileSource, TileSource};
pub use font::Font;
pub use pipeline::PosterPipeline;
pub use typography::{GlyphMetrics, TextRenderer, TextSpan};
pub use viewport::Viewport;

/// Error types for the rendering crate
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("map render timed out after {0} seconds")]
    Timeout(u64),

    #[error("map render failed: {0}")]
    Render(String),

    #[error("font error: {0}")]
    Font(String),

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error(transparent)]
    Data(#[from] trail_poster_lib::DataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
