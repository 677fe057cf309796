//! The poster pipeline: configuration + trail in, PNG bytes out
//!
//! Ties the parser's output through layout, map rendering and compositing.
//! One map render is in flight per invocation; the whole render is guarded
//! by a timeout, and every render-scoped buffer is owned by the future, so
//! success, failure and timeout all release resources the same way.

use crate::compose::{self, PosterLayout};
use crate::dem::TileSource;
use crate::map::render_map;
use crate::typography::TextRenderer;
use crate::{RenderError, Result};
use std::time::Duration;
use trail_poster_lib::catalog::{PosterConfig, PosterDesign, PosterSizeOption};
use trail_poster_lib::track::{ParseOutcome, ParsedTrail};

/// Fixed test/preview resolution (the 18" x 24" print raster).
pub const PREVIEW_WIDTH: u32 = 3600;
pub const PREVIEW_HEIGHT: u32 = 4800;

/// Bound on a single map render reaching its stable state.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Renders finished posters at preview or print resolution.
///
/// Idempotent: identical inputs produce pixel-identical output, since the
/// tile source and every layer below it are deterministic.
pub struct PosterPipeline<S, T> {
    design: PosterDesign,
    tiles: S,
    text: T,
    timeout: Duration,
}

impl<S: TileSource, T: TextRenderer> PosterPipeline<S, T> {
    pub fn new(design: PosterDesign, tiles: S, text: T) -> Self {
        Self {
            design,
            tiles,
            text,
            timeout: RENDER_TIMEOUT,
        }
    }

    /// Override the render timeout (mainly for tests).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Render at the fixed preview resolution.
    pub async fn render_preview(&self, config: &PosterConfig, trail: &ParsedTrail) -> Result<Vec<u8>> {
        self.render_at(config, trail, PREVIEW_WIDTH, PREVIEW_HEIGHT).await
    }

    /// Render at a catalog size's print resolution.
    pub async fn render_print(
        &self,
        config: &PosterConfig,
        trail: &ParsedTrail,
        size: &PosterSizeOption,
    ) -> Result<Vec<u8>> {
        self.render_at(config, trail, size.print_width, size.print_height).await
    }

    /// Render a finished PNG at an arbitrary print resolution.
    pub async fn render_at(
        &self,
        config: &PosterConfig,
        trail: &ParsedTrail,
        print_width: u32,
        print_height: u32,
    ) -> Result<Vec<u8>> {
        if trail.outcome == ParseOutcome::FellBackToSample {
            tracing::info!("rendering the sample trail, not uploaded data");
        }

        let layout = PosterLayout::for_print_size(print_width, print_height);
        let trail_color = config.trail_color_rgb()?;
        tracing::info!(
            print_width,
            print_height,
            render_width = layout.render_map_width,
            render_height = layout.render_map_height,
            "rendering poster"
        );

        let map = tokio::time::timeout(
            self.timeout,
            render_map(
                &self.tiles,
                &self.design,
                &trail.geometry,
                &trail.bounds,
                trail_color,
                layout.render_map_width,
                layout.render_map_height,
            ),
        )
        .await
        .map_err(|_| RenderError::Timeout(self.timeout.as_secs()))??;

        let canvas = compose::compose(&layout, &map, config, &self.design, &self.text)?;
        compose::encode_png(&canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dem::{DemTile, SyntheticTileSource};
    use crate::typography::{GlyphMetrics, TextSpan};
    use tiny_skia::Pixmap;
    use trail_poster_lib::track::sample_trail;

    struct StubText;

    impl GlyphMetrics for StubText {
        fn advance(&self, _ch: char, font_size: f32) -> f32 {
            font_size * 0.6
        }
    }

    impl TextRenderer for StubText {
        fn draw_span(&self, _pixmap: &mut Pixmap, _span: &TextSpan) -> Result<()> {
            Ok(())
        }
    }

    /// Never produces a tile within any reasonable deadline.
    struct StallingTiles;

    impl TileSource for StallingTiles {
        async fn fetch(&self, _x: u32, _y: u32, _z: u8) -> Result<DemTile> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(RenderError::Render("unreachable".to_string()))
        }
    }

    fn pipeline() -> PosterPipeline<SyntheticTileSource, StubText> {
        PosterPipeline::new(PosterDesign::default(), SyntheticTileSource::new(), StubText)
    }

    #[tokio::test]
    async fn test_render_produces_exact_requested_dimensions() {
        let trail = sample_trail();
        let png = pipeline()
            .render_at(&PosterConfig::default(), &trail, 160, 240)
            .await
            .unwrap();
        let decoded = Pixmap::decode_png(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (160, 240));
    }

    #[tokio::test]
    async fn test_render_is_idempotent() {
        let trail = sample_trail();
        let config = PosterConfig::default();
        let p = pipeline();
        let a = p.render_at(&config, &trail, 120, 180).await.unwrap();
        let b = p.render_at(&config, &trail, 120, 180).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_invalid_trail_color_is_a_data_error() {
        let trail = sample_trail();
        let mut config = PosterConfig::default();
        config.trail_color = "tartan".to_string();
        let result = pipeline().render_at(&config, &trail, 120, 180).await;
        assert!(matches!(result, Err(RenderError::Data(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_renderer_times_out() {
        let trail = sample_trail();
        let p = PosterPipeline::new(PosterDesign::default(), StallingTiles, StubText)
            .with_timeout(Duration::from_millis(50));
        let result = p.render_at(&PosterConfig::default(), &trail, 120, 180).await;
        assert!(matches!(result, Err(RenderError::Timeout(_))));
    }

    #[test]
    fn test_preview_resolution_is_the_18x24_raster() {
        assert_eq!((PREVIEW_WIDTH, PREVIEW_HEIGHT), (3600, 4800));
    }
}
