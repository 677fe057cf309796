//! Trail Poster CLI
//!
//! Parses a GPX file (or restores the previous session, or falls back to the
//! sample trail), seeds the poster configuration, renders the poster at the
//! preview or a catalog print resolution and writes the PNG.

use anyhow::{Context, Result};
use clap::Parser;
use trail_poster_app::session;
use trail_poster_app::settings::Settings;
use tracing_subscriber::EnvFilter;
use trail_poster_lib::catalog::{PosterConfig, PosterDesign, SizeCatalog};
use trail_poster_lib::track::{self, ParseOutcome, ParsedTrail};
use trail_poster_render::dem::{HttpTileSource, SyntheticTileSource, TileSource};
use trail_poster_render::font::Font;
use trail_poster_render::pipeline::PosterPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    run(Settings::parse()).await
}

async fn run(settings: Settings) -> Result<()> {
    let catalog = SizeCatalog::builtin();
    let design = PosterDesign::default();
    let font = Font::from_file(&settings.font)
        .with_context(|| format!("loading font {}", settings.font.display()))?;

    let (mut config, trail) = load_trail(&settings).await?;

    if let Some(title) = &settings.title {
        config.title = title.clone();
    }
    if let Some(date) = &settings.date {
        config.date = date.clone();
    }
    if let Some(location) = &settings.location {
        config.location = location.clone();
    }
    if let Some(color) = &settings.trail_color {
        config.trail_color = color.clone();
    }

    if trail.outcome == ParseOutcome::FellBackToSample {
        tracing::warn!("no track data available, the poster will show the sample trail");
    }

    if let Some(dir) = &settings.session_dir {
        let store = session::FileStorage::new(dir.join("session.json"));
        session::save_session(&store, &config, &trail, None, None)
            .context("persisting session state")?;
    }

    let print_size = settings
        .size
        .as_deref()
        .map(|key| catalog.find(key))
        .transpose()
        .context("unknown print size (expected 12x18, 18x24 or 24x36)")?;

    let resolution = print_size.map(|s| (s.print_width, s.print_height));
    let png = if settings.synthetic_terrain {
        render(SyntheticTileSource::new(), design, font, &config, &trail, resolution).await?
    } else {
        let tiles = HttpTileSource::new(settings.tile_url.as_str());
        render(tiles, design, font, &config, &trail, resolution).await?
    };

    tokio::fs::write(&settings.output, &png)
        .await
        .with_context(|| format!("writing {}", settings.output.display()))?;
    tracing::info!(
        path = %settings.output.display(),
        bytes = png.len(),
        "poster written"
    );
    Ok(())
}

/// Resolve the trail and config: an explicit GPX file wins, then the
/// persisted session, then the sample trail.
async fn load_trail(settings: &Settings) -> Result<(PosterConfig, ParsedTrail)> {
    if let Some(path) = &settings.gpx_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let trail = track::parse_gpx(&text);
        let mut config = PosterConfig::default();
        let file_name = path.file_name().and_then(|n| n.to_str());
        config.seed(&trail.stats, file_name);

        if let Some(dir) = &settings.session_dir {
            let store = session::FileStorage::new(dir.join("session.json"));
            session::save_session(&store, &config, &trail, Some(&text), file_name)
                .context("persisting uploaded GPX")?;
        }
        return Ok((config, trail));
    }

    if let Some(dir) = &settings.session_dir {
        let store = session::FileStorage::new(dir.join("session.json"));
        let state = session::load_session(&store);
        return Ok((state.config, state.trail));
    }

    let trail = track::sample_trail();
    let mut config = PosterConfig::default();
    config.seed(&trail.stats, None);
    Ok((config, trail))
}

async fn render<S: TileSource>(
    tiles: S,
    design: PosterDesign,
    font: Font,
    config: &PosterConfig,
    trail: &ParsedTrail,
    print_size: Option<(u32, u32)>,
) -> Result<Vec<u8>> {
    let pipeline = PosterPipeline::new(design, tiles, font);
    let png = match print_size {
        Some((width, height)) => pipeline.render_at(config, trail, width, height).await?,
        None => pipeline.render_preview(config, trail).await?,
    };
    Ok(png)
}
