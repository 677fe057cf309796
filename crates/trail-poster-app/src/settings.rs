use clap::Parser;
use std::path::PathBuf;
use trail_poster_render::dem::DEFAULT_TILE_URL;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Trail Poster - render a GPX trail as a stylized, print-ready map poster
pub struct Settings {
    /// GPX file to render; session state or the sample trail is used when omitted
    #[clap(short, long, value_name = "FILE")]
    pub gpx_file: Option<PathBuf>,

    /// Output PNG path
    #[clap(short, long, default_value = "poster.png")]
    pub output: PathBuf,

    /// Print size key (12x18, 18x24, 24x36); preview resolution when omitted
    #[clap(short, long)]
    pub size: Option<String>,

    /// Poster title; derived from the GPX file name when omitted
    #[clap(long)]
    pub title: Option<String>,

    /// Hike date shown in the stats line (YYYY-MM-DD)
    #[clap(long)]
    pub date: Option<String>,

    /// Location line under the title
    #[clap(long)]
    pub location: Option<String>,

    /// Trail color as #rrggbb
    #[clap(long)]
    pub trail_color: Option<String>,

    /// TTF font for the poster text
    #[clap(long, value_name = "FILE")]
    pub font: PathBuf,

    /// Elevation tile URL template with {z}/{x}/{y} placeholders
    #[clap(long, default_value = DEFAULT_TILE_URL)]
    pub tile_url: String,

    /// Render deterministic synthetic terrain instead of fetching tiles
    #[clap(long, default_value = "false")]
    pub synthetic_terrain: bool,

    /// Directory holding persisted session state between runs
    #[clap(long, value_name = "DIR")]
    pub session_dir: Option<PathBuf>,
}
