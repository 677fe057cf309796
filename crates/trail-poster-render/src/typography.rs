//! Letter-spaced text measurement and poster text layout
//!
//! Layout is pure: it takes glyph metrics and produces positioned spans, so
//! it can be tested without a font face and rasterized by whatever implements
//! [`TextRenderer`]. All proportions are relative to the canvas width, which
//! keeps preview and print output visually identical.

use crate::Result;
use chrono::NaiveDate;
use tiny_skia::Pixmap;
use trail_poster_lib::catalog::{PosterConfig, PosterDesign, parse_hex_color};

/// Per-glyph advance widths at a given font size.
pub trait GlyphMetrics {
    fn advance(&self, ch: char, font_size: f32) -> f32;

    /// Base width of `text` without extra letter spacing.
    fn measure(&self, text: &str, font_size: f32) -> f32 {
        text.chars().map(|ch| self.advance(ch, font_size)).sum()
    }
}

/// Draws laid-out spans onto a raster canvas.
pub trait TextRenderer: GlyphMetrics {
    fn draw_span(&self, pixmap: &mut Pixmap, span: &TextSpan) -> Result<()>;
}

/// One horizontally centered line of text, ready to draw.
#[derive(Clone, Debug, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub font_size: f32,
    /// Extra advance added after every glyph except the last
    pub letter_spacing: f32,
    pub center_x: f32,
    /// Vertical center of the glyphs (middle baseline)
    pub y: f32,
    pub color: [u8; 3],
}

/// Width of `text` including letter spacing between glyphs.
///
/// The spacing contributes `(char_count - 1)` gaps, not `char_count`.
pub fn measure_spaced<M: GlyphMetrics + ?Sized>(
    metrics: &M,
    text: &str,
    font_size: f32,
    extra_spacing: f32,
) -> f32 {
    let chars = text.chars().count();
    metrics.measure(text, font_size) + extra_spacing * chars.saturating_sub(1) as f32
}

/// Greedy word wrap against `max_width`, accounting for letter spacing.
///
/// Words are packed onto a line until the next one would overflow; a word is
/// never broken mid-word, so a single overlong word still gets its own line.
pub fn wrap_spaced<M: GlyphMetrics + ?Sized>(
    metrics: &M,
    text: &str,
    font_size: f32,
    max_width: f32,
    extra_spacing: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split(' ') {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        let width = measure_spaced(metrics, &candidate, font_size, extra_spacing);
        if width > max_width && !current.is_empty() {
            lines.push(current);
            current = word.to_string();
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Render an ISO calendar date as long-form "Month D, YYYY".
///
/// Empty input yields empty output; a non-empty string that is not a
/// calendar date is passed through verbatim. Never an error.
pub fn format_long_date(date: &str) -> String {
    if date.is_empty() {
        return String::new();
    }
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) => parsed.format("%B %-d, %Y").to_string(),
        Err(_) => date.to_string(),
    }
}

/// Lay out the poster text inside the band `(band_top, band_height)`.
///
/// Produces the title block (wrapped to 75% of the canvas width), the
/// optional location line and the optional stats line, in draw order.
pub fn layout_text<M: GlyphMetrics + ?Sized>(
    metrics: &M,
    config: &PosterConfig,
    design: &PosterDesign,
    canvas_width: u32,
    band_top: f32,
    band_height: f32,
) -> Result<Vec<TextSpan>> {
    let width = canvas_width as f32;
    let center_x = width / 2.0;
    let max_text_width = width * 0.75;
    let mut spans = Vec::new();

    // Title: ~4.5% of the canvas width, tracked at 15% of the size
    let title_size = (width * 0.045).round();
    let title_spacing = title_size * 0.15;
    let title_color = parse_hex_color(design.title_color)?;
    let title_text = config.title.to_uppercase();
    let lines = wrap_spaced(metrics, &title_text, title_size, max_text_width, title_spacing);
    let line_height = title_size * 1.35;
    let block_height = lines.len() as f32 * line_height;

    let mut y = band_top + band_height * 0.25 - block_height / 2.0;
    for line in lines {
        y += line_height;
        spans.push(TextSpan {
            text: line,
            font_size: title_size,
            letter_spacing: title_spacing,
            center_x,
            y,
            color: title_color,
        });
    }

    let mut next_y = y + line_height * 0.8;

    if !config.location.is_empty() {
        let location_size = (width * 0.025).round();
        spans.push(TextSpan {
            text: config.location.to_uppercase(),
            font_size: location_size,
            letter_spacing: location_size * 0.15,
            center_x,
            y: next_y,
            color: parse_hex_color(design.location_color)?,
        });
        next_y += location_size * 2.0;
    }

    let mut items = Vec::new();
    if !config.distance.is_empty() {
        items.push(format!("{} MI", config.distance));
    }
    if !config.elevation.is_empty() {
        items.push(format!("{} FT", config.elevation));
    }
    if !config.date.is_empty() {
        items.push(format_long_date(&config.date).to_uppercase());
    }
    if !items.is_empty() {
        let stats_size = (width * 0.02).round();
        spans.push(TextSpan {
            text: items.join("  \u{b7}  "),
            font_size: stats_size,
            letter_spacing: stats_size * 0.1,
            center_x,
            y: next_y,
            color: parse_hex_color(design.stats_color)?,
        });
    }

    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every glyph advances 60% of the font size.
    struct FixedMetrics;

    impl GlyphMetrics for FixedMetrics {
        fn advance(&self, _ch: char, font_size: f32) -> f32 {
            font_size * 0.6
        }
    }

    fn config(title: &str, date: &str, location: &str, distance: &str, elevation: &str) -> PosterConfig {
        PosterConfig {
            title: title.to_string(),
            date: date.to_string(),
            location: location.to_string(),
            distance: distance.to_string(),
            elevation: elevation.to_string(),
            trail_color: "#d4a035".to_string(),
        }
    }

    #[test]
    fn test_measure_counts_gaps_not_chars() {
        let base = FixedMetrics.measure("abcd", 10.0);
        let spaced = measure_spaced(&FixedMetrics, "abcd", 10.0, 2.0);
        assert!((spaced - (base + 3.0 * 2.0)).abs() < 1e-6);
        // A single glyph gets no spacing at all
        assert!((measure_spaced(&FixedMetrics, "a", 10.0, 2.0) - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_wrap_overlong_title() {
        let design = PosterDesign::default();
        let cfg = config(
            "An Exceedingly Long Trail Name That Cannot Possibly Fit One Line",
            "",
            "",
            "",
            "",
        );
        let spans = layout_text(&FixedMetrics, &cfg, &design, 800, 640.0, 160.0).unwrap();

        let title_size = (800.0_f32 * 0.045).round();
        let title_spacing = title_size * 0.15;
        let max_width = 800.0 * 0.75;
        let title_spans: Vec<_> = spans.iter().filter(|s| s.font_size == title_size).collect();
        assert!(title_spans.len() >= 2, "expected a wrapped title");
        for span in &title_spans {
            let width = measure_spaced(&FixedMetrics, &span.text, title_size, title_spacing);
            assert!(width <= max_width, "line {:?} overflows", span.text);
        }
    }

    #[test]
    fn test_wrap_never_breaks_words() {
        let lines = wrap_spaced(&FixedMetrics, "SUPERCALIFRAGILISTIC", 40.0, 10.0, 6.0);
        assert_eq!(lines, vec!["SUPERCALIFRAGILISTIC".to_string()]);
    }

    #[test]
    fn test_wrap_packs_greedily() {
        // Each word is 3 chars * 0.6 * 10 = 18 wide; two words + space = 42
        let lines = wrap_spaced(&FixedMetrics, "abc def ghi", 10.0, 45.0, 0.0);
        assert_eq!(lines, vec!["abc def".to_string(), "ghi".to_string()]);
    }

    #[test]
    fn test_title_block_centered_in_top_quarter() {
        let design = PosterDesign::default();
        let cfg = config("One", "", "", "", "");
        let spans = layout_text(&FixedMetrics, &cfg, &design, 400, 1000.0, 400.0).unwrap();

        let title_size = (400.0_f32 * 0.045).round();
        let line_height = title_size * 1.35;
        // Single line: block centered on band_top + band_height * 0.25
        let expected = 1000.0 + 400.0 * 0.25 - line_height / 2.0 + line_height;
        assert!((spans[0].y - expected).abs() < 1e-3);
    }

    #[test]
    fn test_stats_line_joined_with_middle_dot() {
        let design = PosterDesign::default();
        let cfg = config("T", "2026-01-15", "", "7.4", "1,234");
        let spans = layout_text(&FixedMetrics, &cfg, &design, 1000, 800.0, 200.0).unwrap();
        let stats = spans.last().unwrap();
        assert_eq!(stats.text, "7.4 MI  \u{b7}  1,234 FT  \u{b7}  JANUARY 15, 2026");
        assert_eq!(stats.font_size, (1000.0_f32 * 0.02).round());
    }

    #[test]
    fn test_stats_line_partial_fields() {
        let design = PosterDesign::default();
        let cfg = config("T", "", "", "", "520");
        let spans = layout_text(&FixedMetrics, &cfg, &design, 1000, 800.0, 200.0).unwrap();
        assert_eq!(spans.last().unwrap().text, "520 FT");
    }

    #[test]
    fn test_stats_line_omitted_when_empty() {
        let design = PosterDesign::default();
        let cfg = config("T", "", "", "", "");
        let spans = layout_text(&FixedMetrics, &cfg, &design, 1000, 800.0, 200.0).unwrap();
        // Only the title remains
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn test_location_between_title_and_stats() {
        let design = PosterDesign::default();
        let cfg = config("T", "", "Sierra Nevada", "1.0", "");
        let spans = layout_text(&FixedMetrics, &cfg, &design, 1000, 800.0, 200.0).unwrap();
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].text, "SIERRA NEVADA");
        assert!(spans[1].y < spans[2].y);
        assert!(spans[0].y < spans[1].y);
    }

    #[test]
    fn test_format_long_date() {
        assert_eq!(format_long_date("2026-01-15"), "January 15, 2026");
        assert_eq!(format_long_date("2024-12-01"), "December 1, 2024");
        assert_eq!(format_long_date(""), "");
        assert_eq!(format_long_date("yesterday"), "yesterday");
    }
}
