//! Font-size tiers shared by the texture compositor and the drawing surface.

use tracing::debug;

use crate::constants::{MAX_TEXT_WIDTH_RATIO, MIN_FONT_SIZE, REFERENCE_CANVAS_WIDTH};
use crate::glyphs::GlyphSource;

/// Reference font sizes at a 2048px canvas.
/// Rows: 1, 2, 3+ lines. Columns: longest line <=10, 11-15, >15 characters.
pub const FONT_SIZE_TIERS: [[f32; 3]; 3] = [
    [380.0, 300.0, 220.0],
    [300.0, 240.0, 180.0],
    [240.0, 190.0, 150.0],
];

fn line_tier(line_count: usize) -> usize {
    match line_count {
        0 | 1 => 0,
        2 => 1,
        _ => 2,
    }
}

fn length_tier(longest: usize) -> usize {
    match longest {
        0..=10 => 0,
        11..=15 => 1,
        _ => 2,
    }
}

/// Tier size for the given lines at the reference canvas width.
pub fn tier_font_size(lines: &[&str]) -> f32 {
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    FONT_SIZE_TIERS[line_tier(lines.len())][length_tier(longest)]
}

/// Tier size scaled to `canvas_width` and a surface-specific `ratio`.
pub fn base_font_size(lines: &[&str], canvas_width: f32, ratio: f32) -> f32 {
    tier_font_size(lines) * (canvas_width / REFERENCE_CANVAS_WIDTH) * ratio
}

/// Width of the widest line at `size`.
pub fn widest_line(lines: &[&str], glyphs: &dyn GlyphSource, size: f32) -> f32 {
    lines
        .iter()
        .map(|line| glyphs.measure(line, size))
        .fold(0.0, f32::max)
}

/// Shrink `size` until the widest line fits in 85% of the canvas width.
pub fn fit_font_size(lines: &[&str], glyphs: &dyn GlyphSource, canvas_width: f32, size: f32) -> f32 {
    let limit = canvas_width * MAX_TEXT_WIDTH_RATIO;
    let mut size = size.max(MIN_FONT_SIZE);
    loop {
        let width = widest_line(lines, glyphs, size);
        if width <= limit || size <= MIN_FONT_SIZE {
            return size;
        }
        let scaled = (size * limit / width).floor();
        let next = if scaled < size { scaled } else { size - 1.0 };
        debug!("Text width {width:.0}px exceeds {limit:.0}px, font {size} -> {next}");
        size = next.max(MIN_FONT_SIZE);
    }
}

/// Tier size, then shrink-to-fit.
pub fn resolve_font_size(
    lines: &[&str],
    glyphs: &dyn GlyphSource,
    canvas_width: f32,
    ratio: f32,
) -> f32 {
    let base = base_font_size(lines, canvas_width, ratio);
    fit_font_size(lines, glyphs, canvas_width, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyphs::BlockGlyphs;

    #[test]
    fn test_single_short_line_tier() {
        assert_eq!(tier_font_size(&["MEGA"]), 380.0);
        assert_eq!(tier_font_size(&["ABCDEFGHIJKL"]), 300.0);
        assert_eq!(tier_font_size(&["ABCDEFGHIJKLMNOPQ"]), 220.0);
    }

    #[test]
    fn test_multi_line_tiers() {
        assert_eq!(tier_font_size(&["A", "B"]), 300.0);
        assert_eq!(tier_font_size(&["A", "B", "C", "D"]), 240.0);
        assert_eq!(tier_font_size(&["A", "ABCDEFGHIJKLMNOP", "C"]), 150.0);
    }

    #[test]
    fn test_drawing_surface_ratio_scales_tier() {
        let size = base_font_size(&["MEGA"], 2048.0, 0.7);
        assert!((size - 266.0).abs() < 1e-3);
        let half = base_font_size(&["MEGA"], 1024.0, 1.0);
        assert!((half - 190.0).abs() < 1e-3);
    }

    #[test]
    fn test_sizes_come_from_tiers_and_fit() {
        let glyphs = BlockGlyphs;
        let canvas = 2048.0;
        let all_tiers: Vec<f32> = FONT_SIZE_TIERS.iter().flatten().copied().collect();
        for line_count in 1..=3 {
            for chars in 1..=20 {
                let line = "W".repeat(chars);
                let lines: Vec<&str> = std::iter::repeat_n(line.as_str(), line_count).collect();
                let tier = tier_font_size(&lines);
                assert!(all_tiers.contains(&tier));

                let size = resolve_font_size(&lines, &glyphs, canvas, 1.0);
                assert!(size <= tier);
                assert!(widest_line(&lines, &glyphs, size) <= canvas * MAX_TEXT_WIDTH_RATIO);
                if widest_line(&lines, &glyphs, tier) <= canvas * MAX_TEXT_WIDTH_RATIO {
                    assert_eq!(size, tier);
                }
            }
        }
    }

    #[test]
    fn test_shrink_only_when_too_wide() {
        let glyphs = BlockGlyphs;
        // 20 chars * 0.6 * 220 = 2640px > 1740.8px
        let lines = ["ABCDEFGHIJKLMNOPQRST"];
        let size = resolve_font_size(&lines, &glyphs, 2048.0, 1.0);
        assert_eq!(size, 145.0);
    }
}
