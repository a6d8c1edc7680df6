//! Straight and arc text layout.
//!
//! Layout produces one transform per glyph mapping glyph space (pen on the
//! baseline at the origin, y down) onto the canvas.

use std::f32::consts::FRAC_PI_2;

use glam::{Affine2, Vec2};
use serde::{Deserialize, Serialize};

use crate::constants::LINE_HEIGHT;
use crate::glyphs::{GlyphSource, LineMetrics};

/// How text is arranged on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TextLayout {
    #[default]
    Straight,
    /// Characters follow the top of a circle of this radius (pixels).
    Arc { radius: f32 },
}

impl TextLayout {
    /// Arc layout when a usable radius is given, otherwise straight.
    pub fn arc(radius: Option<f32>) -> Self {
        match radius {
            Some(radius) => Self::Arc { radius }.effective(),
            None => Self::Straight,
        }
    }

    /// Arc with a non-positive or non-finite radius degrades to straight.
    pub fn effective(self) -> Self {
        match self {
            Self::Arc { radius } if radius.is_finite() && radius > 0.0 => self,
            _ => Self::Straight,
        }
    }
}

/// A glyph with its placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub ch: char,
    pub to_canvas: Affine2,
}

/// Laid-out text ready for rasterization.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub glyphs: Vec<PlacedGlyph>,
    pub font_size: f32,
    pub metrics: LineMetrics,
}

impl TextBlock {
    /// Glyph-space (top, bottom) of the line box; gradients span this range.
    pub fn line_box(&self) -> (f32, f32) {
        (-self.metrics.ascent, self.metrics.descent)
    }
}

/// Lay out `lines` centered on a canvas of `canvas` (width, height) pixels.
pub fn layout_text(
    lines: &[&str],
    glyphs: &dyn GlyphSource,
    font_size: f32,
    canvas: Vec2,
    layout: TextLayout,
) -> TextBlock {
    let metrics = glyphs.line_metrics(font_size);
    let placed = match layout.effective() {
        TextLayout::Straight => layout_straight(lines, glyphs, font_size, metrics, canvas),
        TextLayout::Arc { radius } => {
            let joined = lines.join(" ");
            layout_arc(&joined, glyphs, font_size, metrics, canvas, radius)
        }
    };
    TextBlock {
        glyphs: placed,
        font_size,
        metrics,
    }
}

fn layout_straight(
    lines: &[&str],
    glyphs: &dyn GlyphSource,
    font_size: f32,
    metrics: LineMetrics,
    canvas: Vec2,
) -> Vec<PlacedGlyph> {
    let line_height = font_size * LINE_HEIGHT;
    let total_height = line_height * lines.len() as f32;
    let first_center = canvas.y * 0.5 - total_height * 0.5 + line_height * 0.5;

    let mut placed = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let width = glyphs.measure(line, font_size);
        let baseline = first_center + line_height * index as f32 + metrics.middle_to_baseline();
        let mut pen_x = canvas.x * 0.5 - width * 0.5;
        for ch in line.chars() {
            placed.push(PlacedGlyph {
                ch,
                to_canvas: Affine2::from_translation(Vec2::new(pen_x, baseline)),
            });
            pen_x += glyphs.advance(ch, font_size);
        }
    }
    placed
}

/// Characters walk clockwise over the top of a circle centered below the
/// canvas middle, each centered on its own arc position and rotated tangent.
fn layout_arc(
    text: &str,
    glyphs: &dyn GlyphSource,
    font_size: f32,
    metrics: LineMetrics,
    canvas: Vec2,
    radius: f32,
) -> Vec<PlacedGlyph> {
    let total_width = glyphs.measure(text, font_size);
    let span = total_width / radius;
    let center = Vec2::new(canvas.x * 0.5, canvas.y * 0.5 + radius);

    let mut angle = FRAC_PI_2 + span * 0.5;
    let mut placed = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let advance = glyphs.advance(ch, font_size);
        let half = advance * 0.5 / radius;
        angle -= half;

        let position = center + Vec2::new(radius * angle.cos(), -radius * angle.sin());
        let to_canvas = Affine2::from_translation(position)
            * Affine2::from_angle(FRAC_PI_2 - angle)
            * Affine2::from_translation(Vec2::new(-advance * 0.5, metrics.middle_to_baseline()));
        placed.push(PlacedGlyph { ch, to_canvas });

        angle -= half;
    }
    placed
}
