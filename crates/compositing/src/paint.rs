//! Paint sources used when filling glyph coverage.

use crate::color::{Rgba, mix};

/// A color stop on a vertical gradient, `offset` in 0..=1 from top to bottom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Rgba,
}

impl GradientStop {
    pub const fn new(offset: f32, color: Rgba) -> Self {
        Self { offset, color }
    }
}

/// What a coverage pass is filled with.
///
/// Gradients run over the line box of each glyph (ascent to descent), so they
/// follow the glyph when it is rotated along an arc.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Rgba),
    VerticalGradient(Vec<GradientStop>),
}

impl Paint {
    /// Color at normalized line-box position `t` (0 = top, 1 = bottom).
    pub fn sample(&self, t: f32) -> Rgba {
        match self {
            Paint::Solid(color) => *color,
            Paint::VerticalGradient(stops) => sample_gradient(stops, t),
        }
    }
}

fn sample_gradient(stops: &[GradientStop], t: f32) -> Rgba {
    let Some(first) = stops.first() else {
        return [0.0; 4];
    };
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let local = if span > f32::EPSILON {
                (t - a.offset) / span
            } else {
                1.0
            };
            return mix(a.color, b.color, local);
        }
    }
    stops[stops.len() - 1].color
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, WHITE};

    #[test]
    fn test_gradient_endpoints_and_midpoint() {
        let paint = Paint::VerticalGradient(vec![
            GradientStop::new(0.0, WHITE),
            GradientStop::new(1.0, BLACK),
        ]);
        assert_eq!(paint.sample(-1.0), WHITE);
        assert_eq!(paint.sample(2.0), BLACK);
        let mid = paint.sample(0.5);
        assert!((mid[0] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_solid_ignores_position() {
        assert_eq!(Paint::Solid(WHITE).sample(0.3), WHITE);
    }
}
