//! Layered style recipes.
//!
//! Every style is a back-to-front list of passes over the same glyph
//! coverage, using only offsets, paints and opacity so any rasterizer that
//! can fill coverage can reproduce it. This is the only definition of the
//! recipes; full-surface text and decal text both draw from it.

use capforge_design::TextRenderStyle;
use glam::Vec2;

use crate::color::{BLACK, Rgba, WHITE, is_near_white, mix, rgb8, with_alpha};
use crate::constants::FLAT_STROKE_RATIO;
use crate::paint::{GradientStop, Paint};

/// Which coverage a pass fills.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PassShape {
    Fill,
    /// Ring outside the glyph, width as a fraction of font size
    Outline { width: f32 },
}

/// One compositing pass. `offset` is a fraction of font size.
#[derive(Debug, Clone, PartialEq)]
pub struct StylePass {
    pub offset: Vec2,
    pub paint: Paint,
    pub opacity: f32,
    pub shape: PassShape,
}

impl StylePass {
    fn fill(dx: f32, dy: f32, paint: Paint, opacity: f32) -> Self {
        Self {
            offset: Vec2::new(dx, dy),
            paint,
            opacity,
            shape: PassShape::Fill,
        }
    }

    fn outline(width: f32, color: Rgba) -> Self {
        Self {
            offset: Vec2::ZERO,
            paint: Paint::Solid(color),
            opacity: 1.0,
            shape: PassShape::Outline { width },
        }
    }
}

pub const GOLD_GRADIENT: [GradientStop; 7] = [
    GradientStop::new(0.00, rgb8(0xFF, 0xF4, 0xB0)),
    GradientStop::new(0.15, rgb8(0xFF, 0xE0, 0x66)),
    GradientStop::new(0.32, rgb8(0xF5, 0xC5, 0x42)),
    GradientStop::new(0.50, rgb8(0xD4, 0xA0, 0x17)),
    GradientStop::new(0.68, rgb8(0xB8, 0x86, 0x0B)),
    GradientStop::new(0.85, rgb8(0xDA, 0xA5, 0x20)),
    GradientStop::new(1.00, rgb8(0x8B, 0x69, 0x14)),
];

const GOLD_SHINE: [GradientStop; 3] = [
    GradientStop::new(0.0, [1.0, 1.0, 1.0, 0.35]),
    GradientStop::new(0.5, [1.0, 1.0, 1.0, 0.0]),
    GradientStop::new(1.0, [1.0, 1.0, 1.0, 0.0]),
];

const EMBROIDERY_SHADOWS: [(f32, f32, f32); 4] = [
    (0.006, 0.008, 0.45),
    (0.010, 0.014, 0.30),
    (0.014, 0.020, 0.18),
    (0.018, 0.026, 0.10),
];

const GOLD_EMBOSS_ALPHAS: [f32; 5] = [0.40, 0.32, 0.24, 0.16, 0.08];
const GOLD_EMBOSS_STEP: f32 = 0.004;
const GOLD_SIDE_EMBOSS: [(f32, f32); 2] = [(-0.006, 0.006), (0.006, 0.006)];
const GOLD_SIDE_ALPHA: f32 = 0.25;
const GOLD_THREAD_STEP: f32 = 0.003;
const GOLD_THREAD_ALPHA: f32 = 0.06;
const GOLD_FILL_ALPHAS: [f32; 2] = [1.0, 0.6];
const GOLD_OVERLAY_ALPHA: f32 = 0.15;
const GOLD_HIGHLIGHT: (f32, f32) = (-0.004, 0.25);
const GOLD_OUTLINE_WIDTH: f32 = 0.012;

const PUFF_SHADOW_ALPHAS: [f32; 6] = [0.30, 0.25, 0.20, 0.15, 0.10, 0.05];
const PUFF_SHADOW_STEP: f32 = 0.008;
const PUFF_DEPTH: [(f32, Rgba); 3] = [
    (0.006, rgb8(0x55, 0x55, 0x55)),
    (0.004, rgb8(0x77, 0x77, 0x77)),
    (0.002, rgb8(0x99, 0x99, 0x99)),
];
const PUFF_DEPTH_ALPHA: f32 = 0.6;
const PUFF_HIGHLIGHT: (f32, f32) = (-0.003, 0.35);
const PUFF_HIGHLIGHT_LIGHTEN: f32 = 0.4;

/// Stroke color that contrasts with the fill.
pub fn contrast_stroke(fill: Rgba) -> Rgba {
    if is_near_white(fill) {
        [0.0, 0.0, 0.0, 0.45]
    } else {
        [1.0, 1.0, 1.0, 0.35]
    }
}

/// Passes for `style`, back to front.
pub fn style_passes(style: TextRenderStyle, color: Rgba) -> Vec<StylePass> {
    match style {
        TextRenderStyle::Flat => flat_passes(color),
        TextRenderStyle::Embroidery => embroidery_passes(color),
        TextRenderStyle::GoldEmbroidery => gold_embroidery_passes(),
        TextRenderStyle::Puff3d => puff_passes(color),
    }
}

fn flat_passes(color: Rgba) -> Vec<StylePass> {
    vec![
        StylePass::fill(0.0, 0.0, Paint::Solid(color), 1.0),
        StylePass::outline(FLAT_STROKE_RATIO, contrast_stroke(color)),
    ]
}

fn embroidery_passes(color: Rgba) -> Vec<StylePass> {
    let mut passes: Vec<StylePass> = EMBROIDERY_SHADOWS
        .iter()
        .map(|&(dx, dy, alpha)| StylePass::fill(dx, dy, Paint::Solid(BLACK), alpha))
        .collect();
    passes.push(StylePass::fill(0.0, 0.0, Paint::Solid(color), 1.0));
    passes
}

fn gold_embroidery_passes() -> Vec<StylePass> {
    let gradient = || Paint::VerticalGradient(GOLD_GRADIENT.to_vec());
    let mut passes = Vec::new();

    for (k, &alpha) in GOLD_EMBOSS_ALPHAS.iter().enumerate() {
        let dy = GOLD_EMBOSS_STEP * (k + 1) as f32;
        passes.push(StylePass::fill(0.0, dy, Paint::Solid(BLACK), alpha));
    }

    let side_color = rgb8(0x5C, 0x40, 0x00);
    for &(dx, dy) in &GOLD_SIDE_EMBOSS {
        passes.push(StylePass::fill(dx, dy, Paint::Solid(side_color), GOLD_SIDE_ALPHA));
    }

    for i in -1i32..=1 {
        for j in -1i32..=1 {
            if i == 0 && j == 0 {
                continue;
            }
            passes.push(StylePass::fill(
                i as f32 * GOLD_THREAD_STEP,
                j as f32 * GOLD_THREAD_STEP,
                gradient(),
                GOLD_THREAD_ALPHA,
            ));
        }
    }

    for &alpha in &GOLD_FILL_ALPHAS {
        passes.push(StylePass::fill(0.0, 0.0, gradient(), alpha));
    }

    passes.push(StylePass::fill(
        0.0,
        0.0,
        Paint::Solid(rgb8(0xFF, 0xD7, 0x00)),
        GOLD_OVERLAY_ALPHA,
    ));
    passes.push(StylePass::fill(
        0.0,
        GOLD_HIGHLIGHT.0,
        Paint::Solid(WHITE),
        GOLD_HIGHLIGHT.1,
    ));
    passes.push(StylePass::fill(
        0.0,
        0.0,
        Paint::VerticalGradient(GOLD_SHINE.to_vec()),
        1.0,
    ));
    passes.push(StylePass::outline(GOLD_OUTLINE_WIDTH, rgb8(0x7A, 0x5C, 0x00)));
    passes
}

fn puff_passes(color: Rgba) -> Vec<StylePass> {
    let mut passes = Vec::new();
    for (k, &alpha) in PUFF_SHADOW_ALPHAS.iter().enumerate() {
        let dy = PUFF_SHADOW_STEP * (k + 1) as f32;
        passes.push(StylePass::fill(0.0, dy, Paint::Solid(BLACK), alpha));
    }
    for &(dy, gray) in &PUFF_DEPTH {
        passes.push(StylePass::fill(0.0, dy, Paint::Solid(gray), PUFF_DEPTH_ALPHA));
    }
    passes.push(StylePass::fill(0.0, 0.0, Paint::Solid(color), 1.0));

    let highlight = with_alpha(mix(color, WHITE, PUFF_HIGHLIGHT_LIGHTEN), color[3]);
    passes.push(StylePass::fill(
        0.0,
        PUFF_HIGHLIGHT.0,
        Paint::Solid(highlight),
        PUFF_HIGHLIGHT.1,
    ));
    passes
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = [0.8, 0.0, 0.0, 1.0];

    fn fills(passes: &[StylePass]) -> usize {
        passes.iter().filter(|p| p.shape == PassShape::Fill).count()
    }

    #[test]
    fn test_flat_contrast_stroke() {
        let passes = style_passes(TextRenderStyle::Flat, WHITE);
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[1].paint, Paint::Solid([0.0, 0.0, 0.0, 0.45]));

        let passes = style_passes(TextRenderStyle::Flat, RED);
        assert_eq!(passes[1].paint, Paint::Solid([1.0, 1.0, 1.0, 0.35]));
    }

    #[test]
    fn test_embroidery_shadows_fade_under_fill() {
        let passes = style_passes(TextRenderStyle::Embroidery, RED);
        assert_eq!(passes.len(), 5);
        let alphas: Vec<f32> = passes[..4].iter().map(|p| p.opacity).collect();
        assert!(alphas.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(passes[4].paint, Paint::Solid(RED));
        assert_eq!(passes[4].offset, Vec2::ZERO);
    }

    #[test]
    fn test_gold_recipe_structure() {
        let passes = style_passes(TextRenderStyle::GoldEmbroidery, RED);
        // 5 emboss + 2 side + 8 thread + 2 fills + overlay + highlight + shine + outline
        assert_eq!(passes.len(), 21);
        assert_eq!(fills(&passes), 20);
        assert!(matches!(
            passes.last().map(|p| p.shape),
            Some(PassShape::Outline { .. })
        ));
        // Thread grid skips the center offset
        let thread = &passes[7..15];
        assert!(thread.iter().all(|p| p.offset != Vec2::ZERO));
        assert!(thread.iter().all(|p| (p.opacity - GOLD_THREAD_ALPHA).abs() < 1e-6));
        // Gold ignores the requested color
        assert!(
            passes
                .iter()
                .all(|p| p.paint != Paint::Solid(RED))
        );
        match &passes[15].paint {
            Paint::VerticalGradient(stops) => assert_eq!(stops.len(), 7),
            other => panic!("expected gradient, got {other:?}"),
        }
    }

    #[test]
    fn test_puff_recipe_structure() {
        let passes = style_passes(TextRenderStyle::Puff3d, RED);
        assert_eq!(passes.len(), 11);
        // Shadows step further down each pass
        let offsets: Vec<f32> = passes[..6].iter().map(|p| p.offset.y).collect();
        assert!(offsets.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(passes[9].paint, Paint::Solid(RED));
        // Highlight sits above the fill
        assert!(passes[10].offset.y < 0.0);
    }
}
