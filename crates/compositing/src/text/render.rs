//! Rasterizes laid-out text through a list of style passes.

use std::collections::HashMap;

use glam::Affine2;

use super::{PassShape, StylePass, TextBlock};
use crate::glyphs::{GlyphBitmap, GlyphSource};
use crate::surface::CpuSurface;

/// Outline rings never get thinner than this, in pixels.
const MIN_OUTLINE_RADIUS: f32 = 1.0;

/// Coverage bitmaps for every distinct character of a block at its font size.
#[derive(Debug, Clone, Default)]
pub struct GlyphAtlas {
    fills: HashMap<char, GlyphBitmap>,
}

impl GlyphAtlas {
    pub fn build(glyphs: &dyn GlyphSource, block: &TextBlock) -> Self {
        let mut fills = HashMap::new();
        for placed in &block.glyphs {
            fills
                .entry(placed.ch)
                .or_insert_with(|| glyphs.rasterize(placed.ch, block.font_size));
        }
        Self { fills }
    }

    pub fn get(&self, ch: char) -> Option<&GlyphBitmap> {
        self.fills.get(&ch)
    }

    fn outlines(&self, radius: f32) -> HashMap<char, GlyphBitmap> {
        self.fills
            .iter()
            .map(|(&ch, bitmap)| (ch, bitmap.outline(radius)))
            .collect()
    }
}

/// Draw `block` onto `surface`, one pass over every glyph at a time.
pub fn draw_styled_text(
    surface: &mut CpuSurface,
    glyphs: &dyn GlyphSource,
    block: &TextBlock,
    passes: &[StylePass],
) {
    let atlas = GlyphAtlas::build(glyphs, block);
    draw_passes(surface, &atlas, block, passes, Affine2::IDENTITY);
}

/// Draw pre-rasterized glyphs, with `placement` mapping the block's canvas
/// onto `surface`. Outline rings are derived from the fill coverage.
pub fn draw_passes(
    surface: &mut CpuSurface,
    atlas: &GlyphAtlas,
    block: &TextBlock,
    passes: &[StylePass],
    placement: Affine2,
) {
    let size = block.font_size;
    let line_box = block.line_box();

    for pass in passes {
        let outlines = match pass.shape {
            PassShape::Fill => None,
            PassShape::Outline { width } => {
                Some(atlas.outlines((width * size * 0.5).max(MIN_OUTLINE_RADIUS)))
            }
        };

        let shift = placement * Affine2::from_translation(pass.offset * size);
        for placed in &block.glyphs {
            let coverage = match &outlines {
                Some(rings) => rings.get(&placed.ch),
                None => atlas.get(placed.ch),
            };
            let Some(coverage) = coverage else {
                continue;
            };
            surface.fill_coverage(
                coverage,
                shift * placed.to_canvas,
                &pass.paint,
                line_box,
                pass.opacity,
            );
        }
    }
}
