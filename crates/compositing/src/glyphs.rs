//! Glyph metrics and coverage rasterization.
//!
//! [`GlyphSource`] is the seam between text layout and whatever actually
//! knows the font. [`FontGlyphs`] wraps a `fontdue` font; [`BlockGlyphs`]
//! is a deterministic fallback used before a font is available.

use glam::Vec2;

/// Vertical metrics of a font at a given pixel size. Both values are positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
}

impl LineMetrics {
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }

    /// Distance from the vertical middle of the line box down to the baseline.
    pub fn middle_to_baseline(&self) -> f32 {
        (self.ascent - self.descent) * 0.5
    }
}

/// Single-channel coverage bitmap of one glyph.
///
/// `origin` is the top-left corner of the bitmap in glyph space, where the
/// pen position on the baseline is (0, 0) and y points down.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<f32>,
    pub origin: Vec2,
}

impl GlyphBitmap {
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            coverage: Vec::new(),
            origin: Vec2::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Coverage at an integer texel, zero outside the bitmap.
    #[inline]
    pub fn at(&self, x: i32, y: i32) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0.0;
        }
        self.coverage[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// Bilinear sample with texel centers at integer coordinates.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (ix, iy) = (x0 as i32, y0 as i32);

        let top = self.at(ix, iy) * (1.0 - fx) + self.at(ix + 1, iy) * fx;
        let bottom = self.at(ix, iy + 1) * (1.0 - fx) + self.at(ix + 1, iy + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// Coverage of a ring around the glyph, `radius` texels wide, outside the glyph itself.
    pub fn outline(&self, radius: f32) -> GlyphBitmap {
        if self.is_empty() {
            return GlyphBitmap::empty();
        }
        let pad = radius.ceil().max(1.0) as u32;
        let width = self.width + pad * 2;
        let height = self.height + pad * 2;
        let reach = pad as i32;

        // Separable max filter: horizontal then vertical.
        let mut horizontal = vec![0.0f32; (width * height) as usize];
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let mut best = 0.0f32;
                for dx in -reach..=reach {
                    best = best.max(self.at(x + dx - reach, y - reach));
                }
                horizontal[(y as u32 * width + x as u32) as usize] = best;
            }
        }

        let mut coverage = vec![0.0f32; (width * height) as usize];
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let mut best = 0.0f32;
                for dy in -reach..=reach {
                    let sy = y + dy;
                    if sy >= 0 && sy < height as i32 {
                        best = best.max(horizontal[(sy as u32 * width + x as u32) as usize]);
                    }
                }
                let inside = self.at(x - reach, y - reach);
                coverage[(y as u32 * width + x as u32) as usize] = (best - inside).max(0.0);
            }
        }

        GlyphBitmap {
            width,
            height,
            coverage,
            origin: self.origin - Vec2::splat(pad as f32),
        }
    }
}

/// Source of glyph metrics and coverage for one font family.
pub trait GlyphSource: Send + Sync {
    /// Horizontal advance of `ch` at `px` pixels.
    fn advance(&self, ch: char, px: f32) -> f32;

    fn line_metrics(&self, px: f32) -> LineMetrics;

    fn rasterize(&self, ch: char, px: f32) -> GlyphBitmap;

    /// Width of a run of text (advances only, no kerning).
    fn measure(&self, text: &str, px: f32) -> f32 {
        text.chars().map(|ch| self.advance(ch, px)).sum()
    }
}

/// Fixed-pitch block glyphs: every character advances 0.6em and non-whitespace
/// draws a solid 0.5em x 0.7em block.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockGlyphs;

impl BlockGlyphs {
    pub const ADVANCE: f32 = 0.6;
    pub const ASCENT: f32 = 0.8;
    pub const DESCENT: f32 = 0.2;
    const BLOCK_WIDTH: f32 = 0.5;
    const BLOCK_HEIGHT: f32 = 0.7;
}

impl GlyphSource for BlockGlyphs {
    fn advance(&self, _ch: char, px: f32) -> f32 {
        px * Self::ADVANCE
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        LineMetrics {
            ascent: px * Self::ASCENT,
            descent: px * Self::DESCENT,
        }
    }

    fn rasterize(&self, ch: char, px: f32) -> GlyphBitmap {
        if ch.is_whitespace() {
            return GlyphBitmap::empty();
        }
        let width = (px * Self::BLOCK_WIDTH).round().max(1.0) as u32;
        let height = (px * Self::BLOCK_HEIGHT).round().max(1.0) as u32;
        GlyphBitmap {
            width,
            height,
            coverage: vec![1.0; (width * height) as usize],
            origin: Vec2::new(px * 0.05, -(height as f32)),
        }
    }
}

/// Glyphs from a TrueType/OpenType font via `fontdue`.
pub struct FontGlyphs {
    font: fontdue::Font,
}

impl FontGlyphs {
    pub fn new(font: fontdue::Font) -> Self {
        Self { font }
    }
}

impl GlyphSource for FontGlyphs {
    fn advance(&self, ch: char, px: f32) -> f32 {
        self.font.metrics(ch, px).advance_width
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        match self.font.horizontal_line_metrics(px) {
            Some(metrics) => LineMetrics {
                ascent: metrics.ascent,
                descent: -metrics.descent,
            },
            None => BlockGlyphs.line_metrics(px),
        }
    }

    fn rasterize(&self, ch: char, px: f32) -> GlyphBitmap {
        let (metrics, bitmap) = self.font.rasterize(ch, px);
        if metrics.width == 0 || metrics.height == 0 {
            return GlyphBitmap::empty();
        }
        GlyphBitmap {
            width: metrics.width as u32,
            height: metrics.height as u32,
            coverage: bitmap.iter().map(|&c| c as f32 / 255.0).collect(),
            origin: Vec2::new(
                metrics.xmin as f32,
                -(metrics.ymin as f32 + metrics.height as f32),
            ),
        }
    }
}
