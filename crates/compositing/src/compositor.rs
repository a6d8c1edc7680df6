//! Procedural text textures.
//!
//! [`TextureCompositor`] turns a [`TextRequest`] into a [`RasterTexture`]:
//! pick a font size from the shared tiers, lay the lines out straight or on
//! an arc, then draw the style recipe pass by pass onto a transparent surface.

use capforge_design::TextRenderStyle;
use glam::Vec2;
use tracing::debug;

use crate::color::Rgba;
use crate::constants::{DEFAULT_TEXT_CANVAS, MAX_ANISOTROPY};
use crate::fonts::FontRegistry;
use crate::glyphs::GlyphSource;
use crate::surface::CpuSurface;
use crate::text::{
    TextBlock, TextLayout, draw_styled_text, layout_text, resolve_font_size, style_passes,
};
use crate::texture::{RasterTexture, TextureUsage, clamp_anisotropy};

/// Everything needed to render one piece of styled text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub lines: Vec<String>,
    pub color: Rgba,
    pub font_family: String,
    pub style: TextRenderStyle,
    pub layout: TextLayout,
    pub usage: TextureUsage,
}

impl TextRequest {
    pub fn new(lines: &[&str], color: Rgba, font_family: &str, style: TextRenderStyle) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            color,
            font_family: font_family.to_string(),
            style,
            layout: TextLayout::Straight,
            usage: TextureUsage::FullSurface,
        }
    }

    /// Arc layout; a missing or non-positive radius keeps the text straight.
    pub fn with_arc(mut self, radius: Option<f32>) -> Self {
        self.layout = TextLayout::arc(radius);
        self
    }

    pub fn with_usage(mut self, usage: TextureUsage) -> Self {
        self.usage = usage;
        self
    }

    fn line_refs(&self) -> Vec<&str> {
        self.lines.iter().map(String::as_str).collect()
    }
}

/// Renders styled text onto fixed-size offscreen canvases.
#[derive(Debug, Clone, Copy)]
pub struct TextureCompositor {
    pub width: u32,
    pub height: u32,
    anisotropy: u8,
}

impl Default for TextureCompositor {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_CANVAS.0, DEFAULT_TEXT_CANVAS.1)
    }
}

impl TextureCompositor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            anisotropy: MAX_ANISOTROPY,
        }
    }

    /// Use the device-reported anisotropy, clamped to the supported cap.
    pub fn with_device_anisotropy(mut self, device_max: u8) -> Self {
        self.anisotropy = clamp_anisotropy(device_max);
        self
    }

    pub fn anisotropy(&self) -> u8 {
        self.anisotropy
    }

    /// Font size this compositor would use for `lines`.
    pub fn font_size(&self, lines: &[&str], glyphs: &dyn GlyphSource) -> f32 {
        resolve_font_size(lines, glyphs, self.width as f32, 1.0)
    }

    /// Render `request` into a fresh texture.
    pub fn render_text(&self, fonts: &FontRegistry, request: &TextRequest) -> RasterTexture {
        let surface = self.render_surface(fonts, request);
        RasterTexture::new(surface, request.usage, self.anisotropy)
    }

    /// Re-render into an existing texture, flagging it for upload.
    pub fn update_text(
        &self,
        texture: &mut RasterTexture,
        fonts: &FontRegistry,
        request: &TextRequest,
    ) {
        texture.flip_y = request.usage.flip_y();
        texture.replace_surface(self.render_surface(fonts, request));
    }

    fn render_surface(&self, fonts: &FontRegistry, request: &TextRequest) -> CpuSurface {
        let mut surface = CpuSurface::new(self.width, self.height);
        let lines = request.line_refs();
        if lines.iter().all(|l| l.trim().is_empty()) {
            return surface;
        }
        let glyphs = fonts.glyphs(&request.font_family);
        let size = self.font_size(&lines, glyphs);
        debug!(
            "Compositing {:?} text, {} line(s) at {size}px",
            request.style,
            lines.len()
        );
        compose_text(
            &mut surface,
            glyphs,
            &lines,
            size,
            request.color,
            request.style,
            request.layout,
        );
        surface
    }
}

/// Lay out and draw styled text centered on `surface`. Returns the layout used.
pub fn compose_text(
    surface: &mut CpuSurface,
    glyphs: &dyn GlyphSource,
    lines: &[&str],
    font_size: f32,
    color: Rgba,
    style: TextRenderStyle,
    layout: TextLayout,
) -> TextBlock {
    let canvas = Vec2::new(surface.width as f32, surface.height as f32);
    let block = layout_text(lines, glyphs, font_size, canvas, layout);
    draw_styled_text(surface, glyphs, &block, &style_passes(style, color));
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::parse_hex;
    use crate::constants::MAX_TEXT_WIDTH_RATIO;
    use crate::text::{FONT_SIZE_TIERS, widest_line};

    fn gold() -> Rgba {
        parse_hex("#FFD700").unwrap()
    }

    #[test]
    fn test_mega_gold_scenario() {
        let fonts = FontRegistry::new();
        let compositor = TextureCompositor::new(2048, 1024);
        let glyphs = fonts.glyphs("Bebas Neue");
        assert_eq!(compositor.font_size(&["MEGA"], glyphs), 380.0);

        let request = TextRequest::new(&["MEGA"], gold(), "Bebas Neue", TextRenderStyle::GoldEmbroidery);
        let mut texture = compositor.render_text(&fonts, &request);
        assert_eq!((texture.width(), texture.height()), (2048, 1024));
        assert!(texture.surface().covered_pixel_count() > 0);
        assert!(texture.take_needs_update());

        let edited = TextRequest::new(&["MEGA!"], gold(), "Bebas Neue", TextRenderStyle::GoldEmbroidery);
        compositor.update_text(&mut texture, &fonts, &edited);
        assert!(texture.needs_update());
    }

    #[test]
    fn test_sizes_come_from_tiers_and_fit() {
        let fonts = FontRegistry::new();
        let compositor = TextureCompositor::default();
        let glyphs = fonts.glyphs("anything");
        let tiers: Vec<f32> = FONT_SIZE_TIERS.iter().flatten().copied().collect();
        let limit = compositor.width as f32 * MAX_TEXT_WIDTH_RATIO;

        for line_count in 1..=3 {
            for chars in 1..=20 {
                let line = "W".repeat(chars);
                let lines: Vec<&str> = std::iter::repeat_n(line.as_str(), line_count).collect();
                let size = compositor.font_size(&lines, glyphs);
                let base = crate::text::tier_font_size(&lines);
                assert!(tiers.contains(&base));
                assert!(size <= base);
                assert!(widest_line(&lines, glyphs, size) <= limit);
            }
        }
    }

    #[test]
    fn test_blank_text_renders_transparent() {
        let fonts = FontRegistry::new();
        let compositor = TextureCompositor::new(64, 32);
        let request = TextRequest::new(&["", "  "], gold(), "x", TextRenderStyle::Flat);
        let texture = compositor.render_text(&fonts, &request);
        assert_eq!(texture.surface().covered_pixel_count(), 0);
    }

    #[test]
    fn test_decal_usage_flips() {
        let fonts = FontRegistry::new();
        let compositor = TextureCompositor::new(64, 32).with_device_anisotropy(16);
        let request = TextRequest::new(&["HI"], gold(), "x", TextRenderStyle::Embroidery)
            .with_usage(TextureUsage::ProjectedDecal)
            .with_arc(Some(-1.0));
        assert_eq!(request.layout, TextLayout::Straight);
        let texture = compositor.render_text(&fonts, &request);
        assert!(texture.flip_y);
        assert_eq!(texture.anisotropy, 8);
    }
}
