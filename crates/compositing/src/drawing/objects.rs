//! Editable objects placed on the drawing surface.

use capforge_design::TextRenderStyle;
use glam::{Affine2, Vec2};

use crate::color::Rgba;
use crate::compositor::compose_text;
use crate::constants::LINE_HEIGHT;
use crate::glyphs::GlyphSource;
use crate::surface::CpuSurface;
use crate::text::{
    GlyphAtlas, StylePass, TextBlock, TextLayout, draw_passes, layout_text, style_passes,
    widest_line,
};

pub type ObjectId = u64;

/// Margin around text boxes, as a fraction of font size. Leaves room for
/// shadow and outline passes.
const TEXT_PADDING: f32 = 0.15;

/// Text parameters shared by both text representations.
#[derive(Debug, Clone, PartialEq)]
pub struct TextParams {
    pub text: String,
    pub fill: Rgba,
    pub font_family: String,
    pub font_size: f32,
}

impl TextParams {
    pub fn lines(&self) -> Vec<&str> {
        self.text.split('\n').collect()
    }

    fn box_size(&self, glyphs: &dyn GlyphSource) -> Vec2 {
        let lines = self.lines();
        let pad = self.font_size * TEXT_PADDING * 2.0;
        Vec2::new(
            widest_line(&lines, glyphs, self.font_size) + pad,
            self.font_size * LINE_HEIGHT * lines.len() as f32 + pad,
        )
        .ceil()
        .max(Vec2::ONE)
    }
}

/// Text drawn glyph by glyph on every render.
#[derive(Debug, Clone)]
pub struct FlatText {
    pub params: TextParams,
    block: TextBlock,
    atlas: GlyphAtlas,
    passes: Vec<StylePass>,
    size: Vec2,
}

impl FlatText {
    pub fn new(params: TextParams, glyphs: &dyn GlyphSource) -> Self {
        let size = params.box_size(glyphs);
        let block = layout_text(
            &params.lines(),
            glyphs,
            params.font_size,
            size,
            TextLayout::Straight,
        );
        let atlas = GlyphAtlas::build(glyphs, &block);
        let passes = style_passes(TextRenderStyle::Flat, params.fill);
        Self {
            params,
            block,
            atlas,
            passes,
            size,
        }
    }
}

/// Text composited once through an effect recipe and kept as a raster.
#[derive(Debug, Clone)]
pub struct EffectText {
    pub params: TextParams,
    pub style: TextRenderStyle,
    raster: CpuSurface,
}

impl EffectText {
    pub fn new(params: TextParams, style: TextRenderStyle, glyphs: &dyn GlyphSource) -> Self {
        let size = params.box_size(glyphs);
        let mut raster = CpuSurface::new(size.x as u32, size.y as u32);
        compose_text(
            &mut raster,
            glyphs,
            &params.lines(),
            params.font_size,
            params.fill,
            style,
            TextLayout::Straight,
        );
        Self {
            params,
            style,
            raster,
        }
    }

    pub fn raster(&self) -> &CpuSurface {
        &self.raster
    }
}

#[derive(Debug, Clone)]
pub enum ObjectContent {
    FlatText(FlatText),
    EffectText(EffectText),
    Image(CpuSurface),
}

impl ObjectContent {
    pub fn is_text(&self) -> bool {
        !matches!(self, Self::Image(_))
    }

    /// Unscaled size in surface pixels.
    pub fn size(&self) -> Vec2 {
        match self {
            Self::FlatText(text) => text.size,
            Self::EffectText(text) => Vec2::new(text.raster.width as f32, text.raster.height as f32),
            Self::Image(image) => Vec2::new(image.width as f32, image.height as f32),
        }
    }
}

/// An object with its transform. `center` is in surface pixels.
#[derive(Debug, Clone)]
pub struct SurfaceObject {
    pub id: ObjectId,
    pub content: ObjectContent,
    pub center: Vec2,
    pub scale: f32,
    pub angle: f32,
}

impl SurfaceObject {
    pub fn new(id: ObjectId, content: ObjectContent, center: Vec2) -> Self {
        Self {
            id,
            content,
            center,
            scale: 1.0,
            angle: 0.0,
        }
    }

    /// Object space (top-left origin, unscaled pixels) to surface space.
    pub fn to_surface(&self) -> Affine2 {
        Affine2::from_scale_angle_translation(Vec2::splat(self.scale), self.angle, self.center)
            * Affine2::from_translation(-self.content.size() * 0.5)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let transform = self.to_surface();
        if transform.matrix2.determinant().abs() < 1e-12 {
            return false;
        }
        let local = transform.inverse().transform_point2(point);
        let size = self.content.size();
        local.x >= 0.0 && local.y >= 0.0 && local.x <= size.x && local.y <= size.y
    }

    /// Bottom-right corner in surface space; dragging it resizes.
    pub fn resize_handle(&self) -> Vec2 {
        self.to_surface().transform_point2(self.content.size())
    }

    pub fn draw(&self, surface: &mut CpuSurface) {
        let placement = self.to_surface();
        match &self.content {
            ObjectContent::FlatText(text) => {
                draw_passes(surface, &text.atlas, &text.block, &text.passes, placement);
            }
            ObjectContent::EffectText(text) => surface.draw_surface(&text.raster, placement, 1.0),
            ObjectContent::Image(image) => surface.draw_surface(image, placement, 1.0),
        }
    }
}
