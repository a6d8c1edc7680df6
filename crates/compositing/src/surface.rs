//! CPU raster surface for texture compositing

use glam::{Affine2, Vec2};

use crate::color::{Rgba, to_rgba8};
use crate::glyphs::GlyphBitmap;
use crate::paint::Paint;

/// A straight-alpha RGBA CPU surface.
/// Stores pixels as [f32; 4] in sRGB space.
#[derive(Clone)]
pub struct CpuSurface {
    /// Surface dimensions
    pub width: u32,
    pub height: u32,
    /// Pixel data in row-major order, each pixel is [r, g, b, a] as f32
    pixels: Vec<[f32; 4]>,
}

impl std::fmt::Debug for CpuSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl CpuSurface {
    /// Create a new surface with the given dimensions, initialized to transparent black
    pub fn new(width: u32, height: u32) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            pixels: vec![[0.0, 0.0, 0.0, 0.0]; pixel_count],
        }
    }

    /// Copy an RGBA8 image into a new surface
    pub fn from_rgba8(image: &image::RgbaImage) -> Self {
        let pixels = image
            .pixels()
            .map(|p| p.0.map(|c| c as f32 / 255.0))
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
        }
    }

    /// Clear the surface to a solid color
    pub fn clear(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    /// Get a pixel at the given coordinates
    /// Returns None if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize) * (self.width as usize) + (x as usize);
        Some(self.pixels[index])
    }

    /// Set a pixel at the given coordinates
    /// Does nothing if coordinates are out of bounds
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = (y as usize) * (self.width as usize) + (x as usize);
        self.pixels[index] = color;
    }

    /// Composite a color over an existing pixel ("source-over", straight alpha)
    #[inline]
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Rgba, opacity: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = (y as usize) * (self.width as usize) + (x as usize);
        let dst = self.pixels[index];

        let src_alpha = (color[3] * opacity).clamp(0.0, 1.0);
        if src_alpha <= 0.0 {
            return;
        }
        let dst_weight = dst[3] * (1.0 - src_alpha);
        let out_alpha = src_alpha + dst_weight;
        if out_alpha <= f32::EPSILON {
            self.pixels[index] = [0.0, 0.0, 0.0, 0.0];
            return;
        }

        self.pixels[index] = [
            (color[0] * src_alpha + dst[0] * dst_weight) / out_alpha,
            (color[1] * src_alpha + dst[1] * dst_weight) / out_alpha,
            (color[2] * src_alpha + dst[2] * dst_weight) / out_alpha,
            out_alpha,
        ];
    }

    /// Bilinear sample with texel centers at integer coordinates, transparent outside
    pub fn sample(&self, x: f32, y: f32) -> Rgba {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (ix, iy) = (x0 as i64, y0 as i64);

        let texel = |tx: i64, ty: i64| -> Rgba {
            if tx < 0 || ty < 0 || tx >= self.width as i64 || ty >= self.height as i64 {
                return [0.0; 4];
            }
            self.pixels[(ty as usize) * (self.width as usize) + (tx as usize)]
        };

        let weights = [
            (texel(ix, iy), (1.0 - fx) * (1.0 - fy)),
            (texel(ix + 1, iy), fx * (1.0 - fy)),
            (texel(ix, iy + 1), (1.0 - fx) * fy),
            (texel(ix + 1, iy + 1), fx * fy),
        ];

        // Alpha-weighted so transparent texels do not darken edges
        let mut out = [0.0f32; 4];
        for (c, w) in weights {
            let a = c[3] * w;
            out[0] += c[0] * a;
            out[1] += c[1] * a;
            out[2] += c[2] * a;
            out[3] += a;
        }
        if out[3] > f32::EPSILON {
            out[0] /= out[3];
            out[1] /= out[3];
            out[2] /= out[3];
        }
        out
    }

    /// Fill glyph coverage through a glyph-space to surface transform.
    ///
    /// `line_box` is the (top, bottom) extent in glyph space that gradient
    /// paints are spread over.
    pub fn fill_coverage(
        &mut self,
        glyph: &GlyphBitmap,
        to_surface: Affine2,
        paint: &Paint,
        line_box: (f32, f32),
        opacity: f32,
    ) {
        if glyph.is_empty() || opacity <= 0.0 {
            return;
        }
        let size = Vec2::new(glyph.width as f32, glyph.height as f32);
        let Some((inverse, bounds)) = self.transformed_bounds(to_surface, glyph.origin, size) else {
            return;
        };
        let box_height = (line_box.1 - line_box.0).max(f32::EPSILON);

        let (x0, y0, x1, y1) = bounds;
        for y in y0..y1 {
            for x in x0..x1 {
                let local = inverse.transform_point2(Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
                let texel = local - glyph.origin - Vec2::splat(0.5);
                let coverage = glyph.sample(texel.x, texel.y);
                if coverage <= 0.0 {
                    continue;
                }
                let color = paint.sample((local.y - line_box.0) / box_height);
                self.blend_pixel(x, y, color, coverage * opacity);
            }
        }
    }

    /// Composite another surface through a source-space to surface transform
    pub fn draw_surface(&mut self, source: &CpuSurface, to_surface: Affine2, opacity: f32) {
        if source.width == 0 || source.height == 0 || opacity <= 0.0 {
            return;
        }
        let size = Vec2::new(source.width as f32, source.height as f32);
        let Some((inverse, bounds)) = self.transformed_bounds(to_surface, Vec2::ZERO, size) else {
            return;
        };

        let (x0, y0, x1, y1) = bounds;
        for y in y0..y1 {
            for x in x0..x1 {
                let local = inverse.transform_point2(Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
                let color = source.sample(local.x - 0.5, local.y - 0.5);
                if color[3] <= 0.0 {
                    continue;
                }
                self.blend_pixel(x, y, color, opacity);
            }
        }
    }

    /// Inverse transform and clamped pixel bounds of a transformed rectangle
    fn transformed_bounds(
        &self,
        to_surface: Affine2,
        origin: Vec2,
        size: Vec2,
    ) -> Option<(Affine2, (u32, u32, u32, u32))> {
        if to_surface.matrix2.determinant().abs() < 1e-12 {
            return None;
        }
        let corners = [
            origin,
            origin + Vec2::new(size.x, 0.0),
            origin + Vec2::new(0.0, size.y),
            origin + size,
        ]
        .map(|c| to_surface.transform_point2(c));

        let min = corners.iter().fold(Vec2::splat(f32::MAX), |a, c| a.min(*c));
        let max = corners.iter().fold(Vec2::splat(f32::MIN), |a, c| a.max(*c));
        if !min.is_finite() || !max.is_finite() {
            return None;
        }

        let x0 = min.x.floor().max(0.0) as u32;
        let y0 = min.y.floor().max(0.0) as u32;
        let x1 = (max.x.ceil().max(0.0) as u32).min(self.width);
        let y1 = (max.y.ceil().max(0.0) as u32).min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((to_surface.inverse(), (x0, y0, x1, y1)))
    }

    /// Quantize to an RGBA8 image
    pub fn to_rgba8(&self) -> image::RgbaImage {
        let mut out = image::RgbaImage::new(self.width, self.height);
        for (dst, src) in out.pixels_mut().zip(self.pixels.iter()) {
            *dst = image::Rgba(to_rgba8(*src));
        }
        out
    }

    /// Get the total number of pixels
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Get direct access to pixel data
    #[inline]
    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    /// Number of pixels with any coverage
    pub fn covered_pixel_count(&self) -> usize {
        self.pixels.iter().filter(|p| p[3] > 0.0).count()
    }

    /// Bounding box (x0, y0, x1, y1) of pixels with alpha above zero
    pub fn covered_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                let alpha = self.pixels[(y as usize) * (self.width as usize) + (x as usize)][3];
                if alpha <= 0.0 {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, y, x + 1, y + 1),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)),
                });
            }
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyphs::{BlockGlyphs, GlyphSource};

    #[test]
    fn test_new_surface() {
        let surface = CpuSurface::new(100, 100);
        assert_eq!(surface.width, 100);
        assert_eq!(surface.height, 100);
        assert_eq!(surface.pixel_count(), 10000);
    }

    #[test]
    fn test_get_set_pixel() {
        let mut surface = CpuSurface::new(10, 10);
        let color = [1.0, 0.5, 0.25, 1.0];

        surface.set_pixel(5, 5, color);
        assert_eq!(surface.get_pixel(5, 5), Some(color));

        // Out of bounds should return None
        assert_eq!(surface.get_pixel(100, 100), None);
    }

    #[test]
    fn test_blend_pixel() {
        let mut surface = CpuSurface::new(10, 10);

        // Start with white background
        surface.clear([1.0, 1.0, 1.0, 1.0]);

        // Blend 50% opaque red
        surface.blend_pixel(5, 5, [1.0, 0.0, 0.0, 1.0], 0.5);

        let result = surface.get_pixel(5, 5).unwrap();
        assert!((result[0] - 1.0).abs() < 0.01);
        assert!((result[1] - 0.5).abs() < 0.01);
        assert!((result[2] - 0.5).abs() < 0.01);
        assert!((result[3] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_blend_onto_transparent_keeps_color() {
        let mut surface = CpuSurface::new(1, 1);
        surface.blend_pixel(0, 0, [0.2, 0.4, 0.6, 1.0], 0.25);
        let result = surface.get_pixel(0, 0).unwrap();
        assert!((result[0] - 0.2).abs() < 1e-5);
        assert!((result[3] - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_fill_coverage_translated() {
        let mut surface = CpuSurface::new(64, 64);
        let glyph = BlockGlyphs.rasterize('X', 20.0);
        surface.fill_coverage(
            &glyph,
            Affine2::from_translation(Vec2::new(10.0, 40.0)),
            &Paint::Solid([1.0, 0.0, 0.0, 1.0]),
            (-16.0, 4.0),
            1.0,
        );
        let (x0, y0, x1, y1) = surface.covered_bounds().unwrap();
        // Block origin is (1, -14) for a 20px glyph, block is 10x14
        assert_eq!((x0, y0), (11, 26));
        assert_eq!((x1, y1), (21, 40));
    }

    #[test]
    fn test_degenerate_transform_is_skipped() {
        let mut surface = CpuSurface::new(16, 16);
        let glyph = BlockGlyphs.rasterize('X', 10.0);
        surface.fill_coverage(
            &glyph,
            Affine2::from_scale(Vec2::ZERO),
            &Paint::Solid([1.0; 4]),
            (0.0, 1.0),
            1.0,
        );
        assert_eq!(surface.covered_pixel_count(), 0);
    }

    #[test]
    fn test_rgba8_round_trip() {
        let mut surface = CpuSurface::new(2, 2);
        surface.set_pixel(1, 0, [1.0, 0.0, 0.0, 1.0]);
        let image = surface.to_rgba8();
        assert_eq!(image.get_pixel(1, 0).0, [255, 0, 0, 255]);
        let back = CpuSurface::from_rgba8(&image);
        assert_eq!(back.get_pixel(1, 0), Some([1.0, 0.0, 0.0, 1.0]));
    }
}
