//! Renderer-facing texture descriptor for a composited raster.

use image::RgbaImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::MAX_ANISOTROPY;
use crate::surface::CpuSurface;

/// Color space the texels are encoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

/// How a texture is applied to the model. Decides the vertical flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextureUsage {
    /// Wraps a whole sub-mesh through its own UVs.
    FullSurface,
    /// Projected onto baked target geometry.
    ProjectedDecal,
}

impl TextureUsage {
    pub fn flip_y(self) -> bool {
        matches!(self, Self::ProjectedDecal)
    }
}

/// Clamp a device-reported anisotropy to the supported range.
pub fn clamp_anisotropy(device_max: u8) -> u8 {
    device_max.clamp(1, MAX_ANISOTROPY)
}

/// A raster plus the sampling state the renderer needs to upload it.
///
/// Every content change bumps `version` and raises `needs_update`; the
/// uploader clears `needs_update` with [`RasterTexture::take_needs_update`].
#[derive(Debug, Clone)]
pub struct RasterTexture {
    surface: CpuSurface,
    pub color_space: ColorSpace,
    pub flip_y: bool,
    pub generate_mipmaps: bool,
    pub anisotropy: u8,
    version: u64,
    needs_update: bool,
}

impl RasterTexture {
    pub fn new(surface: CpuSurface, usage: TextureUsage, device_anisotropy: u8) -> Self {
        Self {
            surface,
            color_space: ColorSpace::Srgb,
            flip_y: usage.flip_y(),
            generate_mipmaps: true,
            anisotropy: clamp_anisotropy(device_anisotropy),
            version: 1,
            needs_update: true,
        }
    }

    pub fn full_surface(surface: CpuSurface) -> Self {
        Self::new(surface, TextureUsage::FullSurface, MAX_ANISOTROPY)
    }

    pub fn projected_decal(surface: CpuSurface) -> Self {
        Self::new(surface, TextureUsage::ProjectedDecal, MAX_ANISOTROPY)
    }

    /// 1x1 fully transparent texture used when an optional asset is missing.
    pub fn transparent_fallback() -> Self {
        let mut texture = Self::new(CpuSurface::new(1, 1), TextureUsage::FullSurface, 1);
        texture.generate_mipmaps = false;
        texture
    }

    pub fn surface(&self) -> &CpuSurface {
        &self.surface
    }

    pub fn width(&self) -> u32 {
        self.surface.width
    }

    pub fn height(&self) -> u32 {
        self.surface.height
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Swap in new content and flag it for upload.
    pub fn replace_surface(&mut self, surface: CpuSurface) {
        self.surface = surface;
        self.mark_changed();
    }

    /// Flag the current content for upload after an in-place edit.
    pub fn mark_changed(&mut self) {
        self.version += 1;
        self.needs_update = true;
        debug!("Texture content changed, version {}", self.version);
    }

    /// Clear the upload flag, returning whether it was set.
    pub fn take_needs_update(&mut self) -> bool {
        std::mem::take(&mut self.needs_update)
    }

    /// Texels as RGBA8, rows flipped when `flip_y` is set.
    pub fn to_rgba8(&self) -> RgbaImage {
        let image = self.surface.to_rgba8();
        if self.flip_y {
            imageops::flip_vertical(&image)
        } else {
            image
        }
    }

    /// Base level followed by successively halved levels down to 1x1.
    /// Only the base level when mipmapping is off.
    pub fn mip_chain(&self) -> Vec<RgbaImage> {
        let base = self.to_rgba8();
        if !self.generate_mipmaps {
            return vec![base];
        }
        mip_levels(base)
    }
}

/// `base` followed by successively halved levels down to 1x1.
pub fn mip_levels(base: RgbaImage) -> Vec<RgbaImage> {
    let mut levels = vec![base];
    loop {
        let Some(last) = levels.last() else {
            break;
        };
        let (w, h) = last.dimensions();
        if w <= 1 && h <= 1 {
            break;
        }
        let next = imageops::resize(last, (w / 2).max(1), (h / 2).max(1), FilterType::Triangle);
        levels.push(next);
    }
    levels
}
