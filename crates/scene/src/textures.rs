//! Conversion of CPU rasters into Bevy images.

use bevy::asset::RenderAssetUsages;
use bevy::image::{ImageAddressMode, ImageSampler, ImageSamplerDescriptor};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use compositing::{ColorSpace, CpuSurface, RasterTexture, clamp_anisotropy, mip_levels};
use image::RgbaImage;

fn texture_format(color_space: ColorSpace) -> TextureFormat {
    match color_space {
        ColorSpace::Srgb => TextureFormat::Rgba8UnormSrgb,
        ColorSpace::Linear => TextureFormat::Rgba8Unorm,
    }
}

fn extent(width: u32, height: u32) -> Extent3d {
    Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

/// Image for a live surface that is re-uploaded in place. Clamped, with a
/// full mip chain and anisotropic filtering.
pub fn surface_image(surface: &CpuSurface, device_anisotropy: u8) -> Image {
    let mut image = Image::new_fill(
        extent(surface.width, surface.height),
        TextureDimension::D2,
        &[0, 0, 0, 0],
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::all(),
    );
    upload_surface(&mut image, surface);
    image.sampler = sampler(ImageAddressMode::ClampToEdge, clamp_anisotropy(device_anisotropy));
    image
}

/// Replace an image's texels and mip chain with the current surface contents.
pub fn upload_surface(image: &mut Image, surface: &CpuSurface) {
    set_levels(image, &mip_levels(surface.to_rgba8()));
}

// Levels are stored back to back, largest first
fn set_levels(image: &mut Image, levels: &[RgbaImage]) {
    image.texture_descriptor.mip_level_count = levels.len() as u32;
    image.data = Some(levels.iter().flat_map(|level| level.as_raw().iter().copied()).collect());
}

fn sampler(address_mode: ImageAddressMode, anisotropy: u8) -> ImageSampler {
    ImageSampler::Descriptor(ImageSamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        anisotropy_clamp: u16::from(anisotropy),
        ..ImageSamplerDescriptor::linear()
    })
}

/// Image for a composited texture, with its mip chain and sampler settings.
pub fn raster_image(texture: &RasterTexture, address_mode: ImageAddressMode) -> Image {
    let levels = texture.mip_chain();
    let mut image = Image::new_fill(
        extent(texture.width(), texture.height()),
        TextureDimension::D2,
        &[0, 0, 0, 0],
        texture_format(texture.color_space),
        RenderAssetUsages::all(),
    );
    set_levels(&mut image, &levels);
    let anisotropy = if levels.len() > 1 { texture.anisotropy } else { 1 };
    image.sampler = sampler(address_mode, anisotropy);
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_image_carries_mips_and_anisotropy() {
        let texture = RasterTexture::projected_decal(CpuSurface::new(8, 4));
        let image = raster_image(&texture, ImageAddressMode::ClampToEdge);

        // 8x4, 4x2, 2x1, 1x1
        assert_eq!(image.texture_descriptor.mip_level_count, 4);
        assert_eq!(image.data.as_ref().unwrap().len(), (32 + 8 + 2 + 1) * 4);
        assert_eq!(image.texture_descriptor.format, TextureFormat::Rgba8UnormSrgb);
        match &image.sampler {
            ImageSampler::Descriptor(descriptor) => {
                assert_eq!(descriptor.anisotropy_clamp, u16::from(texture.anisotropy));
            }
            other => panic!("unexpected sampler {other:?}"),
        }
    }

    #[test]
    fn test_fallback_texture_is_single_level() {
        let image = raster_image(&RasterTexture::transparent_fallback(), ImageAddressMode::Repeat);
        assert_eq!(image.texture_descriptor.mip_level_count, 1);
        assert_eq!(image.data.as_ref().unwrap(), &vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_upload_replaces_texels() {
        let mut surface = CpuSurface::new(2, 2);
        let mut image = surface_image(&surface, 8);
        surface.clear([1.0, 0.0, 0.0, 1.0]);
        upload_surface(&mut image, &surface);
        let data = image.data.as_ref().unwrap();
        assert_eq!(&data[..4], &[255, 0, 0, 255]);
        // The 1x1 level follows the 2x2 base and is refreshed too
        assert_eq!(data.len(), (4 + 1) * 4);
        assert!(data[16] > 250 && data[17] == 0 && data[19] > 250);
    }

    #[test]
    fn test_surface_image_is_mipmapped_and_anisotropic() {
        let image = surface_image(&CpuSurface::new(16, 16), 16);
        // 16, 8, 4, 2, 1
        assert_eq!(image.texture_descriptor.mip_level_count, 5);
        assert_eq!(
            image.data.as_ref().unwrap().len(),
            (256 + 64 + 16 + 4 + 1) * 4
        );
        match &image.sampler {
            ImageSampler::Descriptor(descriptor) => {
                assert_eq!(descriptor.anisotropy_clamp, 8);
                assert_eq!(descriptor.address_mode_u, ImageAddressMode::ClampToEdge);
            }
            other => panic!("unexpected sampler {other:?}"),
        }
    }
}
