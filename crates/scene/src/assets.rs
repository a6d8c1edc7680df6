//! URL-based loads the host fulfills.
//!
//! The scene never does I/O. It emits [`FetchRequest`]s and expects a
//! matching [`FetchResult`] back, whenever it arrives. Results that no longer
//! match what the scene wants are dropped by the receiving slot or layer.
//! Fonts are fetched the same way, one request per family.

use std::f32::consts::{FRAC_PI_2, PI};

use bevy::ecs::message::Message;
use bevy::image::ImageAddressMode;
use bevy::prelude::*;
use capforge_config::CapforgeConfig;
use compositing::{FontRegistry, TextureUsage, font_url};
use placement::{AssetError, AssetSlot, LoadTicket, flag_url};

use crate::decals::decal_quad;
use crate::design::{DesignResource, Fonts, design_font_families};
use crate::model::{ModelState, SceneOverlay};
use crate::textures::raster_image;

/// What a fetched resource is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPurpose {
    Pattern,
    Flag,
    BrimText,
    Decal(LoadTicket),
    /// Font file for a family
    Font(String),
}

#[derive(Message, Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub purpose: FetchPurpose,
}

#[derive(Message, Debug, Clone)]
pub struct FetchResult {
    pub request: FetchRequest,
    /// Encoded image bytes, or why they could not be fetched
    pub bytes: Result<Vec<u8>, String>,
}

impl FetchResult {
    pub(crate) fn into_parts(self) -> (FetchRequest, Result<Vec<u8>, AssetError>) {
        let url = self.request.url.clone();
        let bytes = self
            .bytes
            .map_err(|reason| AssetError::Fetch { url, reason });
        (self.request, bytes)
    }
}

/// An [`AssetSlot`] plus the image uploaded from it.
pub struct SlotImage {
    pub slot: AssetSlot,
    address_mode: ImageAddressMode,
    handle: Option<Handle<Image>>,
    uploaded: bool,
}

impl SlotImage {
    fn new(url: Option<String>, usage: TextureUsage, address_mode: ImageAddressMode) -> Self {
        Self {
            slot: AssetSlot::new(url, usage),
            address_mode,
            handle: None,
            uploaded: false,
        }
    }

    /// Image of the loaded raster; `None` while the feature is not visible.
    pub fn handle(&self) -> Option<&Handle<Image>> {
        self.handle.as_ref().filter(|_| self.slot.is_ready())
    }

    fn set_url(&mut self, url: Option<String>) {
        if self.slot.url() != url.as_deref() {
            self.slot.set_url(url);
            self.uploaded = false;
        }
    }

    fn resolve(&mut self, url: &str, bytes: Result<Vec<u8>, AssetError>) {
        self.slot.resolve(url, bytes);
        self.uploaded = false;
    }
}

/// Pattern, flag and brim text rasters.
#[derive(Resource)]
pub struct ExternalAssets {
    pub pattern: SlotImage,
    pub flag: SlotImage,
    pub brim_text: SlotImage,
}

impl ExternalAssets {
    pub fn from_config(config: &CapforgeConfig) -> Self {
        Self {
            pattern: SlotImage::new(None, TextureUsage::FullSurface, ImageAddressMode::Repeat),
            flag: SlotImage::new(None, TextureUsage::ProjectedDecal, ImageAddressMode::ClampToEdge),
            brim_text: SlotImage::new(
                config.assets.brim_text_url.clone(),
                TextureUsage::ProjectedDecal,
                ImageAddressMode::ClampToEdge,
            ),
        }
    }

    fn slot_mut(&mut self, purpose: &FetchPurpose) -> Option<&mut SlotImage> {
        match purpose {
            FetchPurpose::Pattern => Some(&mut self.pattern),
            FetchPurpose::Flag => Some(&mut self.flag),
            FetchPurpose::BrimText => Some(&mut self.brim_text),
            FetchPurpose::Decal(_) | FetchPurpose::Font(_) => None,
        }
    }
}

/// Flag URL for the design's country code, if both are available.
pub fn design_flag_url(config: &CapforgeConfig, code: Option<&str>) -> Option<String> {
    let code = code?;
    match flag_url(config.assets.flag_endpoint.as_deref(), code) {
        Ok(url) => Some(url),
        Err(err) => {
            warn!("No flag for {code:?}: {err}");
            None
        }
    }
}

pub(crate) fn request_external_assets(
    design: Res<DesignResource>,
    config: Res<CapforgeConfig>,
    mut assets: ResMut<ExternalAssets>,
    mut requests: MessageWriter<FetchRequest>,
) {
    if design.is_changed() {
        assets.pattern.set_url(design.design.texture.clone());
        assets
            .flag
            .set_url(design_flag_url(&config, design.design.flag.as_deref()));
    }

    let assets = &mut *assets;
    for (slot, purpose) in [
        (&mut assets.pattern, FetchPurpose::Pattern),
        (&mut assets.flag, FetchPurpose::Flag),
        (&mut assets.brim_text, FetchPurpose::BrimText),
    ] {
        if let Some(url) = slot.slot.request() {
            requests.write(FetchRequest { url, purpose });
        }
    }
}

/// Route fetch results to their slot; decal results are left to the decal layer.
pub(crate) fn receive_external_assets(
    mut results: MessageReader<FetchResult>,
    mut assets: ResMut<ExternalAssets>,
) {
    for result in results.read() {
        let (request, bytes) = result.clone().into_parts();
        if let Some(slot) = assets.slot_mut(&request.purpose) {
            slot.resolve(&request.url, bytes);
        }
    }
}

pub(crate) fn upload_external_assets(
    mut assets: ResMut<ExternalAssets>,
    mut images: ResMut<Assets<Image>>,
) {
    let assets = &mut *assets;
    for slot in [&mut assets.pattern, &mut assets.flag, &mut assets.brim_text] {
        if slot.uploaded || !slot.slot.is_ready() {
            continue;
        }
        if let Some(old) = slot.handle.take() {
            images.remove(&old);
        }
        slot.handle = Some(images.add(raster_image(slot.slot.texture(), slot.address_mode)));
        slot.uploaded = true;
    }
}

/// Ask for the font file of every family the design uses, once per family.
pub(crate) fn request_fonts(
    design: Res<DesignResource>,
    config: Res<CapforgeConfig>,
    mut fonts: ResMut<Fonts>,
    mut requests: MessageWriter<FetchRequest>,
) {
    if !design.is_changed() {
        return;
    }
    let Some(template) = config.assets.font_template.as_deref() else {
        return;
    };
    // Marking a family requested changes no lookup
    let registry = &mut fonts.bypass_change_detection().0;
    for family in design_font_families(&design.design) {
        let Some(url) = font_url(template, family) else {
            continue;
        };
        if registry.request(family) {
            requests.write(FetchRequest {
                url,
                purpose: FetchPurpose::Font(family.to_string()),
            });
        }
    }
}

/// Register a fetched font. A failed fetch or unreadable file keeps the
/// family on the built-in face. Returns whether glyph lookups changed.
pub fn apply_font_result(
    registry: &mut FontRegistry,
    family: &str,
    bytes: Result<&[u8], &str>,
) -> bool {
    let registered = match bytes {
        Ok(bytes) => registry.register(family, bytes).map_err(|err| err.to_string()),
        Err(reason) => Err(reason.to_string()),
    };
    match registered {
        Ok(()) => true,
        Err(reason) => {
            warn!("Font {family:?} unavailable, using the built-in face: {reason}");
            false
        }
    }
}

pub(crate) fn receive_fonts(mut results: MessageReader<FetchResult>, mut fonts: ResMut<Fonts>) {
    for result in results.read() {
        let FetchPurpose::Font(family) = &result.request.purpose else {
            continue;
        };
        let bytes = result.bytes.as_deref().map_err(String::as_str);
        // Only a successful registration counts as a change
        if apply_font_result(&mut fonts.bypass_change_detection().0, family, bytes) {
            fonts.set_changed();
        }
    }
}

/// A plane on the cap showing one of the optional external rasters.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeaturePlane {
    /// On the back of the crown
    Flag,
    /// On top of the bill
    BrimText,
}

impl FeaturePlane {
    /// Model-space placement, sized to the raster's intended aspect.
    pub fn transform(self) -> Transform {
        match self {
            Self::Flag => Transform::from_xyz(0.0, 0.05, -0.108)
                .with_rotation(Quat::from_rotation_y(PI))
                .with_scale(Vec3::new(0.05, 0.033, 1.0)),
            Self::BrimText => Transform::from_xyz(0.0, 0.012, 0.14)
                .with_rotation(Quat::from_rotation_x(-FRAC_PI_2))
                .with_scale(Vec3::new(0.08, 0.02, 1.0)),
        }
    }

    fn image(self, assets: &ExternalAssets) -> Option<&Handle<Image>> {
        match self {
            Self::Flag => assets.flag.handle(),
            Self::BrimText => assets.brim_text.handle(),
        }
    }
}

/// Give each newly classified model its (initially hidden) feature planes.
pub(crate) fn spawn_feature_planes(
    mut commands: Commands,
    model: Res<ModelState>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut spawned_for: Local<Option<Entity>>,
) {
    if *spawned_for == model.root() {
        return;
    }
    *spawned_for = model.root();
    let Some(root) = model.root() else {
        return;
    };
    // Both rasters are decoded as projected decals, bottom row first
    let quad = meshes.add(decal_quad(true));
    for kind in [FeaturePlane::Flag, FeaturePlane::BrimText] {
        let material = materials.add(StandardMaterial {
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            ..default()
        });
        let plane = commands
            .spawn((
                Mesh3d(quad.clone()),
                MeshMaterial3d(material),
                kind.transform(),
                Visibility::Hidden,
                kind,
                SceneOverlay,
                Name::new(format!("{kind:?}")),
            ))
            .id();
        commands.entity(root).add_child(plane);
    }
}

/// Planes are shown only while their raster is loaded.
pub(crate) fn update_feature_planes(
    assets: Res<ExternalAssets>,
    mut planes: Query<(&FeaturePlane, &MeshMaterial3d<StandardMaterial>, &mut Visibility)>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (kind, material, mut visibility) in &mut planes {
        show_texture(&material.0, &mut visibility, kind.image(&assets), &mut materials);
    }
}

/// Show `material` with `image`, or hide it while there is none.
pub(crate) fn show_texture(
    material: &Handle<StandardMaterial>,
    visibility: &mut Visibility,
    image: Option<&Handle<Image>>,
    materials: &mut Assets<StandardMaterial>,
) {
    let wanted = if image.is_some() {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    if *visibility != wanted {
        *visibility = wanted;
    }
    let stale = materials
        .get(material)
        .is_some_and(|m| m.base_color_texture.as_ref() != image);
    if stale && let Some(material) = materials.get_mut(material) {
        material.base_color_texture = image.cloned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_url_needs_endpoint_and_code() {
        let mut config = CapforgeConfig::default();
        assert_eq!(design_flag_url(&config, Some("us")), None);

        config.assets.flag_endpoint = Some("https://flags.example/{code}.png".to_string());
        assert_eq!(
            design_flag_url(&config, Some("DE")).as_deref(),
            Some("https://flags.example/de.png")
        );
        assert_eq!(design_flag_url(&config, Some("Germany")), None);
        assert_eq!(design_flag_url(&config, None), None);
    }

    #[test]
    fn test_fetch_failure_becomes_asset_error() {
        let result = FetchResult {
            request: FetchRequest {
                url: "https://cdn.example/p.png".to_string(),
                purpose: FetchPurpose::Pattern,
            },
            bytes: Err("404".to_string()),
        };
        let (_, bytes) = result.into_parts();
        assert!(matches!(bytes, Err(AssetError::Fetch { reason, .. }) if reason == "404"));
    }

    #[test]
    fn test_feature_planes_face_outward() {
        let flag = FeaturePlane::Flag.transform();
        assert!((flag.rotation * Vec3::Z - Vec3::NEG_Z).length() < 1e-5);
        assert!(flag.translation.z < 0.0);

        let brim = FeaturePlane::BrimText.transform();
        assert!((brim.rotation * Vec3::Z - Vec3::Y).length() < 1e-5);
        assert!(brim.translation.z > 0.0);
    }

    #[test]
    fn test_fetched_font_drives_glyph_advance() {
        let mut registry = FontRegistry::new();
        let block = registry.glyphs("Bebas Neue").advance('i', 100.0);

        assert!(!apply_font_result(&mut registry, "Bebas Neue", Err("missing")));
        assert!(!apply_font_result(&mut registry, "Bebas Neue", Ok(b"garbage".as_slice())));
        assert_eq!(registry.glyphs("Bebas Neue").advance('i', 100.0), block);

        assert!(apply_font_result(
            &mut registry,
            "Bebas Neue",
            Ok(compositing::DEFAULT_FACE)
        ));
        let loaded = registry.glyphs("'Bebas Neue', sans-serif");
        assert!(loaded.advance('i', 100.0) < block);
        assert!(loaded.advance('i', 100.0) < loaded.advance('W', 100.0));
    }

    #[test]
    fn test_slot_handle_hidden_until_ready() {
        let mut slot = SlotImage::new(
            Some("https://cdn.example/b.png".to_string()),
            TextureUsage::ProjectedDecal,
            ImageAddressMode::ClampToEdge,
        );
        slot.handle = Some(Handle::default());
        assert!(slot.handle().is_none());
        slot.slot.request();
        slot.resolve("https://cdn.example/b.png", Err(AssetError::MissingEndpoint));
        assert!(slot.handle().is_none());
        assert!(slot.slot.has_failed());
    }
}
