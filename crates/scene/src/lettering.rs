//! Back and brim lettering.
//!
//! Both are full-surface wraps rendered by the [`TextureCompositor`] and laid
//! over their region's mesh: back text runs straight across the crown, half a
//! turn around U from the front, and brim text follows an arc on the bill.
//! An overlay shares the region's mesh and draws with a depth bias so it
//! stays in front of the fabric.

use bevy::image::ImageAddressMode;
use bevy::math::Affine2;
use bevy::prelude::*;
use capforge_config::CapforgeConfig;
use capforge_design::HatDesign;
use compositing::color::{WHITE, parse_hex_or};
use compositing::{FontRegistry, RasterTexture, TextRequest, TextureCompositor, TextureUsage};
use placement::{Classification, TargetKey};

use crate::ScenePhase;
use crate::assets::show_texture;
use crate::design::{DesignResource, Fonts};
use crate::model::{ModelState, SceneOverlay};
use crate::textures::raster_image;

/// Radius of the brim arc in canvas pixels.
pub const BRIM_ARC_RADIUS: f32 = 1600.0;

const OVERLAY_DEPTH_BIAS: f32 = 2.0;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LetteringKind {
    Back,
    Brim,
}

impl LetteringKind {
    pub const ALL: [Self; 2] = [Self::Back, Self::Brim];

    /// What to render, or `None` when the design has no text here.
    pub fn request(self, design: &HatDesign) -> Option<TextRequest> {
        let color = parse_hex_or(&design.text_color, WHITE);
        let request = match self {
            Self::Back => {
                let lines = design.back_lines();
                if lines.is_empty() {
                    return None;
                }
                TextRequest::new(&lines, color, &design.font, design.text_style)
            }
            Self::Brim => {
                let text = design
                    .brim_text
                    .as_deref()
                    .map(str::trim)
                    .filter(|text| !text.is_empty())?;
                TextRequest::new(&[text], color, &design.font, design.text_style)
                    .with_arc(Some(BRIM_ARC_RADIUS))
            }
        };
        Some(request.with_usage(TextureUsage::FullSurface))
    }

    /// Sub-mesh the lettering is laid over.
    pub fn target(self, classification: &Classification) -> Option<&TargetKey> {
        match self {
            Self::Back => classification.main_cap.as_ref(),
            Self::Brim => classification.bill.as_ref(),
        }
    }

    pub fn uv_transform(self) -> Affine2 {
        match self {
            Self::Back => Affine2::from_translation(Vec2::new(0.5, 0.0)),
            Self::Brim => Affine2::IDENTITY,
        }
    }
}

#[derive(Default)]
pub struct LetteringSlot {
    request: Option<TextRequest>,
    font_revision: u64,
    texture: Option<RasterTexture>,
    image: Option<Handle<Image>>,
}

impl LetteringSlot {
    pub fn texture(&self) -> Option<&RasterTexture> {
        self.texture.as_ref()
    }

    pub fn image(&self) -> Option<&Handle<Image>> {
        self.image.as_ref()
    }
}

#[derive(Resource)]
pub struct Lettering {
    compositor: TextureCompositor,
    back: LetteringSlot,
    brim: LetteringSlot,
}

impl Lettering {
    pub fn new(compositor: TextureCompositor) -> Self {
        Self {
            compositor,
            back: LetteringSlot::default(),
            brim: LetteringSlot::default(),
        }
    }

    pub fn from_config(config: &CapforgeConfig) -> Self {
        let (width, height) = config.text_canvas;
        Self::new(TextureCompositor::new(width, height).with_device_anisotropy(config.max_anisotropy))
    }

    pub fn slot(&self, kind: LetteringKind) -> &LetteringSlot {
        match kind {
            LetteringKind::Back => &self.back,
            LetteringKind::Brim => &self.brim,
        }
    }

    fn slot_mut(&mut self, kind: LetteringKind) -> &mut LetteringSlot {
        match kind {
            LetteringKind::Back => &mut self.back,
            LetteringKind::Brim => &mut self.brim,
        }
    }

    /// Re-render lettering whose text, style or font changed. Returns what
    /// was re-rendered or dropped.
    pub fn refresh(&mut self, design: &HatDesign, fonts: &FontRegistry) -> Vec<LetteringKind> {
        let compositor = self.compositor;
        let mut changed = Vec::new();
        for kind in LetteringKind::ALL {
            let request = kind.request(design);
            let slot = self.slot_mut(kind);
            let fonts_current = request.is_none() || slot.font_revision == fonts.revision();
            if slot.request == request && fonts_current {
                continue;
            }
            slot.font_revision = fonts.revision();
            match (&request, &mut slot.texture) {
                (None, texture) => *texture = None,
                (Some(request), Some(texture)) => compositor.update_text(texture, fonts, request),
                (Some(request), texture) => *texture = Some(compositor.render_text(fonts, request)),
            }
            slot.request = request;
            changed.push(kind);
        }
        changed
    }
}

/// Overlay entity showing one lettering wrap.
#[derive(Component, Debug, Clone, Copy)]
pub struct LetteringOverlay(pub LetteringKind);

pub struct LetteringPlugin;

impl Plugin for LetteringPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<CapforgeConfig>()
            .cloned()
            .unwrap_or_default();
        app.insert_resource(Lettering::from_config(&config))
            .add_systems(
                Update,
                (
                    refresh_lettering,
                    upload_lettering,
                    spawn_lettering_overlays,
                    update_lettering_overlays,
                )
                    .chain()
                    .in_set(ScenePhase::Sync),
            );
    }
}

fn refresh_lettering(design: Res<DesignResource>, fonts: Res<Fonts>, mut lettering: ResMut<Lettering>) {
    if !design.is_changed() && !fonts.is_changed() {
        return;
    }
    let changed = lettering.refresh(&design.design, &fonts.0);
    if !changed.is_empty() {
        debug!("Lettering re-rendered: {changed:?}");
    }
}

fn upload_lettering(mut lettering: ResMut<Lettering>, mut images: ResMut<Assets<Image>>) {
    for kind in LetteringKind::ALL {
        let slot = lettering.bypass_change_detection().slot_mut(kind);
        let Some(texture) = slot.texture.as_mut() else {
            if let Some(handle) = slot.image.take() {
                images.remove(&handle);
            }
            continue;
        };
        if !texture.take_needs_update() {
            continue;
        }
        let image = raster_image(texture, ImageAddressMode::Repeat);
        match slot.image.as_ref().and_then(|handle| images.get_mut(handle)) {
            Some(existing) => *existing = image,
            None => slot.image = Some(images.add(image)),
        }
    }
}

/// Give each newly classified model one hidden overlay per lettering kind.
fn spawn_lettering_overlays(
    mut commands: Commands,
    model: Res<ModelState>,
    meshes: Query<&Mesh3d>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut spawned: Local<(Option<Entity>, Vec<Handle<StandardMaterial>>)>,
) {
    let (spawned_for, owned) = &mut *spawned;
    if *spawned_for == model.root() {
        return;
    }
    *spawned_for = model.root();
    for material in owned.drain(..) {
        materials.remove(&material);
    }

    let classification = model.classification();
    for kind in LetteringKind::ALL {
        let Some(entity) = kind
            .target(classification)
            .and_then(|key| classification.get(key))
            .and_then(|sub_mesh| model.entity(sub_mesh.node))
        else {
            continue;
        };
        let Ok(mesh) = meshes.get(entity) else {
            continue;
        };
        let material = materials.add(StandardMaterial {
            alpha_mode: AlphaMode::Blend,
            depth_bias: OVERLAY_DEPTH_BIAS,
            uv_transform: kind.uv_transform(),
            ..default()
        });
        owned.push(material.clone());
        let overlay = commands
            .spawn((
                Mesh3d(mesh.0.clone()),
                MeshMaterial3d(material),
                Transform::IDENTITY,
                Visibility::Hidden,
                LetteringOverlay(kind),
                SceneOverlay,
                Name::new(format!("{kind:?} lettering")),
            ))
            .id();
        commands.entity(entity).add_child(overlay);
    }
}

fn update_lettering_overlays(
    lettering: Res<Lettering>,
    mut overlays: Query<(
        &LetteringOverlay,
        &MeshMaterial3d<StandardMaterial>,
        &mut Visibility,
    )>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (overlay, material, mut visibility) in &mut overlays {
        let image = lettering.slot(overlay.0).image();
        show_texture(&material.0, &mut visibility, image, &mut materials);
    }
}

#[cfg(test)]
mod tests {
    use compositing::TextLayout;
    use placement::TargetKey;

    use super::*;

    fn lettering() -> Lettering {
        Lettering::new(TextureCompositor::new(128, 64))
    }

    #[test]
    fn test_back_text_edit_flags_upload() {
        let fonts = FontRegistry::new();
        let mut lettering = lettering();
        let mut design = HatDesign::default();
        assert!(lettering.refresh(&design, &fonts).is_empty());

        design.back_text = "TEAM".to_string();
        assert_eq!(lettering.refresh(&design, &fonts), vec![LetteringKind::Back]);
        let texture = lettering.back.texture.as_mut().unwrap();
        assert!(!texture.flip_y);
        assert!(texture.take_needs_update());

        assert!(lettering.refresh(&design, &fonts).is_empty());
        design.back_text = "CREW\n2026".to_string();
        lettering.refresh(&design, &fonts);
        assert!(lettering.back.texture().unwrap().needs_update());

        design.back_text = "   ".to_string();
        assert_eq!(lettering.refresh(&design, &fonts), vec![LetteringKind::Back]);
        assert!(lettering.back.texture().is_none());
    }

    #[test]
    fn test_brim_text_follows_arc() {
        let fonts = FontRegistry::new();
        let mut lettering = lettering();
        let mut design = HatDesign {
            brim_text: Some("CHAMPIONS".to_string()),
            ..HatDesign::default()
        };
        let request = LetteringKind::Brim.request(&design).unwrap();
        assert_eq!(request.layout, TextLayout::Arc { radius: BRIM_ARC_RADIUS });
        assert_eq!(request.usage, TextureUsage::FullSurface);

        assert_eq!(lettering.refresh(&design, &fonts), vec![LetteringKind::Brim]);
        let texture = lettering.brim.texture.as_mut().unwrap();
        assert!(texture.surface().covered_pixel_count() > 0);
        assert!(texture.take_needs_update());

        design.text_color = "#FF0000".to_string();
        lettering.refresh(&design, &fonts);
        assert!(lettering.brim.texture().unwrap().needs_update());
    }

    #[test]
    fn test_loaded_font_rerenders_lettering() {
        let mut fonts = FontRegistry::new();
        let mut lettering = lettering();
        let design = HatDesign {
            back_text: "TEAM".to_string(),
            ..HatDesign::default()
        };
        lettering.refresh(&design, &fonts);
        fonts.register("Bebas Neue", compositing::DEFAULT_FACE).unwrap();
        assert_eq!(lettering.refresh(&design, &fonts), vec![LetteringKind::Back]);
    }

    #[test]
    fn test_lettering_targets_regions() {
        let classification = Classification {
            sub_meshes: Vec::new(),
            main_cap: Some(TargetKey::new("main_cap", "crown")),
            bill: Some(TargetKey::new("bill", "visor")),
        };
        assert_eq!(
            LetteringKind::Back.target(&classification),
            classification.main_cap.as_ref()
        );
        assert_eq!(
            LetteringKind::Brim.target(&classification),
            classification.bill.as_ref()
        );
        let back = LetteringKind::Back.uv_transform();
        assert!((back.transform_point2(Vec2::ZERO) - Vec2::new(0.5, 0.0)).length() < 1e-6);
    }
}
