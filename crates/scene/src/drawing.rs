//! The live drawing surface and its GPU texture.
//!
//! The adapter raises its dirty signal after every redraw; the upload system
//! is the signal's only consumer and copies the raster on the same frame.

use bevy::prelude::*;
use capforge_config::CapforgeConfig;
use compositing::{DirtySignal, DrawingSurfaceAdapter, UvPointerBridge};

use crate::ScenePhase;
use crate::design::{DesignResource, Fonts};
use crate::textures::{surface_image, upload_surface};

/// Drawing surface, its pointer bridge and the image it is uploaded to.
#[derive(Resource)]
pub struct LiveDrawingTexture {
    pub adapter: DrawingSurfaceAdapter,
    pub bridge: UvPointerBridge,
    pub image: Handle<Image>,
    dirty: DirtySignal,
}

impl LiveDrawingTexture {
    pub fn new(adapter: DrawingSurfaceAdapter, image: Handle<Image>) -> Self {
        let dirty = adapter.dirty_signal();
        Self {
            adapter,
            bridge: UvPointerBridge::new(),
            image,
            dirty,
        }
    }

    /// Whether the surface has anything worth showing on the cap.
    pub fn is_active(&self) -> bool {
        !self.adapter.objects().is_empty()
    }
}

pub struct DrawingTexturePlugin;

impl Plugin for DrawingTexturePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_drawing_texture).add_systems(
            Update,
            (mirror_design_to_surface, upload_drawing_texture)
                .chain()
                .in_set(ScenePhase::Sync),
        );
    }
}

fn setup_drawing_texture(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    config: Res<CapforgeConfig>,
    design: Res<DesignResource>,
    fonts: Res<Fonts>,
) {
    let mut adapter = DrawingSurfaceAdapter::new(config.drawing_surface_size);
    adapter.apply_design(&design.design, &fonts.0);
    let image = images.add(surface_image(adapter.raster_element(), config.max_anisotropy));
    info!(
        "Drawing surface ready ({0}x{0})",
        config.drawing_surface_size
    );
    commands.insert_resource(LiveDrawingTexture::new(adapter, image));
}

/// Background and primary text follow the design.
fn mirror_design_to_surface(
    design: Res<DesignResource>,
    fonts: Res<Fonts>,
    drawing: Option<ResMut<LiveDrawingTexture>>,
) {
    let Some(mut drawing) = drawing else {
        return;
    };
    if !design.is_changed() && !fonts.is_changed() {
        return;
    }
    let change = drawing.adapter.apply_design(&design.design, &fonts.0);
    debug!("Drawing surface text: {change:?}");
}

fn upload_drawing_texture(
    drawing: Option<Res<LiveDrawingTexture>>,
    mut images: ResMut<Assets<Image>>,
) {
    let Some(drawing) = drawing else {
        return;
    };
    if !drawing.dirty.take() {
        return;
    }
    match images.get_mut(&drawing.image) {
        Some(image) => upload_surface(image, drawing.adapter.raster_element()),
        // Not uploaded yet; keep the flag for the next frame
        None => drawing.dirty.raise(),
    }
}
