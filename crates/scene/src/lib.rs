//! Bevy scene for the cap configurator
//!
//! [`CapforgeScenePlugin`] wires the compositing and placement cores into a
//! Bevy app: the design resource, the live drawing texture, back and brim
//! lettering, model classification, decal planes and pointer routing. The
//! host app supplies the model (see [`ModelImported`]) and fulfills
//! [`FetchRequest`]s.

use bevy::light::GlobalAmbientLight;
use bevy::prelude::*;
use capforge_config::CapforgeConfig;

mod assets;
mod camera;
mod decals;
mod design;
mod drawing;
mod lettering;
mod model;
mod pointer;
mod textures;

pub use assets::{
    ExternalAssets, FeaturePlane, FetchPurpose, FetchRequest, FetchResult, SlotImage,
    apply_font_result, design_flag_url,
};
pub use camera::{CameraControllerPlugin, MainCamera, OrbitCamera};
pub use decals::{
    DecalLayer, DecalPlane, DecalPlugin, decal_quad, nudged_matrix, plane_transform, plane_world,
    projected_decal_mesh, source_aspect,
};
pub use design::{
    AddToCart, Cart, DesignEdit, DesignResource, Fonts, SelectedDecal, design_font_families,
};
pub use drawing::{DrawingTexturePlugin, LiveDrawingTexture};
pub use lettering::{
    BRIM_ARC_RADIUS, Lettering, LetteringKind, LetteringOverlay, LetteringPlugin, LetteringSlot,
};
pub use model::{
    CapModel, MaterialName, ModelImported, ModelPlugin, ModelState, SceneOverlay, apply_fill,
    mesh_from_primitive, primitive_from_mesh,
};
pub use pointer::{
    PointerCapture, PointerPlugin, bridge_uv, drawing_event, pick_plane, ray_quad_distance,
};
pub use textures::{raster_image, surface_image, upload_surface};

/// Frame phases, run in this order every `Update`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenePhase {
    /// Pointer routing, then camera controls
    Input,
    /// Design edits from messages and the keyboard gizmo, plus font loads
    Edit,
    /// Caches, textures and entities follow the design
    Sync,
}

pub struct CapforgeScenePlugin;

impl Plugin for CapforgeScenePlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<CapforgeConfig>()
            .cloned()
            .unwrap_or_default();

        app.configure_sets(
            Update,
            (ScenePhase::Input, ScenePhase::Edit, ScenePhase::Sync).chain(),
        )
        .insert_resource(ExternalAssets::from_config(&config))
        .insert_resource(DecalLayer::from_config(&config))
        .insert_resource(config)
        .init_resource::<DesignResource>()
        .init_resource::<SelectedDecal>()
        .init_resource::<Fonts>()
        .init_resource::<Cart>()
        .add_message::<DesignEdit>()
        .add_message::<AddToCart>()
        .add_message::<FetchRequest>()
        .add_message::<FetchResult>();

        app.add_plugins((
            PointerPlugin,
            CameraControllerPlugin,
            DrawingTexturePlugin,
            ModelPlugin,
            DecalPlugin,
            LetteringPlugin,
        ));

        app.add_systems(Startup, setup_lighting)
            .add_systems(
                Update,
                (assets::request_fonts, assets::receive_fonts).in_set(ScenePhase::Edit),
            )
            .add_systems(
                Update,
                (
                    (
                        assets::request_external_assets,
                        assets::receive_external_assets,
                        assets::upload_external_assets,
                        assets::spawn_feature_planes,
                        assets::update_feature_planes,
                    )
                        .chain(),
                    design::handle_add_to_cart,
                )
                    .in_set(ScenePhase::Sync),
            );
    }
}

/// Key light from the upper front plus a soft ambient fill, so fabric
/// colors read true from every orbit angle.
fn setup_lighting(mut commands: Commands) {
    let direction = Vec3::new(0.4, 1.0, 0.8).normalize();
    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: false,
            ..default()
        },
        // looking_to takes the forward direction; light travels along -direction
        Transform::default().looking_to(-direction, Vec3::Y),
        Name::new("Key light"),
    ));
    commands.insert_resource(GlobalAmbientLight {
        color: Color::WHITE,
        brightness: 400.0,
        ..default()
    });
    info!("Scene lighting ready");
}
