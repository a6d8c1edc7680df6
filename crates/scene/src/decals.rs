//! Decal planes on the cap: design edits, texture sources, outlines and the
//! keyboard gizmo.
//!
//! All decisions live in [`DecalCompositionLayer`]. These systems feed it
//! messages and input, route its image fetches through [`FetchRequest`], and
//! mirror its visuals into entities parented to the model root. A decal over
//! its target is drawn as a mesh cut from that target's surface; anywhere
//! else it falls back to a flat quad.

use std::collections::HashMap;

use bevy::image::ImageAddressMode;
use bevy::mesh::VertexAttributeValues;
use bevy::prelude::*;
use capforge_config::CapforgeConfig;
use capforge_design::Decal;
use compositing::{RasterTexture, Rgba};
use placement::{
    DecalCompositionLayer, DecalSource, DecalTargets, DecalTransform, DecalVisual,
    ERROR_PLACEHOLDER, MeshPrimitive, SELECTED_OUTLINE, project_decal,
};

use crate::ScenePhase;
use crate::assets::{FetchPurpose, FetchRequest, FetchResult};
use crate::design::{DesignEdit, DesignResource, Fonts, SelectedDecal};
use crate::model::{ModelState, SceneOverlay, mesh_from_primitive};
use crate::textures::raster_image;

/// Per-frame keyboard gizmo steps.
const NUDGE_STEP: f32 = 0.002;
const SPIN_STEP: f32 = 0.02;
const SCALE_STEP: f32 = 1.01;

#[derive(Resource)]
pub struct DecalLayer(pub DecalCompositionLayer);

impl DecalLayer {
    pub fn from_config(config: &CapforgeConfig) -> Self {
        Self(DecalCompositionLayer::from_config(config))
    }
}

/// A spawned decal plane.
#[derive(Component, Debug, Clone)]
pub struct DecalPlane {
    pub id: String,
}

/// GPU resources owned by the decal planes.
#[derive(Resource, Default)]
struct DecalPlaneAssets {
    revision: Option<u64>,
    root: Option<Entity>,
    quads: HashMap<bool, Handle<Mesh>>,
    /// Meshes conformed to the target surface, rebuilt with the planes
    projected: Vec<Handle<Mesh>>,
    /// Keyed by decal id, tagged with the source it was uploaded from
    images: HashMap<String, ((bool, u64), Handle<Image>)>,
    materials: Vec<Handle<StandardMaterial>>,
}

impl DecalPlaneAssets {
    fn quad(&mut self, flip_y: bool, meshes: &mut Assets<Mesh>) -> Handle<Mesh> {
        self.quads
            .entry(flip_y)
            .or_insert_with(|| meshes.add(decal_quad(flip_y)))
            .clone()
    }

    fn image(
        &mut self,
        visual: &DecalVisual,
        texture: &RasterTexture,
        images: &mut Assets<Image>,
    ) -> Handle<Image> {
        let key = (visual.is_text, visual.source_version);
        if let Some((uploaded, handle)) = self.images.get(visual.id) {
            if *uploaded == key {
                return handle.clone();
            }
            images.remove(handle);
        }
        let handle = images.add(raster_image(texture, ImageAddressMode::ClampToEdge));
        self.images
            .insert(visual.id.to_string(), (key, handle.clone()));
        handle
    }
}

pub struct DecalPlugin;

impl Plugin for DecalPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DecalPlaneAssets>()
            .add_systems(
                Update,
                (apply_design_edits, decal_keyboard_gizmo)
                    .chain()
                    .in_set(ScenePhase::Edit),
            )
            .add_systems(
                Update,
                (
                    sync_decal_layer,
                    receive_decal_loads,
                    rebuild_decal_planes,
                    mirror_selection,
                    draw_decal_outlines,
                )
                    .chain()
                    .in_set(ScenePhase::Sync),
            );
    }
}

/// Unit quad facing +Z. With `flip_y` the V axis is flipped so rasters
/// stored bottom row first still read upright.
pub fn decal_quad(flip_y: bool) -> Mesh {
    let mut mesh = Mesh::from(Rectangle::new(1.0, 1.0));
    if flip_y
        && let Some(VertexAttributeValues::Float32x2(uvs)) =
            mesh.attribute_mut(Mesh::ATTRIBUTE_UV_0)
    {
        for uv in uvs.iter_mut() {
            uv[1] = 1.0 - uv[1];
        }
    }
    mesh
}

/// Width over height of what the plane shows. Placeholders are square.
pub fn source_aspect(source: &DecalSource) -> f32 {
    match source {
        DecalSource::Texture(texture) if texture.height() > 0 => {
            texture.width() as f32 / texture.height() as f32
        }
        _ => 1.0,
    }
}

/// Model-space transform of a decal plane, stretched to its source aspect.
pub fn plane_transform(transform: &DecalTransform, aspect: f32) -> Transform {
    Transform {
        translation: transform.position,
        rotation: transform.rotation,
        scale: transform.scale * Vec3::new(aspect, 1.0, 1.0),
    }
}

/// World matrix of a decal plane for a model placed at `model_world`.
pub fn plane_world(visual: &DecalVisual, model_world: Mat4) -> Mat4 {
    let local = plane_transform(&visual.transform, source_aspect(&visual.source));
    model_world * Mat4::from_scale_rotation_translation(local.scale, local.rotation, local.translation)
}

/// Decal mesh conformed to its target, in model space. `None` when the
/// target is unknown or the decal box misses it.
pub fn projected_decal_mesh(
    visual: &DecalVisual,
    targets: &DecalTargets,
    surface_offset: f32,
    flip_y: bool,
) -> Option<MeshPrimitive> {
    let target = targets.get(visual.target.as_ref()?)?;
    let local = plane_transform(&visual.transform, source_aspect(&visual.source));
    let projector =
        Mat4::from_scale_rotation_translation(local.scale, local.rotation, local.translation);
    project_decal(&target.geometry, projector, surface_offset, flip_y)
}

/// Matrix a gizmo produces after nudging `decal` along its own plane axes,
/// spinning it about its normal and scaling it.
pub fn nudged_matrix(decal: &Decal, translate: Vec2, spin: f32, scale: f32) -> Mat4 {
    let current = DecalTransform::from_decal(decal);
    let offset = current.rotation * translate.extend(0.0);
    Mat4::from_scale_rotation_translation(
        current.scale * scale,
        current.rotation * Quat::from_rotation_z(spin),
        current.position + offset,
    )
}

fn color(rgba: Rgba) -> Color {
    Color::srgba(rgba[0], rgba[1], rgba[2], rgba[3])
}

fn model_world(state: &ModelState, globals: &Query<&GlobalTransform>) -> Mat4 {
    state
        .root()
        .and_then(|root| globals.get(root).ok())
        .map_or(Mat4::IDENTITY, |global| Mat4::from(global.affine()))
}

fn apply_design_edits(
    mut edits: MessageReader<DesignEdit>,
    mut layer: ResMut<DecalLayer>,
    mut design: ResMut<DesignResource>,
) {
    for edit in edits.read() {
        let next = match edit {
            DesignEdit::Replace(next) => {
                layer.0.clear_selection();
                Some(next.clone())
            }
            DesignEdit::AddDecal { decal, placement } => {
                Some(layer.0.place_new(&design.design, decal.clone(), placement.as_ref()))
            }
            DesignEdit::RemoveDecal(id) => {
                let (next, _) = layer.0.remove(&design.design, id);
                Some(next)
            }
            DesignEdit::SelectDecal(Some(id)) => {
                if design.design.decal(id).is_some() {
                    layer.0.select(id);
                } else {
                    warn!("Cannot select unknown decal {id}");
                }
                None
            }
            DesignEdit::SelectDecal(None) => {
                layer.0.clear_selection();
                None
            }
        };
        if let Some(next) = next {
            design.replace(next);
        }
    }
}

/// Arrows move the selected decal in its plane, Q/E spin it, +/- scale it
/// and Delete removes it.
fn decal_keyboard_gizmo(
    keys: Res<ButtonInput<KeyCode>>,
    mut layer: ResMut<DecalLayer>,
    mut design: ResMut<DesignResource>,
) {
    let Some(id) = layer.0.selected().map(str::to_string) else {
        return;
    };

    if keys.just_pressed(KeyCode::Delete) {
        let (next, _) = layer.0.remove(&design.design, &id);
        design.replace(next);
        return;
    }

    let axis = |positive: KeyCode, negative: KeyCode| {
        keys.pressed(positive) as i32 as f32 - keys.pressed(negative) as i32 as f32
    };
    let translate = Vec2::new(
        axis(KeyCode::ArrowRight, KeyCode::ArrowLeft),
        axis(KeyCode::ArrowUp, KeyCode::ArrowDown),
    ) * NUDGE_STEP;
    let spin = axis(KeyCode::KeyQ, KeyCode::KeyE) * SPIN_STEP;
    let scale = SCALE_STEP.powf(axis(KeyCode::Equal, KeyCode::Minus));

    if translate == Vec2::ZERO && spin == 0.0 && scale == 1.0 {
        layer.0.end_gizmo();
        return;
    }
    let Some(decal) = design.design.decal(&id) else {
        return;
    };
    let matrix = nudged_matrix(decal, translate, spin, scale);
    layer.0.begin_gizmo();
    match layer.0.apply_gizmo(&design.design, &id, matrix) {
        Ok(next) => design.replace(next),
        Err(err) => warn!("Gizmo edit on {id} dropped: {err}"),
    }
}

fn sync_decal_layer(
    design: Res<DesignResource>,
    fonts: Res<Fonts>,
    mut layer: ResMut<DecalLayer>,
    mut requests: MessageWriter<FetchRequest>,
) {
    if !design.is_changed() && !fonts.is_changed() {
        return;
    }
    layer.0.sync(&design.design, &fonts.0);
    let updated = layer.0.take_updated_text();
    if !updated.is_empty() {
        debug!("Text decals re-rendered: {updated:?}");
    }
    for ticket in layer.0.take_load_requests() {
        requests.write(FetchRequest {
            url: ticket.src.clone(),
            purpose: FetchPurpose::Decal(ticket),
        });
    }
}

fn receive_decal_loads(mut results: MessageReader<FetchResult>, mut layer: ResMut<DecalLayer>) {
    for result in results.read() {
        if !matches!(result.request.purpose, FetchPurpose::Decal(_)) {
            continue;
        }
        let (request, bytes) = result.clone().into_parts();
        if let FetchPurpose::Decal(ticket) = request.purpose {
            layer.0.complete_load(&ticket, bytes);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn rebuild_decal_planes(
    mut commands: Commands,
    layer: Res<DecalLayer>,
    design: Res<DesignResource>,
    model: Res<ModelState>,
    planes: Query<Entity, With<DecalPlane>>,
    mut cache: ResMut<DecalPlaneAssets>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
) {
    let revision = layer.0.revision();
    if cache.revision == Some(revision) && cache.root == model.root() && !design.is_changed() {
        return;
    }
    cache.revision = Some(revision);
    cache.root = model.root();

    for plane in &planes {
        commands.entity(plane).despawn();
    }
    for material in cache.materials.drain(..) {
        materials.remove(&material);
    }
    for mesh in cache.projected.drain(..) {
        meshes.remove(&mesh);
    }

    let targets = model.targets();
    let visuals = layer.0.visuals(&design.design, targets.as_deref());
    cache.images.retain(|id, (_, handle)| {
        let keep = visuals.iter().any(|v| v.id == id.as_str());
        if !keep {
            images.remove(&*handle);
        }
        keep
    });

    let Some(root) = model.root() else {
        return;
    };
    for visual in &visuals {
        let DecalSource::Texture(texture) = visual.source else {
            continue;
        };
        let image = cache.image(visual, texture, &mut images);
        let projected = targets.as_deref().and_then(|targets| {
            projected_decal_mesh(visual, targets, layer.0.surface_offset(), texture.flip_y)
        });
        // Off-target decals keep the flat plane
        let (mesh, transform) = match projected {
            Some(primitive) => {
                let mesh = meshes.add(mesh_from_primitive(&primitive));
                cache.projected.push(mesh.clone());
                (mesh, Transform::IDENTITY)
            }
            None => (
                cache.quad(texture.flip_y, &mut meshes),
                plane_transform(&visual.transform, source_aspect(&visual.source)),
            ),
        };
        let material = materials.add(StandardMaterial {
            base_color_texture: Some(image),
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            ..default()
        });
        cache.materials.push(material.clone());
        let plane = commands
            .spawn((
                Mesh3d(mesh),
                MeshMaterial3d(material),
                transform,
                DecalPlane {
                    id: visual.id.to_string(),
                },
                SceneOverlay,
                Name::new(format!("Decal {}", visual.id)),
            ))
            .id();
        commands.entity(root).add_child(plane);
    }
    debug!("Rebuilt {} decal planes", visuals.len());
}

fn mirror_selection(layer: Res<DecalLayer>, mut selected: ResMut<SelectedDecal>) {
    let current = layer.0.selected().map(str::to_string);
    if selected.0 != current {
        selected.0 = current;
    }
}

fn draw_decal_outlines(
    layer: Res<DecalLayer>,
    design: Res<DesignResource>,
    model: Res<ModelState>,
    globals: Query<&GlobalTransform>,
    mut gizmos: Gizmos,
) {
    let model_world = model_world(&model, &globals);
    let targets = model.targets();
    for visual in layer.0.visuals(&design.design, targets.as_deref()) {
        let world = plane_world(&visual, model_world);
        let corners = [
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.5, -0.5, 0.0),
            Vec3::new(0.5, 0.5, 0.0),
            Vec3::new(-0.5, 0.5, 0.0),
        ]
        .map(|corner| world.transform_point3(corner));

        let outline = match visual.source {
            DecalSource::ErrorPlaceholder => {
                let placeholder = color(ERROR_PLACEHOLDER);
                gizmos.line(corners[0], corners[2], placeholder);
                gizmos.line(corners[1], corners[3], placeholder);
                Some(visual.outline.map_or(placeholder, color))
            }
            _ => visual.outline.map(color),
        };
        if let Some(outline) = outline {
            for i in 0..4 {
                gizmos.line(corners[i], corners[(i + 1) % 4], outline);
            }
        }

        if visual.outline == Some(SELECTED_OUTLINE) {
            let center = world.transform_point3(Vec3::ZERO);
            let normal = world.transform_vector3(Vec3::Z).normalize_or_zero() * 0.03;
            gizmos.arrow(center, center + normal, color(SELECTED_OUTLINE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flipped_quad_inverts_v() {
        let plain = decal_quad(false);
        let flipped = decal_quad(true);
        let uvs = |mesh: &Mesh| match mesh.attribute(Mesh::ATTRIBUTE_UV_0) {
            Some(VertexAttributeValues::Float32x2(uvs)) => uvs.clone(),
            _ => panic!("quad has no uvs"),
        };
        for (a, b) in uvs(&plain).iter().zip(uvs(&flipped).iter()) {
            assert_eq!(a[0], b[0]);
            assert!((a[1] + b[1] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_text_plane_keeps_canvas_aspect() {
        let texture = RasterTexture::transparent_fallback();
        assert_eq!(source_aspect(&DecalSource::Texture(&texture)), 1.0);
        assert_eq!(source_aspect(&DecalSource::Loading), 1.0);

        let decal = Decal::text("t1", "GO", "#ffffff", "Roboto");
        let transform = DecalTransform::from_decal(&decal);
        let plane = plane_transform(&transform, 2.0);
        assert_eq!(plane.scale.x, transform.scale.x * 2.0);
        assert_eq!(plane.scale.y, transform.scale.y);
    }

    #[test]
    fn test_decal_mesh_lies_on_its_target() {
        use capforge_design::TargetRef;
        use placement::{DecalInteraction, DecalTargetGeometry, TargetKey};

        use crate::model::primitive_from_mesh;

        let key = TargetKey::new("main_cap", "crown");
        let mut targets = DecalTargets::new();
        targets.insert(DecalTargetGeometry {
            key: key.clone(),
            parent_name: "main_cap".to_string(),
            mesh_name: "crown".to_string(),
            geometry: primitive_from_mesh(&Mesh::from(Rectangle::new(1.0, 1.0))).unwrap(),
        });

        let texture = RasterTexture::projected_decal(compositing::CpuSurface::new(8, 4));
        let mut visual = DecalVisual {
            id: "d1",
            transform: DecalTransform {
                position: Vec3::new(0.0, 0.0, 0.002),
                rotation: Quat::IDENTITY,
                scale: Vec3::splat(0.2),
            },
            target: Some(key),
            source: DecalSource::Texture(&texture),
            source_version: 1,
            is_text: false,
            interaction: DecalInteraction::default(),
            outline: None,
        };

        let mesh = projected_decal_mesh(&visual, &targets, 0.002, true).unwrap();
        for position in &mesh.positions {
            assert!((position.z - 0.002).abs() < 1e-6);
            // 2:1 texture, so the box is twice as wide as it is tall
            assert!(position.x.abs() <= 0.2 + 1e-5 && position.y.abs() <= 0.1 + 1e-5);
        }
        let width = mesh.positions.iter().map(|p| p.x).fold(f32::MIN, f32::max)
            - mesh.positions.iter().map(|p| p.x).fold(f32::MAX, f32::min);
        assert!((width - 0.4).abs() < 1e-5);

        visual.target = Some(TargetKey::from(&TargetRef::new("old", "mesh")));
        assert!(projected_decal_mesh(&visual, &targets, 0.002, true).is_none());
    }

    #[test]
    fn test_nudge_moves_in_decal_plane() {
        let mut decal = Decal::image("d1", "https://cdn.example/logo.png");
        decal.position = [0.0, 0.0, 0.1];
        decal.rotation = [0.0, std::f32::consts::FRAC_PI_2, 0.0];
        decal.scale = [0.2, 0.2, 0.2];

        let matrix = nudged_matrix(&decal, Vec2::new(0.01, 0.0), 0.0, 1.0);
        let (scale, _, translation) = matrix.to_scale_rotation_translation();
        // Rotated a quarter turn about Y, the decal's right axis points down -Z.
        assert!((translation - Vec3::new(0.0, 0.0, 0.09)).length() < 1e-5);
        assert!((scale - Vec3::splat(0.2)).length() < 1e-5);
    }

    #[test]
    fn test_nudge_spin_and_scale() {
        let decal = Decal::image("d1", "https://cdn.example/logo.png");
        let matrix = nudged_matrix(&decal, Vec2::ZERO, 0.5, 2.0);
        let (scale, rotation, _) = matrix.to_scale_rotation_translation();
        let expected = DecalTransform::from_decal(&decal).rotation * Quat::from_rotation_z(0.5);
        assert!(rotation.angle_between(expected) < 1e-4);
        assert!((scale - Vec3::from_array(decal.scale) * 2.0).length() < 1e-5);
    }
}
