//! Imported cap model: classification, decal targets and fabric materials.
//!
//! The host spawns the model's entity tree and then sends [`ModelImported`]
//! with its root. The tree is mirrored into a [`ModelHierarchy`], classified,
//! and every sub-mesh gets its own material so recoloring never leaks into
//! assets shared with other scenes. Materials and targets are released when
//! the model is replaced or its root despawned.

use std::collections::HashMap;
use std::sync::Arc;

use bevy::asset::RenderAssetUsages;
use bevy::ecs::message::Message;
use bevy::math::Affine2;
use bevy::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use bevy::prelude::*;
use capforge_config::CapforgeConfig;
use compositing::Rgba;
use placement::{
    Classification, DecalTargets, FabricInputs, MaterialDesc, MeshClassifier, MeshPrimitive,
    ModelHierarchy, NodeId, SurfaceFill, TargetRegistry, surface_fill,
};

use crate::ScenePhase;
use crate::assets::ExternalAssets;
use crate::design::DesignResource;
use crate::drawing::LiveDrawingTexture;

/// The model's entity tree is in place under `root`.
#[derive(Message, Debug, Clone, Copy)]
pub struct ModelImported {
    pub root: Entity,
}

/// Marks the root of the classified model.
#[derive(Component)]
pub struct CapModel;

/// Entity the scene adds inside the model tree (decal planes, lettering).
/// The classifier skips it and everything below it.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct SceneOverlay;

/// Imported material name, attached by the loader next to `MeshMaterial3d`.
#[derive(Component, Debug, Clone)]
pub struct MaterialName(pub String);

#[derive(Resource, Default)]
pub struct ModelState {
    root: Option<Entity>,
    classification: Classification,
    targets: TargetRegistry,
    entities: HashMap<NodeId, Entity>,
    materials: HashMap<NodeId, Handle<StandardMaterial>>,
}

impl ModelState {
    pub fn root(&self) -> Option<Entity> {
        self.root
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn targets(&self) -> Option<Arc<DecalTargets>> {
        self.targets.current()
    }

    pub fn entity(&self, node: NodeId) -> Option<Entity> {
        self.entities.get(&node).copied()
    }

    fn dispose(&mut self, materials: &mut Assets<StandardMaterial>) {
        for (_, handle) in self.materials.drain() {
            materials.remove(&handle);
        }
        self.targets.dispose();
        self.entities.clear();
        self.classification = Classification::default();
        self.root = None;
    }
}

pub struct ModelPlugin;

impl Plugin for ModelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ModelState>()
            .add_message::<ModelImported>()
            .add_systems(
                Update,
                (
                    dispose_removed_model,
                    classify_imported_model,
                    apply_fabric_materials,
                )
                    .chain()
                    .in_set(ScenePhase::Sync),
            );
    }
}

pub(crate) fn local_matrix(transform: &Transform) -> Mat4 {
    Mat4::from_scale_rotation_translation(transform.scale, transform.rotation, transform.translation)
}

/// Triangle geometry of a Bevy mesh. `None` without positions or indices.
pub fn primitive_from_mesh(mesh: &Mesh) -> Option<MeshPrimitive> {
    let positions: Vec<Vec3> = match mesh.attribute(Mesh::ATTRIBUTE_POSITION)? {
        VertexAttributeValues::Float32x3(pos) => pos.iter().map(|p| Vec3::from_array(*p)).collect(),
        _ => return None,
    };
    let indices = match mesh.indices()? {
        Indices::U16(idx) => idx.iter().map(|&i| u32::from(i)).collect(),
        Indices::U32(idx) => idx.clone(),
    };
    let normals = match mesh.attribute(Mesh::ATTRIBUTE_NORMAL) {
        Some(VertexAttributeValues::Float32x3(norm)) => {
            norm.iter().map(|n| Vec3::from_array(*n)).collect()
        }
        _ => Vec::new(),
    };
    let uvs = match mesh.attribute(Mesh::ATTRIBUTE_UV_0) {
        Some(VertexAttributeValues::Float32x2(uv)) => uv.iter().map(|u| Vec2::from_array(*u)).collect(),
        _ => Vec::new(),
    };
    Some(MeshPrimitive {
        positions,
        normals,
        uvs,
        indices,
    })
}

/// Bevy mesh for generated geometry, such as a projected decal.
pub fn mesh_from_primitive(primitive: &MeshPrimitive) -> Mesh {
    let positions: Vec<[f32; 3]> = primitive.positions.iter().map(|p| p.to_array()).collect();
    let normals: Vec<[f32; 3]> = primitive.normals.iter().map(|n| n.to_array()).collect();
    let uvs: Vec<[f32; 2]> = primitive.uvs.iter().map(|uv| uv.to_array()).collect();
    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::all())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
        .with_inserted_indices(Indices::U32(primitive.indices.clone()))
}

fn dispose_removed_model(
    mut state: ResMut<ModelState>,
    roots: Query<(), With<CapModel>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(root) = state.root else {
        return;
    };
    if roots.get(root).is_err() {
        info!("Cap model {root} unloaded");
        state.dispose(&mut materials);
    }
}

type NodeQuery<'w, 's> = Query<
    'w,
    's,
    (
        Option<&'static Name>,
        &'static Transform,
        Option<&'static Children>,
        Option<&'static Mesh3d>,
        Option<&'static MeshMaterial3d<StandardMaterial>>,
        Option<&'static MaterialName>,
        Has<SceneOverlay>,
    ),
>;

fn classify_imported_model(
    mut commands: Commands,
    mut imported: MessageReader<ModelImported>,
    config: Res<CapforgeConfig>,
    nodes: NodeQuery,
    meshes: Res<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut state: ResMut<ModelState>,
) {
    // Only the latest import matters
    let Some(ModelImported { root }) = imported.read().last().copied() else {
        return;
    };
    let Ok((root_name, root_transform, root_children, ..)) = nodes.get(root) else {
        warn!("Imported model root {root} does not exist");
        return;
    };
    state.dispose(&mut materials);

    let root_name = root_name.map_or("root", |n| n.as_str());
    let mut model = ModelHierarchy::new(root_name, local_matrix(root_transform));
    let mut entities = HashMap::from([(ModelHierarchy::ROOT, root)]);
    let mut sources = HashMap::new();

    let mut stack: Vec<(Entity, NodeId)> = Vec::new();
    if let Some(children) = root_children {
        let children: &[Entity] = children;
        stack.extend(children.iter().rev().map(|&child| (child, ModelHierarchy::ROOT)));
    }
    while let Some((entity, parent)) = stack.pop() {
        let Ok((name, transform, children, mesh, material, material_name, overlay)) = nodes.get(entity)
        else {
            continue;
        };
        if overlay {
            continue;
        }
        let name = name.map_or(String::new(), |n| n.as_str().to_string());
        let local = local_matrix(transform);
        let primitive = mesh
            .and_then(|m| meshes.get(&m.0))
            .and_then(primitive_from_mesh);

        let node = match primitive {
            Some(primitive) => {
                let base_color = material
                    .and_then(|m| materials.get(&m.0))
                    .map(|m| srgba_array(m.base_color))
                    .unwrap_or([1.0; 4]);
                let desc = MaterialDesc {
                    name: material_name.map(|n| n.0.clone()).unwrap_or_default(),
                    base_color,
                };
                let node = model.add_mesh(parent, name, local, primitive, desc);
                if let Some(material) = material {
                    sources.insert(node, material.0.clone());
                }
                node
            }
            None => model.add_group(parent, name, local),
        };
        entities.insert(node, entity);
        if let Some(children) = children {
            let children: &[Entity] = children;
            stack.extend(children.iter().rev().map(|&child| (child, node)));
        }
    }

    let classifier = MeshClassifier::new(config.classifier.clone());
    let classification = classifier.classify(&model);
    let targets = classifier.bake_targets(&model, &classification);

    let mut owned = HashMap::new();
    for sub_mesh in &classification.sub_meshes {
        let (Some(&entity), Some(source)) = (entities.get(&sub_mesh.node), sources.get(&sub_mesh.node))
        else {
            continue;
        };
        let Some(mut material) = materials.get(source).cloned() else {
            continue;
        };
        if !sub_mesh.is_fabric() {
            material.alpha_mode = AlphaMode::Opaque;
        }
        let handle = materials.add(material);
        commands.entity(entity).insert(MeshMaterial3d(handle.clone()));
        owned.insert(sub_mesh.node, handle);
    }

    state.targets.replace(targets);
    state.root = Some(root);
    state.classification = classification;
    state.entities = entities;
    state.materials = owned;
    commands.entity(root).insert(CapModel);
}

fn srgba_array(color: Color) -> Rgba {
    let c = color.to_srgba();
    [c.red, c.green, c.blue, c.alpha]
}

/// Set a fabric material from its fill. Structural fills leave it untouched.
///
/// A pattern that has not loaded yet shows the flat base color meanwhile.
pub fn apply_fill(
    material: &mut StandardMaterial,
    fill: &SurfaceFill,
    base_color: Rgba,
    drawing: Option<&Handle<Image>>,
    pattern: Option<&Handle<Image>>,
) {
    let (tint, texture, repeat) = match fill {
        SurfaceFill::Structural => return,
        SurfaceFill::Color(color) => (*color, None, 1.0),
        SurfaceFill::DrawingTexture => match drawing {
            Some(image) => (fill.tint().unwrap_or(base_color), Some(image.clone()), 1.0),
            None => (base_color, None, 1.0),
        },
        SurfaceFill::Pattern { repeat, .. } => match pattern {
            Some(image) => (fill.tint().unwrap_or(base_color), Some(image.clone()), *repeat),
            None => (base_color, None, 1.0),
        },
    };
    material.base_color = Color::srgba(tint[0], tint[1], tint[2], tint[3]);
    material.base_color_texture = texture;
    material.uv_transform = Affine2::from_scale(Vec2::splat(repeat));
}

fn apply_fabric_materials(
    state: Res<ModelState>,
    design: Res<DesignResource>,
    config: Res<CapforgeConfig>,
    drawing: Option<Res<LiveDrawingTexture>>,
    external: Option<Res<ExternalAssets>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut last: Local<Option<(FabricInputs, Option<Handle<Image>>)>>,
) {
    let drawing_active = drawing.as_ref().is_some_and(|d| d.is_active());
    let inputs = FabricInputs::from_design(&design.design, drawing_active, config.pattern_repeat);
    let pattern = external
        .as_ref()
        .and_then(|e| e.pattern.handle().cloned());
    let current = Some((inputs, pattern));
    if !state.is_changed() && *last == current {
        return;
    }
    *last = current;
    let Some((inputs, pattern)) = last.as_ref() else {
        return;
    };

    let drawing_image = drawing.as_ref().map(|d| &d.image);
    for sub_mesh in state.classification.fabric() {
        let Some(material) = state
            .materials
            .get(&sub_mesh.node)
            .and_then(|handle| materials.get_mut(handle))
        else {
            continue;
        };
        apply_fill(
            material,
            &surface_fill(sub_mesh, inputs),
            inputs.base_color,
            drawing_image,
            pattern.as_ref(),
        );
    }
    debug!("Fabric materials updated");
}
