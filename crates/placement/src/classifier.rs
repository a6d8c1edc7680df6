//! Sub-mesh discovery, fabric classification and material assignment.

use capforge_config::ClassifierConfig;
use compositing::color::{Rgba, WHITE, parse_hex_or};
use tracing::{debug, info};

use crate::bake::bake_primitive;
use crate::hierarchy::{ModelHierarchy, NodeId};
use crate::targets::{DecalTargetGeometry, DecalTargets, TargetKey};

/// Which part of the cap a sub-mesh belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    MainCap,
    Bill,
    Band,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialClass {
    /// Recolorable, texturable cloth
    Fabric,
    /// Left as imported
    Structural,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubMesh {
    pub node: NodeId,
    pub key: TargetKey,
    pub mesh_name: String,
    pub parent_name: String,
    pub material_name: String,
    pub class: MaterialClass,
    pub region: Region,
}

impl SubMesh {
    pub fn is_fabric(&self) -> bool {
        self.class == MaterialClass::Fabric
    }
}

/// Output of [`MeshClassifier::classify`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Sub-meshes in traversal order
    pub sub_meshes: Vec<SubMesh>,
    pub main_cap: Option<TargetKey>,
    pub bill: Option<TargetKey>,
}

impl Classification {
    pub fn get(&self, key: &TargetKey) -> Option<&SubMesh> {
        self.sub_meshes.iter().find(|s| &s.key == key)
    }

    pub fn fabric(&self) -> impl Iterator<Item = &SubMesh> {
        self.sub_meshes.iter().filter(|s| s.is_fabric())
    }
}

/// What a sub-mesh's material should look like.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceFill {
    /// Imported material kept as is, opaque and depth-tested
    Structural,
    Color(Rgba),
    /// The live drawing surface texture under a white tint
    DrawingTexture,
    /// Uploaded pattern image tiled `repeat` times under a white tint
    Pattern { src: String, repeat: f32 },
}

impl SurfaceFill {
    /// Base color multiplier for the material.
    pub fn tint(&self) -> Option<Rgba> {
        match self {
            Self::Structural => None,
            Self::Color(color) => Some(*color),
            Self::DrawingTexture | Self::Pattern { .. } => Some(WHITE),
        }
    }
}

/// Design state that drives fabric materials.
#[derive(Debug, Clone, PartialEq)]
pub struct FabricInputs {
    pub base_color: Rgba,
    pub band_color: Option<Rgba>,
    pub drawing_active: bool,
    pub pattern: Option<String>,
    pub pattern_repeat: f32,
}

impl FabricInputs {
    pub fn from_design(design: &capforge_design::HatDesign, drawing_active: bool, pattern_repeat: f32) -> Self {
        let base_color = parse_hex_or(&design.hat_color, WHITE);
        Self {
            base_color,
            band_color: design
                .band_color
                .as_deref()
                .map(|c| parse_hex_or(c, base_color)),
            drawing_active,
            pattern: design.texture.clone(),
            pattern_repeat,
        }
    }
}

/// Material for one sub-mesh.
pub fn surface_fill(sub_mesh: &SubMesh, inputs: &FabricInputs) -> SurfaceFill {
    if !sub_mesh.is_fabric() {
        return SurfaceFill::Structural;
    }
    if sub_mesh.region == Region::Band {
        return SurfaceFill::Color(inputs.band_color.unwrap_or(inputs.base_color));
    }
    if inputs.drawing_active && sub_mesh.region == Region::MainCap {
        return SurfaceFill::DrawingTexture;
    }
    match &inputs.pattern {
        Some(src) => SurfaceFill::Pattern {
            src: src.clone(),
            repeat: inputs.pattern_repeat,
        },
        None => SurfaceFill::Color(inputs.base_color),
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeshClassifier {
    config: ClassifierConfig,
}

impl MeshClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Exact name match, or a keyword anywhere in material, mesh and parent names.
    pub fn is_fabric(&self, material: &str, mesh: &str, parent: &str) -> bool {
        let material_lower = material.to_lowercase();
        if self
            .config
            .fabric_material_names
            .iter()
            .any(|name| name.to_lowercase() == material_lower)
        {
            return true;
        }
        let haystack = format!("{material_lower} {mesh} {parent}").to_lowercase();
        contains_any(&haystack, &self.config.fabric_keywords)
    }

    fn region(&self, material: &str, mesh: &str, parent: &str) -> Region {
        let haystack = format!("{material} {mesh} {parent}").to_lowercase();
        let naming = &self.config.naming;
        if contains_any(&haystack, &self.config.band_keywords) {
            Region::Band
        } else if parent == naming.main_group {
            Region::MainCap
        } else if parent == naming.bill_group {
            Region::Bill
        } else {
            Region::Other
        }
    }

    pub fn classify(&self, model: &ModelHierarchy) -> Classification {
        let mut sub_meshes = Vec::new();
        for node_id in model.meshes() {
            let Some(node) = model.node(node_id) else {
                continue;
            };
            let Some(mesh) = &node.mesh else {
                continue;
            };
            let parent_name = model.parent_name(node_id).to_string();
            let material_name = mesh.material.name.clone();
            let class = if self.is_fabric(&material_name, &node.name, &parent_name) {
                MaterialClass::Fabric
            } else {
                MaterialClass::Structural
            };
            let region = self.region(&material_name, &node.name, &parent_name);
            debug!(
                "Sub-mesh {parent_name}/{}: material {material_name:?}, {class:?}, {region:?}",
                node.name
            );
            sub_meshes.push(SubMesh {
                node: node_id,
                key: TargetKey::new(&parent_name, &node.name),
                mesh_name: node.name.clone(),
                parent_name,
                material_name,
                class,
                region,
            });
        }

        let naming = &self.config.naming;
        let main_cap = find_group_mesh(&sub_meshes, &naming.main_group);
        let bill = find_group_mesh(&sub_meshes, &naming.bill_group);

        // Unnamed models: the fallback main target also becomes the crown region
        if sub_meshes.iter().all(|s| s.region != Region::MainCap) {
            if let Some(crown) = sub_meshes.iter_mut().find(|s| Some(&s.key) == main_cap.as_ref()) {
                crown.region = Region::MainCap;
            }
        }

        info!(
            "Classified {} sub-meshes ({} fabric), main cap {:?}, bill {:?}",
            sub_meshes.len(),
            sub_meshes.iter().filter(|s| s.is_fabric()).count(),
            main_cap.as_ref().map(TargetKey::as_str),
            bill.as_ref().map(TargetKey::as_str),
        );
        Classification {
            sub_meshes,
            main_cap,
            bill,
        }
    }

    /// Bake every sub-mesh into model space and index it by key.
    pub fn bake_targets(&self, model: &ModelHierarchy, classification: &Classification) -> DecalTargets {
        let mut targets = DecalTargets::new();
        for sub_mesh in &classification.sub_meshes {
            let Some(mesh) = model.node(sub_mesh.node).and_then(|n| n.mesh.as_ref()) else {
                continue;
            };
            if !mesh.primitive.is_valid() {
                debug!("Skipping invalid geometry for {}", sub_mesh.key);
                continue;
            }
            let geometry = bake_primitive(&mesh.primitive, model.model_transform(sub_mesh.node));
            targets.insert(DecalTargetGeometry {
                key: sub_mesh.key.clone(),
                parent_name: sub_mesh.parent_name.clone(),
                mesh_name: sub_mesh.mesh_name.clone(),
                geometry,
            });
        }
        if let Some(main) = &classification.main_cap {
            targets.set_main(main);
        }
        targets
    }
}

/// First non-band mesh under `group`, falling back to the first non-band
/// mesh of all.
fn find_group_mesh(sub_meshes: &[SubMesh], group: &str) -> Option<TargetKey> {
    let mut surfaces = sub_meshes.iter().filter(|s| s.region != Region::Band);
    surfaces
        .clone()
        .find(|s| s.parent_name == group)
        .or_else(|| surfaces.next())
        .map(|s| s.key.clone())
}

fn contains_any(haystack: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|k| !k.is_empty() && haystack.contains(&k.to_lowercase()))
}
