//! Arena representation of a loaded model.
//!
//! Nodes live in one flat list and refer to each other by index. The root is
//! always node 0. Traversal is depth-first pre-order in child insertion order,
//! so "first mesh encountered" is stable across runs.

use glam::{Mat4, Vec2, Vec3};

pub type NodeId = usize;

/// Triangle geometry of one sub-mesh, in the node's own space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshPrimitive {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl MeshPrimitive {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Indices are in range and come in whole triangles.
    pub fn is_valid(&self) -> bool {
        self.indices.len() % 3 == 0
            && self
                .indices
                .iter()
                .all(|&i| (i as usize) < self.positions.len())
    }
}

/// Material as imported.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    pub name: String,
    pub base_color: [f32; 4],
}

impl MaterialDesc {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color: [1.0; 4],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub primitive: MeshPrimitive,
    pub material: MaterialDesc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Transform relative to the parent
    pub local: Mat4,
    pub mesh: Option<MeshData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelHierarchy {
    nodes: Vec<ModelNode>,
}

impl ModelHierarchy {
    pub const ROOT: NodeId = 0;

    pub fn new(root_name: impl Into<String>, root_transform: Mat4) -> Self {
        Self {
            nodes: vec![ModelNode {
                name: root_name.into(),
                parent: None,
                children: Vec::new(),
                local: root_transform,
                mesh: None,
            }],
        }
    }

    /// Add an empty group under `parent`.
    pub fn add_group(&mut self, parent: NodeId, name: impl Into<String>, local: Mat4) -> NodeId {
        self.push(parent, name.into(), local, None)
    }

    /// Add a sub-mesh under `parent`.
    pub fn add_mesh(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        local: Mat4,
        primitive: MeshPrimitive,
        material: MaterialDesc,
    ) -> NodeId {
        self.push(
            parent,
            name.into(),
            local,
            Some(MeshData {
                primitive,
                material,
            }),
        )
    }

    fn push(&mut self, parent: NodeId, name: String, local: Mat4, mesh: Option<MeshData>) -> NodeId {
        // Unknown parents attach to the root so the tree stays connected
        let parent = if parent < self.nodes.len() {
            parent
        } else {
            Self::ROOT
        };
        let id = self.nodes.len();
        self.nodes.push(ModelNode {
            name,
            parent: Some(parent),
            children: Vec::new(),
            local,
            mesh,
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&ModelNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Name of the parent node, empty for the root.
    pub fn parent_name(&self, id: NodeId) -> &str {
        self.node(id)
            .and_then(|n| n.parent)
            .and_then(|p| self.node(p))
            .map(|p| p.name.as_str())
            .unwrap_or("")
    }

    /// Depth-first pre-order from the root.
    pub fn traverse(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(node) = self.nodes.get(id) {
                stack.extend(node.children.iter().rev());
            }
        }
        order
    }

    /// Mesh nodes in traversal order.
    pub fn meshes(&self) -> Vec<NodeId> {
        self.traverse()
            .into_iter()
            .filter(|&id| self.nodes[id].mesh.is_some())
            .collect()
    }

    /// Accumulated transform from `id` up to, but not including, the root.
    pub fn model_transform(&self, id: NodeId) -> Mat4 {
        let mut transform = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == Self::ROOT {
                break;
            }
            let Some(node) = self.nodes.get(node_id) else {
                break;
            };
            transform = node.local * transform;
            current = node.parent;
        }
        transform
    }

    /// Root transform, which places the model in the world.
    pub fn root_transform(&self) -> Mat4 {
        self.nodes[Self::ROOT].local
    }

    pub fn world_transform(&self, id: NodeId) -> Mat4 {
        self.root_transform() * self.model_transform(id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two-triangle unit quad in the XY plane facing +Z.
    pub(crate) fn quad() -> MeshPrimitive {
        MeshPrimitive {
            positions: vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ],
            normals: vec![Vec3::Z; 4],
            uvs: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// root -> main_cap -> {crown, sweatband}, root -> bill -> visor, root -> button
    pub(crate) fn cap_model() -> ModelHierarchy {
        let mut model = ModelHierarchy::new("Scene", Mat4::from_scale(Vec3::splat(10.0)));
        let main = model.add_group(ModelHierarchy::ROOT, "main_cap", Mat4::IDENTITY);
        model.add_mesh(
            main,
            "crown",
            Mat4::from_translation(Vec3::new(0.0, 0.1, 0.0)),
            quad(),
            MaterialDesc::named("Cotton_Twill"),
        );
        model.add_mesh(main, "sweatband", Mat4::IDENTITY, quad(), MaterialDesc::named("Inner"));
        let bill = model.add_group(
            ModelHierarchy::ROOT,
            "bill",
            Mat4::from_translation(Vec3::new(0.0, 0.0, 0.5)),
        );
        model.add_mesh(bill, "visor", Mat4::IDENTITY, quad(), MaterialDesc::named("Material.001"));
        model.add_mesh(
            ModelHierarchy::ROOT,
            "button",
            Mat4::IDENTITY,
            quad(),
            MaterialDesc::named("Metal"),
        );
        model
    }

    #[test]
    fn test_traversal_is_preorder() {
        let model = cap_model();
        let names: Vec<&str> = model
            .traverse()
            .into_iter()
            .map(|id| model.node(id).unwrap().name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Scene", "main_cap", "crown", "sweatband", "bill", "visor", "button"]
        );
    }

    #[test]
    fn test_model_transform_excludes_root() {
        let model = cap_model();
        let crown = model.meshes()[0];
        let point = model.model_transform(crown).transform_point3(Vec3::ZERO);
        assert!((point - Vec3::new(0.0, 0.1, 0.0)).length() < 1e-6);

        let world = model.world_transform(crown).transform_point3(Vec3::ZERO);
        assert!((world - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_parent_names() {
        let model = cap_model();
        let meshes = model.meshes();
        assert_eq!(model.parent_name(meshes[0]), "main_cap");
        assert_eq!(model.parent_name(meshes[3]), "Scene");
        assert_eq!(model.parent_name(ModelHierarchy::ROOT), "");
    }

    #[test]
    fn test_invalid_primitive() {
        let mut broken = quad();
        broken.indices.push(9);
        assert!(!broken.is_valid());
        assert!(quad().is_valid());
    }
}
