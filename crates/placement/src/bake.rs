//! World-space baking of sub-mesh geometry.

use glam::{Mat4, Vec3};

use crate::hierarchy::MeshPrimitive;

/// Degenerate vectors shorter than this (squared) are replaced.
pub(crate) const DEGENERATE_LENGTH_SQUARED: f32 = 1e-10;

/// Copy `primitive` through `transform` and recompute vertex normals.
///
/// Normals are area-weighted face normals summed per vertex, so they stay
/// correct under non-uniform scale.
pub fn bake_primitive(primitive: &MeshPrimitive, transform: Mat4) -> MeshPrimitive {
    let positions: Vec<Vec3> = primitive
        .positions
        .iter()
        .map(|&p| transform.transform_point3(p))
        .collect();
    let normals = compute_vertex_normals(&positions, &primitive.indices);
    MeshPrimitive {
        positions,
        normals,
        uvs: primitive.uvs.clone(),
        indices: primitive.indices.clone(),
    }
}

pub fn compute_vertex_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        // Cross product length is twice the area
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals
        .into_iter()
        .map(|n| {
            if n.length_squared() < DEGENERATE_LENGTH_SQUARED {
                Vec3::Z
            } else {
                n.normalize()
            }
        })
        .collect()
}
