//! Decal meshes conformed to baked target geometry.
//!
//! A decal's projector is the model-space matrix of its unit box: x and y
//! span the image, z is the projection depth. Every target triangle is moved
//! into that box, clipped to it and fanned back into triangles, so the decal
//! follows the surface curvature instead of floating as a flat quad.

use glam::{Mat4, Vec2, Vec3};
use tracing::debug;

use crate::hierarchy::MeshPrimitive;

/// Half extent of the projector box on every axis.
const HALF: f32 = 0.5;

#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    /// Position in projector space
    local: Vec3,
    /// Normal in model space
    normal: Vec3,
}

impl ClipVertex {
    fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            local: self.local.lerp(other.local, t),
            normal: self.normal.lerp(other.normal, t),
        }
    }
}

/// Keep the part of `polygon` on the inner side of the plane
/// `sign * local[axis] = HALF`.
fn clip_polygon(polygon: &[ClipVertex], axis: usize, sign: f32) -> Vec<ClipVertex> {
    let distance = |v: &ClipVertex| HALF - sign * v.local[axis];
    let mut clipped = Vec::with_capacity(polygon.len() + 1);
    for (i, current) in polygon.iter().enumerate() {
        let previous = polygon[(i + polygon.len() - 1) % polygon.len()];
        let (d_current, d_previous) = (distance(current), distance(&previous));
        if d_current >= 0.0 {
            if d_previous < 0.0 {
                clipped.push(previous.lerp(*current, d_previous / (d_previous - d_current)));
            }
            clipped.push(*current);
        } else if d_previous >= 0.0 {
            clipped.push(previous.lerp(*current, d_previous / (d_previous - d_current)));
        }
    }
    clipped
}

/// Project `target` through `projector` and return the covered part of the
/// surface, lifted `offset` along its normals. UVs come from the projector's
/// x and y; `flip_y` flips V for rasters stored bottom row first.
///
/// Faces turned away from the projection axis are skipped. Returns `None`
/// for a degenerate projector or when nothing lands inside the box.
pub fn project_decal(
    target: &MeshPrimitive,
    projector: Mat4,
    offset: f32,
    flip_y: bool,
) -> Option<MeshPrimitive> {
    if !projector.is_finite() || projector.determinant().abs() <= f32::EPSILON {
        return None;
    }
    let inverse = projector.inverse();
    let axis = projector.transform_vector3(Vec3::Z).normalize_or_zero();

    let mut out = MeshPrimitive::default();
    for triangle in target.indices.chunks_exact(3) {
        let corners = [triangle[0], triangle[1], triangle[2]].map(|i| {
            let i = i as usize;
            ClipVertex {
                local: inverse.transform_point3(target.positions[i]),
                normal: target.normals.get(i).copied().unwrap_or(axis),
            }
        });
        if corners.iter().map(|c| c.normal).sum::<Vec3>().dot(axis) <= 0.0 {
            continue;
        }
        let mut polygon = corners.to_vec();
        for axis_index in 0..3 {
            for sign in [-1.0, 1.0] {
                polygon = clip_polygon(&polygon, axis_index, sign);
                if polygon.is_empty() {
                    break;
                }
            }
        }
        if polygon.len() < 3 {
            continue;
        }

        let base = out.positions.len() as u32;
        for vertex in &polygon {
            let normal = vertex.normal.try_normalize().unwrap_or(axis);
            out.positions
                .push(projector.transform_point3(vertex.local) + normal * offset);
            out.normals.push(normal);
            let v = if flip_y {
                HALF + vertex.local.y
            } else {
                HALF - vertex.local.y
            };
            out.uvs.push(Vec2::new(vertex.local.x + HALF, v));
        }
        for k in 1..polygon.len() as u32 - 1 {
            out.indices.extend([base, base + k, base + k + 1]);
        }
    }

    if out.indices.is_empty() {
        return None;
    }
    debug!(
        "Projected decal: {} of {} triangles",
        out.triangle_count(),
        target.triangle_count()
    );
    Some(out)
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;

    /// 2x2 grid of quads on the z = 0 plane spanning [-1, 1], normals +Z.
    fn flat_sheet() -> MeshPrimitive {
        let mut sheet = MeshPrimitive::default();
        for y in 0..3 {
            for x in 0..3 {
                sheet.positions.push(Vec3::new(x as f32 - 1.0, y as f32 - 1.0, 0.0));
                sheet.normals.push(Vec3::Z);
                sheet.uvs.push(Vec2::new(x as f32 / 2.0, y as f32 / 2.0));
            }
        }
        for y in 0..2 {
            for x in 0..2 {
                let i = y * 3 + x;
                sheet.indices.extend([i, i + 1, i + 4, i, i + 4, i + 3]);
            }
        }
        sheet
    }

    /// Curved strip bent around the Y axis, facing +Z.
    fn bent_strip() -> MeshPrimitive {
        let mut strip = MeshPrimitive::default();
        let steps = 8;
        for i in 0..=steps {
            let angle = -0.8 + 1.6 * i as f32 / steps as f32;
            let normal = Vec3::new(angle.sin(), 0.0, angle.cos());
            for y in [-1.0, 1.0] {
                strip.positions.push(normal + Vec3::new(0.0, y, -1.0));
                strip.normals.push(normal);
                strip.uvs.push(Vec2::ZERO);
            }
        }
        for i in 0..steps {
            let a = i * 2;
            strip.indices.extend([a, a + 2, a + 3, a, a + 3, a + 1]);
        }
        strip
    }

    #[test]
    fn test_projection_clips_to_the_box() {
        let projector = Mat4::from_scale(Vec3::splat(1.0));
        let mesh = project_decal(&flat_sheet(), projector, 0.0, false).unwrap();
        assert!(mesh.is_valid());
        for position in &mesh.positions {
            assert!(position.x.abs() <= 0.5 + 1e-5 && position.y.abs() <= 0.5 + 1e-5);
        }
        for uv in &mesh.uvs {
            assert!((-1e-5..=1.0 + 1e-5).contains(&uv.x));
            assert!((-1e-5..=1.0 + 1e-5).contains(&uv.y));
        }
        // Covered area equals the unit box face
        let area: f32 = mesh
            .indices
            .chunks_exact(3)
            .map(|t| {
                let [a, b, c] = [0, 1, 2].map(|k| mesh.positions[t[k] as usize]);
                (b - a).cross(c - a).length() / 2.0
            })
            .sum();
        assert!((area - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_uv_follows_projector_axes() {
        let projector = Mat4::from_scale(Vec3::splat(2.0));
        let upright = project_decal(&flat_sheet(), projector, 0.0, false).unwrap();
        let flipped = project_decal(&flat_sheet(), projector, 0.0, true).unwrap();
        for (i, position) in upright.positions.iter().enumerate() {
            let uv = upright.uvs[i];
            assert!((uv.x - (position.x / 2.0 + 0.5)).abs() < 1e-5);
            assert!((uv.y - (0.5 - position.y / 2.0)).abs() < 1e-5);
            assert!((flipped.uvs[i].y - (1.0 - uv.y)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_projection_hugs_curved_surface_with_offset() {
        let strip = bent_strip();
        let projector = Mat4::from_scale_rotation_translation(
            Vec3::new(0.8, 0.5, 0.8),
            Quat::IDENTITY,
            Vec3::ZERO,
        );
        let mesh = project_decal(&strip, projector, 0.01, false).unwrap();
        // Every vertex sits on the unit cylinder around (0, y, -1), lifted by the offset
        for position in &mesh.positions {
            let radial = Vec2::new(position.x, position.z + 1.0).length();
            assert!((radial - 1.01).abs() < 0.01, "radial {radial}");
        }
        // The mesh curves away from the flat plane z = 0 toward its edges
        let min_z = mesh.positions.iter().map(|p| p.z).fold(f32::MAX, f32::min);
        assert!(min_z < -0.03);
    }

    #[test]
    fn test_back_faces_and_misses_give_nothing() {
        let facing_away = Mat4::from_rotation_y(std::f32::consts::PI);
        assert!(project_decal(&flat_sheet(), facing_away, 0.0, false).is_none());

        let far = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        assert!(project_decal(&flat_sheet(), far, 0.0, false).is_none());

        assert!(project_decal(&flat_sheet(), Mat4::ZERO, 0.0, false).is_none());
    }
}
