//! Ray picking against baked decal targets.
//!
//! Uses the Moller-Trumbore ray/triangle test. Targets are in model space, so
//! the world ray is brought into model space first and hits are reported
//! back in world space, ready for the hit mapper.

use glam::{Mat4, Vec2, Vec3};

use crate::bake::DEGENERATE_LENGTH_SQUARED;
use crate::hierarchy::MeshPrimitive;
use crate::targets::{DecalTargets, TargetKey};

/// Epsilon for floating point comparisons in ray intersection
const EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    fn transformed(&self, transform: Mat4) -> Self {
        Self {
            origin: transform.transform_point3(self.origin),
            direction: transform.transform_vector3(self.direction),
        }
    }
}

/// Result of a ray-triangle intersection test
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    /// Distance along the ray in units of the ray direction
    pub t: f32,
    /// Barycentric weight of vertex 1
    pub u: f32,
    /// Barycentric weight of vertex 2
    pub v: f32,
}

pub fn ray_triangle_intersection(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = ray.direction.cross(edge2);
    let det = edge1.dot(pvec);

    // Ray parallel to the triangle plane
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = ray.origin - v0;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = ray.direction.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    if t < EPSILON {
        return None;
    }
    Some(TriangleHit { t, u, v })
}

pub fn interpolate_vec2(v0: Vec2, v1: Vec2, v2: Vec2, u: f32, v: f32) -> Vec2 {
    let w = 1.0 - u - v;
    v0 * w + v1 * u + v2 * v
}

/// Closest hit of a ray on one primitive: triangle index and intersection.
pub fn raycast_primitive(ray: &Ray, primitive: &MeshPrimitive) -> Option<(usize, TriangleHit)> {
    let mut closest: Option<(usize, TriangleHit)> = None;
    for (tri_index, tri) in primitive.indices.chunks_exact(3).enumerate() {
        let (Some(&v0), Some(&v1), Some(&v2)) = (
            primitive.positions.get(tri[0] as usize),
            primitive.positions.get(tri[1] as usize),
            primitive.positions.get(tri[2] as usize),
        ) else {
            continue;
        };
        if let Some(hit) = ray_triangle_intersection(ray, v0, v1, v2) {
            if closest.is_none_or(|(_, prev)| hit.t < prev.t) {
                closest = Some((tri_index, hit));
            }
        }
    }
    closest
}

/// A pointer hit on a decal target, in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceHit {
    pub key: TargetKey,
    pub point: Vec3,
    /// Geometric normal of the hit face in the hit mesh's own space.
    /// `None` when the face could not be resolved.
    pub face_normal: Option<Vec3>,
    pub uv: Option<Vec2>,
    /// World transform of the hit mesh
    pub mesh_world: Mat4,
    pub distance: f32,
}

/// Closest hit of a world-space ray over all targets of a model placed at
/// `model_world`.
pub fn raycast_targets(ray: &Ray, model_world: Mat4, targets: &DecalTargets) -> Option<SurfaceHit> {
    if model_world.determinant().abs() < EPSILON {
        return None;
    }
    let local_ray = ray.transformed(model_world.inverse());

    let mut best: Option<SurfaceHit> = None;
    for target in targets.iter() {
        let geometry = &target.geometry;
        let Some((tri_index, hit)) = raycast_primitive(&local_ray, geometry) else {
            continue;
        };
        let local_point = local_ray.origin + local_ray.direction * hit.t;
        let point = model_world.transform_point3(local_point);
        let distance = point.distance(ray.origin);
        if best.as_ref().is_some_and(|b| b.distance <= distance) {
            continue;
        }

        let tri = &geometry.indices[tri_index * 3..tri_index * 3 + 3];
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (p0, p1, p2) = (geometry.positions[i0], geometry.positions[i1], geometry.positions[i2]);
        let face = (p1 - p0).cross(p2 - p0);
        let face_normal = (face.length_squared() >= DEGENERATE_LENGTH_SQUARED).then(|| face.normalize());
        let uv = match (geometry.uvs.get(i0), geometry.uvs.get(i1), geometry.uvs.get(i2)) {
            (Some(&a), Some(&b), Some(&c)) => Some(interpolate_vec2(a, b, c, hit.u, hit.v)),
            _ => None,
        };

        best = Some(SurfaceHit {
            key: target.key.clone(),
            point,
            face_normal,
            uv,
            mesh_world: model_world,
            distance,
        });
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::tests::quad;
    use crate::targets::DecalTargetGeometry;

    fn single_target(z: f32) -> DecalTargets {
        let mut primitive = quad();
        for p in &mut primitive.positions {
            p.z = z;
        }
        let mut targets = DecalTargets::new();
        targets.insert(DecalTargetGeometry {
            key: TargetKey::new("main_cap", &format!("panel_{z}")),
            parent_name: "main_cap".to_string(),
            mesh_name: format!("panel_{z}"),
            geometry: primitive,
        });
        targets
    }

    #[test]
    fn test_ray_triangle_hit() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::NEG_Z);
        let hit = ray_triangle_intersection(&ray, Vec3::ZERO, Vec3::X, Vec3::Y).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-6);
        assert!((hit.u - 0.25).abs() < 1e-6);
        assert!((hit.v - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_ray_triangle_miss_and_behind() {
        let outside = Ray::new(Vec3::new(2.0, 2.0, 1.0), Vec3::NEG_Z);
        assert!(ray_triangle_intersection(&outside, Vec3::ZERO, Vec3::X, Vec3::Y).is_none());
        let behind = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::Z);
        assert!(ray_triangle_intersection(&behind, Vec3::ZERO, Vec3::X, Vec3::Y).is_none());
    }

    #[test]
    fn test_raycast_targets_reports_world_hit_and_uv() {
        let targets = single_target(0.0);
        let model_world = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let ray = Ray::new(Vec3::new(0.25, 0.0, 5.0), Vec3::NEG_Z);

        let hit = raycast_targets(&ray, model_world, &targets).unwrap();
        assert!((hit.point - Vec3::new(0.25, 0.0, -5.0)).length() < 1e-5);
        assert!((hit.distance - 10.0).abs() < 1e-4);
        assert!((hit.face_normal.unwrap() - Vec3::Z).length() < 1e-6);
        let uv = hit.uv.unwrap();
        assert!((uv - Vec2::new(0.75, 0.5)).length() < 1e-5);
    }

    #[test]
    fn test_closest_target_wins() {
        let mut targets = single_target(0.0);
        let mut front = quad();
        for p in &mut front.positions {
            p.z = 0.3;
        }
        targets.insert(DecalTargetGeometry {
            key: TargetKey::new("main_cap", "front"),
            parent_name: "main_cap".to_string(),
            mesh_name: "front".to_string(),
            geometry: front,
        });
        let ray = Ray::new(Vec3::new(0.0, 0.1, 2.0), Vec3::NEG_Z);
        let hit = raycast_targets(&ray, Mat4::IDENTITY, &targets).unwrap();
        assert_eq!(hit.key, TargetKey::new("main_cap", "front"));
    }
}
