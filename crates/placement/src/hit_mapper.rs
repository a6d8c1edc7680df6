//! Converts a world-space pointer hit into a model-local decal placement.
//!
//! The output only depends on the hit and the model/mesh transforms, never on
//! the camera, so orbiting or zooming cannot move a placed decal.

use capforge_design::TargetRef;
use glam::{EulerRot, Mat4, Quat, Vec3};
use tracing::warn;

use crate::bake::DEGENERATE_LENGTH_SQUARED;
use crate::error::PlacementError;
use crate::raycast::SurfaceHit;
use crate::targets::DecalTargets;

/// Normal used when the computed one collapses to zero length.
pub const FALLBACK_NORMAL: Vec3 = Vec3::Z;

/// Placement of a decal in model-local space.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPlacement {
    pub position: Vec3,
    pub normal: Vec3,
    pub target: TargetRef,
}

/// Inputs of one pointer hit.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerHit {
    pub point: Vec3,
    /// Face normal in the hit mesh's own space, `None` when the raycaster
    /// could not provide face data.
    pub face_normal: Option<Vec3>,
    pub mesh_world: Mat4,
    pub model_world: Mat4,
    pub target: TargetRef,
}

impl PointerHit {
    /// Pair a target raycast hit with the model transform, looking the
    /// target's names up in `targets`.
    pub fn from_surface_hit(hit: &SurfaceHit, model_world: Mat4, targets: &DecalTargets) -> Option<Self> {
        let target = targets.get(&hit.key)?.target_ref();
        Some(Self {
            point: hit.point,
            face_normal: hit.face_normal,
            mesh_world: hit.mesh_world,
            model_world,
            target,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHitMapper {
    /// Distance the decal is lifted off the surface along its normal
    pub surface_offset: f32,
}

impl Default for SurfaceHitMapper {
    fn default() -> Self {
        Self {
            surface_offset: capforge_config::DEFAULT_SURFACE_OFFSET,
        }
    }
}

impl SurfaceHitMapper {
    pub fn new(surface_offset: f32) -> Self {
        Self { surface_offset }
    }

    /// Map a hit, or `None` when the placement would be invalid. Callers
    /// leave the decal where it was in that case.
    pub fn map_hit(&self, hit: &PointerHit) -> Option<LocalPlacement> {
        match self.try_map_hit(hit) {
            Ok(placement) => Some(placement),
            Err(err) => {
                warn!("Ignoring decal placement: {err}");
                None
            }
        }
    }

    pub fn try_map_hit(&self, hit: &PointerHit) -> Result<LocalPlacement, PlacementError> {
        let face_normal = hit.face_normal.ok_or(PlacementError::MissingFaceData)?;
        if !hit.point.is_finite() {
            return Err(PlacementError::NonFiniteHit);
        }
        if hit.model_world.determinant().abs() < f32::EPSILON {
            return Err(PlacementError::SingularTransform);
        }
        let world_to_model = hit.model_world.inverse();
        let local_point = world_to_model.transform_point3(hit.point);

        // Mesh-space face normal as a world direction
        let world_normal = hit
            .mesh_world
            .transform_vector3(face_normal)
            .normalize_or_zero();

        // Difference of two transformed points, not a direction transform,
        // so non-uniform model scale cannot skew it
        let tip = world_to_model.transform_point3(hit.point + world_normal);
        let normal = local_normal(tip - local_point);

        Ok(LocalPlacement {
            position: local_point + normal * self.surface_offset,
            normal,
            target: hit.target.clone(),
        })
    }
}

fn local_normal(raw: Vec3) -> Vec3 {
    if !raw.is_finite() || raw.length_squared() < DEGENERATE_LENGTH_SQUARED {
        FALLBACK_NORMAL
    } else {
        raw.normalize()
    }
}

/// Which side of the cap a decal faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecalSide {
    Front,
    Back,
}

impl DecalSide {
    pub fn from_normal(normal: Vec3) -> Self {
        if normal.z < 0.0 { Self::Back } else { Self::Front }
    }

    /// Stored Euler rotation of a planar decal: only the spin is free, the
    /// side decides whether the plane is turned around.
    pub fn rotation(self, spin: f32) -> [f32; 3] {
        match self {
            Self::Front => [0.0, 0.0, spin],
            Self::Back => [0.0, std::f32::consts::PI, spin],
        }
    }
}

/// Orientation that turns a plane's +Z onto `normal`, then spins it about
/// that normal.
pub fn orientation_from_normal(normal: Vec3, spin: f32) -> Quat {
    let normal = local_normal(normal);
    Quat::from_rotation_arc(Vec3::Z, normal) * Quat::from_rotation_z(spin)
}

/// [`orientation_from_normal`] as Euler XYZ angles.
pub fn euler_from_normal(normal: Vec3, spin: f32) -> [f32; 3] {
    let (x, y, z) = orientation_from_normal(normal, spin).to_euler(EulerRot::XYZ);
    [x, y, z]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(point: Vec3, normal: Option<Vec3>, mesh_world: Mat4, model_world: Mat4) -> PointerHit {
        PointerHit {
            point,
            face_normal: normal,
            mesh_world,
            model_world,
            target: TargetRef::new("main_cap", "crown"),
        }
    }

    #[test]
    fn test_identity_hit_is_offset_along_normal() {
        let mapper = SurfaceHitMapper::default();
        let placement = mapper
            .map_hit(&hit(Vec3::new(0.1, 0.2, 0.3), Some(Vec3::Z), Mat4::IDENTITY, Mat4::IDENTITY))
            .unwrap();
        assert!((placement.normal - Vec3::Z).length() < 1e-6);
        assert!((placement.position - Vec3::new(0.1, 0.2, 0.302)).length() < 1e-6);
        assert_eq!(placement.target.mesh_name, "crown");
    }

    #[test]
    fn test_world_hit_maps_into_model_space() {
        let model_world = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::new(5.0, 0.0, 0.0),
        );
        // Model-local point (0, 0, 1) with local normal +Z
        let world_point = model_world.transform_point3(Vec3::new(0.0, 0.0, 1.0));
        let placement = SurfaceHitMapper::new(0.0)
            .map_hit(&hit(world_point, Some(Vec3::Z), model_world, model_world))
            .unwrap();
        assert!((placement.position - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-5);
        assert!((placement.normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_non_uniform_scale_keeps_unit_normal() {
        let model_world = Mat4::from_scale(Vec3::new(4.0, 1.0, 0.5));
        let placement = SurfaceHitMapper::default()
            .map_hit(&hit(Vec3::ZERO, Some(Vec3::new(1.0, 1.0, 0.0)), model_world, model_world))
            .unwrap();
        assert!((placement.normal.length() - 1.0).abs() < 1e-5);
        assert!(placement.normal.is_finite());
    }

    #[test]
    fn test_degenerate_normal_falls_back() {
        let placement = SurfaceHitMapper::default()
            .map_hit(&hit(Vec3::ONE, Some(Vec3::ZERO), Mat4::IDENTITY, Mat4::IDENTITY))
            .unwrap();
        assert_eq!(placement.normal, FALLBACK_NORMAL);
        assert!(placement.position.is_finite());
    }

    #[test]
    fn test_missing_face_data_is_refused() {
        let mapper = SurfaceHitMapper::default();
        let missing = hit(Vec3::ONE, None, Mat4::IDENTITY, Mat4::IDENTITY);
        assert!(mapper.map_hit(&missing).is_none());
        assert!(matches!(
            mapper.try_map_hit(&missing),
            Err(PlacementError::MissingFaceData)
        ));

        let singular = hit(Vec3::ONE, Some(Vec3::Z), Mat4::IDENTITY, Mat4::from_scale(Vec3::ZERO));
        assert!(matches!(
            mapper.try_map_hit(&singular),
            Err(PlacementError::SingularTransform)
        ));
    }

    #[test]
    fn test_repeated_hits_are_identical() {
        let mapper = SurfaceHitMapper::default();
        let model_world = Mat4::from_rotation_x(0.7);
        let input = hit(Vec3::new(0.3, -0.2, 0.9), Some(Vec3::new(0.2, 0.1, 1.0)), model_world, model_world);
        assert_eq!(mapper.map_hit(&input), mapper.map_hit(&input));
    }

    #[test]
    fn test_side_and_orientation() {
        assert_eq!(DecalSide::from_normal(Vec3::NEG_Z), DecalSide::Back);
        assert_eq!(DecalSide::from_normal(Vec3::Z), DecalSide::Front);
        assert_eq!(DecalSide::Front.rotation(0.5), [0.0, 0.0, 0.5]);

        let facing_x = orientation_from_normal(Vec3::X, 0.0) * Vec3::Z;
        assert!((facing_x - Vec3::X).length() < 1e-5);
        let spun = orientation_from_normal(Vec3::Z, std::f32::consts::FRAC_PI_2) * Vec3::X;
        assert!((spun - Vec3::Y).length() < 1e-5);
    }
}
