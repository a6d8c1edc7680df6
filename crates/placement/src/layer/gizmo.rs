//! Decal transforms and gizmo write-back.

use capforge_design::Decal;
use glam::{EulerRot, Mat4, Quat, Vec3};

/// Position, rotation and scale of a decal plane in model space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecalTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl DecalTransform {
    pub fn from_decal(decal: &Decal) -> Self {
        let [x, y, z] = decal.rotation;
        Self {
            position: Vec3::from_array(decal.position),
            rotation: Quat::from_euler(EulerRot::XYZ, x, y, z),
            scale: Vec3::from_array(decal.scale),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Decompose a gizmo's output matrix into the decal's stored fields.
///
/// Scale is forced uniform and positive, since decals are never stretched.
/// Returns `None` for matrices with non-finite parts.
pub fn apply_gizmo(decal: &Decal, matrix: Mat4) -> Option<Decal> {
    let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
    if !(scale.is_finite() && rotation.is_finite() && translation.is_finite()) {
        return None;
    }
    let (x, y, z) = rotation.normalize().to_euler(EulerRot::XYZ);
    let mut updated = decal.clone();
    updated.position = translation.to_array();
    updated.rotation = [x, y, z];
    updated.scale = Decal::normalized_scale(scale.to_array());
    Some(updated)
}
