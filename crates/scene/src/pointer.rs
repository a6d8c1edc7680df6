//! Pointer routing between decal planes, the drawing surface and the camera.
//!
//! Each frame the cursor is cast into the scene once. A press on a decal
//! plane selects and drags that decal; a press on the crown fabric is offered to the
//! drawing surface through the UV bridge. Either one claims the gesture, and
//! the camera ignores claimed gestures until the button is released.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use compositing::ViewportPointerEvent;
use placement::{Classification, PointerHit, Ray, Region, SurfaceHit, raycast_targets};

use crate::ScenePhase;
use crate::camera::MainCamera;
use crate::decals::{DecalLayer, plane_world};
use crate::design::DesignResource;
use crate::drawing::LiveDrawingTexture;
use crate::model::ModelState;

/// Who owns the current left-button gesture.
#[derive(Resource, Debug, Default)]
pub struct PointerCapture {
    /// The gesture was claimed by a decal or the drawing surface
    pub consumed: bool,
    pub dragging_decal: Option<String>,
    hovered: Option<String>,
}

pub struct PointerPlugin;

impl Plugin for PointerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PointerCapture>()
            .add_systems(Update, route_pointer.in_set(ScenePhase::Input));
    }
}

/// Distance along `ray` to a unit quad (facing +Z in its own space) placed
/// at `world`.
pub fn ray_quad_distance(ray: &Ray, world: Mat4) -> Option<f32> {
    if world.determinant().abs() < f32::EPSILON {
        return None;
    }
    let inverse = world.inverse();
    let origin = inverse.transform_point3(ray.origin);
    let direction = inverse.transform_vector3(ray.direction);
    if direction.z.abs() < 1e-6 {
        return None;
    }
    let t = -origin.z / direction.z;
    if t <= 0.0 {
        return None;
    }
    let local = origin + direction * t;
    if local.x.abs() > 0.5 || local.y.abs() > 0.5 {
        return None;
    }
    Some(world.transform_point3(local).distance(ray.origin))
}

/// Nearest plane hit by `ray`.
pub fn pick_plane<'a>(
    ray: &Ray,
    planes: impl IntoIterator<Item = (&'a str, Mat4)>,
) -> Option<(&'a str, f32)> {
    planes
        .into_iter()
        .filter_map(|(id, world)| ray_quad_distance(ray, world).map(|d| (id, d)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Model UVs have V pointing down the texture; the bridge expects it up.
pub fn bridge_uv(hit: &SurfaceHit) -> ViewportPointerEvent {
    match hit.uv {
        Some(uv) => ViewportPointerEvent::at_uv(Vec2::new(uv.x, 1.0 - uv.y)),
        None => ViewportPointerEvent::without_uv(),
    }
}

/// Bridge event for a surface hit. Only fabric on the main cap carries the
/// drawing texture; hits anywhere else give `None`.
pub fn drawing_event(classification: &Classification, hit: &SurfaceHit) -> Option<ViewportPointerEvent> {
    let sub_mesh = classification.get(&hit.key)?;
    (sub_mesh.is_fabric() && sub_mesh.region == Region::MainCap).then(|| bridge_uv(hit))
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn route_pointer(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    globals: Query<&GlobalTransform>,
    model: Res<ModelState>,
    mut capture: ResMut<PointerCapture>,
    mut layer: ResMut<DecalLayer>,
    mut design: ResMut<DesignResource>,
    mut drawing: Option<ResMut<LiveDrawingTexture>>,
) {
    let ray = windows
        .single()
        .ok()
        .and_then(|window| window.cursor_position())
        .zip(cameras.single().ok())
        .and_then(|(cursor, (camera, camera_global))| {
            camera.viewport_to_world(camera_global, cursor).ok()
        })
        .map(|ray| Ray::new(ray.origin, *ray.direction));

    let model_world = model
        .root()
        .and_then(|root| globals.get(root).ok())
        .map_or(Mat4::IDENTITY, |global| Mat4::from(global.affine()));
    let targets = model.targets();

    let (decal_hit, surface_hit) = match &ray {
        Some(ray) => {
            let visuals = layer.0.visuals(&design.design, targets.as_deref());
            let decal = pick_plane(
                ray,
                visuals.iter().map(|v| (v.id, plane_world(v, model_world))),
            )
            .map(|(id, distance)| (id.to_string(), distance));
            let surface = targets
                .as_deref()
                .and_then(|t| raycast_targets(ray, model_world, t));
            (decal, surface)
        }
        None => (None, None),
    };
    let drawing_hit = surface_hit
        .as_ref()
        .and_then(|hit| drawing_event(model.classification(), hit));
    // A decal sits just above the surface it is on, so it wins ties
    let over_decal = decal_hit
        .as_ref()
        .filter(|(_, d)| surface_hit.as_ref().is_none_or(|s| *d <= s.distance + 1e-3))
        .map(|(id, _)| id.clone());

    if capture.hovered != over_decal {
        if let Some(previous) = capture.hovered.take() {
            layer.0.pointer_out(&previous);
        }
        if let Some(id) = &over_decal {
            layer.0.pointer_over(id);
        }
        capture.hovered = over_decal.clone();
    }

    if buttons.just_pressed(MouseButton::Left) {
        capture.consumed = false;
        if let Some(id) = over_decal {
            layer.0.select(&id);
            layer.0.begin_gizmo();
            capture.dragging_decal = Some(id);
            capture.consumed = true;
        } else if let (Some(mut event), Some(drawing)) = (drawing_hit, drawing.as_deref_mut()) {
            let drawing = &mut *drawing;
            drawing.bridge.on_pointer_down(&mut event, &mut drawing.adapter);
            capture.consumed = event.propagation_stopped();
        }
        if !capture.consumed && surface_hit.is_none() {
            layer.0.clear_selection();
        }
    } else if buttons.pressed(MouseButton::Left) {
        if let Some(id) = capture.dragging_decal.clone() {
            let moved = surface_hit.as_ref().zip(targets.as_deref()).and_then(|(hit, targets)| {
                let hit = PointerHit::from_surface_hit(hit, model_world, targets)?;
                layer.0.drag_to(&design.design, &id, &hit)
            });
            if let Some(next) = moved {
                design.replace(next);
            }
        } else if let Some(drawing) = drawing.as_deref_mut()
            && drawing.bridge.is_dragging()
        {
            let mut event = drawing_hit.unwrap_or_else(ViewportPointerEvent::without_uv);
            drawing.bridge.on_pointer_move(&mut event, &mut drawing.adapter);
        }
    }

    if buttons.just_released(MouseButton::Left) {
        if capture.dragging_decal.take().is_some() {
            layer.0.end_gizmo();
        }
        if let Some(drawing) = drawing.as_deref_mut() {
            let mut event = drawing_hit.unwrap_or_else(ViewportPointerEvent::without_uv);
            drawing.bridge.on_pointer_up(&mut event, &mut drawing.adapter);
        }
        capture.consumed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placement::{MaterialClass, SubMesh, TargetKey};

    fn forward_ray() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z)
    }

    #[test]
    fn test_ray_hits_quad_inside_bounds() {
        let world = Mat4::from_translation(Vec3::new(0.2, 0.0, 1.0));
        let distance = ray_quad_distance(&forward_ray(), world).unwrap();
        assert!((distance - 4.0).abs() < 1e-5);

        let off = Mat4::from_translation(Vec3::new(0.6, 0.0, 1.0));
        assert!(ray_quad_distance(&forward_ray(), off).is_none());
    }

    #[test]
    fn test_quad_behind_ray_or_edge_on_is_missed() {
        let behind = Mat4::from_translation(Vec3::new(0.0, 0.0, 6.0));
        assert!(ray_quad_distance(&forward_ray(), behind).is_none());

        let edge_on = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        assert!(ray_quad_distance(&forward_ray(), edge_on).is_none());

        assert!(ray_quad_distance(&forward_ray(), Mat4::ZERO).is_none());
    }

    #[test]
    fn test_pick_nearest_plane() {
        let planes = [
            ("far", Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0))),
            ("near", Mat4::from_translation(Vec3::new(0.0, 0.0, 1.0))),
            ("aside", Mat4::from_translation(Vec3::new(3.0, 0.0, 2.0))),
        ];
        let (id, _) = pick_plane(&forward_ray(), planes).unwrap();
        assert_eq!(id, "near");
    }

    fn sub_mesh(node: usize, parent: &str, mesh: &str, class: MaterialClass, region: Region) -> SubMesh {
        SubMesh {
            node,
            key: TargetKey::new(parent, mesh),
            mesh_name: mesh.to_string(),
            parent_name: parent.to_string(),
            material_name: "fabric".to_string(),
            class,
            region,
        }
    }

    fn hit_on(parent: &str, mesh: &str) -> SurfaceHit {
        SurfaceHit {
            key: TargetKey::new(parent, mesh),
            point: Vec3::ZERO,
            face_normal: Some(Vec3::Z),
            uv: Some(Vec2::new(0.5, 0.5)),
            mesh_world: Mat4::IDENTITY,
            distance: 1.0,
        }
    }

    #[test]
    fn test_only_crown_fabric_reaches_the_bridge() {
        let classification = Classification {
            sub_meshes: vec![
                sub_mesh(1, "main_cap", "crown", MaterialClass::Fabric, Region::MainCap),
                sub_mesh(2, "main_cap", "sweatband", MaterialClass::Fabric, Region::Band),
                sub_mesh(3, "main_cap", "button", MaterialClass::Structural, Region::MainCap),
                sub_mesh(4, "bill", "visor", MaterialClass::Fabric, Region::Bill),
            ],
            main_cap: Some(TargetKey::new("main_cap", "crown")),
            bill: Some(TargetKey::new("bill", "visor")),
        };
        let crown = drawing_event(&classification, &hit_on("main_cap", "crown")).unwrap();
        assert_eq!(crown.uv, Some(Vec2::new(0.5, 0.5)));

        assert!(drawing_event(&classification, &hit_on("bill", "visor")).is_none());
        assert!(drawing_event(&classification, &hit_on("main_cap", "sweatband")).is_none());
        assert!(drawing_event(&classification, &hit_on("main_cap", "button")).is_none());
        assert!(drawing_event(&classification, &hit_on("other", "mesh")).is_none());
    }

    #[test]
    fn test_bridge_uv_flips_v() {
        let mut hit = SurfaceHit {
            key: TargetKey::new("cap", "main_cap"),
            point: Vec3::ZERO,
            face_normal: None,
            uv: Some(Vec2::new(0.25, 0.1)),
            mesh_world: Mat4::IDENTITY,
            distance: 1.0,
        };
        let event = bridge_uv(&hit);
        let uv = event.uv.unwrap();
        assert!((uv - Vec2::new(0.25, 0.9)).length() < 1e-6);

        hit.uv = None;
        assert_eq!(bridge_uv(&hit).uv, None);
    }
}
