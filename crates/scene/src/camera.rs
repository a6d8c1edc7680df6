//! Orbit camera around the cap
//!
//! Controls:
//! - Left drag: orbit, unless the press landed on a decal or the drawing surface
//! - Right drag: pan
//! - Scroll wheel: dolly (zoom)

use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::input::mouse::{MouseButton, MouseMotion, MouseWheel};
use bevy::prelude::*;

use crate::ScenePhase;
use crate::pointer::{PointerCapture, route_pointer};

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Camera orbit controller state
#[derive(Component, Debug, Clone)]
pub struct OrbitCamera {
    /// Point the camera orbits around
    pub target: Vec3,
    pub distance: f32,
    /// Horizontal angle (yaw) in radians
    pub yaw: f32,
    /// Vertical angle (pitch) in radians
    pub pitch: f32,
    /// Radians per pixel
    pub orbit_sensitivity: f32,
    /// Units per pixel, scaled by distance
    pub pan_sensitivity: f32,
    /// Fraction of the distance per scroll line
    pub zoom_sensitivity: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        // Front three-quarter view of a cap roughly 0.25 units across
        Self {
            target: Vec3::new(0.0, 0.05, 0.0),
            distance: 0.6,
            yaw: 0.35,
            pitch: 0.25,
            orbit_sensitivity: 0.005,
            pan_sensitivity: 0.0015,
            zoom_sensitivity: 0.1,
            min_distance: 0.2,
            max_distance: 3.0,
        }
    }
}

impl OrbitCamera {
    /// Camera position from the orbit parameters. Pitch is measured from the
    /// horizontal, yaw around Y.
    pub fn calculate_position(&self) -> Vec3 {
        let horizontal_distance = self.distance * self.pitch.cos();
        let y = self.distance * self.pitch.sin();
        let x = horizontal_distance * self.yaw.sin();
        let z = horizontal_distance * self.yaw.cos();

        self.target + Vec3::new(x, y, z)
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw -= delta.x * self.orbit_sensitivity;
        // Just short of straight up/down so the view never flips
        self.pitch = (self.pitch - delta.y * self.orbit_sensitivity).clamp(-1.5, 1.5);
    }

    pub fn zoom(&mut self, lines: f32) {
        let amount = lines * self.zoom_sensitivity * self.distance;
        self.distance = (self.distance - amount).clamp(self.min_distance, self.max_distance);
    }
}

pub struct CameraControllerPlugin;

impl Plugin for CameraControllerPlugin {
    fn build(&self, app: &mut App) {
        // orbit and pan both read MouseMotion and must see the pointer capture
        app.add_systems(Startup, spawn_camera).add_systems(
            Update,
            (
                camera_orbit_system,
                camera_pan_system,
                camera_zoom_system,
                update_camera_transform,
            )
                .chain()
                .in_set(ScenePhase::Input)
                .after(route_pointer),
        );
    }
}

fn spawn_camera(mut commands: Commands) {
    let orbit = OrbitCamera::default();
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(orbit.calculate_position()).looking_at(orbit.target, Vec3::Y),
        Tonemapping::Reinhard,
        MainCamera,
        orbit,
    ));
}

fn camera_orbit_system(
    mouse_button: Res<ButtonInput<MouseButton>>,
    capture: Res<PointerCapture>,
    mut motion_events: MessageReader<MouseMotion>,
    mut camera_query: Query<&mut OrbitCamera>,
) {
    if !mouse_button.pressed(MouseButton::Left) || capture.consumed {
        motion_events.clear();
        return;
    }

    let delta: Vec2 = motion_events.read().map(|event| event.delta).sum();
    if delta == Vec2::ZERO {
        return;
    }
    for mut orbit in camera_query.iter_mut() {
        orbit.orbit(delta);
    }
}

fn camera_pan_system(
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut motion_events: MessageReader<MouseMotion>,
    mut camera_query: Query<(&mut OrbitCamera, &Transform)>,
) {
    if !mouse_button.pressed(MouseButton::Right) {
        motion_events.clear();
        return;
    }

    let delta: Vec2 = motion_events.read().map(|event| event.delta).sum();
    if delta == Vec2::ZERO {
        return;
    }
    for (mut orbit, transform) in camera_query.iter_mut() {
        let right = transform.rotation * Vec3::X;
        let up = transform.rotation * Vec3::Y;
        let pan_scale = orbit.pan_sensitivity * orbit.distance;
        // Negative so it feels like dragging the scene
        orbit.target += (-right * delta.x + up * delta.y) * pan_scale;
    }
}

fn camera_zoom_system(
    mut scroll_events: MessageReader<MouseWheel>,
    mut camera_query: Query<&mut OrbitCamera>,
) {
    let lines: f32 = scroll_events.read().map(|event| event.y).sum();
    if lines == 0.0 {
        return;
    }
    for mut orbit in camera_query.iter_mut() {
        orbit.zoom(lines);
    }
}

fn update_camera_transform(
    mut camera_query: Query<(&OrbitCamera, &mut Transform), (With<MainCamera>, Changed<OrbitCamera>)>,
) {
    for (orbit, mut transform) in camera_query.iter_mut() {
        *transform =
            Transform::from_translation(orbit.calculate_position()).looking_at(orbit.target, Vec3::Y);
    }
}
