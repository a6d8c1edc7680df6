//! Built-in cap model, named the way the classifier expects exported caps to be.

use bevy::prelude::*;
use capforge_scene::{MaterialName, ModelImported};

/// Root of the spawned demo cap, announced once its hierarchy is in place
#[derive(Resource)]
struct DemoCapRoot(Entity);

pub struct DemoCapPlugin;

impl Plugin for DemoCapPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_demo_cap)
            .add_systems(PostStartup, announce_demo_cap);
    }
}

fn spawn_demo_cap(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let fabric = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        perceptual_roughness: 0.9,
        ..default()
    });
    let metal = materials.add(StandardMaterial {
        base_color: Color::srgb(0.75, 0.75, 0.78),
        metallic: 0.8,
        perceptual_roughness: 0.3,
        ..default()
    });

    let crown = meshes.add(Sphere::new(0.1).mesh().uv(48, 24));
    let visor = meshes.add(Cylinder::new(0.09, 0.006));
    let band = meshes.add(Torus::new(0.092, 0.1));
    let button = meshes.add(Sphere::new(0.008).mesh().uv(12, 8));

    let root = commands
        .spawn((Transform::default(), Visibility::default(), Name::new("cap")))
        .with_children(|cap| {
            cap.spawn((Transform::default(), Visibility::default(), Name::new("main_cap")))
                .with_children(|main| {
                    main.spawn((
                        Mesh3d(crown),
                        MeshMaterial3d(fabric.clone()),
                        Transform::from_scale(Vec3::new(1.0, 0.8, 1.05)),
                        Name::new("crown"),
                        MaterialName("fabric".to_string()),
                    ));
                    main.spawn((
                        Mesh3d(band),
                        MeshMaterial3d(fabric.clone()),
                        Transform::from_xyz(0.0, 0.004, 0.0),
                        Name::new("sweatband"),
                        MaterialName("fabric".to_string()),
                    ));
                    main.spawn((
                        Mesh3d(button),
                        MeshMaterial3d(metal),
                        Transform::from_xyz(0.0, 0.08, 0.0),
                        Name::new("button"),
                        MaterialName("metal".to_string()),
                    ));
                });
            cap.spawn((Transform::default(), Visibility::default(), Name::new("bill")))
                .with_children(|bill| {
                    bill.spawn((
                        Mesh3d(visor),
                        MeshMaterial3d(fabric),
                        Transform::from_xyz(0.0, 0.0, 0.1)
                            .with_rotation(Quat::from_rotation_x(-0.12))
                            .with_scale(Vec3::new(1.0, 1.0, 0.75)),
                        Name::new("visor"),
                        MaterialName("fabric".to_string()),
                    ));
                });
        })
        .id();
    commands.insert_resource(DemoCapRoot(root));
}

fn announce_demo_cap(root: Res<DemoCapRoot>, mut imported: MessageWriter<ModelImported>) {
    imported.write(ModelImported { root: root.0 });
    info!("Demo cap spawned");
}
