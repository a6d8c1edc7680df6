//! Capforge - desktop viewer for the cap configurator

use bevy::prelude::*;
use bevy::window::WindowResolution;
use capforge_config::CapforgeConfig;
use capforge_scene::{CapforgeScenePlugin, DesignResource};

mod config;
mod demo;
mod fetch;
mod input;

use config::ViewerConfig;

const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 800;

fn main() {
    let viewer = ViewerConfig::from_env();
    let config = CapforgeConfig::from_env();

    let window = Window {
        title: "Capforge".into(),
        resolution: WindowResolution::new(WINDOW_WIDTH, WINDOW_HEIGHT),
        present_mode: bevy::window::PresentMode::AutoVsync,
        ..default()
    };

    let mut app = App::new();
    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(window),
                ..default()
            })
            .set(bevy::log::LogPlugin {
                level: bevy::log::Level::INFO,
                ..default()
            }),
    );

    info!(
        "Starting Capforge, assets from {}",
        viewer.asset_dir.display()
    );

    // Both must be in place before the scene plugin builds
    app.insert_resource(config)
        .insert_resource(DesignResource::new(viewer.design.clone()))
        .insert_resource(viewer)
        .add_plugins(CapforgeScenePlugin)
        .add_plugins((fetch::LocalFetchPlugin, demo::DemoCapPlugin, input::HotkeyPlugin))
        .run();
}
