//! Viewer hotkeys
//!
//! - T: add a text decal
//! - Escape: clear the decal selection
//! - Ctrl+S: log a share link for the current design
//! - Enter: add the design to the cart

use bevy::prelude::*;
use capforge_design::{Decal, snapshot_query};
use capforge_scene::{AddToCart, DesignEdit, DesignResource, ScenePhase};

pub struct HotkeyPlugin;

impl Plugin for HotkeyPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (handle_decal_hotkeys, handle_share_hotkey, handle_cart_hotkey)
                .before(ScenePhase::Edit),
        );
    }
}

fn handle_decal_hotkeys(
    key_input: Res<ButtonInput<KeyCode>>,
    design: Res<DesignResource>,
    mut edits: MessageWriter<DesignEdit>,
    mut next_id: Local<u32>,
) {
    if key_input.just_pressed(KeyCode::KeyT) {
        // Skip ids a loaded design already uses
        let id = loop {
            *next_id += 1;
            let id = format!("text-{}", *next_id);
            if design.design.decal(&id).is_none() {
                break id;
            }
        };
        let decal = Decal::text(
            id,
            "TEXT",
            design.design.text_color.clone(),
            design.design.font.clone(),
        );
        edits.write(DesignEdit::AddDecal {
            decal,
            placement: None,
        });
    }
    if key_input.just_pressed(KeyCode::Escape) {
        edits.write(DesignEdit::SelectDecal(None));
    }
}

fn handle_share_hotkey(key_input: Res<ButtonInput<KeyCode>>, design: Res<DesignResource>) {
    let ctrl = key_input.pressed(KeyCode::ControlLeft) || key_input.pressed(KeyCode::ControlRight);
    if !(ctrl && key_input.just_pressed(KeyCode::KeyS)) {
        return;
    }
    match snapshot_query(&design.design) {
        Ok(query) => info!("Share link: ?{query}"),
        Err(err) => warn!("Could not encode design: {err}"),
    }
}

fn handle_cart_hotkey(key_input: Res<ButtonInput<KeyCode>>, mut cart: MessageWriter<AddToCart>) {
    if key_input.just_pressed(KeyCode::Enter) {
        cart.write(AddToCart { quantity: 1 });
    }
}
