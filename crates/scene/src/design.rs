//! The current design and the edits that replace it.

use bevy::ecs::message::Message;
use bevy::prelude::*;
use capforge_design::{CartItem, CartSink, Decal, DecalContent, HatDesign, MemoryCart};
use compositing::FontRegistry;
use placement::LocalPlacement;

/// The design everything in the scene is derived from.
///
/// Systems never mutate it field by field; edits replace the whole value so
/// change detection fires once per edit.
#[derive(Resource, Debug, Clone, Default)]
pub struct DesignResource {
    pub design: HatDesign,
}

impl DesignResource {
    pub fn new(design: HatDesign) -> Self {
        Self { design }
    }

    pub fn replace(&mut self, design: HatDesign) {
        self.design = design;
    }
}

/// Id of the selected decal, mirrored from the decal layer for UI consumers.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedDecal(pub Option<String>);

/// Loaded fonts. Starts with the built-in face so text never draws as blocks.
#[derive(Resource)]
pub struct Fonts(pub FontRegistry);

impl Default for Fonts {
    fn default() -> Self {
        match FontRegistry::with_default_face() {
            Ok(registry) => Self(registry),
            Err(err) => {
                warn!("Built-in font unavailable, text falls back to blocks: {err}");
                Self(FontRegistry::new())
            }
        }
    }
}

/// Edits requested by the host UI.
#[derive(Message, Debug, Clone)]
pub enum DesignEdit {
    /// Replace the whole design (e.g. a shared snapshot was opened)
    Replace(HatDesign),
    AddDecal {
        decal: Decal,
        placement: Option<LocalPlacement>,
    },
    RemoveDecal(String),
    SelectDecal(Option<String>),
}

/// Hand the current design to the cart.
#[derive(Message, Debug, Clone, Copy)]
pub struct AddToCart {
    pub quantity: u32,
}

#[derive(Resource, Default)]
pub struct Cart(pub MemoryCart);

/// Every font family the design draws text with, main text first.
pub fn design_font_families(design: &HatDesign) -> Vec<&str> {
    let mut families = vec![design.font.as_str()];
    for decal in &design.decals {
        if let DecalContent::Text { font, .. } = &decal.content
            && !families.contains(&font.as_str())
        {
            families.push(font.as_str());
        }
    }
    families
}

pub(crate) fn handle_add_to_cart(
    mut requests: MessageReader<AddToCart>,
    design: Res<DesignResource>,
    mut cart: ResMut<Cart>,
) {
    for request in requests.read() {
        cart.0
            .add_item(CartItem::from_design(&design.design, request.quantity));
        debug!("Cart total {:.2}", cart.0.total());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fonts_start_with_built_in_face() {
        let fonts = Fonts::default();
        assert!(fonts.0.has_default_face());
    }

    #[test]
    fn test_font_families_are_unique() {
        let mut design = HatDesign::default();
        design.decals = vec![
            Decal::text("a", "ONE", "#ffffff", "Pacifico"),
            Decal::image("b", "logo.png"),
            Decal::text("c", "TWO", "#ffffff", "Bebas Neue"),
            Decal::text("d", "THREE", "#ffffff", "Pacifico"),
        ];
        assert_eq!(design_font_families(&design), vec!["Bebas Neue", "Pacifico"]);
    }
}
