//! Cart boundary.
//!
//! The compositor hands a finished design to a [`CartSink`]; price rules
//! live here so the scene never computes prices itself.

use tracing::info;

use crate::types::{CapSize, HatDesign};

/// Price of a standard cap
pub const STANDARD_PRICE: f64 = 50.0;

/// Price of a white cap with white text
pub const WHITE_ON_WHITE_PRICE: f64 = 80.0;

const WHITE: &str = "#ffffff";

/// Price a design.
pub fn price(design: &HatDesign) -> f64 {
    if normalize_color(&design.hat_color) == WHITE && normalize_color(&design.text_color) == WHITE
    {
        WHITE_ON_WHITE_PRICE
    } else {
        STANDARD_PRICE
    }
}

/// Lowercase a color string and drop all whitespace.
pub fn normalize_color(color: &str) -> String {
    color
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A priced, shareable cart entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    pub design: HatDesign,
    pub size: CapSize,
    pub unit_price: f64,
    pub quantity: u32,
}

impl CartItem {
    /// Price a design and strip session-local references so the item outlives the session.
    pub fn from_design(design: &HatDesign, quantity: u32) -> Self {
        let design = design.sanitized();
        Self {
            size: design.size,
            unit_price: price(&design),
            quantity: quantity.max(1),
            design,
        }
    }

    pub fn total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// External cart collaborator.
pub trait CartSink {
    fn add_item(&mut self, item: CartItem);
}

/// In-memory cart
#[derive(Debug, Default)]
pub struct MemoryCart {
    items: Vec<CartItem>,
}

impl MemoryCart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::total).sum()
    }
}

impl CartSink for MemoryCart {
    fn add_item(&mut self, item: CartItem) {
        info!(
            "Cart: added {}x {:?} cap at {:.2}",
            item.quantity, item.size, item.unit_price
        );
        self.items.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Decal;

    #[test]
    fn test_white_on_white_price() {
        let design = HatDesign {
            hat_color: "#FFFFFF".to_string(),
            text_color: " #ffffff ".to_string(),
            ..Default::default()
        };
        assert_eq!(price(&design), 80.0);
    }

    #[test]
    fn test_standard_price() {
        let design = HatDesign {
            hat_color: "#CC0000".to_string(),
            text_color: "#FFD700".to_string(),
            ..Default::default()
        };
        assert_eq!(price(&design), 50.0);
    }

    #[test]
    fn test_cart_item_is_sanitized() {
        let design = HatDesign::default().with_decal(Decal::image("b", "blob:local/1"));
        let mut cart = MemoryCart::new();
        cart.add_item(CartItem::from_design(&design, 2));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].design, design.sanitized());
        assert_eq!(cart.total(), 100.0);
    }
}
