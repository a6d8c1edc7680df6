//! Procedural text: font sizing, layout, style recipes and rasterization.

mod layout;
mod recipe;
mod render;
mod sizing;

pub use layout::*;
pub use recipe::*;
pub use render::*;
pub use sizing::*;
