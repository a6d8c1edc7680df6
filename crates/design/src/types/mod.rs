//! Type definitions for the design configuration.

mod decal;
mod design;

pub use decal::*;
pub use design::*;
