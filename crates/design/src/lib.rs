//! Hat design model for Capforge
//!
//! Defines the design configuration threaded through the compositor and
//! scene, the shareable URL snapshot, and the boundary to the cart.

pub mod error;
pub mod pricing;
pub mod snapshot;
pub mod types;

pub use error::DesignError;
pub use pricing::*;
pub use snapshot::*;
pub use types::*;
