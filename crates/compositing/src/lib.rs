//! CPU texture compositing for the cap configurator.
//!
//! This crate turns text, images and freeform drawings into rasters the
//! renderer can upload:
//! - [`TextureCompositor`] renders styled text (flat, embroidery,
//!   gold embroidery, puff) straight or along an arc
//! - [`DrawingSurfaceAdapter`] keeps an editable 2D surface whose raster is
//!   used as a live texture
//! - [`UvPointerBridge`] lets pointer hits on the 3D model edit that surface

pub mod color;
pub mod compositor;
pub mod constants;
pub mod dirty;
pub mod drawing;
pub mod fonts;
pub mod glyphs;
pub mod paint;
pub mod pointer_bridge;
pub mod surface;
pub mod text;
pub mod texture;

pub use color::{ColorError, Rgba};
pub use compositor::{TextRequest, TextureCompositor, compose_text};
pub use dirty::DirtySignal;
pub use drawing::{DrawingSurfaceAdapter, TextChange, TextOptions};
pub use fonts::{DEFAULT_FACE, FontError, FontRegistry, font_url};
pub use glyphs::{BlockGlyphs, FontGlyphs, GlyphSource};
pub use pointer_bridge::{BridgeOutcome, UvPointerBridge, ViewportPointerEvent, uv_to_canvas};
pub use surface::CpuSurface;
pub use text::TextLayout;
pub use texture::{ColorSpace, RasterTexture, TextureUsage, clamp_anisotropy, mip_levels};
