/// Canvas width the font-size tiers are defined against.
pub const REFERENCE_CANVAS_WIDTH: f32 = 2048.0;

/// Text may occupy at most this fraction of the canvas width.
pub const MAX_TEXT_WIDTH_RATIO: f32 = 0.85;

/// Drawing-surface text is this fraction of texture text at equal canvas width.
pub const DRAWING_SURFACE_FONT_RATIO: f32 = 0.7;

/// Line height as a multiple of font size.
pub const LINE_HEIGHT: f32 = 1.2;

/// Font sizes never shrink below this.
pub const MIN_FONT_SIZE: f32 = 8.0;

/// Flat-style stroke width as a fraction of font size.
pub const FLAT_STROKE_RATIO: f32 = 0.04;

/// Hard cap on anisotropic filtering.
pub const MAX_ANISOTROPY: u8 = 8;

/// Default procedural text canvas.
pub const DEFAULT_TEXT_CANVAS: (u32, u32) = (2048, 1024);

/// Default square drawing surface side.
pub const DEFAULT_DRAWING_SURFACE_SIZE: u32 = 2048;
