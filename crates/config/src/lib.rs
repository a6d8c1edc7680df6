//! Shared configuration for Capforge
//!
//! This crate provides the single source of truth for texture canvas sizes,
//! material classification keywords, and placement tunables shared by the
//! compositing, placement and scene crates.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

/// Default procedural text canvas width in pixels
pub const DEFAULT_TEXT_CANVAS_WIDTH: u32 = 2048;

/// Default procedural text canvas height in pixels
pub const DEFAULT_TEXT_CANVAS_HEIGHT: u32 = 1024;

/// Default side length of the square drawing surface
pub const DEFAULT_DRAWING_SURFACE_SIZE: u32 = 2048;

/// Upper bound for anisotropic filtering, regardless of what the device reports
pub const DEFAULT_MAX_ANISOTROPY: u8 = 8;

/// Distance (model units) decals are lifted off the surface along its normal
pub const DEFAULT_SURFACE_OFFSET: f32 = 0.002;

/// Tiling factor for uploaded fabric patterns (both axes)
pub const DEFAULT_PATTERN_REPEAT: f32 = 2.0;

/// Material names treated as fabric regardless of mesh naming
pub const DEFAULT_FABRIC_MATERIAL_NAMES: &[&str] = &[
    "fabric",
    "cloth",
    "cap",
    "hat",
    "material",
    "material.001",
    "crown",
    "visor",
    "brim",
    "bill",
];

/// Substrings that mark a material/mesh/parent combination as fabric
pub const DEFAULT_FABRIC_KEYWORDS: &[&str] = &[
    "fabric", "cloth", "cotton", "canvas", "twill", "cap", "crown", "panel", "visor", "brim",
    "bill", "liner", "band", "sweat",
];

/// Substrings that mark a fabric sub-mesh as part of the inner band
pub const DEFAULT_BAND_KEYWORDS: &[&str] = &["band", "liner", "sweat"];

/// Structural naming for the cap model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelNaming {
    /// Parent group name of the crown sub-mesh
    pub main_group: String,
    /// Parent group name of the visor sub-mesh
    pub bill_group: String,
}

impl Default for ModelNaming {
    fn default() -> Self {
        Self {
            main_group: "main_cap".to_string(),
            bill_group: "bill".to_string(),
        }
    }
}

/// Keyword configuration for fabric classification.
///
/// Matching is heuristic; these lists are expected to be tuned per model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub fabric_material_names: Vec<String>,
    pub fabric_keywords: Vec<String>,
    pub band_keywords: Vec<String>,
    pub naming: ModelNaming,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            fabric_material_names: to_owned_list(DEFAULT_FABRIC_MATERIAL_NAMES),
            fabric_keywords: to_owned_list(DEFAULT_FABRIC_KEYWORDS),
            band_keywords: to_owned_list(DEFAULT_BAND_KEYWORDS),
            naming: ModelNaming::default(),
        }
    }
}

/// Where font files are looked up; `{family}` becomes the hyphenated family name
pub const DEFAULT_FONT_TEMPLATE: &str = "fonts/{family}.ttf";

/// Optional externally hosted assets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEndpoints {
    /// URL template for flag images, `{code}` is replaced by a 2-letter country code
    pub flag_endpoint: Option<String>,
    /// URL of the localized brim text raster
    pub brim_text_url: Option<String>,
    /// URL template for font files. Without one, every family uses the built-in face.
    pub font_template: Option<String>,
}

impl Default for AssetEndpoints {
    fn default() -> Self {
        Self {
            flag_endpoint: None,
            brim_text_url: None,
            font_template: Some(DEFAULT_FONT_TEMPLATE.to_string()),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
pub struct CapforgeConfig {
    /// Procedural text canvas (width, height)
    pub text_canvas: (u32, u32),
    /// Square drawing surface side length
    pub drawing_surface_size: u32,
    pub max_anisotropy: u8,
    pub surface_offset: f32,
    pub pattern_repeat: f32,
    pub classifier: ClassifierConfig,
    pub assets: AssetEndpoints,
}

impl Default for CapforgeConfig {
    fn default() -> Self {
        Self {
            text_canvas: (DEFAULT_TEXT_CANVAS_WIDTH, DEFAULT_TEXT_CANVAS_HEIGHT),
            drawing_surface_size: DEFAULT_DRAWING_SURFACE_SIZE,
            max_anisotropy: DEFAULT_MAX_ANISOTROPY,
            surface_offset: DEFAULT_SURFACE_OFFSET,
            pattern_repeat: DEFAULT_PATTERN_REPEAT,
            classifier: ClassifierConfig::default(),
            assets: AssetEndpoints::default(),
        }
    }
}

impl CapforgeConfig {
    /// Defaults overlaid with `CAPFORGE_*` environment variables
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values looked up by key. Unparsable values keep the current setting.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup("CAPFORGE_MAX_ANISOTROPY") {
            match raw.trim().parse::<u8>() {
                Ok(value) if value > 0 => self.max_anisotropy = value,
                _ => warn!("Ignoring CAPFORGE_MAX_ANISOTROPY={raw:?}"),
            }
        }
        if let Some(raw) = lookup("CAPFORGE_SURFACE_OFFSET") {
            match raw.trim().parse::<f32>() {
                Ok(value) if value.is_finite() && value >= 0.0 => self.surface_offset = value,
                _ => warn!("Ignoring CAPFORGE_SURFACE_OFFSET={raw:?}"),
            }
        }
        if let Some(raw) = lookup("CAPFORGE_FLAG_ENDPOINT") {
            self.assets.flag_endpoint = non_empty(raw);
        }
        if let Some(raw) = lookup("CAPFORGE_BRIM_TEXT_URL") {
            self.assets.brim_text_url = non_empty(raw);
        }
        if let Some(raw) = lookup("CAPFORGE_FONT_TEMPLATE") {
            self.assets.font_template = non_empty(raw);
        }
        self
    }

    /// Text canvas width as f32 for calculations
    pub fn text_canvas_width_f32(&self) -> f32 {
        self.text_canvas.0 as f32
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CapforgeConfig::default();
        assert_eq!(config.text_canvas, (2048, 1024));
        assert_eq!(config.drawing_surface_size, 2048);
        assert_eq!(config.max_anisotropy, 8);
        assert_eq!(config.classifier.naming.main_group, "main_cap");
        assert!(config.classifier.band_keywords.contains(&"liner".to_string()));
        assert_eq!(config.assets.font_template.as_deref(), Some("fonts/{family}.ttf"));
    }

    #[test]
    fn test_overrides_applied() {
        let config = CapforgeConfig::default().with_overrides(|key| match key {
            "CAPFORGE_MAX_ANISOTROPY" => Some("4".to_string()),
            "CAPFORGE_FLAG_ENDPOINT" => Some("https://flags.example/{code}.png".to_string()),
            _ => None,
        });
        assert_eq!(config.max_anisotropy, 4);
        assert_eq!(
            config.assets.flag_endpoint.as_deref(),
            Some("https://flags.example/{code}.png")
        );
    }

    #[test]
    fn test_invalid_overrides_ignored() {
        let config = CapforgeConfig::default().with_overrides(|key| match key {
            "CAPFORGE_MAX_ANISOTROPY" => Some("lots".to_string()),
            "CAPFORGE_SURFACE_OFFSET" => Some("-1".to_string()),
            "CAPFORGE_BRIM_TEXT_URL" => Some("   ".to_string()),
            "CAPFORGE_FONT_TEMPLATE" => Some("".to_string()),
            _ => None,
        });
        assert_eq!(config.max_anisotropy, DEFAULT_MAX_ANISOTROPY);
        assert_eq!(config.surface_offset, DEFAULT_SURFACE_OFFSET);
        assert!(config.assets.brim_text_url.is_none());
        assert!(config.assets.font_template.is_none());
    }
}
