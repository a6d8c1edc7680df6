//! Font registry.
//!
//! Holds loaded fonts keyed by family and the set of families that have
//! already been requested from the font loader. Construction is the
//! initialization boundary; nothing here is global.
//!
//! Families that are not loaded render with the default face when one is
//! set, and with [`BlockGlyphs`] otherwise.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, info};

use crate::glyphs::{BlockGlyphs, FontGlyphs, GlyphSource};

/// Fira Sans Bold, used for families that have not been loaded.
pub const DEFAULT_FACE: &[u8] = include_bytes!("../assets/fonts/FiraSans-Bold.ttf");

/// Placeholder for the family slug in font URL templates.
pub const FAMILY_PLACEHOLDER: &str = "{family}";

#[derive(Debug, Error)]
pub enum FontError {
    #[error("Failed to load font {family:?}: {reason}")]
    Load { family: String, reason: String },
    #[error("Font family name is empty")]
    EmptyFamily,
}

/// Fonts available to the compositor.
#[derive(Default)]
pub struct FontRegistry {
    fonts: HashMap<String, FontGlyphs>,
    requested: HashSet<String>,
    default_face: Option<FontGlyphs>,
    fallback: BlockGlyphs,
    revision: u64,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with [`DEFAULT_FACE`] standing in for unloaded families.
    pub fn with_default_face() -> Result<Self, FontError> {
        let mut registry = Self::new();
        registry.set_default_face(DEFAULT_FACE)?;
        Ok(registry)
    }

    /// Face used for every family that has no font of its own.
    pub fn set_default_face(&mut self, bytes: &[u8]) -> Result<(), FontError> {
        let font = parse_font("default", bytes)?;
        self.default_face = Some(FontGlyphs::new(font));
        self.revision += 1;
        Ok(())
    }

    pub fn has_default_face(&self) -> bool {
        self.default_face.is_some()
    }

    /// Bumped whenever a lookup may resolve to different glyphs than before.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Mark a family as requested. Returns `true` only the first time, so the
    /// caller starts at most one load per family.
    pub fn request(&mut self, family: &str) -> bool {
        let key = family_key(family);
        if key.is_empty() || self.fonts.contains_key(&key) {
            return false;
        }
        let first = self.requested.insert(key);
        if first {
            debug!("Font requested: {family:?}");
        }
        first
    }

    pub fn is_requested(&self, family: &str) -> bool {
        self.requested.contains(&family_key(family))
    }

    pub fn is_loaded(&self, family: &str) -> bool {
        self.fonts.contains_key(&family_key(family))
    }

    /// Register font bytes for a family.
    pub fn register(&mut self, family: &str, bytes: &[u8]) -> Result<(), FontError> {
        let key = family_key(family);
        if key.is_empty() {
            return Err(FontError::EmptyFamily);
        }
        let font = parse_font(family, bytes)?;
        info!("Registered font {family:?}");
        self.requested.insert(key.clone());
        self.fonts.insert(key, FontGlyphs::new(font));
        self.revision += 1;
        Ok(())
    }

    /// Glyphs for a CSS-style family list; the first family decides.
    pub fn glyphs(&self, family: &str) -> &dyn GlyphSource {
        if let Some(font) = self.fonts.get(&family_key(family)) {
            return font as &dyn GlyphSource;
        }
        match &self.default_face {
            Some(face) => face as &dyn GlyphSource,
            None => &self.fallback as &dyn GlyphSource,
        }
    }
}

fn parse_font(family: &str, bytes: &[u8]) -> Result<fontdue::Font, FontError> {
    fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()).map_err(|reason| {
        FontError::Load {
            family: family.to_string(),
            reason: reason.to_string(),
        }
    })
}

/// URL of a family's font file: `{family}` in `template` becomes the
/// hyphenated family key, so `"'Bebas Neue', sans-serif"` loads `bebas-neue`.
pub fn font_url(template: &str, family: &str) -> Option<String> {
    let slug = family_key(family)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() || !template.contains(FAMILY_PLACEHOLDER) {
        return None;
    }
    Some(template.replace(FAMILY_PLACEHOLDER, &slug))
}

/// Normalize `"'Bebas Neue', sans-serif"` to `"bebas neue"`.
fn family_key(family: &str) -> String {
    family
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_is_idempotent() {
        let mut registry = FontRegistry::new();
        assert!(registry.request("Pacifico"));
        assert!(!registry.request("pacifico"));
        assert!(!registry.request("'Pacifico', cursive"));
        assert!(registry.is_requested("PACIFICO"));
        assert!(!registry.request("  "));
    }

    #[test]
    fn test_unknown_family_uses_fallback() {
        let registry = FontRegistry::new();
        let glyphs = registry.glyphs("Bebas Neue");
        assert!((glyphs.advance('A', 100.0) - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_default_face_replaces_blocks() {
        let registry = FontRegistry::with_default_face().unwrap();
        assert!(registry.has_default_face());
        assert_eq!(registry.revision(), 1);
        let glyphs = registry.glyphs("Bebas Neue");
        // Proportional: a narrow glyph is narrower than a wide one
        assert!(glyphs.advance('i', 100.0) < glyphs.advance('W', 100.0));
    }

    #[test]
    fn test_registered_family_wins_over_default() {
        let mut registry = FontRegistry::new();
        registry.register("Fira Sans", DEFAULT_FACE).unwrap();
        assert_eq!(registry.revision(), 1);
        assert!(registry.is_loaded("'Fira Sans', sans-serif"));
        assert!(!registry.request("Fira Sans"));
        let advance = registry.glyphs("fira sans").advance('i', 100.0);
        assert!((advance - 60.0).abs() > 1.0);
        // Other families still use blocks
        assert!((registry.glyphs("Pacifico").advance('i', 100.0) - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_font_url_slug() {
        assert_eq!(
            font_url("fonts/{family}.ttf", "'Bebas Neue', sans-serif").as_deref(),
            Some("fonts/bebas-neue.ttf")
        );
        assert_eq!(font_url("fonts/{family}.ttf", " , serif"), None);
        assert_eq!(font_url("fonts/default.ttf", "Pacifico"), None);
    }

    #[test]
    fn test_register_rejects_garbage() {
        let mut registry = FontRegistry::new();
        let err = registry.register("Broken", b"not a font").unwrap_err();
        assert!(matches!(err, FontError::Load { .. }));
        assert!(!registry.is_loaded("Broken"));
        assert!(matches!(
            registry.register("", b""),
            Err(FontError::EmptyFamily)
        ));
    }
}
