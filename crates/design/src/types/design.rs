//! The hat design configuration.

use serde::{Deserialize, Serialize};

use super::{Decal, DecalContent};

/// Scheme prefix of in-memory object URLs that only resolve inside the authoring session.
pub const EPHEMERAL_URL_PREFIX: &str = "blob:";

/// Stylized rendering applied to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextRenderStyle {
    #[default]
    Flat,
    Embroidery,
    GoldEmbroidery,
    #[serde(rename = "puff-3d")]
    Puff3d,
}

impl TextRenderStyle {
    /// Every style except `Flat` is drawn through the layered effect recipes.
    pub fn is_effect(self) -> bool {
        !matches!(self, Self::Flat)
    }
}

/// Cap size options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CapSize {
    #[serde(rename = "S/M")]
    SmallMedium,
    #[default]
    #[serde(rename = "M/L")]
    MediumLarge,
    #[serde(rename = "L/XL")]
    LargeExtraLarge,
}

/// Full customization state of a cap.
///
/// Every edit produces a new value; the scene and compositor only ever read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HatDesign {
    pub hat_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band_color: Option<String>,
    /// Uploaded fabric pattern image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
    pub front_text: String,
    pub back_text: String,
    pub font: String,
    pub text_color: String,
    pub text_style: TextRenderStyle,
    pub size: CapSize,
    /// ISO 3166-1 alpha-2 country code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brim_text: Option<String>,
    #[serde(default)]
    pub decals: Vec<Decal>,
}

impl Default for HatDesign {
    fn default() -> Self {
        Self {
            hat_color: "#1F2A44".to_string(),
            band_color: None,
            texture: None,
            front_text: String::new(),
            back_text: String::new(),
            font: "Bebas Neue".to_string(),
            text_color: "#FFFFFF".to_string(),
            text_style: TextRenderStyle::Flat,
            size: CapSize::default(),
            flag: None,
            brim_text: None,
            decals: Vec::new(),
        }
    }
}

impl HatDesign {
    /// Band color, falling back to the base color
    pub fn effective_band_color(&self) -> &str {
        self.band_color.as_deref().unwrap_or(&self.hat_color)
    }

    pub fn decal(&self, id: &str) -> Option<&Decal> {
        self.decals.iter().find(|d| d.id == id)
    }

    /// Copy with `decal` appended.
    pub fn with_decal(&self, decal: Decal) -> Self {
        let mut next = self.clone();
        next.decals.push(decal);
        next
    }

    /// Copy with the decal `id` replaced by `update(decal)`. Unknown ids leave the design as is.
    pub fn with_decal_updated(&self, id: &str, update: impl FnOnce(&Decal) -> Decal) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.decals.iter_mut().find(|d| d.id == id) {
            let updated = update(slot);
            *slot = updated;
        }
        next
    }

    /// Copy without decal `id`, plus the selection that remains afterwards.
    ///
    /// Removing the selected decal clears the selection; removing any other decal keeps it.
    pub fn without_decal(&self, id: &str, selected: Option<&str>) -> (Self, Option<String>) {
        let mut next = self.clone();
        next.decals.retain(|d| d.id != id);
        let selection = match selected {
            Some(current) if current == id => None,
            other => other.map(str::to_string),
        };
        (next, selection)
    }

    /// Copy with every session-local object URL replaced by `None`.
    pub fn sanitized(&self) -> Self {
        let mut next = self.clone();
        next.texture = next.texture.filter(|src| !is_ephemeral_url(src));
        for decal in &mut next.decals {
            if let DecalContent::Image { src } = &mut decal.content {
                if src.as_deref().is_some_and(is_ephemeral_url) {
                    *src = None;
                }
            }
        }
        next
    }

    /// Text lines for the front panel (blank lines dropped)
    pub fn front_lines(&self) -> Vec<&str> {
        split_lines(&self.front_text)
    }

    /// Text lines for the back panel (blank lines dropped)
    pub fn back_lines(&self) -> Vec<&str> {
        split_lines(&self.back_text)
    }
}

/// Whether `src` is an in-memory object URL.
pub fn is_ephemeral_url(src: &str) -> bool {
    src.trim_start().starts_with(EPHEMERAL_URL_PREFIX)
}

fn split_lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}
