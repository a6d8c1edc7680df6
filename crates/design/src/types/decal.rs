//! Decal types for the design configuration.

use serde::{Deserialize, Serialize};

use super::TextRenderStyle;

/// Smallest scale a decal may be given.
pub const MIN_DECAL_SCALE: f32 = 0.01;

/// Reference to the sub-mesh a decal is projected onto.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    pub mesh_name: String,
    pub parent_name: String,
}

impl TargetRef {
    pub fn new(parent_name: impl Into<String>, mesh_name: impl Into<String>) -> Self {
        Self {
            mesh_name: mesh_name.into(),
            parent_name: parent_name.into(),
        }
    }
}

/// What a decal shows. Each variant carries exactly the fields it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DecalContent {
    /// Uploaded or linked raster. `src` is `None` once an ephemeral blob URL was stripped.
    Image { src: Option<String> },
    /// Text rendered procedurally with the design's style recipes.
    Text {
        text: String,
        color: String,
        font: String,
    },
}

/// A positioned, oriented, scaled planar layer projected onto the cap.
///
/// Transforms are stored in model-local space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decal {
    pub id: String,
    #[serde(flatten)]
    pub content: DecalContent,
    pub position: [f32; 3],
    /// Euler XYZ radians. Only `z` (spin) is free for surface-placed decals.
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextRenderStyle>,
}

impl Decal {
    /// Create an image decal at the default front position.
    pub fn image(id: impl Into<String>, src: impl Into<String>) -> Self {
        Self::with_content(id, DecalContent::Image {
            src: Some(src.into()),
        })
    }

    /// Create a text decal at the default front position.
    pub fn text(
        id: impl Into<String>,
        text: impl Into<String>,
        color: impl Into<String>,
        font: impl Into<String>,
    ) -> Self {
        Self::with_content(id, DecalContent::Text {
            text: text.into(),
            color: color.into(),
            font: font.into(),
        })
    }

    fn with_content(id: impl Into<String>, content: DecalContent) -> Self {
        Self {
            id: id.into(),
            content,
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
            normal: None,
            target: None,
            style: None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.content, DecalContent::Text { .. })
    }

    /// Set a uniform scale, clamped to [`MIN_DECAL_SCALE`].
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = [uniform_scale(scale); 3];
        self
    }

    /// Collapse an arbitrary scale to the uniform-positive form decals require.
    pub fn normalized_scale(scale: [f32; 3]) -> [f32; 3] {
        let mean = (scale[0].abs() + scale[1].abs() + scale[2].abs()) / 3.0;
        [uniform_scale(mean); 3]
    }

    /// Whether the decal sits on the back half of the cap.
    pub fn faces_back(&self) -> bool {
        self.normal.is_some_and(|n| n[2] < 0.0)
    }
}

fn uniform_scale(value: f32) -> f32 {
    if value.is_finite() {
        value.abs().max(MIN_DECAL_SCALE)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decal_kind_tag_serialization() {
        let decal = Decal::text("d1", "HELLO", "#ffffff", "Bebas Neue");
        let json = serde_json::to_value(&decal).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["text"], "HELLO");
        assert!(json.get("normal").is_none());

        let back: Decal = serde_json::from_value(json).unwrap();
        assert_eq!(back, decal);
    }

    #[test]
    fn test_normalized_scale_is_uniform_positive() {
        let scale = Decal::normalized_scale([-0.5, 0.7, 0.9]);
        assert!((scale[0] - 0.7).abs() < 1e-6);
        assert_eq!(scale[0], scale[1]);
        assert_eq!(scale[1], scale[2]);

        let tiny = Decal::normalized_scale([0.0, 0.0, 0.0]);
        assert_eq!(tiny, [MIN_DECAL_SCALE; 3]);
    }

    #[test]
    fn test_faces_back_uses_normal() {
        let mut decal = Decal::image("d1", "https://example.com/logo.png");
        assert!(!decal.faces_back());
        decal.normal = Some([0.0, 0.0, -1.0]);
        assert!(decal.faces_back());
    }
}
